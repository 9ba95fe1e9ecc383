// Screenshots
//
// Saves the last delivered frame as a PNG file under the screenshots
// directory, in one subdirectory per game.

use crate::video::FrameBuffer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// No frame has been delivered yet
    #[error("no frame to capture")]
    NoFrame,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// Directory for a game's screenshots: `<base>/<game stem>/`
fn screenshot_directory(base: &Path, game: Option<&Path>) -> PathBuf {
    match game.and_then(Path::file_stem) {
        Some(stem) => base.join(stem),
        None => base.join("default"),
    }
}

/// Save a frame as PNG
///
/// # Arguments
///
/// * `frame` - The frame to save
/// * `base` - Screenshots directory
/// * `game` - Location of the loaded game, used for the subdirectory
///
/// # Returns
///
/// Path of the written file
///
/// # Example
///
/// ```no_run
/// use emu_front::program::save_screenshot;
/// use emu_front::video::FrameBuffer;
/// use std::path::Path;
///
/// let mut frame = FrameBuffer::new();
/// frame.copy_from(&[0xffff_0000; 4], 2, 2, 2);
/// let path = save_screenshot(&frame, Path::new("screenshots"), None).unwrap();
/// println!("Screenshot saved to: {}", path.display());
/// ```
pub fn save_screenshot(
    frame: &FrameBuffer,
    base: &Path,
    game: Option<&Path>,
) -> Result<PathBuf, ScreenshotError> {
    if frame.is_empty() {
        return Err(ScreenshotError::NoFrame);
    }

    let directory = screenshot_directory(base, game);
    fs::create_dir_all(&directory)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = directory.join(format!("screenshot_{}.png", timestamp));
    save_png(&path, &frame.to_rgb(), frame.width(), frame.height())?;

    log::info!("Screenshot saved to {}", path.display());
    Ok(path)
}

fn save_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<(), ScreenshotError> {
    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;

    Ok(())
}
