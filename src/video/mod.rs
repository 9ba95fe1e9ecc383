// Video output
//
// The output buffer the core's frames are copied into, the geometry latch
// the emulation thread uses to signal a resolution change, and the output
// size computation for each output mode.

use crate::engine::Screen;
use crate::settings::{OutputMode, VideoSettings};

/// Frame buffer holding the last delivered frame
///
/// Pixels are 0xAARRGGBB, `width * height` of them, without padding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Copy a frame out of a core buffer
    ///
    /// # Arguments
    /// * `pixels` - Source rows, `pitch` pixels apart
    /// * `pitch` - Row stride of the source in pixels
    /// * `width` - Visible pixels per row
    /// * `height` - Visible rows
    ///
    /// # Returns
    /// `true` if the size differs from the previous frame
    pub fn copy_from(&mut self, pixels: &[u32], pitch: usize, width: u32, height: u32) -> bool {
        let changed = width != self.width || height != self.height;
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.reserve((width * height) as usize);

        let pitch = pitch.max(width as usize);
        for row in pixels.chunks(pitch).take(height as usize) {
            let visible = &row[..row.len().min(width as usize)];
            self.pixels.extend_from_slice(visible);
            // Short trailing row: pad with black
            self.pixels
                .extend(std::iter::repeat(0xff00_0000).take(width as usize - visible.len()));
        }
        let missing = (width * height) as usize - self.pixels.len();
        self.pixels
            .extend(std::iter::repeat(0xff00_0000).take(missing));
        changed
    }

    /// Pixel at (x, y), `None` if outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.pixels
    }

    /// Convert to packed RGB888
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
        for &color in &self.pixels {
            rgb.push(((color >> 16) & 0xFF) as u8);
            rgb.push(((color >> 8) & 0xFF) as u8);
            rgb.push((color & 0xFF) as u8);
        }
        rgb
    }

    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels.clear();
    }
}

/// Last observed video geometry
///
/// Written by the emulation thread when a frame arrives; the UI thread
/// takes the `changed` flag once per tick and resizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latch {
    pub width: u32,
    pub height: u32,
    pub rotation: u32,
    pub changed: bool,
}

impl Latch {
    /// Record a frame's geometry
    ///
    /// # Returns
    /// `true` if it differs from the previous one
    pub fn update(&mut self, width: u32, height: u32, rotation: u32) -> bool {
        if self.width == width && self.height == height && self.rotation == rotation {
            return false;
        }
        self.width = width;
        self.height = height;
        self.rotation = rotation;
        self.changed = true;
        true
    }

    /// Consume the changed flag
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Native size of a frame after aspect correction and rotation
pub fn native_size(screen: &Screen, width: u32, height: u32, settings: &VideoSettings) -> (u32, u32) {
    let mut w = width as f64;
    let h = height as f64;
    if settings.aspect_correction {
        w *= screen.aspect;
    }
    let (w, h) = if screen.rotation == 90 || screen.rotation == 270 {
        (h, w)
    } else {
        (w, h)
    };
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Window size for the configured multiplier
pub fn window_size(screen: &Screen, width: u32, height: u32, settings: &VideoSettings) -> (u32, u32) {
    let (w, h) = native_size(screen, width, height, settings);
    let multiplier = settings.multiplier.max(1);
    (w * multiplier, h * multiplier)
}

/// Size of the picture inside a viewport
///
/// # Arguments
/// * `native` - Size from `native_size`
/// * `viewport` - Drawable area of the window
pub fn output_size(native: (u32, u32), viewport: (u32, u32), mode: OutputMode) -> (u32, u32) {
    let (w, h) = (native.0.max(1), native.1.max(1));
    let (vw, vh) = viewport;
    let scale = || {
        let multiplier = (vw as f64 / w as f64).min(vh as f64 / h as f64);
        (
            (w as f64 * multiplier).round() as u32,
            (h as f64 * multiplier).round() as u32,
        )
    };
    match mode {
        OutputMode::Center => {
            // Viewport smaller than the picture: shrink instead
            let multiplier = (vw / w).min(vh / h);
            if multiplier == 0 {
                scale()
            } else {
                (w * multiplier, h * multiplier)
            }
        }
        OutputMode::Scale => scale(),
        OutputMode::Stretch => (vw, vh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_from_strips_pitch() {
        let mut fb = FrameBuffer::new();
        let source = [1, 2, 99, 3, 4, 99];
        assert!(fb.copy_from(&source, 3, 2, 2));
        assert_eq!(fb.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(fb.pixel(1, 1), Some(4));
        assert_eq!(fb.pixel(2, 0), None);

        assert!(!fb.copy_from(&source, 3, 2, 2));
    }

    #[test]
    fn test_copy_from_short_source() {
        let mut fb = FrameBuffer::new();
        fb.copy_from(&[7], 2, 2, 2);
        assert_eq!(fb.as_slice(), &[7, 0xff00_0000, 0xff00_0000, 0xff00_0000]);
    }

    #[test]
    fn test_to_rgb() {
        let mut fb = FrameBuffer::new();
        fb.copy_from(&[0xff12_3456], 1, 1, 1);
        assert_eq!(fb.to_rgb(), vec![0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_latch() {
        let mut latch = Latch::default();
        assert!(latch.update(256, 240, 0));
        assert!(!latch.update(256, 240, 0));
        assert!(latch.take_changed());
        assert!(!latch.take_changed());
        assert!(latch.update(256, 240, 90));
    }

    #[test]
    fn test_native_size() {
        let mut screen = Screen::new("Screen", 256, 240);
        screen.aspect = 8.0 / 7.0;
        let mut settings = VideoSettings::default();

        assert_eq!(native_size(&screen, 256, 224, &settings), (293, 224));
        settings.aspect_correction = false;
        assert_eq!(native_size(&screen, 256, 224, &settings), (256, 224));

        screen.rotation = 90;
        assert_eq!(native_size(&screen, 256, 224, &settings), (224, 256));

        settings.multiplier = 3;
        assert_eq!(window_size(&screen, 256, 224, &settings), (672, 768));
    }

    #[test]
    fn test_output_modes() {
        let native = (256, 240);
        assert_eq!(output_size(native, (800, 600), OutputMode::Center), (512, 480));
        assert_eq!(output_size(native, (800, 600), OutputMode::Scale), (640, 600));
        assert_eq!(output_size(native, (800, 600), OutputMode::Stretch), (800, 600));
        assert_eq!(output_size(native, (128, 240), OutputMode::Center), (128, 120));
    }
}
