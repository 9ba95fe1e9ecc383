// Emulator Front-End - Main Entry Point
//
// Headless runner: loads the games given on the command line into the
// built-in cores, runs the emulation thread for a number of frames and
// prints what happened. Useful for checking settings, bindings and saves
// without a window.

use clap::Parser;
use emu_front::audio::{self, AudioSink, NullSink};
use emu_front::input::{InputDriver, KeyboardFeed, NullDriver, UnifiedDriver};
use emu_front::settings::recent::RECENT_FILE;
use emu_front::{blank_factory, consoles, InputManager, Program, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// UI tick period
const TICK: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "emu-front")]
#[command(about = "Multi-console emulator front-end")]
struct Cli {
    /// Games to load; the first one is started
    games: Vec<PathBuf>,

    /// Emulator to use instead of picking one by file extension
    #[arg(long)]
    system: Option<String>,

    /// Stop after this many frames
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run without frame pacing
    #[arg(long)]
    fast_forward: bool,

    /// Do not open an audio device
    #[arg(long)]
    no_audio: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings_path = cli.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load_or_default(&settings_path);

    let driver: Box<dyn InputDriver> = match settings.input.driver.as_str() {
        "None" => Box::new(NullDriver),
        _ => Box::new(UnifiedDriver::new(KeyboardFeed::new(), true)),
    };
    let input = Arc::new(InputManager::new(driver));
    let sink: Box<dyn AudioSink> = if cli.no_audio {
        Box::new(NullSink::new(settings.audio.frequency))
    } else {
        audio::open(&settings.audio)
    };

    let list = consoles();
    let factory = blank_factory(&list);
    let recent_path = settings_path.with_file_name(RECENT_FILE);
    let mut program = Program::new(settings, list, Box::new(factory), input, sink)
        .with_settings_path(&settings_path)
        .with_recent_path(recent_path);

    println!("emu-front v{}", env!("CARGO_PKG_VERSION"));
    println!("Settings: {}", settings_path.display());

    let mut games = cli.games.into_iter();
    let Some(first) = games.next() else {
        println!("No game given, nothing to run.");
        return Ok(());
    };
    program.push_start(games);

    let loaded = match &cli.system {
        Some(system) => program.load(system, Some(&first)),
        None => program.load_file(&first),
    };
    if let Err(e) = loaded {
        program.quit();
        return Err(e.into());
    }
    println!("Running {} for {} frames", program.loaded().unwrap_or("?"), cli.frames);

    program.set_fast_forward(cli.fast_forward);
    program.start()?;

    let mut last_status = None;
    while program.frames() < cli.frames {
        let tick = program.main();
        if tick.quit {
            break;
        }
        if let Some(latch) = tick.resize {
            println!("Video: {}x{} (rotation {})", latch.width, latch.height, latch.rotation);
        }
        if tick.status.is_some() && tick.status != last_status {
            println!("{}", tick.status.as_deref().unwrap_or_default());
        }
        last_status = tick.status;
        thread::sleep(TICK);
    }

    let frames = program.frames();
    program.quit();
    println!("Ran {} frames ({} interrupts)", frames, program.interrupts());
    Ok(())
}
