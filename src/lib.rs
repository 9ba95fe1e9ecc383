// Emulator Front-End Library
// Control layer between a window, input hardware and emulation cores

// Public modules
pub mod audio;
pub mod emulator;
pub mod engine;
pub mod input;
pub mod media;
pub mod program;
pub mod settings;
pub mod video;

// Re-export main types for convenience
pub use audio::{AudioSink, Mixer, NullSink, Resampler};
pub use emulator::{blank_factory, consoles, Console, Emulator, LoadError};
pub use engine::{Core, CoreFactory, Platform};
pub use input::{
    Assignment, BindTarget, Defocus, HotkeyAction, HotkeyEvent, InputConfig, InputManager,
    MappingId, PadControl,
};
pub use media::{FirmwarePak, GamePak, Pak};
pub use program::{Program, Session, StateManager, Step, Tick};
pub use settings::{RecentGames, Settings};
pub use video::{FrameBuffer, Latch};
