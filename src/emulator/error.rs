// Load errors
//
// Everything that can make `Emulator::load` fail. Every variant leaves the
// emulator unloaded, so `unload` is always safe afterwards.

use crate::engine::CoreError;
use crate::media::MediaError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Nothing queued and nothing on the command line
    #[error("no file selected")]
    NoFileSelected,

    /// A required firmware file is not configured or cannot be read
    #[error("{system} {kind} ({region}) firmware is missing")]
    FirmwareMissing {
        system: String,
        kind: String,
        region: String,
    },

    #[error("ROM not found: {}", .0.display())]
    RomNotFound(PathBuf),

    #[error("ROM not found in database")]
    RomNotFoundInDatabase,

    #[error("invalid ROM: {0}")]
    InvalidRom(String),

    #[error("could not parse manifest: {0}")]
    CouldNotParseManifest(String),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl LoadError {
    /// Whether the error should be reported to the user
    ///
    /// A cancelled file selection is not an error.
    pub fn is_silent(&self) -> bool {
        matches!(self, LoadError::NoFileSelected)
    }
}

impl From<MediaError> for LoadError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::NotFound(path) => LoadError::RomNotFound(path),
            MediaError::Manifest { path, message } => {
                LoadError::CouldNotParseManifest(format!("{}: {}", path.display(), message))
            }
            MediaError::Io(e) => LoadError::Other(e.to_string()),
        }
    }
}

impl From<CoreError> for LoadError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidRom(message) => LoadError::InvalidRom(message),
            CoreError::UnknownSystem(system) => {
                LoadError::Other(format!("no core available for {}", system))
            }
            CoreError::Other(message) => LoadError::Other(message),
        }
    }
}
