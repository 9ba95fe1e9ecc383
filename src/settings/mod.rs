// Settings
//
// Front-end settings persisted as TOML in the platform configuration
// directory. Every section has defaults, so a partial or missing file is
// always usable.

pub mod recent;

pub use recent::{RecentGame, RecentGames};

use crate::input::InputConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How the emulated picture is fitted into the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Integer multiple of the native size, centered
    #[default]
    Center,
    /// Largest size that keeps the aspect ratio
    Scale,
    /// Fill the viewport
    Stretch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub multiplier: u32,
    pub output: OutputMode,
    pub aspect_correction: bool,
    pub adaptive_sizing: bool,
    pub color_emulation: bool,
    pub overscan: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            multiplier: 2,
            output: OutputMode::Scale,
            aspect_correction: true,
            adaptive_sizing: true,
            color_emulation: true,
            overscan: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// "cpal" or "None"
    pub driver: String,
    pub frequency: u32,
    pub latency_ms: u32,
    /// Linear gain, 0.0 to 2.0
    pub volume: f64,
    /// -1.0 (left only) to 1.0 (right only)
    pub balance: f64,
    pub mute: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            driver: "cpal".to_string(),
            frequency: 48000,
            latency_ms: 40,
            volume: 1.0,
            balance: 0.0,
            mute: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootSettings {
    pub fast: bool,
    /// Preferred region family: "NTSC-U", "NTSC-J" or "PAL"
    pub prefer: String,
    /// Optional comma separated region list that overrides `prefer`
    pub regions: String,
}

impl Default for BootSettings {
    fn default() -> Self {
        Self {
            fast: false,
            prefer: "NTSC-U".to_string(),
            regions: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub rewind: bool,
    pub run_ahead: bool,
    pub auto_save_memory: bool,
    pub show_status: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            rewind: false,
            run_ahead: false,
            auto_save_memory: true,
            show_status: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewindSettings {
    /// Maximum number of stored states
    pub length: usize,
    /// Frames between two captured states
    pub frequency: u32,
}

impl Default for RewindSettings {
    fn default() -> Self {
        Self {
            length: 100,
            frequency: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathSettings {
    /// Base directory for everything below; the configuration directory if unset
    pub home: Option<PathBuf>,
    /// Save states and battery memory; next to the game if unset
    pub saves: Option<PathBuf>,
    pub screenshots: Option<PathBuf>,
    /// Trace logs
    pub debugging: Option<PathBuf>,
    pub firmware: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorSettings {
    pub visible: bool,
    pub game_path: Option<PathBuf>,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            visible: true,
            game_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub input: InputConfig,
    pub boot: BootSettings,
    pub general: GeneralSettings,
    pub rewind: RewindSettings,
    pub paths: PathSettings,
    /// `"<system>/<type>/<region>"` -> firmware file
    pub firmware: BTreeMap<String, PathBuf>,
    /// Per-emulator settings keyed by emulator name
    pub emulators: BTreeMap<String, EmulatorSettings>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the settings file
    ///
    /// Falls back to the working directory when the platform has no
    /// configuration directory.
    pub fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "emu-front")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join(SETTINGS_FILE)
    }

    /// Load settings, falling back to defaults on any error
    ///
    /// Defaults are written back when the file does not exist yet.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                let settings = Self::default();
                if let Err(e) = settings.save(path) {
                    log::warn!("Could not save default settings: {}", e);
                } else {
                    log::info!("Created default settings at {}", path.display());
                }
                settings
            }
            Err(e) => {
                log::warn!("Could not load settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Key used in the `[firmware]` table
    pub fn firmware_key(system: &str, kind: &str, region: &str) -> String {
        format!("{}/{}/{}", system, kind, region)
    }

    /// Configured firmware file, resolved against `paths.firmware`
    pub fn firmware_path(&self, system: &str, kind: &str, region: &str) -> Option<PathBuf> {
        let path = self.firmware.get(&Self::firmware_key(system, kind, region))?;
        Some(match &self.paths.firmware {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        })
    }

    pub fn emulator(&self, name: &str) -> EmulatorSettings {
        self.emulators.get(name).cloned().unwrap_or_default()
    }

    /// Base directory for generated files
    pub fn home(&self) -> PathBuf {
        self.paths.home.clone().unwrap_or_else(Self::config_dir)
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.paths
            .screenshots
            .clone()
            .unwrap_or_else(|| self.home().join("screenshots"))
    }

    pub fn debugging_dir(&self) -> PathBuf {
        self.paths
            .debugging
            .clone()
            .unwrap_or_else(|| self.home().join("debugging"))
    }
}
