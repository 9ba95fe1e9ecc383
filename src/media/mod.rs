// Media packages
//
// A `Pak` bundles what a core needs from one medium: the ROM or disc image,
// manifest attributes (region, board, peripherals) and the backing files
// for battery memory and save states.
//
// `GamePak` is a plain file with an optional TOML manifest next to it
// (`game.sfc` + `game.sfc.toml`). `FirmwarePak` is the set of firmware
// files a console needs, keyed by firmware type.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name under which the main image of a game is read
pub const PROGRAM_ROM: &str = "program.rom";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not parse manifest {}: {}", .path.display(), .message)]
    Manifest { path: PathBuf, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A loaded medium
pub trait Pak: Send {
    /// Display name (manifest name, or the file stem)
    fn name(&self) -> &str;

    /// Where the medium was loaded from
    fn location(&self) -> &Path;

    /// Manifest attribute, e.g. `region` or `board`
    fn attribute(&self, name: &str) -> Option<String>;

    /// Regions the medium declares, in manifest order
    fn regions(&self) -> Vec<String> {
        self.attribute("region")
            .map(|list| {
                list.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read a named file of the medium
    fn read(&self, name: &str) -> Option<Vec<u8>>;

    /// Write a named backing file (battery memory, states)
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()>;

    /// Path of a backing file with the given suffix
    fn save_path(&self, suffix: &str) -> PathBuf;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Manifest {
    name: Option<String>,
    region: Option<String>,
    attributes: BTreeMap<String, String>,
}

fn manifest_path(location: &Path) -> PathBuf {
    let mut path = OsString::from(location.as_os_str());
    path.push(".toml");
    PathBuf::from(path)
}

/// A game loaded from a single file
#[derive(Debug)]
pub struct GamePak {
    name: String,
    location: PathBuf,
    attributes: BTreeMap<String, String>,
    save_dir: PathBuf,
}

impl GamePak {
    /// Open a game file
    ///
    /// # Arguments
    /// * `location` - The game file
    /// * `system` - Emulator name, used to group saves
    /// * `saves` - Save directory; saves go next to the game if `None`
    pub fn open(location: &Path, system: &str, saves: Option<&Path>) -> Result<Self, MediaError> {
        if !location.is_file() {
            return Err(MediaError::NotFound(location.to_path_buf()));
        }

        let manifest_file = manifest_path(location);
        let manifest = match fs::read_to_string(&manifest_file) {
            Ok(text) => toml::from_str::<Manifest>(&text).map_err(|e| MediaError::Manifest {
                path: manifest_file.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => return Err(e.into()),
        };

        let stem = location
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("game")
            .to_string();
        let mut attributes = manifest.attributes;
        if let Some(region) = manifest.region {
            attributes.insert("region".to_string(), region);
        }
        let save_dir = match saves {
            Some(dir) => dir.join(system),
            None => location
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        Ok(Self {
            name: manifest.name.unwrap_or(stem),
            location: location.to_path_buf(),
            attributes,
            save_dir,
        })
    }

    fn stem(&self) -> &str {
        self.location
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("game")
    }
}

impl Pak for GamePak {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn read(&self, name: &str) -> Option<Vec<u8>> {
        let path = if name == PROGRAM_ROM {
            self.location.clone()
        } else {
            self.save_path(name)
        };
        fs::read(path).ok()
    }

    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let path = self.save_path(name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, data)
    }

    fn save_path(&self, suffix: &str) -> PathBuf {
        self.save_dir.join(format!("{}.{}", self.stem(), suffix))
    }
}

/// Firmware files of one console, keyed by firmware type
#[derive(Debug, Clone, Default)]
pub struct FirmwarePak {
    system: String,
    location: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl FirmwarePak {
    pub fn new(system: &str) -> Self {
        Self {
            system: system.to_string(),
            location: PathBuf::new(),
            files: BTreeMap::new(),
        }
    }

    /// Add a firmware file
    ///
    /// # Returns
    /// `Err(NotFound)` if the file does not exist
    pub fn insert(&mut self, kind: &str, path: &Path) -> Result<(), MediaError> {
        if !path.is_file() {
            return Err(MediaError::NotFound(path.to_path_buf()));
        }
        if self.location.as_os_str().is_empty() {
            if let Some(parent) = path.parent() {
                self.location = parent.to_path_buf();
            }
        }
        self.files.insert(kind.to_string(), path.to_path_buf());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Pak for FirmwarePak {
    fn name(&self) -> &str {
        &self.system
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn attribute(&self, _name: &str) -> Option<String> {
        None
    }

    fn read(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).and_then(|path| fs::read(path).ok())
    }

    fn write(&self, _name: &str, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "firmware is read-only",
        ))
    }

    fn save_path(&self, suffix: &str) -> PathBuf {
        self.location.join(format!("{}.{}", self.system, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.fc");
        fs::write(&rom, [1, 2, 3]).unwrap();

        let pak = GamePak::open(&rom, "Famicom", None).unwrap();
        assert_eq!(pak.name(), "game");
        assert!(pak.regions().is_empty());
        assert_eq!(pak.read(PROGRAM_ROM), Some(vec![1, 2, 3]));
        assert_eq!(pak.save_path("bs1"), dir.path().join("game.bs1"));
    }

    #[test]
    fn test_manifest_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.sfc");
        fs::write(&rom, [0]).unwrap();
        fs::write(
            dir.path().join("game.sfc.toml"),
            "name = \"Game\"\nregion = \"NTSC-J, NTSC-U\"\n[attributes]\nboard = \"SHVC-1A3M\"\n",
        )
        .unwrap();

        let pak = GamePak::open(&rom, "Super Famicom", None).unwrap();
        assert_eq!(pak.name(), "Game");
        assert_eq!(pak.regions(), vec!["NTSC-J", "NTSC-U"]);
        assert_eq!(pak.attribute("board").as_deref(), Some("SHVC-1A3M"));
    }

    #[test]
    fn test_bad_manifest_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.md");
        fs::write(&rom, [0]).unwrap();
        fs::write(dir.path().join("game.md.toml"), "region = [").unwrap();

        assert!(matches!(
            GamePak::open(&rom, "Mega Drive", None),
            Err(MediaError::Manifest { .. })
        ));
        assert!(matches!(
            GamePak::open(&dir.path().join("missing.md"), "Mega Drive", None),
            Err(MediaError::NotFound(_))
        ));
    }

    #[test]
    fn test_saves_directory() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.gb");
        fs::write(&rom, [0]).unwrap();
        let saves = dir.path().join("saves");

        let pak = GamePak::open(&rom, "Game Boy", Some(&saves)).unwrap();
        pak.write("sav", &[9, 9]).unwrap();
        assert_eq!(
            fs::read(saves.join("Game Boy").join("game.sav")).unwrap(),
            vec![9, 9]
        );
        assert_eq!(pak.read("sav"), Some(vec![9, 9]));
    }

    #[test]
    fn test_firmware_pak() {
        let dir = tempfile::tempdir().unwrap();
        let bios = dir.path().join("bios.bin");
        fs::write(&bios, [7]).unwrap();

        let mut pak = FirmwarePak::new("PlayStation");
        assert!(pak.insert("BIOS", &dir.path().join("nope.bin")).is_err());
        pak.insert("BIOS", &bios).unwrap();
        assert_eq!(pak.read("BIOS"), Some(vec![7]));
        assert!(pak.write("BIOS", &[0]).is_err());
    }
}
