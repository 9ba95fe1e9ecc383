// Save states
//
// Nine numbered slots per game, stored through the game's pak as
// `<game>.bs1` .. `<game>.bs9` with a JSON metadata sidecar. Saving over a
// slot first moves the previous file to `<game>.bsu`; loading first
// snapshots the running state to `<game>.blu`. Both can be undone.

use crate::engine::Core;
use crate::media::Pak;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use thiserror::Error;

/// Number of save slots; slots are numbered from 1
pub const SLOT_COUNT: u32 = 9;

/// Suffix of the file a save moved out of the way
pub const UNDO_SAVE: &str = "bsu";

/// Suffix of the snapshot taken before a load
pub const UNDO_LOAD: &str = "blu";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("no game loaded")]
    NotLoaded,

    #[error("slot {0} is empty")]
    NotFound(u32),

    #[error("slot {0} could not be restored")]
    Rejected(u32),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Slot after `slot`, wrapping 9 -> 1
pub fn next_slot(slot: u32) -> u32 {
    if slot >= SLOT_COUNT {
        1
    } else {
        slot + 1
    }
}

/// Slot before `slot`, wrapping 1 -> 9
pub fn previous_slot(slot: u32) -> u32 {
    if slot <= 1 {
        SLOT_COUNT
    } else {
        slot - 1
    }
}

pub fn slot_suffix(slot: u32) -> String {
    format!("bs{}", slot)
}

fn metadata_suffix(suffix: &str) -> String {
    format!("{}.json", suffix)
}

/// Sidecar written next to each state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetadata {
    pub system: String,
    pub game: String,
    pub slot: u32,
    /// RFC 3339 local time
    pub created: String,
    pub size: usize,
}

/// Move `from` to `to` inside the pak's save directory
///
/// # Returns
/// `false` if there was nothing to move
fn move_file(game: &dyn Pak, from: &str, to: &str) -> io::Result<bool> {
    let source = game.save_path(from);
    if !source.is_file() {
        return Ok(false);
    }
    let target = game.save_path(to);
    if target.is_file() {
        fs::remove_file(&target)?;
    }
    fs::rename(&source, &target)?;
    Ok(true)
}

fn remove_file(game: &dyn Pak, suffix: &str) -> io::Result<()> {
    match fs::remove_file(game.save_path(suffix)) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Current slot and undo bookkeeping
#[derive(Debug, Clone)]
pub struct StateManager {
    slot: u32,
    /// Slot of the last save, and whether it replaced an older state
    last_save: Option<(u32, bool)>,
    /// A pre-load snapshot exists
    last_load: bool,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        Self {
            slot: 1,
            last_save: None,
            last_load: false,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn set_slot(&mut self, slot: u32) {
        self.slot = slot.clamp(1, SLOT_COUNT);
    }

    pub fn increment(&mut self) -> u32 {
        self.slot = next_slot(self.slot);
        self.slot
    }

    pub fn decrement(&mut self) -> u32 {
        self.slot = previous_slot(self.slot);
        self.slot
    }

    /// Serialize the core into `slot`
    ///
    /// An existing state in the slot is kept as the undo-save file.
    ///
    /// # Arguments
    /// * `core` - The running core
    /// * `game` - Pak that owns the state files
    /// * `system` - Emulator name, recorded in the metadata
    /// * `slot` - Slot number, 1 to 9
    pub fn save(
        &mut self,
        core: &mut dyn Core,
        game: &dyn Pak,
        system: &str,
        slot: u32,
    ) -> Result<StateMetadata, StateError> {
        let suffix = slot_suffix(slot);
        let state = core.serialize(true);

        let replaced = move_file(game, &suffix, UNDO_SAVE)?;
        move_file(game, &metadata_suffix(&suffix), &metadata_suffix(UNDO_SAVE))?;

        game.write(&suffix, &state)?;
        let metadata = StateMetadata {
            system: system.to_string(),
            game: game.name().to_string(),
            slot,
            created: chrono::Local::now().to_rfc3339(),
            size: state.len(),
        };
        game.write(
            &metadata_suffix(&suffix),
            serde_json::to_string_pretty(&metadata)?.as_bytes(),
        )?;

        self.last_save = Some((slot, replaced));
        log::info!("Saved state to slot {} ({} bytes)", slot, state.len());
        Ok(metadata)
    }

    /// Restore the state stored in `slot`
    ///
    /// The running state is snapshotted first so the load can be undone.
    /// On failure the core keeps running on its current state.
    pub fn load(&mut self, core: &mut dyn Core, game: &dyn Pak, slot: u32) -> Result<(), StateError> {
        let state = game.read(&slot_suffix(slot)).ok_or(StateError::NotFound(slot))?;

        let snapshot = core.serialize(true);
        if !core.unserialize(&state) {
            core.unserialize(&snapshot);
            return Err(StateError::Rejected(slot));
        }
        game.write(UNDO_LOAD, &snapshot)?;
        self.last_load = true;
        log::info!("Loaded state from slot {}", slot);
        Ok(())
    }

    /// Put back the state the last save replaced
    ///
    /// If the slot was empty before, the saved state is removed instead.
    ///
    /// # Returns
    /// The slot that was restored
    pub fn undo_save(&mut self, game: &dyn Pak) -> Result<u32, StateError> {
        let (slot, replaced) = self.last_save.take().ok_or(StateError::NothingToUndo)?;
        let suffix = slot_suffix(slot);
        if replaced {
            move_file(game, UNDO_SAVE, &suffix)?;
            move_file(game, &metadata_suffix(UNDO_SAVE), &metadata_suffix(&suffix))?;
        } else {
            remove_file(game, &suffix)?;
            remove_file(game, &metadata_suffix(&suffix))?;
        }
        log::info!("Undid save to slot {}", slot);
        Ok(slot)
    }

    /// Restore the snapshot taken before the last load
    pub fn undo_load(&mut self, core: &mut dyn Core, game: &dyn Pak) -> Result<(), StateError> {
        if !self.last_load {
            return Err(StateError::NothingToUndo);
        }
        let snapshot = game.read(UNDO_LOAD).ok_or(StateError::NothingToUndo)?;
        if !core.unserialize(&snapshot) {
            return Err(StateError::Rejected(0));
        }
        self.last_load = false;
        remove_file(game, UNDO_LOAD)?;
        log::info!("Undid state load");
        Ok(())
    }

    /// Delete the undo files and forget the undo history
    pub fn clear_undo(&mut self, game: &dyn Pak) -> Result<(), StateError> {
        self.last_save = None;
        self.last_load = false;
        remove_file(game, UNDO_SAVE)?;
        remove_file(game, &metadata_suffix(UNDO_SAVE))?;
        remove_file(game, UNDO_LOAD)?;
        Ok(())
    }

    /// Metadata of a slot, if it holds a state
    pub fn metadata(&self, game: &dyn Pak, slot: u32) -> Option<StateMetadata> {
        let bytes = game.read(&metadata_suffix(&slot_suffix(slot)))?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Platform, Port};
    use crate::media::GamePak;
    use std::path::PathBuf;

    /// Core whose whole state is one byte; 0xFF is never accepted
    struct Byte(u8);

    impl Core for Byte {
        fn name(&self) -> &str {
            "Byte"
        }

        fn power(&mut self, _reset: bool) {
            self.0 = 0;
        }

        fn run(&mut self, _platform: &mut dyn Platform) {
            self.0 = self.0.wrapping_add(1);
        }

        fn serialize(&mut self, _with_id: bool) -> Vec<u8> {
            vec![self.0]
        }

        fn unserialize(&mut self, state: &[u8]) -> bool {
            match state {
                [value] if *value != 0xFF => {
                    self.0 = *value;
                    true
                }
                _ => false,
            }
        }

        fn save(&mut self) -> Vec<(String, Vec<u8>)> {
            Vec::new()
        }

        fn unload(&mut self, _platform: &mut dyn Platform) {}

        fn port(&mut self, _name: &str) -> Option<&mut dyn Port> {
            None
        }

        fn ports(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn game(dir: &tempfile::TempDir) -> (GamePak, PathBuf) {
        let location = dir.path().join("game.nes");
        fs::write(&location, b"program").unwrap();
        (GamePak::open(&location, "Famicom", None).unwrap(), location)
    }

    #[test]
    fn test_slot_wraparound() {
        assert_eq!(previous_slot(1), 9);
        assert_eq!(next_slot(9), 1);
        for slot in 2..=8 {
            assert_eq!(next_slot(slot), slot + 1);
            assert_eq!(previous_slot(slot), slot - 1);
        }

        let mut states = StateManager::new();
        assert_eq!(states.decrement(), 9);
        assert_eq!(states.increment(), 1);
        states.set_slot(42);
        assert_eq!(states.slot(), 9);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let (pak, _) = game(&dir);
        let mut states = StateManager::new();
        let mut core = Byte(10);

        let metadata = states.save(&mut core, &pak, "Famicom", 3).unwrap();
        assert_eq!(metadata.slot, 3);
        assert_eq!(metadata.size, 1);
        assert!(dir.path().join("game.bs3").is_file());
        assert_eq!(states.metadata(&pak, 3), Some(metadata));

        core.0 = 20;
        states.load(&mut core, &pak, 3).unwrap();
        assert_eq!(core.0, 10);

        states.undo_load(&mut core, &pak).unwrap();
        assert_eq!(core.0, 20);
        assert!(matches!(
            states.undo_load(&mut core, &pak),
            Err(StateError::NothingToUndo)
        ));
    }

    #[test]
    fn test_load_failures_keep_state() {
        let dir = tempfile::tempdir().unwrap();
        let (pak, _) = game(&dir);
        let mut states = StateManager::new();
        let mut core = Byte(5);

        assert!(matches!(
            states.load(&mut core, &pak, 1),
            Err(StateError::NotFound(1))
        ));
        assert_eq!(core.0, 5);

        pak.write(&slot_suffix(2), &[0xFF]).unwrap();
        assert!(matches!(
            states.load(&mut core, &pak, 2),
            Err(StateError::Rejected(2))
        ));
        assert_eq!(core.0, 5);
        assert!(!dir.path().join("game.blu").exists());
    }

    #[test]
    fn test_undo_save_restores_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let (pak, _) = game(&dir);
        let mut states = StateManager::new();
        let mut core = Byte(1);

        states.save(&mut core, &pak, "Famicom", 1).unwrap();
        core.0 = 2;
        states.save(&mut core, &pak, "Famicom", 1).unwrap();
        assert_eq!(pak.read("bs1"), Some(vec![2]));
        assert_eq!(pak.read(UNDO_SAVE), Some(vec![1]));

        assert_eq!(states.undo_save(&pak).unwrap(), 1);
        assert_eq!(pak.read("bs1"), Some(vec![1]));
        assert!(pak.read(UNDO_SAVE).is_none());
        assert!(matches!(states.undo_save(&pak), Err(StateError::NothingToUndo)));
    }

    #[test]
    fn test_undo_first_save_empties_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (pak, _) = game(&dir);
        let mut states = StateManager::new();

        states.save(&mut Byte(1), &pak, "Famicom", 4).unwrap();
        states.undo_save(&pak).unwrap();
        assert!(pak.read("bs4").is_none());
        assert!(states.metadata(&pak, 4).is_none());
    }

    #[test]
    fn test_clear_undo() {
        let dir = tempfile::tempdir().unwrap();
        let (pak, _) = game(&dir);
        let mut states = StateManager::new();
        let mut core = Byte(1);

        states.save(&mut core, &pak, "Famicom", 1).unwrap();
        states.save(&mut core, &pak, "Famicom", 1).unwrap();
        states.load(&mut core, &pak, 1).unwrap();
        states.clear_undo(&pak).unwrap();
        assert!(pak.read(UNDO_SAVE).is_none());
        assert!(pak.read(UNDO_LOAD).is_none());
        assert!(pak.read("bs1").is_some());
    }
}
