// Recent games list
//
// Tracks the most recently loaded games, newest first.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the recent games list inside the configuration directory
pub const RECENT_FILE: &str = "recent.toml";

/// Maximum number of entries kept
pub const MAX_RECENT_GAMES: usize = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentGame {
    /// Emulator the game was loaded with
    pub system: String,
    pub location: PathBuf,
    /// RFC 3339 timestamp
    pub last_played: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentGames {
    #[serde(default)]
    games: Vec<RecentGame>,
}

impl RecentGames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), io::Error> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)
    }

    /// Move a game to the top of the list
    pub fn add<P: AsRef<Path>>(&mut self, system: &str, location: P) {
        let location = location.as_ref();
        self.games
            .retain(|game| !(game.system == system && game.location == location));
        self.games.insert(
            0,
            RecentGame {
                system: system.to_string(),
                location: location.to_path_buf(),
                last_played: chrono::Local::now().to_rfc3339(),
            },
        );
        self.games.truncate(MAX_RECENT_GAMES);
    }

    pub fn remove<P: AsRef<Path>>(&mut self, location: P) {
        let location = location.as_ref();
        self.games.retain(|game| game.location != location);
    }

    pub fn clear(&mut self) {
        self.games.clear();
    }

    pub fn entries(&self) -> &[RecentGame] {
        &self.games
    }

    pub fn most_recent(&self) -> Option<&RecentGame> {
        self.games.first()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
