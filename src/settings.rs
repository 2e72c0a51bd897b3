use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::models::{GameId, GameRegistry};

pub const DATA_DIR_ENV: &str = "GAMETRACK_DATA_DIR";
pub const BIND_ENV: &str = "GAMETRACK_BIND";
pub const DEBUG_ENV: &str = "GAMETRACK_DEBUG";

const DEBUG_TICK_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmSettings {
    pub game: GameId,
    pub threshold_minutes: u64,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            game: GameId::kovaaks(),
            threshold_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub bind_addr: String,
    pub games: Vec<GameId>,
    pub alarm: AlarmSettings,
    pub tick_interval_ms: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            games: GameRegistry::default().iter().cloned().collect(),
            alarm: AlarmSettings::default(),
            tick_interval_ms: 1_000,
        }
    }
}

impl TrackerSettings {
    pub fn registry(&self) -> GameRegistry {
        GameRegistry::new(self.games.iter().cloned())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Applies `GAMETRACK_BIND` and `GAMETRACK_DEBUG` on top of the file values.
    pub fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var(BIND_ENV) {
            if !bind.trim().is_empty() {
                self.bind_addr = bind.trim().to_string();
            }
        }
        if debug_mode() {
            self.tick_interval_ms = DEBUG_TICK_MS;
        }
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Where the store, cache and settings file live: `GAMETRACK_DATA_DIR` or `./data`.
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    /// Reads `path` if it exists. An unreadable file is an error; a file that does not
    /// parse falls back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                TrackerSettings::default()
            })
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> TrackerSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
