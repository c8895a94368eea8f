use crate::app_dirs::AppDirs;
use crate::words::Difficulty;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Test lengths offered, in seconds
pub const DURATION_PRESETS: [u64; 4] = [15, 30, 60, 120];
pub const DEFAULT_DURATION_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,
    pub duration_secs: u64,
    pub words_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            duration_secs: DEFAULT_DURATION_SECS,
            words_dir: None,
        }
    }
}

impl Config {
    /// Snap an arbitrary duration to a preset, as hand-edited files may hold anything
    pub fn normalized(mut self) -> Self {
        if !DURATION_PRESETS.contains(&self.duration_secs) {
            log::warn!(
                "duration {}s is not a preset, using {}s",
                self.duration_secs,
                DEFAULT_DURATION_SECS
            );
            self.duration_secs = DEFAULT_DURATION_SECS;
        }
        self
    }
}

/// Preset after `secs`, wrapping around
pub fn next_duration(secs: u64) -> u64 {
    let pos = DURATION_PRESETS.iter().position(|&p| p == secs);
    match pos {
        Some(i) => DURATION_PRESETS[(i + 1) % DURATION_PRESETS.len()],
        None => DEFAULT_DURATION_SECS,
    }
}

/// Preset before `secs`, wrapping around
pub fn prev_duration(secs: u64) -> u64 {
    let pos = DURATION_PRESETS.iter().position(|&p| p == secs);
    match pos {
        Some(i) => DURATION_PRESETS[(i + DURATION_PRESETS.len() - 1) % DURATION_PRESETS.len()],
        None => DEFAULT_DURATION_SECS,
    }
}

pub fn parse_duration(s: &str) -> Result<u64, String> {
    let secs: u64 = s.parse().map_err(|_| format!("`{s}` is not a number of seconds"))?;
    if DURATION_PRESETS.contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("duration must be one of {DURATION_PRESETS:?}"))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg.normalized(),
                Err(e) => {
                    log::warn!("ignoring unreadable config {}: {e}", self.path.display());
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
