use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Engine configuration.
///
/// Intervals, timeouts, chunk size and the retry bound are compiled-in
/// defaults on their owning modules; only deployment-specific knobs
/// live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Network interface the raw socket binds to.
    pub interface: String,
    /// Username announced in presence beacons.
    pub username: String,
    /// Where assembled files land; created if missing.
    pub download_dir: PathBuf,
    /// Hint for the hosting application to enable per-frame logging.
    pub debug: bool,
}

impl Config {
    pub fn new(interface: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            username: username.into(),
            download_dir: PathBuf::from("downloads"),
            debug: false,
        }
    }
}

/// Loads a config file, falling back to the given defaults on any
/// failure.
pub fn load_config(path: &Path, fallback: Config) -> Config {
    fs::read_to_string(path)
        .ok()
        .and_then(|data| serde_json::from_str::<Config>(&data).ok())
        .unwrap_or(fallback)
}

pub fn save_config(path: &Path, config: &Config) -> io::Result<()> {
    let data = serde_json::to_string_pretty(config)?;
    fs::write(path, data)
}
