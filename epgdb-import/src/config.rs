//! Import configuration.
//!
//! Settings come from a TOML file (see [`ConfigFile`]); command line flags
//! override individual values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::gate::readiness::MIN_DUMP_SIZE;

/// Settings for one import session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Path of the epg.db cache file.
    pub epgdb_path: PathBuf,
    /// Keep events that ended up to this many hours ago.
    pub outdated_hours: i64,
    /// Import events starting within this many days.
    pub timespan_days: i64,
    /// Delay between dump size polls.
    pub poll_interval_ms: u64,
    /// Smallest file size accepted as a complete dump.
    pub min_dump_size: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            epgdb_path: PathBuf::from("/etc/enigma2/epg.db"),
            outdated_hours: 0,
            timespan_days: 7,
            poll_interval_ms: 5000,
            min_dump_size: MIN_DUMP_SIZE,
        }
    }
}

impl ImportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImportSection {
    pub epgdb_path: Option<String>,
    pub outdated_hours: Option<i64>,
    pub timespan_days: Option<i64>,
    pub poll_interval_ms: Option<u64>,
    pub min_dump_size: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EngineSection {
    /// Shell command that makes the engine save its cache.
    pub save_command: Option<String>,
    /// Shell command that makes the engine reload its cache.
    pub load_command: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Import settings with defaults filled in.
    pub fn import_config(&self) -> ImportConfig {
        let defaults = ImportConfig::default();
        ImportConfig {
            epgdb_path: self
                .import
                .epgdb_path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or(defaults.epgdb_path),
            outdated_hours: self.import.outdated_hours.unwrap_or(defaults.outdated_hours),
            timespan_days: self.import.timespan_days.unwrap_or(defaults.timespan_days),
            poll_interval_ms: self
                .import
                .poll_interval_ms
                .unwrap_or(defaults.poll_interval_ms),
            min_dump_size: self.import.min_dump_size.unwrap_or(defaults.min_dump_size),
        }
    }
}
