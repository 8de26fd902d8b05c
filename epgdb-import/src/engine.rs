//! Interface to the native EPG cache engine.
//!
//! The importer only needs two things from the engine: a request to dump
//! the in-memory cache to the epg.db file, and a request to reload the file
//! once the import is committed. Completion of the dump is reported back
//! through [`CacheState`] notifications.

use std::process::Command;

use log::{debug, info};
use thiserror::Error;

/// Engine request failures.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to run engine command {command:?}: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cache state notifications emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Started,
    SaveFinished,
    LoadFinished,
}

/// Host side of the native EPG cache.
pub trait CacheEngine: Send + Sync {
    /// Ask the engine to dump its cache to the epg.db file.
    fn request_save(&self) -> Result<(), EngineError>;
    /// Ask the engine to reload the epg.db file.
    fn request_load(&self) -> Result<(), EngineError>;
}

/// Engine that does nothing (standalone use and tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCacheEngine;

impl CacheEngine for NullCacheEngine {
    fn request_save(&self) -> Result<(), EngineError> {
        debug!("No cache engine attached, skipping save request");
        Ok(())
    }

    fn request_load(&self) -> Result<(), EngineError> {
        debug!("No cache engine attached, skipping load request");
        Ok(())
    }
}

/// Engine driven by shell commands (e.g. a web interface call that makes
/// the receiver save or load its EPG).
#[derive(Debug, Default, Clone)]
pub struct CommandCacheEngine {
    pub save_command: Option<String>,
    pub load_command: Option<String>,
}

impl CommandCacheEngine {
    pub fn new(save_command: Option<String>, load_command: Option<String>) -> Self {
        Self {
            save_command,
            load_command,
        }
    }

    fn run(command: &str) -> Result<(), EngineError> {
        info!("Running engine command: {}", command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|source| EngineError::Command {
                command: command.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::RequestFailed(format!(
                "{:?} exited with {}",
                command, status
            )))
        }
    }
}

impl CacheEngine for CommandCacheEngine {
    fn request_save(&self) -> Result<(), EngineError> {
        match &self.save_command {
            Some(command) => Self::run(command),
            None => Ok(()),
        }
    }

    fn request_load(&self) -> Result<(), EngineError> {
        match &self.load_command {
            Some(command) => Self::run(command),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_engine_without_commands() {
        let engine = CommandCacheEngine::default();
        assert!(engine.request_save().is_ok());
        assert!(engine.request_load().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_engine_failure() {
        let engine = CommandCacheEngine::new(Some("true".into()), Some("exit 3".into()));
        assert!(engine.request_save().is_ok());
        assert!(matches!(
            engine.request_load(),
            Err(EngineError::RequestFailed(_))
        ));
    }
}
