//! Importer error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::database::DatabaseError;
use crate::engine::EngineError;

/// Errors surfaced by an import session.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Not connected to {0}")]
    NotConnected(PathBuf),

    #[error("EPG cache engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Import cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
