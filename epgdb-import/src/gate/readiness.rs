//! File-size stabilization gate.
//!
//! The engine writes its dump asynchronously and its "save finished"
//! notification can arrive before the file is fully flushed, so the file
//! counts as complete only once two consecutive polls see the same size.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

/// Even an empty epg.db is at least this large.
pub const MIN_DUMP_SIZE: u64 = 23 * 1024;

/// Result of a single size poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Missing,
    TooSmall(u64),
    Growing(u64),
    Stable(u64),
}

/// Tracks the last observed size of the cache file.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    path: PathBuf,
    min_size: u64,
    last_size: u64,
}

impl ReadinessGate {
    pub fn new(path: impl Into<PathBuf>, min_size: u64) -> Self {
        Self {
            path: path.into(),
            min_size,
            last_size: 0,
        }
    }

    /// Check the file once.
    ///
    /// A size change is recorded and reported as [`GateStatus::Growing`];
    /// missing and too-small files leave the recorded size untouched.
    pub fn poll(&mut self) -> io::Result<GateStatus> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("{} not found", self.path.display());
                return Ok(GateStatus::Missing);
            }
            Err(e) => return Err(e),
        };

        if size < self.min_size {
            info!("{} too small ({} bytes)", self.path.display(), size);
            return Ok(GateStatus::TooSmall(size));
        }

        if size != self.last_size {
            info!("Size {} >>> {} changed", self.last_size, size);
            self.last_size = size;
            return Ok(GateStatus::Growing(size));
        }

        debug!("{} save finished, size {}", self.path.display(), size);
        Ok(GateStatus::Stable(size))
    }

    /// Record the current file size so the next poll can succeed at once.
    pub fn prime_with_current_size(&mut self) -> io::Result<()> {
        self.last_size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };
        Ok(())
    }

    /// Forget the recorded size (a new dump is about to start).
    pub fn reset(&mut self) {
        self.last_size = 0;
    }

    pub fn last_size(&self) -> u64 {
        self.last_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
