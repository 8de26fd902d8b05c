//! Readiness gating for the dumped cache file.
//!
//! This module provides:
//! - [`ReadinessGate`]: file-size stabilization check on the epg.db file
//! - [`DumpPoller`]: timed polling loop that drives an import session until
//!   it is connected

pub mod poller;
pub mod readiness;

pub use poller::DumpPoller;
pub use readiness::{GateStatus, ReadinessGate, MIN_DUMP_SIZE};

use crate::database::DatabaseError;

/// Import session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Nothing requested yet.
    NotStarted,
    /// The engine is dumping; waiting for the file size to settle.
    WaitingForStableSize,
    /// Connection open, import transaction running.
    Connected,
    /// Import committed and reload requested.
    Committed,
    /// Import rolled back.
    Aborted,
}

/// Why a poll did not result in a connection.
#[derive(Debug)]
pub enum NotReadyReason {
    /// The cache file does not exist.
    Missing,
    /// The cache file is smaller than any valid dump.
    TooSmall(u64),
    /// The file looked stable but could not be opened for import.
    ConnectFailed(DatabaseError),
}

/// Outcome of one readiness poll.
#[derive(Debug)]
pub enum Readiness {
    /// Connected; the import transaction is open.
    Ready,
    /// The file is still growing; poll again after the interval.
    Growing(u64),
    /// Not ready and no further poll is scheduled.
    NotReady(NotReadyReason),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}
