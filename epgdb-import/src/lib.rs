//! epgdb-import: write parsed EPG events into the native epg.db cache.
//!
//! The importer waits for the native EPG cache engine to finish dumping its
//! cache to disk, merges buffered events per channel inside one long-lived
//! transaction, and asks the engine to reload the file afterwards.
//!
//! # Session lifecycle
//!
//! 1. [`ImportSession::new`] asks the engine for a dump; once the engine
//!    reports [`CacheState::SaveFinished`], a [`DumpPoller`] polls the file
//!    size until it stops changing and the session connects.
//!    ([`ImportSession::from_scratch`] and [`ImportSession::attach`] skip
//!    the dump.)
//! 2. Events are buffered with [`ImportSession::add_event`] and written with
//!    [`ImportSession::preprocess_events_channel`].
//! 3. [`ImportSession::final_process`] commits and triggers the reload;
//!    [`ImportSession::cancel_process`] discards everything.

pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod gate;
pub mod hasher;
pub mod logging;
pub mod merge;
pub mod session;

pub use config::ImportConfig;
pub use database::{DatabaseError, EpgDatabase};
pub use engine::{CacheEngine, CacheState, CommandCacheEngine, EngineError, NullCacheEngine};
pub use error::ImportError;
pub use gate::{DumpPoller, GateState, GateStatus, NotReadyReason, Readiness, ReadinessGate};
pub use hasher::{DefaultStringHasher, StringHasher};
pub use merge::{ChannelOutcome, ImportStats, ServiceNameResolver, SkipReason};
pub use session::ImportSession;
