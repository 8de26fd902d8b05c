//! Import session: connection, transaction and event buffer for one run.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use epgdb_types::{EpgEvent, ImportWindow};
use log::{info, warn};

use crate::config::ImportConfig;
use crate::database::EpgDatabase;
use crate::engine::{CacheEngine, CacheState};
use crate::error::{ImportError, Result};
use crate::gate::{GateState, GateStatus, NotReadyReason, Readiness, ReadinessGate};
use crate::hasher::StringHasher;
use crate::merge::{ImportStats, MergeContext, ServiceNameResolver};

/// One import run for one EPG provider.
///
/// Holds the single connection and the transaction spanning the whole
/// import; nothing is visible to the engine until [`final_process`]
/// commits.
///
/// [`final_process`]: ImportSession::final_process
pub struct ImportSession {
    config: ImportConfig,
    source_name: String,
    priority: i64,
    engine: Arc<dyn CacheEngine>,
    hasher: Arc<dyn StringHasher>,
    window: ImportWindow,
    gate: ReadinessGate,
    state: GateState,
    db: Option<EpgDatabase>,
    source_id: Option<i64>,
    events: Vec<EpgEvent>,
    excluded_sids: HashSet<u16>,
    stats: ImportStats,
}

impl ImportSession {
    fn build(
        config: ImportConfig,
        source_name: &str,
        priority: i64,
        engine: Arc<dyn CacheEngine>,
        hasher: Arc<dyn StringHasher>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        let window = ImportWindow::new(now, config.outdated_hours, config.timespan_days);
        let gate = ReadinessGate::new(config.epgdb_path.clone(), config.min_dump_size);

        Self {
            config,
            source_name: source_name.to_string(),
            priority,
            engine,
            hasher,
            window,
            gate,
            state: GateState::NotStarted,
            db: None,
            source_id: None,
            events: Vec::new(),
            excluded_sids: HashSet::new(),
            stats: ImportStats::default(),
        }
    }

    /// Start a session that imports on top of a fresh dump of the engine's cache.
    ///
    /// Removes the old file and asks the engine to save; the session waits
    /// for [`CacheState::SaveFinished`] and then for the file to settle.
    pub fn new(
        config: ImportConfig,
        source_name: &str,
        priority: i64,
        engine: Arc<dyn CacheEngine>,
        hasher: Arc<dyn StringHasher>,
    ) -> Result<Self> {
        let mut session = Self::build(config, source_name, priority, engine, hasher);
        let path = session.config.epgdb_path.clone();

        info!("Saving EPG: {}", path.display());
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        session.gate.reset();
        session.state = GateState::WaitingForStableSize;
        session.engine.request_save()?;

        Ok(session)
    }

    /// Start a session on a newly created empty cache, skipping the dump.
    pub fn from_scratch(
        config: ImportConfig,
        source_name: &str,
        priority: i64,
        engine: Arc<dyn CacheEngine>,
        hasher: Arc<dyn StringHasher>,
    ) -> Result<Self> {
        let mut session = Self::build(config, source_name, priority, engine, hasher);
        EpgDatabase::create_empty(&session.config.epgdb_path)?;
        session.connect_now()?;
        Ok(session)
    }

    /// Start a session on the cache file as it is, skipping the dump.
    pub fn attach(
        config: ImportConfig,
        source_name: &str,
        priority: i64,
        engine: Arc<dyn CacheEngine>,
        hasher: Arc<dyn StringHasher>,
    ) -> Result<Self> {
        let mut session = Self::build(config, source_name, priority, engine, hasher);
        session.connect_now()?;
        Ok(session)
    }

    fn connect_now(&mut self) -> Result<()> {
        self.gate.prime_with_current_size()?;
        match self.start_process()? {
            Readiness::Ready => Ok(()),
            Readiness::NotReady(NotReadyReason::ConnectFailed(e)) => Err(e.into()),
            _ => Err(ImportError::NotConnected(self.config.epgdb_path.clone())),
        }
    }

    /// Replace the import window (the default is computed from the clock
    /// when the session is created).
    pub fn with_window(mut self, window: ImportWindow) -> Self {
        self.window = window;
        self
    }

    /// Handle a cache state notification from the engine.
    ///
    /// Returns `true` when the dump has finished and polling should start.
    pub fn cache_state_changed(&mut self, state: CacheState) -> bool {
        match state {
            CacheState::SaveFinished => {
                info!("EPG saved");
                self.state == GateState::WaitingForStableSize
            }
            CacheState::LoadFinished => {
                info!("EPG reloaded");
                false
            }
            CacheState::Started => false,
        }
    }

    /// Poll the dump once and connect if it is complete.
    ///
    /// A committed or aborted session never reconnects.
    pub fn start_process(&mut self) -> Result<Readiness> {
        if matches!(self.state, GateState::Committed | GateState::Aborted) {
            warn!("Import already {:?}, not reconnecting", self.state);
            return Err(ImportError::NotConnected(self.config.epgdb_path.clone()));
        }
        if self.db.is_some() {
            info!("{} connected already", self.path().display());
            return Ok(Readiness::Ready);
        }

        match self.gate.poll()? {
            GateStatus::Missing => Ok(Readiness::NotReady(NotReadyReason::Missing)),
            GateStatus::TooSmall(size) => Ok(Readiness::NotReady(NotReadyReason::TooSmall(size))),
            GateStatus::Growing(size) => {
                self.state = GateState::WaitingForStableSize;
                Ok(Readiness::Growing(size))
            }
            GateStatus::Stable(size) => {
                info!("{} save finished, size {}", self.path().display(), size);
                Ok(self.connect())
            }
        }
    }

    fn connect(&mut self) -> Readiness {
        let db = match EpgDatabase::open_for_import(&self.config.epgdb_path) {
            Ok(db) => db,
            Err(e) => {
                warn!("Connect {} failed: {}", self.path().display(), e);
                return Readiness::NotReady(NotReadyReason::ConnectFailed(e));
            }
        };

        let begun = db
            .get_or_create_source(&self.source_name, self.priority)
            .and_then(|source_id| db.begin().map(|_| source_id));
        match begun {
            Ok(source_id) => {
                self.source_id = Some(source_id);
                self.db = Some(db);
                self.state = GateState::Connected;
                info!("Connect {} finished", self.path().display());
                Readiness::Ready
            }
            Err(e) => {
                warn!("Connect {} failed: {}", self.path().display(), e);
                db.close();
                Readiness::NotReady(NotReadyReason::ConnectFailed(e))
            }
        }
    }

    /// Skip channels with these service ids.
    pub fn set_excluded_sids(&mut self, sids: impl IntoIterator<Item = u16>) {
        self.excluded_sids = sids.into_iter().collect();
    }

    /// Buffer one event for the next [`preprocess_events_channel`] call.
    ///
    /// [`preprocess_events_channel`]: ImportSession::preprocess_events_channel
    pub fn add_event(
        &mut self,
        begin_time: i64,
        duration: i64,
        title: &str,
        description: &str,
        language: &str,
    ) {
        self.events
            .push(EpgEvent::new(begin_time, duration, title, description, language));
    }

    /// Buffer already constructed events; titles are truncated like in
    /// [`add_event`](ImportSession::add_event).
    pub fn add_events(&mut self, events: impl IntoIterator<Item = EpgEvent>) {
        self.events.extend(events.into_iter().map(|event| {
            EpgEvent::new(
                event.begin_time,
                event.duration,
                &event.title,
                event.description,
                event.language,
            )
        }));
    }

    /// Write the buffered events to every service in `services`, then clear
    /// the buffer. `None` only clears the buffer.
    ///
    /// If the session is not connected yet, one immediate connect is
    /// attempted first.
    pub fn preprocess_events_channel(
        &mut self,
        services: Option<&[&str]>,
        resolver: &dyn ServiceNameResolver,
    ) -> Result<()> {
        if self.db.is_none() {
            info!("Not yet connected");
            self.gate.prime_with_current_size()?;
            if let Readiness::NotReady(NotReadyReason::ConnectFailed(e)) = self.start_process()? {
                self.events.clear();
                return Err(e.into());
            }
        }

        let events = std::mem::take(&mut self.events);
        let Some(services) = services else {
            return Ok(());
        };

        let (Some(db), Some(source_id)) = (self.db.as_ref(), self.source_id) else {
            return Err(ImportError::NotConnected(self.config.epgdb_path.clone()));
        };

        let ctx = MergeContext {
            db,
            hasher: self.hasher.as_ref(),
            window: self.window,
            source_id,
            excluded_sids: &self.excluded_sids,
        };

        for reference in services {
            let channel = resolver
                .service_name(reference)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| reference.to_string());

            ctx.import_channel(reference, &channel, &events, &mut self.stats)?;
            self.stats.total_events += events.len() as u64;
        }

        Ok(())
    }

    /// Commit the import, close the connection and ask the engine to reload.
    pub fn final_process(&mut self) -> Result<()> {
        let Some(db) = self.db.take() else {
            warn!("Still not connected, nothing to commit");
            return Ok(());
        };

        info!(
            "Import finished: {} of {} available events imported",
            self.stats.events_imported, self.stats.total_events
        );
        info!(
            "{} events were outside the timespan ({} hours outdated, {} days ahead)",
            self.stats.events_outdated, self.config.outdated_hours, self.config.timespan_days
        );

        let committed = db.commit();
        db.close();
        if let Err(e) = committed {
            self.state = GateState::Aborted;
            return Err(e.into());
        }
        self.state = GateState::Committed;

        info!("Reloading EPG database");
        self.engine.request_load()?;
        Ok(())
    }

    /// Roll back the import and close the connection without reloading.
    pub fn cancel_process(&mut self) {
        let Some(db) = self.db.take() else {
            warn!("Still not connected, nothing to cancel");
            return;
        };

        info!("Import cancelled");
        if let Err(e) = db.rollback() {
            warn!("Rollback failed: {}", e);
        }
        db.close();
        self.events.clear();
        self.state = GateState::Aborted;
    }

    /// Integrity check result for the cache file (`"ok"` when healthy).
    pub fn check_integrity(&self) -> String {
        EpgDatabase::check_integrity(&self.config.epgdb_path)
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    pub fn source_id(&self) -> Option<i64> {
        self.source_id
    }

    pub fn buffered_events(&self) -> &[EpgEvent] {
        &self.events
    }

    /// The open import connection, if connected.
    pub fn database(&self) -> Option<&EpgDatabase> {
        self.db.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.config.epgdb_path
    }
}

impl std::fmt::Debug for ImportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportSession")
            .field("path", &self.config.epgdb_path)
            .field("source_name", &self.source_name)
            .field("priority", &self.priority)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
