//! Per-channel merge of buffered events into the cache.
//!
//! For every channel the service row is resolved (or created), all of its
//! existing events are dropped, and each buffered event inside the import
//! window is written as one `T_Event` row, one `T_Data` row and up to three
//! hash-deduplicated text rows.

use std::collections::HashSet;

use epgdb_types::{
    clamp_duration, normalize_hash, split_description, synthetic_event_id, EpgEvent,
    ImportWindow, ServiceRef,
};
use log::{debug, info};
use serde::Serialize;

use crate::database::{EpgDatabase, NewData, NewEvent, Result, TextTable};
use crate::hasher::StringHasher;

/// Maps a service reference to a display name (logging only).
pub trait ServiceNameResolver {
    fn service_name(&self, reference: &str) -> Option<String>;
}

impl<F> ServiceNameResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn service_name(&self, reference: &str) -> Option<String> {
        self(reference)
    }
}

/// Running totals of an import session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Channels written (malformed and excluded ones don't count).
    pub channels_processed: u64,
    /// Events offered, summed over every service reference.
    pub total_events: u64,
    /// Events written for the most recent channel.
    pub channel_imported: u64,
    /// Events written over the whole session.
    pub events_imported: u64,
    /// Events dropped for lying outside the import window.
    pub events_outdated: u64,
}

/// Why a channel was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoEvents,
    Malformed(String),
    Excluded(u16),
}

/// Result of merging one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Skipped(SkipReason),
    Imported {
        service_id: i64,
        imported: u64,
        outdated: u64,
    },
}

impl ChannelOutcome {
    /// Events written for the channel.
    pub fn imported(&self) -> u64 {
        match self {
            ChannelOutcome::Skipped(_) => 0,
            ChannelOutcome::Imported { imported, .. } => *imported,
        }
    }

    /// Per-channel log line, also emitted for skipped channels.
    pub fn summary(&self, offered: usize, channel_name: &str) -> String {
        format!(
            "Added {} from {} events for channel {}",
            self.imported(),
            offered,
            channel_name
        )
    }
}

/// Everything a channel merge needs besides the events.
pub struct MergeContext<'a> {
    pub db: &'a EpgDatabase,
    pub hasher: &'a dyn StringHasher,
    pub window: ImportWindow,
    pub source_id: i64,
    pub excluded_sids: &'a HashSet<u16>,
}

impl MergeContext<'_> {
    fn hash(&self, text: &str) -> i32 {
        normalize_hash(self.hasher.string_hash(text))
    }

    /// Merge `events` into the service identified by `reference`.
    ///
    /// Database errors abort the merge and are returned as-is; the caller
    /// is expected to abandon the whole session.
    pub fn import_channel(
        &self,
        reference: &str,
        channel_name: &str,
        events: &[EpgEvent],
        stats: &mut ImportStats,
    ) -> Result<ChannelOutcome> {
        let outcome = self.merge_channel(reference, events, stats)?;
        let summary = outcome.summary(events.len(), channel_name);
        match &outcome {
            ChannelOutcome::Imported { .. } => info!("{}", summary),
            ChannelOutcome::Skipped(reason) => {
                debug!("{} ({} skipped: {:?})", summary, reference, reason)
            }
        }
        Ok(outcome)
    }

    fn merge_channel(
        &self,
        reference: &str,
        events: &[EpgEvent],
        stats: &mut ImportStats,
    ) -> Result<ChannelOutcome> {
        if events.is_empty() {
            return Ok(ChannelOutcome::Skipped(SkipReason::NoEvents));
        }

        let service = match ServiceRef::parse(reference) {
            Ok(service) => service,
            Err(e) => {
                return Ok(ChannelOutcome::Skipped(SkipReason::Malformed(e.to_string())));
            }
        };

        if self.excluded_sids.contains(&service.sid) {
            return Ok(ChannelOutcome::Skipped(SkipReason::Excluded(service.sid)));
        }

        stats.channels_processed += 1;

        let service_id = self.db.get_or_create_service(&service)?;
        self.db.delete_service_events(service_id)?;

        let mut imported = 0;
        let mut outdated = 0;
        for event in events {
            if self.insert_event(service_id, event)? {
                imported += 1;
            } else {
                outdated += 1;
            }
        }

        stats.channel_imported = imported;
        stats.events_imported += imported;
        stats.events_outdated += outdated;

        Ok(ChannelOutcome::Imported {
            service_id,
            imported,
            outdated,
        })
    }

    /// Write one event; returns `false` if it lies outside the window.
    fn insert_event(&self, service_id: i64, event: &EpgEvent) -> Result<bool> {
        let duration = clamp_duration(event.duration);
        if !self.window.contains(event.begin_time, duration) {
            return Ok(false);
        }

        let title = event.title.as_str();
        let (short_description, extended_description) =
            split_description(title, &event.description);

        let event_id = self.db.insert_event(&NewEvent {
            service_id,
            begin_time: event.begin_time,
            duration,
            source_id: self.source_id,
            dvb_event_id: synthetic_event_id(event.begin_time),
        })?;

        let title_id = self
            .db
            .get_or_insert_text(TextTable::Title, self.hash(title), title)?;
        let short_description_id = self.db.get_or_insert_text(
            TextTable::ShortDescription,
            self.hash(short_description),
            short_description,
        )?;
        let extended_description_id = self.db.get_or_insert_text(
            TextTable::ExtendedDescription,
            self.hash(extended_description),
            extended_description,
        )?;

        self.db.insert_data(&NewData {
            event_id,
            title_id,
            short_description_id,
            extended_description_id,
            language: &event.language,
        })?;

        Ok(true)
    }
}
