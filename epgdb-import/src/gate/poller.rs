//! Timed polling of the dump file.

use std::time::Duration;

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use super::{NotReadyReason, Readiness};
use crate::error::{ImportError, Result};
use crate::session::ImportSession;

/// Delay between the engine's "save finished" and each size poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Drives [`ImportSession::start_process`] on a fixed cadence until the
/// session is connected or the file turns out to be unusable.
#[derive(Debug, Clone)]
pub struct DumpPoller {
    interval: Duration,
    cancel: CancellationToken,
}

impl Default for DumpPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl DumpPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts a running [`wait_until_ready`](Self::wait_until_ready).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll after each interval while the dump is still growing.
    ///
    /// Returns [`Readiness::Ready`] once connected, or the first
    /// [`Readiness::NotReady`] outcome; there is no retry limit while the
    /// file keeps growing.
    pub async fn wait_until_ready(&self, session: &mut ImportSession) -> Result<Readiness> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Waiting for EPG save cancelled");
                    return Err(ImportError::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            match session.start_process()? {
                Readiness::Growing(_) => continue,
                Readiness::NotReady(NotReadyReason::Missing) => {
                    warn!("{} disappeared while waiting for save", session.path().display());
                    return Ok(Readiness::NotReady(NotReadyReason::Missing));
                }
                other => return Ok(other),
            }
        }
    }
}
