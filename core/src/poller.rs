//! Save file poller
//!
//! Watches the save's modification time on a fixed interval and turns
//! changes into published death counts:
//!
//! 1. locate the save (cached until a stat fails)
//! 2. skip unless the mtime is strictly newer than the last successful read
//! 3. decode the slot, retrying once after a short delay on a torn read
//! 4. commit the mtime, then drop duplicates and zeroes before publishing
//!
//! The poller owns all of its state; nothing here is shared across tasks.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use deathwatch_types::AppConfig;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::locator::resolve_save_path;
use crate::save::{self, Profile};
use crate::sinks::CounterSink;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Delay before the single retry of a torn read.
pub const RETRY_DELAY: Duration = Duration::from_millis(50);

/// What a single poll tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No save file could be located
    SaveNotFound,
    /// The cached save could not be stat'ed; it will be re-located
    StatFailed,
    /// Modification time not newer than the last successful read
    Unchanged,
    /// Open failed, or both decode attempts failed
    ReadFailed,
    /// Same count as last published
    Duplicate,
    /// A zero count, never published
    ZeroSuppressed,
    Published(Profile),
}

pub struct DeathPoller {
    config: AppConfig,
    sinks: Vec<Box<dyn CounterSink>>,
    retry_delay: Duration,

    save_path: Option<PathBuf>,
    last_modified: Option<SystemTime>,
    last_seen: Option<u32>,
}

impl DeathPoller {
    pub fn new(config: AppConfig, sinks: Vec<Box<dyn CounterSink>>) -> Self {
        Self {
            config,
            sinks,
            retry_delay: RETRY_DELAY,
            save_path: None,
            last_modified: None,
            last_seen: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn slot(&self) -> usize {
        self.config.character_slot
    }

    #[cfg(test)]
    pub(crate) fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Poll every [`POLL_INTERVAL`] until `shutdown` changes or its sender
    /// is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.tick().await;
                    trace!(?outcome, "Poll tick");
                }
                _ = shutdown.changed() => break,
            }
        }

        debug!(slot = self.slot(), "Poller stopped");
    }

    /// Run one poll step.
    pub async fn tick(&mut self) -> TickOutcome {
        let path = match self.locate() {
            Some(path) => path,
            None => return TickOutcome::SaveNotFound,
        };

        let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Save file stat failed, re-locating");
                self.save_path = None;
                self.last_modified = None;
                return TickOutcome::StatFailed;
            }
        };

        if self.last_modified.is_some_and(|last| modified <= last) {
            return TickOutcome::Unchanged;
        }

        let Some(profile) = self.read_with_retry(&path).await else {
            return TickOutcome::ReadFailed;
        };

        // Timestamp tracking is independent of the value gate below
        self.last_modified = Some(modified);

        self.gate(profile)
    }

    fn locate(&mut self) -> Option<PathBuf> {
        if let Some(path) = &self.save_path {
            return Some(path.clone());
        }

        match resolve_save_path(Some(&self.config)) {
            Ok(path) => {
                info!(path = %path.display(), "Save file located");
                self.save_path = Some(path.clone());
                Some(path)
            }
            Err(e) => {
                debug!(error = %e, "Save file not located");
                None
            }
        }
    }

    async fn read_with_retry(&self, path: &Path) -> Option<Profile> {
        let slot = self.slot();

        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match read_slot(path.to_path_buf(), slot).await {
                Ok(Some(profile)) => return Some(profile),
                Ok(None) => trace!(attempt, slot, "Slot read incomplete"),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Failed to open save file");
                    return None;
                }
            }
        }

        debug!(slot, "Slot unreadable after retry, waiting for next change");
        None
    }

    fn gate(&mut self, profile: Profile) -> TickOutcome {
        if self.last_seen == Some(profile.deaths) {
            return TickOutcome::Duplicate;
        }
        self.last_seen = Some(profile.deaths);

        // Deaths never decrease in-game; a zero is an uninitialised slot. It
        // still counts as seen so the next non-zero value always publishes.
        if profile.deaths == 0 {
            return TickOutcome::ZeroSuppressed;
        }

        self.publish(&profile);
        TickOutcome::Published(profile)
    }

    fn publish(&self, profile: &Profile) {
        info!(deaths = profile.deaths, name = %profile.name, "Death count changed");

        for sink in &self.sinks {
            if let Err(e) = sink.publish(profile) {
                warn!(sink = sink.name(), error = %e, "Failed to publish death count");
            }
        }
    }
}

async fn read_slot(path: PathBuf, slot: usize) -> io::Result<Option<Profile>> {
    tokio::task::spawn_blocking(move || save::read_profile(&path, slot))
        .await
        .map_err(io::Error::other)?
}
