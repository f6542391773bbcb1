//! Destinations for confirmed death count changes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::hub::DeathCounter;
use crate::save::Profile;

/// File name of the plain-text counter, written next to the config.
pub const DEATH_FILE_NAME: &str = "death.txt";

/// Receives every published change from the poller.
///
/// Errors are logged by the poller and never stop other sinks.
pub trait CounterSink: Send + Sync {
    /// Short label for log lines
    fn name(&self) -> &'static str;

    fn publish(&self, profile: &Profile) -> io::Result<()>;
}

impl CounterSink for DeathCounter {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn publish(&self, profile: &Profile) -> io::Result<()> {
        self.update(profile.deaths, &profile.name);
        Ok(())
    }
}

impl<T: CounterSink + ?Sized> CounterSink for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn publish(&self, profile: &Profile) -> io::Result<()> {
        (**self).publish(profile)
    }
}

/// Overwrites a text file with the decimal count (no trailing newline).
#[derive(Debug, Clone)]
pub struct TextFileSink {
    path: PathBuf,
}

impl TextFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterSink for TextFileSink {
    fn name(&self) -> &'static str {
        "text-file"
    }

    fn publish(&self, profile: &Profile) -> io::Result<()> {
        fs::write(&self.path, profile.deaths.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(deaths: u32) -> Profile {
        Profile {
            slot_index: 0,
            name: "Tarnished".to_string(),
            level: 1,
            play_time: 0,
            deaths,
            active: true,
        }
    }

    #[test]
    fn test_text_file_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = TextFileSink::new(dir.path().join(DEATH_FILE_NAME));

        sink.publish(&profile(1234)).unwrap();
        sink.publish(&profile(7)).unwrap();

        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "7");
    }

    #[test]
    fn test_text_file_missing_dir_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = TextFileSink::new(dir.path().join("missing").join(DEATH_FILE_NAME));
        assert!(sink.publish(&profile(1)).is_err());
    }

    #[test]
    fn test_counter_sink_updates_hub() {
        let counter = Arc::new(DeathCounter::new());
        let sink: Box<dyn CounterSink> = Box::new(Arc::clone(&counter));

        sink.publish(&profile(42)).unwrap();
        assert_eq!(sink.name(), "overlay");
        assert_eq!(counter.get().deaths, 42);
        assert_eq!(counter.get().name, "Tarnished");
    }
}
