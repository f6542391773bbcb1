pub mod config;
pub mod hub;
pub mod locator;
pub mod poller;
pub mod save;
pub mod sinks;
pub mod web;

// Re-exports for convenience
pub use config::{AppConfigExt, ConfigError};
pub use hub::{DeathCounter, SubscriberId, Subscription};
pub use locator::{LocateError, resolve_save_path};
pub use poller::{DeathPoller, TickOutcome};
pub use save::Profile;
pub use sinks::{CounterSink, TextFileSink};
pub use web::{WebError, WebServer};
