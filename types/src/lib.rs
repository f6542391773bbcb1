//! Shared types for deathwatch.
//!
//! Kept dependency-light so the config file format and the overlay wire
//! format can be reused without pulling in the runtime.

pub mod config;
pub mod formatting;
pub mod snapshot;

pub use config::AppConfig;
pub use snapshot::DeathSnapshot;
