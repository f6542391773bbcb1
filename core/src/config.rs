//! Loading and saving `config.json`
//!
//! The file is produced by the setup wizard. Any failure here (missing file,
//! bad JSON, out-of-range values) sends the user back through setup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use deathwatch_types::AppConfig;
use thiserror::Error;

use crate::save::NUM_SLOTS;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur while loading or saving the config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialize error for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// File I/O and validation for [`AppConfig`].
pub trait AppConfigExt: Sized {
    fn load(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self, path: &Path) -> Result<(), ConfigError>;
    fn validate(&self) -> Result<(), ConfigError>;
}

impl AppConfigExt for AppConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents =
            serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialize {
                path: path.to_path_buf(),
                source,
            })?;

        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.character_slot >= NUM_SLOTS {
            return Err(ConfigError::Invalid(format!(
                "character_slot {} is outside 0..{}",
                self.character_slot, NUM_SLOTS
            )));
        }
        if self.enable_web_ui && self.web_port == 0 {
            return Err(ConfigError::Invalid("web_port must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Directory containing the running executable.
pub fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Default config location: `config.json` beside the executable.
pub fn default_config_path() -> Option<PathBuf> {
    exe_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
