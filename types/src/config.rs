//! Persisted application configuration.
//!
//! Written by the setup wizard as `config.json` next to the executable.

use serde::{Deserialize, Serialize};

pub const DEFAULT_WEB_PORT: u16 = 8080;

/// User configuration for the monitoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Character slot to monitor (0-based)
    pub character_slot: usize,
    /// Serve the browser overlay and JSON/SSE endpoints
    pub enable_web_ui: bool,
    /// Mirror the counter into `death.txt`
    pub enable_text_file: bool,
    pub web_port: u16,
    /// Explicit save file location; probed from the default directory when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            character_slot: 0,
            enable_web_ui: true,
            enable_text_file: false,
            web_port: DEFAULT_WEB_PORT,
            save_path: None,
        }
    }
}

impl AppConfig {
    /// Configured save path, treating an empty string as unset.
    pub fn save_path(&self) -> Option<&str> {
        self.save_path.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wizard_output() {
        let json = r#"{
  "character_slot": 2,
  "enable_web_ui": true,
  "enable_text_file": false,
  "web_port": 9000,
  "save_path": "C:\\Users\\me\\AppData\\Roaming\\EldenRing\\123\\ER0000.sl2"
}"#;

        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.character_slot, 2);
        assert_eq!(config.web_port, 9000);
        assert!(config.enable_web_ui);
        assert!(config.save_path().unwrap().ends_with("ER0000.sl2"));
    }

    #[test]
    fn test_missing_save_path_is_omitted() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("save_path"));

        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_empty_save_path_is_unset() {
        let config = AppConfig {
            save_path: Some(String::new()),
            ..AppConfig::default()
        };
        assert_eq!(config.save_path(), None);
    }
}
