use serde::{Deserialize, Serialize};

/// Latest published counter value, as served by `/api/deaths` and each SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSnapshot {
    pub deaths: u32,
    pub name: String,
}

impl DeathSnapshot {
    pub fn new(deaths: u32, name: impl Into<String>) -> Self {
        Self {
            deaths,
            name: name.into(),
        }
    }
}
