#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Quarantine {
    /// When false the actor resolves as unavailable and rejects every command.
    pub enabled: bool,
}

impl Default for Quarantine {
    fn default() -> Self {
        Self { enabled: true }
    }
}
