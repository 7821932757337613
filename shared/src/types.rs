//! Common types used across the ledger

use serde::{Deserialize, Serialize};

/// Principal recorded as `createdBy` on ledger entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    /// Actor for calls made through the external API key
    pub const EXTERNAL_API: &'static str = "EXTERNAL_API";

    pub fn user(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    pub fn external_api() -> Self {
        Self(Self::EXTERNAL_API.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_external(&self) -> bool {
        self.0 == Self::EXTERNAL_API
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
