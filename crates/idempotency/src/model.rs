use serde::{Deserialize, Serialize};

/// Lifecycle of an idempotency key. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Processing,
    Completed,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Processing => "processing",
            KeyStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for KeyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(KeyStatus::Processing),
            "completed" => Ok(KeyStatus::Completed),
            other => Err(format!("unknown key status: {other}")),
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The captured outcome of a wrapped operation.
///
/// Business failures are valid, cacheable outcomes too: a retry replays the
/// failure rather than re-executing business logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl StoredResponse {
    pub fn new(status_code: u16, body: serde_json::Value) -> Self {
        Self { status_code, body }
    }
}

/// One row of coordinator state.
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub key: String,
    pub target_type: String,
    pub target_id: i64,
    pub status: KeyStatus,
    pub response: Option<StoredResponse>,
}
