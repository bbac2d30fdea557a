use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_browse_limit() -> u16 {
    20
}

/// Query parameters for the discovery browse endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BrowseQuery {
    #[serde(default = "default_browse_limit")]
    #[validate(range(min = 1))]
    pub limit: u16,
}

/// Query parameters for chat history pagination.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HistoryQuery {
    /// Return messages sent strictly before this instant (RFC 3339).
    #[serde(default)]
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default = "default_history_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: u16,
}

fn default_history_limit() -> u16 {
    50
}
