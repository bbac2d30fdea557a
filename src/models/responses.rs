use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::CandidateCard;
use crate::models::events::MessagePayload;

/// Response for the like endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub is_match: bool,
    pub match_id: Option<Uuid>,
}

/// Response for the pass endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassResponse {
    pub passed: bool,
}

/// Response for the unmatch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchResponse {
    pub unmatched: bool,
}

/// One entry in the caller's match list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub matched_user: CandidateCard,
    pub matched_at: DateTime<Utc>,
    pub last_message: Option<MessagePayload>,
    pub unread_count: i64,
}

/// Chat history page, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub match_id: Uuid,
    pub messages: Vec<MessagePayload>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
