//! Amora Core - discovery, matching and real-time chat core for the Amora
//! dating app.
//!
//! Three tightly coupled pieces live here: the candidate discovery and
//! scoring pipeline, the like/match consistency protocol, and the real-time
//! connection/room registry that fans out chat events. Everything else
//! (profiles, auth issuance, moderation word lists, trust bookkeeping) is an
//! external collaborator.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{calculate_match_score, haversine_distance, ExclusionSets, Matcher};
pub use crate::models::{
    canonical_pair, CandidateCard, MatchRecord, MatchStatus, PreferenceRecord, ProfileRecord,
};
pub use crate::realtime::ConnectionRegistry;
pub use crate::services::LikeMatchCoordinator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let a = uuid::Uuid::from_u128(2);
        let b = uuid::Uuid::from_u128(1);
        assert_eq!(canonical_pair(a, b).0, b);
    }
}
