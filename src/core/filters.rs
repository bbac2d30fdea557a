use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{PreferenceRecord, ProfileRecord};

/// Relationship-based exclusions for one browse request.
///
/// Each set is computed once from storage before filtering so the candidate
/// pipeline itself stays pure and cheap to test.
#[derive(Debug, Default, Clone)]
pub struct ExclusionSets {
    /// Users the requester already sent a like to (either direction of a
    /// pending like is irrelevant; only the outgoing edge excludes).
    pub liked: HashSet<Uuid>,
    /// Users with an ACTIVE match with the requester.
    pub matched: HashSet<Uuid>,
    /// Users blocked by or blocking the requester.
    pub blocked: HashSet<Uuid>,
    /// Users passed within the suppression window.
    pub recently_passed: HashSet<Uuid>,
}

impl ExclusionSets {
    pub fn excludes(&self, candidate_id: Uuid) -> bool {
        self.liked.contains(&candidate_id)
            || self.matched.contains(&candidate_id)
            || self.blocked.contains(&candidate_id)
            || self.recently_passed.contains(&candidate_id)
    }
}

/// Cutoff instant for pass suppression: a pass stamped after this still
/// hides the candidate, an older one is inert (wall-clock, not calendar
/// days).
pub fn pass_cutoff(now: DateTime<Utc>, suppression_hours: u32) -> DateTime<Utc> {
    now - Duration::hours(suppression_hours as i64)
}

/// Check whether a candidate is eligible for the requester.
///
/// Applies every mandatory exclusion except the relationship sets (those are
/// checked separately via [`ExclusionSets::excludes`]): self, discoverability
/// of the candidate account, age window, gender preference and max distance.
pub fn is_eligible(
    viewer_id: Uuid,
    preferences: &PreferenceRecord,
    candidate: &ProfileRecord,
    distance_km: f64,
) -> bool {
    if candidate.user_id == viewer_id {
        return false;
    }

    if !candidate.is_discoverable() {
        return false;
    }

    if candidate.age < preferences.min_age || candidate.age > preferences.max_age {
        return false;
    }

    if !preferences.gender_preference.allows(candidate.gender) {
        return false;
    }

    if distance_km > preferences.max_distance_km as f64 {
        return false;
    }

    true
}
