use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::{
    distance::haversine_distance,
    filters::{is_eligible, ExclusionSets},
    scoring::calculate_match_score,
};
use crate::models::{PreferenceRecord, ProfileRecord};

/// A candidate that survived filtering, with its computed signals.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub profile: ProfileRecord,
    pub distance_km: f64,
    pub score: f64,
}

/// Result of one ranking run.
#[derive(Debug)]
pub struct RankResult {
    pub candidates: Vec<ScoredCandidate>,
    pub total_considered: usize,
}

/// Discovery ranking pipeline.
///
/// Stages: relationship exclusions -> eligibility (age, gender, distance,
/// discoverability) -> scoring -> descending sort -> truncate. Candidates
/// with equal scores keep their input order (stable sort); no secondary key
/// is applied.
#[derive(Debug, Clone, Default)]
pub struct Matcher;

impl Matcher {
    pub fn new() -> Self {
        Self
    }

    /// Rank an over-fetched candidate set for the viewer.
    ///
    /// Candidates missing a location are skipped rather than failing the
    /// whole run; the same goes for any other per-candidate defect.
    pub fn rank(
        &self,
        viewer: &ProfileRecord,
        preferences: &PreferenceRecord,
        exclusions: &ExclusionSets,
        candidates: Vec<ProfileRecord>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> RankResult {
        let total_considered = candidates.len();

        let Some((viewer_lat, viewer_lon)) = viewer.location() else {
            return RankResult {
                candidates: Vec::new(),
                total_considered,
            };
        };
        let viewer_id: Uuid = viewer.user_id;

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|candidate| !exclusions.excludes(candidate.user_id))
            .filter_map(|candidate| {
                let Some((lat, lon)) = candidate.location() else {
                    tracing::warn!(
                        "candidate {} has no location, skipping",
                        candidate.user_id
                    );
                    return None;
                };

                let distance_km = haversine_distance(viewer_lat, viewer_lon, lat, lon);
                if !is_eligible(viewer_id, preferences, &candidate, distance_km) {
                    return None;
                }

                let score = calculate_match_score(viewer, &candidate, distance_km, now);
                Some(ScoredCandidate {
                    profile: candidate,
                    distance_km,
                    score,
                })
            })
            .collect();

        // Stable sort: equal scores preserve candidate-query order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        RankResult {
            candidates: scored,
            total_considered,
        }
    }
}
