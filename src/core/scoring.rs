use chrono::{DateTime, Utc};

use crate::models::ProfileRecord;

/// Compute the match score (0-100) of a candidate for a viewer.
///
/// Additive formula:
/// - shared interests: 10 points each, capped at 50
/// - distance tier: up to 20
/// - recency of activity: up to 20
/// - profile completeness (photos + bio): up to 5
/// - external trust score tier: up to 5
///
/// Pure function of its inputs; `now` is passed in so the activity tier is
/// reproducible in tests.
pub fn calculate_match_score(
    viewer: &ProfileRecord,
    candidate: &ProfileRecord,
    distance_km: f64,
    now: DateTime<Utc>,
) -> f64 {
    let score = interest_term(viewer, candidate)
        + distance_term(distance_km)
        + activity_term(candidate.last_active, now)
        + completeness_term(candidate)
        + trust_term(candidate.trust_score);

    score.clamp(0.0, 100.0)
}

#[inline]
fn interest_term(viewer: &ProfileRecord, candidate: &ProfileRecord) -> f64 {
    let common = candidate
        .interests
        .iter()
        .filter(|interest| viewer.interests.contains(interest))
        .count();

    (common as f64 * 10.0).min(50.0)
}

#[inline]
fn distance_term(distance_km: f64) -> f64 {
    if distance_km < 5.0 {
        20.0
    } else if distance_km < 10.0 {
        15.0
    } else if distance_km < 25.0 {
        10.0
    } else if distance_km < 50.0 {
        5.0
    } else {
        0.0
    }
}

#[inline]
fn activity_term(last_active: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(last_active) = last_active else {
        return 0.0;
    };

    let hours = (now - last_active).num_seconds() as f64 / 3600.0;
    if hours < 1.0 {
        20.0
    } else if hours < 24.0 {
        15.0
    } else if hours < 72.0 {
        10.0
    } else if hours < 168.0 {
        5.0
    } else {
        0.0
    }
}

#[inline]
fn completeness_term(candidate: &ProfileRecord) -> f64 {
    let photo_points = (candidate.photos.len() as f64 * 0.5).min(3.0);
    let bio_points = match &candidate.bio {
        Some(bio) if !bio.is_empty() => 2.0,
        _ => 0.0,
    };

    photo_points + bio_points
}

#[inline]
fn trust_term(trust_score: i32) -> f64 {
    if trust_score >= 70 {
        5.0
    } else if trust_score >= 50 {
        4.0
    } else if trust_score >= 30 {
        2.5
    } else if trust_score >= 20 {
        1.0
    } else {
        0.0
    }
}
