use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::core::{filters::pass_cutoff, ExclusionSets};
use crate::error::ApiError;
use crate::models::{
    BrowseQuery, CandidateCard, HealthResponse, LikeResponse, MatchSummary, MessagePayload,
    PassResponse, ServerEvent, UnmatchResponse,
};
use crate::routes::AppState;
use crate::services::directory::DirectoryError;
use crate::services::{AuthedUser, CacheKey};

/// Configure discovery routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/discovery/browse", web::get().to(browse))
        .route("/discovery/like/{user_id}", web::post().to(like))
        .route("/discovery/pass/{user_id}", web::post().to(pass))
        .route("/discovery/matches", web::get().to(list_matches))
        .route("/discovery/matches/{match_id}", web::delete().to(unmatch));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let db_healthy = state.store.health_check().await.unwrap_or(false);
    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Browse ranked candidates.
///
/// GET /api/v1/discovery/browse?limit=20
async fn browse(
    state: web::Data<AppState>,
    user: AuthedUser,
    query: web::Query<BrowseQuery>,
) -> Result<HttpResponse, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let viewer_id = user.0;
    let limit = query.limit.min(state.matching.max_limit) as usize;

    let viewer = state.directory.get_profile(viewer_id).await.map_err(|e| match e {
        DirectoryError::NotFound(_) => {
            ApiError::Validation("complete your profile before browsing".to_string())
        }
        other => other.into(),
    })?;

    if !viewer.is_complete {
        return Err(ApiError::Validation(
            "complete your profile before browsing".to_string(),
        ));
    }
    let Some((lat, lon)) = viewer.location() else {
        return Err(ApiError::Validation(
            "set your location before browsing".to_string(),
        ));
    };

    let preferences = load_preferences(&state, viewer_id).await;

    let exclusions = load_exclusions(&state, viewer_id).await?;

    // Over-fetch: ranking reorders, so pull more than requested and truncate
    // only after scoring.
    let fetch_limit = limit * state.matching.overfetch_factor as usize;
    let candidates = state
        .directory
        .candidates_within(lat, lon, preferences.max_distance_km as f64, fetch_limit)
        .await?;

    tracing::debug!(
        "browse for {}: {} candidates before ranking",
        viewer_id,
        candidates.len()
    );

    let result = state.matcher.rank(
        &viewer,
        &preferences,
        &exclusions,
        candidates,
        limit,
        Utc::now(),
    );

    let cards: Vec<CandidateCard> = result
        .candidates
        .iter()
        .map(|scored| {
            let mut card = CandidateCard::from_profile(&scored.profile);
            card.distance_km = Some((scored.distance_km * 10.0).round() / 10.0);
            card.match_score = Some((scored.score * 10.0).round() / 10.0);
            card
        })
        .collect();

    tracing::info!(
        "browse for {}: returning {} of {} considered",
        viewer_id,
        cards.len(),
        result.total_considered
    );

    Ok(HttpResponse::Ok().json(cards))
}

/// Like a user; resolves mutual likes into a match.
///
/// POST /api/v1/discovery/like/{user_id}
async fn like(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let liker = user.0;
    let target = path.into_inner();

    if liker != target {
        // Target must exist and be discoverable before any edge is written.
        let target_profile = state.directory.get_profile(target).await.map_err(|e| match e {
            DirectoryError::NotFound(_) => {
                ApiError::NotFound("user not found or not visible".to_string())
            }
            other => other.into(),
        })?;
        if !target_profile.is_discoverable() {
            return Err(ApiError::NotFound(
                "user not found or not visible".to_string(),
            ));
        }
    }

    let outcome = state.coordinator.like(liker, target).await?;

    // Trust bookkeeping is the directory's; failures only warn.
    if let Err(e) = state.directory.adjust_trust_score(target, "received_like").await {
        tracing::warn!("trust adjustment failed for {}: {}", target, e);
    }

    if outcome.is_match {
        for user_id in [liker, target] {
            if let Err(e) = state
                .directory
                .adjust_trust_score(user_id, "match_created")
                .await
            {
                tracing::warn!("trust adjustment failed for {}: {}", user_id, e);
            }
        }

        if let Some(match_id) = outcome.match_id {
            state.registry.send(
                target,
                ServerEvent::NotificationMatch {
                    match_id,
                    matched_user_id: liker,
                },
            );
            state.registry.send(
                liker,
                ServerEvent::NotificationMatch {
                    match_id,
                    matched_user_id: target,
                },
            );
        }
        state.cache.invalidate_match_lists(liker, target).await;
    } else {
        // One-way like: the target learns someone is interested, not who.
        state.registry.send(target, ServerEvent::NotificationLiked);
    }

    Ok(HttpResponse::Ok().json(LikeResponse {
        liked: outcome.liked,
        is_match: outcome.is_match,
        match_id: outcome.match_id,
    }))
}

/// Pass on a user for the suppression window.
///
/// POST /api/v1/discovery/pass/{user_id}
async fn pass(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let target = path.into_inner();
    if target == user.0 {
        return Err(ApiError::Policy("you cannot pass on yourself".to_string()));
    }

    state.store.upsert_pass(user.0, target).await?;

    Ok(HttpResponse::Ok().json(PassResponse { passed: true }))
}

/// List the caller's active matches with the other party's card, the last
/// message and the unread count.
///
/// GET /api/v1/discovery/matches
async fn list_matches(
    state: web::Data<AppState>,
    user: AuthedUser,
) -> Result<HttpResponse, ApiError> {
    let caller = user.0;

    let cache_key = CacheKey::matches(caller);
    if let Ok(cached) = state.cache.get::<Vec<MatchSummary>>(&cache_key).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let matches = state.store.active_matches_for(caller).await?;
    if matches.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<MatchSummary>::new()));
    }

    let match_ids: Vec<Uuid> = matches.iter().map(|m| m.id).collect();
    let unread = state.store.unread_counts(caller, &match_ids).await?;
    let last_messages = state.store.last_messages(&match_ids).await?;

    let mut summaries = Vec::with_capacity(matches.len());
    for record in &matches {
        let other_id = record.other_user(caller);

        // A missing counterparty profile drops that entry, never the list.
        let profile = match state.directory.get_profile(other_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("skipping match {}: profile fetch failed: {}", record.id, e);
                continue;
            }
        };

        summaries.push(MatchSummary {
            match_id: record.id,
            matched_user: CandidateCard::from_profile(&profile),
            matched_at: record.matched_at,
            last_message: last_messages.get(&record.id).map(MessagePayload::from),
            unread_count: unread.get(&record.id).copied().unwrap_or(0),
        });
    }

    if let Err(e) = state.cache.set(&cache_key, &summaries).await {
        tracing::warn!("failed to cache match list for {}: {}", caller, e);
    }

    Ok(HttpResponse::Ok().json(summaries))
}

/// Unmatch an active match.
///
/// DELETE /api/v1/discovery/matches/{match_id}
async fn unmatch(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let match_id = path.into_inner();

    let record = state
        .store
        .unmatch(match_id, user.0)
        .await?
        .ok_or_else(|| ApiError::NotFound("match not found or already inactive".to_string()))?;

    state
        .cache
        .invalidate_match_lists(record.user_low, record.user_high)
        .await;

    Ok(HttpResponse::Ok().json(UnmatchResponse { unmatched: true }))
}

/// Preferences come from the preference store; a user who never saved any
/// browses with the defaults.
async fn load_preferences(
    state: &web::Data<AppState>,
    viewer_id: Uuid,
) -> crate::models::PreferenceRecord {
    let cache_key = CacheKey::preferences(viewer_id);
    if let Ok(cached) = state.cache.get(&cache_key).await {
        return cached;
    }

    let preferences = match state.directory.get_preferences(viewer_id).await {
        Ok(preferences) => preferences,
        Err(DirectoryError::NotFound(_)) => {
            crate::models::PreferenceRecord::defaults_for(viewer_id)
        }
        Err(e) => {
            tracing::warn!("preference fetch failed for {}, using defaults: {}", viewer_id, e);
            crate::models::PreferenceRecord::defaults_for(viewer_id)
        }
    };

    if let Err(e) = state.cache.set(&cache_key, &preferences).await {
        tracing::warn!("failed to cache preferences for {}: {}", viewer_id, e);
    }

    preferences
}

async fn load_exclusions(
    state: &web::Data<AppState>,
    viewer_id: Uuid,
) -> Result<ExclusionSets, ApiError> {
    let cutoff = pass_cutoff(Utc::now(), state.matching.pass_suppression_hours);

    Ok(ExclusionSets {
        liked: state.store.liked_set(viewer_id).await?,
        matched: state.store.active_matched_set(viewer_id).await?,
        blocked: state.store.blocked_set(viewer_id).await?,
        recently_passed: state.store.passed_since(viewer_id, cutoff).await?,
    })
}
