use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{ChatHistoryResponse, HistoryQuery, MessagePayload, ServerEvent};
use crate::routes::AppState;
use crate::services::AuthedUser;

/// Configure message routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/messages/matches/{match_id}",
        web::get().to(chat_history),
    )
    .route("/messages/{message_id}", web::delete().to(delete_message));
}

/// Chat history for a match, oldest first.
///
/// GET /api/v1/messages/matches/{match_id}?before=...&limit=50
///
/// A newly joined reader replays persisted messages in persistence order;
/// soft-deleted messages are omitted. History stays readable after an
/// unmatch.
async fn chat_history(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let match_id = path.into_inner();

    let record = state
        .store
        .find_match_by_id(match_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("match not found".to_string()))?;

    if !record.involves(user.0) {
        return Err(ApiError::Forbidden(
            "you are not a member of this match".to_string(),
        ));
    }

    let messages = state
        .store
        .message_history(match_id, query.before, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(ChatHistoryResponse {
        match_id,
        messages: messages.iter().map(MessagePayload::from).collect(),
    }))
}

/// Soft-delete a message the caller sent; the room learns via a
/// `message_deleted` event.
///
/// DELETE /api/v1/messages/{message_id}
async fn delete_message(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let message_id = path.into_inner();

    let message = state
        .store
        .find_message(message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("message not found".to_string()))?;

    if message.sender_id != user.0 {
        return Err(ApiError::Forbidden(
            "only the sender can delete a message".to_string(),
        ));
    }

    let match_id = state
        .store
        .soft_delete_message(message_id, user.0)
        .await?
        .ok_or_else(|| ApiError::NotFound("message not found".to_string()))?;

    state.registry.broadcast(
        match_id,
        ServerEvent::MessageDeleted {
            message_id,
            match_id,
            deleted_by: user.0,
        },
        None,
    );

    if let Ok(Some(record)) = state.store.find_match_by_id(match_id).await {
        state
            .cache
            .invalidate_match_lists(record.user_low, record.user_high)
            .await;
    }

    Ok(HttpResponse::NoContent().finish())
}
