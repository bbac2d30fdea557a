use std::sync::Arc;

use uuid::Uuid;

use crate::models::{ClientEvent, MatchRecord, MessageKind, MessagePayload, ServerEvent};
use crate::realtime::registry::ConnectionRegistry;
use crate::services::{CacheManager, DirectoryClient, ModerationClient, PgRelationshipStore};

/// Shared state for real-time event processing.
pub struct RealtimeContext {
    pub registry: Arc<ConnectionRegistry>,
    pub store: Arc<PgRelationshipStore>,
    pub moderation: Arc<ModerationClient>,
    pub directory: Arc<DirectoryClient>,
    pub cache: Arc<CacheManager>,
    pub max_message_length: usize,
}

/// Dispatch one client event.
///
/// Every per-event failure is reported back as an `error` event on the
/// sender's own connection; nothing here closes the connection or leaks into
/// other users' sessions.
pub async fn dispatch(ctx: &RealtimeContext, sender_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::ChatMessage {
            match_id,
            content,
            message_type,
        } => handle_chat_message(ctx, sender_id, match_id, content, message_type).await,
        ClientEvent::Typing {
            match_id,
            is_typing,
        } => handle_typing(ctx, sender_id, match_id, is_typing),
        ClientEvent::ReadReceipt { message_id } => {
            handle_read_receipt(ctx, sender_id, message_id).await
        }
        ClientEvent::JoinMatch { match_id } => handle_join_match(ctx, sender_id, match_id).await,
        ClientEvent::LeaveMatch { match_id } => {
            ctx.registry.leave(match_id, sender_id);
            tracing::debug!("user {} left room {}", sender_id, match_id);
        }
        ClientEvent::Pong => ctx.registry.touch(sender_id),
    }
}

async fn handle_chat_message(
    ctx: &RealtimeContext,
    sender_id: Uuid,
    match_id: Uuid,
    content: String,
    kind: MessageKind,
) {
    let content = content.trim().to_string();
    if content.is_empty() {
        ctx.registry
            .send(sender_id, ServerEvent::error("message content cannot be empty"));
        return;
    }

    if content.chars().count() > ctx.max_message_length {
        ctx.registry.send(
            sender_id,
            ServerEvent::error(format!(
                "message too long, limit is {} characters",
                ctx.max_message_length
            )),
        );
        return;
    }

    match kind {
        MessageKind::Image | MessageKind::Gif => {
            if !valid_image_payload(&content) {
                ctx.registry
                    .send(sender_id, ServerEvent::error("invalid image message payload"));
                return;
            }
        }
        MessageKind::Text => {
            let verdict = ctx.moderation.check_message(sender_id, &content).await;
            if !verdict.approved {
                tracing::warn!("message from {} rejected by moderation", sender_id);
                // Best-effort trust penalty; the directory owns the ledger.
                if let Err(e) = ctx
                    .directory
                    .adjust_trust_score(sender_id, "content_violation")
                    .await
                {
                    tracing::warn!("trust adjustment failed for {}: {}", sender_id, e);
                }
                ctx.registry.send(
                    sender_id,
                    ServerEvent::Error {
                        message: "message rejected by content safety".to_string(),
                        violations: Some(verdict.violations),
                    },
                );
                return;
            }
        }
    }

    let Some(record) = require_active_membership(ctx, sender_id, match_id).await else {
        return;
    };

    let message = match ctx
        .store
        .insert_message(match_id, sender_id, &content, kind)
        .await
    {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("failed to persist message in match {}: {}", match_id, e);
            ctx.registry
                .send(sender_id, ServerEvent::error("failed to send message"));
            return;
        }
    };

    // The whole room, sender included, gets the persisted confirmation.
    ctx.registry.broadcast(
        match_id,
        ServerEvent::NewMessage {
            message: MessagePayload::from(&message),
        },
        None,
    );

    let receiver_id = record.other_user(sender_id);
    if !ctx.registry.is_in_room(match_id, receiver_id) {
        ctx.registry.send(
            receiver_id,
            ServerEvent::NotificationMessage {
                match_id,
                sender_id,
                preview: preview_of(&message.content, kind),
            },
        );
    }

    ctx.cache
        .invalidate_match_lists(record.user_low, record.user_high)
        .await;
}

fn handle_typing(ctx: &RealtimeContext, sender_id: Uuid, match_id: Uuid, is_typing: bool) {
    // Ephemeral; no persistence, and the sender never hears its own echo.
    ctx.registry.broadcast(
        match_id,
        ServerEvent::Typing {
            user_id: sender_id,
            is_typing,
            match_id,
        },
        Some(sender_id),
    );
}

async fn handle_read_receipt(ctx: &RealtimeContext, reader_id: Uuid, message_id: Uuid) {
    match ctx.store.mark_message_read(message_id, reader_id).await {
        // Only the receiver can mark, and only the first receipt counts;
        // anything else is a silent no-op.
        Ok(Some((sender_id, read_at))) => {
            ctx.registry.send(
                sender_id,
                ServerEvent::ReadReceipt {
                    message_id,
                    read_by: reader_id,
                    read_at,
                },
            );
        }
        Ok(None) => {
            tracing::debug!("read receipt for {} ignored", message_id);
        }
        Err(e) => {
            tracing::error!("failed to mark message {} read: {}", message_id, e);
            ctx.registry
                .send(reader_id, ServerEvent::error("failed to record read receipt"));
        }
    }
}

async fn handle_join_match(ctx: &RealtimeContext, user_id: Uuid, match_id: Uuid) {
    if require_active_membership(ctx, user_id, match_id).await.is_none() {
        return;
    }

    ctx.registry.join(match_id, user_id);
    ctx.registry
        .send(user_id, ServerEvent::JoinedMatch { match_id });
}

/// Look up a match and require it to be ACTIVE with the user as a member;
/// reports the failure to the user and returns None otherwise.
async fn require_active_membership(
    ctx: &RealtimeContext,
    user_id: Uuid,
    match_id: Uuid,
) -> Option<MatchRecord> {
    let record = match ctx.store.find_match_by_id(match_id).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("match lookup {} failed: {}", match_id, e);
            ctx.registry
                .send(user_id, ServerEvent::error("match lookup failed"));
            return None;
        }
    };

    let Some(record) = record else {
        ctx.registry
            .send(user_id, ServerEvent::error("match not found or no longer active"));
        return None;
    };

    if !record.is_active() {
        ctx.registry
            .send(user_id, ServerEvent::error("match not found or no longer active"));
        return None;
    }

    if !record.involves(user_id) {
        ctx.registry
            .send(user_id, ServerEvent::error("you are not a member of this match"));
        return None;
    }

    Some(record)
}

/// Image and GIF messages carry a JSON payload referencing uploaded assets.
fn valid_image_payload(content: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(content)
        .map(|v| {
            v.get("image_url").and_then(|u| u.as_str()).is_some()
                && v.get("thumbnail_url").and_then(|u| u.as_str()).is_some()
        })
        .unwrap_or(false)
}

fn preview_of(content: &str, kind: MessageKind) -> String {
    match kind {
        MessageKind::Image => "[image]".to_string(),
        MessageKind::Gif => "[gif]".to_string(),
        MessageKind::Text => {
            let mut preview: String = content.chars().take(50).collect();
            if content.chars().count() > 50 {
                preview.push_str("...");
            }
            preview
        }
    }
}
