use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{MessageKind, MessageRecord};

/// Events a client may send over the real-time channel.
///
/// The wire format is a JSON object discriminated by `type`, e.g.
/// `{"type": "chat_message", "match_id": "...", "content": "hi"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    ChatMessage {
        match_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: MessageKind,
    },
    Typing {
        match_id: Uuid,
        #[serde(default)]
        is_typing: bool,
    },
    ReadReceipt {
        message_id: Uuid,
    },
    JoinMatch {
        match_id: Uuid,
    },
    LeaveMatch {
        match_id: Uuid,
    },
    /// Heartbeat reply to a server `ping`.
    Pong,
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connection {
        status: String,
        user_id: Uuid,
    },
    NewMessage {
        message: MessagePayload,
    },
    Typing {
        user_id: Uuid,
        is_typing: bool,
        match_id: Uuid,
    },
    ReadReceipt {
        message_id: Uuid,
        read_by: Uuid,
        read_at: DateTime<Utc>,
    },
    MessageDeleted {
        message_id: Uuid,
        match_id: Uuid,
        deleted_by: Uuid,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        violations: Option<Vec<String>>,
    },
    JoinedMatch {
        match_id: Uuid,
    },
    NotificationMatch {
        match_id: Uuid,
        matched_user_id: Uuid,
    },
    NotificationLiked,
    /// Preview pushed to the other party when they are connected but not
    /// sitting in the chat room.
    NotificationMessage {
        match_id: Uuid,
        sender_id: Uuid,
        preview: String,
    },
    Ping {
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
            violations: None,
        }
    }
}

/// Chat message as delivered over the real-time channel and the history API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageKind,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<&MessageRecord> for MessagePayload {
    fn from(record: &MessageRecord) -> Self {
        Self {
            id: record.id,
            match_id: record.match_id,
            sender_id: record.sender_id,
            content: record.content.clone(),
            message_type: record.kind,
            sent_at: record.sent_at,
            read_at: record.read_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_tags() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type": "chat_message", "match_id": "00000000-0000-0000-0000-000000000001", "content": "hey"}"#,
        )
        .unwrap();

        match event {
            ClientEvent::ChatMessage {
                content,
                message_type,
                ..
            } => {
                assert_eq!(content, "hey");
                assert_eq!(message_type, MessageKind::Text);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_client_event_typing() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type": "typing", "match_id": "00000000-0000-0000-0000-000000000001", "is_typing": true}"#,
        )
        .unwrap();

        assert!(matches!(event, ClientEvent::Typing { is_typing: true, .. }));
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"type": "launch_missiles"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_serializes_with_type_tag() {
        let json = serde_json::to_value(ServerEvent::JoinedMatch {
            match_id: Uuid::from_u128(7),
        })
        .unwrap();

        assert_eq!(json["type"], "joined_match");
        assert_eq!(json["match_id"], "00000000-0000-0000-0000-000000000007");
    }

    #[test]
    fn test_error_event_omits_empty_violations() {
        let json = serde_json::to_value(ServerEvent::error("nope")).unwrap();
        assert_eq!(json["type"], "error");
        assert!(json.get("violations").is_none());
    }
}
