use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),
}

/// Verdict from the content-safety collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationVerdict {
    pub approved: bool,
    #[serde(default)]
    pub violations: Vec<String>,
}

impl ModerationVerdict {
    pub fn approved() -> Self {
        Self {
            approved: true,
            violations: Vec::new(),
        }
    }
}

/// Client for the external content-moderation service.
///
/// Word lists and detection logic live in the collaborator; this core only
/// asks for a verdict before persisting a chat message.
pub struct ModerationClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ModerationClient {
    pub fn new(base_url: String, api_key: String, timeout_secs: Option<u64>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(10)))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// Check a text message. When the collaborator is unreachable the
    /// message is allowed through with a warning; chat availability wins
    /// over filtering here, and the verdict is advisory for text.
    pub async fn check_message(&self, sender_id: Uuid, content: &str) -> ModerationVerdict {
        match self.check(sender_id, content).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("moderation check unavailable, allowing message: {}", e);
                ModerationVerdict::approved()
            }
        }
    }

    async fn check(
        &self,
        sender_id: Uuid,
        content: &str,
    ) -> Result<ModerationVerdict, ModerationError> {
        let url = format!(
            "{}/internal/moderation/check",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("X-Service-Key", &self.api_key)
            .json(&serde_json::json!({
                "sender_id": sender_id,
                "content": content,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ModerationError::Api(format!(
                "moderation check failed: {}",
                response.status()
            )));
        }

        Ok(response.json::<ModerationVerdict>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejected_message_carries_violations() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/internal/moderation/check")
            .with_status(200)
            .with_body(r#"{"approved": false, "violations": ["profanity"]}"#)
            .create_async()
            .await;

        let client = ModerationClient::new(server.url(), "secret".to_string(), Some(5));
        let verdict = client.check_message(Uuid::from_u128(1), "bad words").await;

        assert!(!verdict.approved);
        assert_eq!(verdict.violations, vec!["profanity"]);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/internal/moderation/check")
            .with_status(503)
            .create_async()
            .await;

        let client = ModerationClient::new(server.url(), "secret".to_string(), Some(5));
        let verdict = client.check_message(Uuid::from_u128(1), "hello").await;

        assert!(verdict.approved);
        assert!(verdict.violations.is_empty());
    }
}
