use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{PreferenceRecord, ProfileRecord};

/// Errors that can occur when talking to the profile directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid service key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Client for the profile directory service.
///
/// The directory owns profile/photo CRUD, search preferences and trust
/// scores; this core only reads profiles and preferences, asks the
/// directory's geospatial index for candidates within a radius, and posts
/// trust-score adjustments.
pub struct DirectoryClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl DirectoryClient {
    pub fn new(base_url: String, api_key: String, timeout_secs: Option<u64>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch a single profile snapshot.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileRecord, DirectoryError> {
        let url = self.url(&format!("/internal/profiles/{}", user_id));

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound(format!(
                "profile not found for user {}",
                user_id
            )));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DirectoryError::Unauthorized);
        }
        if !status.is_success() {
            return Err(DirectoryError::Api(format!(
                "failed to fetch profile: {}",
                status
            )));
        }

        response
            .json::<ProfileRecord>()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(format!("failed to parse profile: {}", e)))
    }

    /// Fetch the user's search preferences.
    pub async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<PreferenceRecord, DirectoryError> {
        let url = self.url(&format!("/internal/preferences/{}", user_id));

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound(format!(
                "preferences not found for user {}",
                user_id
            )));
        }
        if !status.is_success() {
            return Err(DirectoryError::Api(format!(
                "failed to fetch preferences: {}",
                status
            )));
        }

        response.json::<PreferenceRecord>().await.map_err(|e| {
            DirectoryError::InvalidResponse(format!("failed to parse preferences: {}", e))
        })
    }

    /// Query candidate profiles within a radius of a point.
    ///
    /// This is the directory's geospatial primitive; the discovery pipeline
    /// still applies its own precise distance and preference filters on top.
    /// Documents that fail to parse are skipped rather than failing the
    /// whole query.
    pub async fn candidates_within(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let query = format!(
            "latitude={}&longitude={}&radius_km={}&limit={}",
            latitude,
            longitude,
            radius_km,
            limit
        );
        let url = format!("{}?{}", self.url("/internal/profiles/nearby"), query);

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DirectoryError::Api(format!(
                "failed to query candidates: {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;

        let documents = json
            .get("profiles")
            .and_then(|p| p.as_array())
            .ok_or_else(|| DirectoryError::InvalidResponse("missing profiles array".into()))?;

        let profiles: Vec<ProfileRecord> = documents
            .iter()
            .filter_map(|doc| match serde_json::from_value(doc.clone()) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!("skipping unparseable candidate profile: {}", e);
                    None
                }
            })
            .collect();

        tracing::debug!(
            "directory returned {} candidates ({} documents)",
            profiles.len(),
            documents.len()
        );

        Ok(profiles)
    }

    /// Post a trust-score adjustment for a behavioral event. Best-effort on
    /// the calling side; the directory owns the bookkeeping.
    pub async fn adjust_trust_score(
        &self,
        user_id: Uuid,
        action: &str,
    ) -> Result<(), DirectoryError> {
        let url = self.url(&format!("/internal/trust/{}/adjust", user_id));

        let response = self
            .client
            .post(&url)
            .header("X-Service-Key", &self.api_key)
            .json(&serde_json::json!({ "action": action }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DirectoryError::Api(format!(
                "failed to adjust trust score: {}",
                response.status()
            )));
        }

        tracing::debug!("trust adjustment {} for {}", action, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn profile_json(id: Uuid) -> serde_json::Value {
        serde_json::json!({
            "user_id": id,
            "display_name": "Mei",
            "age": 28,
            "gender": "female",
            "interests": ["hiking"],
            "latitude": 25.03,
            "longitude": 121.56,
            "trust_score": 72
        })
    }

    #[tokio::test]
    async fn test_get_profile() {
        let mut server = mockito::Server::new_async().await;
        let id = Uuid::from_u128(42);

        let mock = server
            .mock("GET", format!("/internal/profiles/{}", id).as_str())
            .match_header("X-Service-Key", "secret")
            .with_status(200)
            .with_body(profile_json(id).to_string())
            .create_async()
            .await;

        let client = DirectoryClient::new(server.url(), "secret".to_string(), Some(5));
        let profile = client.get_profile(id).await.unwrap();

        assert_eq!(profile.user_id, id);
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.trust_score, 72);
        // Omitted flags default to true
        assert!(profile.is_active);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let mut server = mockito::Server::new_async().await;
        let id = Uuid::from_u128(42);

        server
            .mock("GET", format!("/internal/profiles/{}", id).as_str())
            .with_status(404)
            .create_async()
            .await;

        let client = DirectoryClient::new(server.url(), "secret".to_string(), Some(5));
        let result = client.get_profile(id).await;

        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_candidates_within_skips_bad_documents() {
        let mut server = mockito::Server::new_async().await;

        let body = serde_json::json!({
            "profiles": [
                profile_json(Uuid::from_u128(1)),
                {"garbage": true},
                profile_json(Uuid::from_u128(2)),
            ]
        });

        server
            .mock("GET", mockito::Matcher::Regex("/internal/profiles/nearby.*".to_string()))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = DirectoryClient::new(server.url(), "secret".to_string(), Some(5));
        let profiles = client
            .candidates_within(25.03, 121.56, 50.0, 60)
            .await
            .unwrap();

        assert_eq!(profiles.len(), 2);
    }

    #[tokio::test]
    async fn test_adjust_trust_score_error_status() {
        let mut server = mockito::Server::new_async().await;
        let id = Uuid::from_u128(9);

        server
            .mock("POST", format!("/internal/trust/{}/adjust", id).as_str())
            .with_status(500)
            .create_async()
            .await;

        let client = DirectoryClient::new(server.url(), "secret".to_string(), Some(5));
        let result = client.adjust_trust_score(id, "received_like").await;

        assert!(matches!(result, Err(DirectoryError::Api(_))));
    }
}
