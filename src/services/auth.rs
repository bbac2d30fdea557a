use actix_web::{dev::Payload, FromRequest, HttpRequest};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::future::{ready, Ready};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,

    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("wrong token type")]
    WrongType,
}

impl actix_web::ResponseError for AuthError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::Unauthorized().json(ErrorResponse {
            error: "unauthorized".to_string(),
            message: self.to_string(),
            status_code: 401,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
    #[serde(rename = "type")]
    token_type: String,
}

/// Verifies access tokens issued by the external auth service.
///
/// Token issuance, refresh and revocation live in that service; this core
/// only checks the signature, the expiry and that the credential is an
/// access token (not a refresh token).
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and return the authenticated user id.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            },
        )?;

        if data.claims.token_type != "access" {
            return Err(AuthError::WrongType);
        }

        data.claims.sub.parse().map_err(|_| AuthError::Invalid)
    }
}

/// Extractor for the authenticated caller on REST routes.
///
/// Reads `Authorization: Bearer <token>` and resolves it through the
/// [`TokenVerifier`] registered as app data.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub Uuid);

impl FromRequest for AuthedUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = (|| {
            let verifier = req
                .app_data::<actix_web::web::Data<TokenVerifier>>()
                .ok_or(AuthError::Invalid)?;

            let header = req
                .headers()
                .get(actix_web::http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .ok_or(AuthError::Missing)?;

            let token = header.strip_prefix("Bearer ").ok_or(AuthError::Missing)?;

            verifier.verify(token).map(AuthedUser)
        })();

        ready(result)
    }
}
