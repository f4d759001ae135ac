//! JWT authentication module.
//!
//! The API only verifies bearer tokens. Tokens are HS256 with a shared
//! secret; `dev-token` mints them for local use.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! extract_bearer_token() ──► JwtManager::verify() ──► Claims
//!        │                                              │
//!        ▼                                              ▼
//!  AuthError → 401                        AuthenticatedEmployee { employee_id, store_id }
//! ```

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (employee id, as a string)
    pub sub: String,

    /// Store the employee works at, if the token is bound to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Why a bearer token was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token subject is not an employee id: '{0}'")]
    InvalidSubject(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager").finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Create a new JWT manager for an HS256 shared secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs a token for `employee_id`, valid for `lifetime_secs`.
    pub fn generate(
        &self,
        employee_id: i64,
        store_id: Option<i64>,
        lifetime_secs: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = Claims {
            sub: employee_id.to_string(),
            store_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Some(Uuid::new_v4().to_string()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validate and decode a token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    /// Verifies `token` and resolves the employee it was issued to.
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedEmployee, AuthError> {
        let claims = self.verify(token)?;
        let employee_id = claims
            .sub
            .trim()
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidSubject(claims.sub.clone()))?;

        Ok(AuthenticatedEmployee {
            employee_id,
            store_id: claims.store_id,
        })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// The employee behind a verified bearer token, scoped to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedEmployee {
    pub employee_id: i64,
    pub store_id: Option<i64>,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedEmployee {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let result = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)
            .and_then(|value| value.to_str().map_err(|_| AuthError::MalformedHeader))
            .and_then(|value| extract_bearer_token(value).ok_or(AuthError::MalformedHeader))
            .and_then(|token| state.jwt.authenticate(token));

        result.map_err(|e| {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                reason = %e,
                "Rejected request"
            );
            ApiError::from(e)
        })
    }
}
