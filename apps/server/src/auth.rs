//! Bearer-token authentication.
//!
//! Every `/api/v1` route runs behind [`auth_middleware`], which verifies an
//! HS256 token and stashes the caller's identity in request extensions.
//! Handlers pick it up through the [`CurrentUser`] extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's id.
    pub sub: Uuid,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// The authenticated caller, available to handlers behind the auth layer.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("Invalid authorization header".to_string()))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.auth.token_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "token rejected");
        Error::Unauthorized("Invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(CurrentUser {
        id: decoded.claims.sub,
    });
    Ok(next.run(request).await)
}

#[async_trait::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))
    }
}

/// Mint a token for `user_id`. The server itself never issues tokens in
/// normal operation; this backs the integration-test harness.
pub fn sign_token(secret: &str, user_id: Uuid, ttl: Duration) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| Error::Internal(format!("failed to sign token: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_tokens_verify_with_the_same_secret() {
        let user_id = Uuid::new_v4();
        let token = sign_token("test-secret", user_id, Duration::minutes(5)).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id);
    }

    #[test]
    fn expired_tokens_fail_verification() {
        let token = sign_token("test-secret", Uuid::new_v4(), Duration::minutes(-5)).unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
