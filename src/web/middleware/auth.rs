//! JWT authentication middleware.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::web::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username.
    pub username: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

impl JwtClaims {
    /// Claims for a token issued now and valid for `ttl_secs`.
    pub fn new(user_id: i64, username: &str, ttl_secs: u64) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        Self {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + ttl_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Keys and validation settings for access tokens.
#[derive(Clone)]
pub struct JwtState {
    /// Encoding key for issuing tokens.
    pub encoding_key: EncodingKey,
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign claims into an HS256 token.
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, ApiError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Decode and validate a token.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, ApiError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Pull `token=` out of a query string.
fn token_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn verify_token(parts: &Parts, token: &str) -> Result<JwtClaims, ApiError> {
    let jwt_state = parts
        .extensions
        .get::<Arc<JwtState>>()
        .ok_or_else(|| ApiError::internal("JWT state not configured"))?;
    jwt_state.verify(token)
}

/// Extractor for authenticated users.
///
/// Only `Authorization: Bearer <jwt>` is accepted.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;
        Ok(AuthUser(verify_token(parts, token)?))
    }
}

/// Authenticated user for links a browser opens directly.
///
/// Like [`AuthUser`], but falls back to a `?token=` query parameter. Only
/// the download and preview routes use it.
#[derive(Debug, Clone)]
pub struct LinkAuthUser(pub JwtClaims);

#[async_trait]
impl<S> FromRequestParts<S> for LinkAuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Some(t) => t.to_string(),
            None => parts
                .uri
                .query()
                .and_then(token_from_query)
                .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?,
        };
        Ok(LinkAuthUser(verify_token(parts, &token)?))
    }
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat_offset: i64, exp_offset: i64) -> JwtClaims {
        let now = chrono::Utc::now().timestamp();
        JwtClaims {
            sub: 1,
            username: "testuser".to_string(),
            iat: (now + iat_offset) as u64,
            exp: (now + exp_offset) as u64,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_jwt_state_new() {
        let state = JwtState::new("test-secret");
        assert!(state.validation.validate_exp);
    }

    #[test]
    fn test_issue_and_verify() {
        let state = JwtState::new("test-secret");

        let token = state.issue(&JwtClaims::new(7, "alice", 900)).unwrap();
        let decoded = state.verify(&token).unwrap();

        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.exp - decoded.iat, 900);
    }

    #[test]
    fn test_unique_jti() {
        let a = JwtClaims::new(1, "alice", 60);
        let b = JwtClaims::new(1, "alice", 60);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token() {
        let state = JwtState::new("test-secret");
        // Expired 1 hour ago
        let token = state.issue(&claims(-7200, -3600)).unwrap();
        assert!(state.verify(&token).is_err());
    }

    #[test]
    fn test_invalid_secret() {
        let token = JwtState::new("secret1").issue(&claims(0, 3600)).unwrap();
        assert!(JwtState::new("secret2").verify(&token).is_err());
    }

    #[test]
    fn test_token_from_query() {
        assert_eq!(token_from_query("token=abc"), Some("abc".to_string()));
        assert_eq!(
            token_from_query("x=1&token=a%2Eb"),
            Some("a.b".to_string())
        );
        assert_eq!(token_from_query("tokens=abc"), None);
        assert_eq!(token_from_query(""), None);
    }
}
