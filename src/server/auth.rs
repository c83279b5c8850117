//! Bearer token authentication
//!
//! Access and refresh tokens are HS256 JWTs signed with the configured
//! secret. The `kind` claim keeps one from being used as the other.

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::server::routes::ApiError;
use crate::server::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub kind: TokenKind,
    /// Unique token id so two pairs issued in the same second differ
    pub jti: String,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies tokens
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl_secs: i64::try_from(access_ttl_secs).unwrap_or(i64::MAX),
            refresh_ttl_secs: i64::try_from(refresh_ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Build from config; an empty secret gets a random per-process one
    pub fn from_config(config: &AuthConfig) -> Self {
        if config.jwt_secret.is_empty() {
            warn!("auth.jwt_secret is not set, tokens will not survive a restart");
            let secret = Uuid::new_v4().to_string();
            return Self::new(secret.as_bytes(), config.access_ttl_secs, config.refresh_ttl_secs);
        }
        Self::new(
            config.jwt_secret.as_bytes(),
            config.access_ttl_secs,
            config.refresh_ttl_secs,
        )
    }

    fn issue(&self, user_id: &str, kind: TokenKind) -> Result<String> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now.saturating_add(ttl),
            iat: now,
            kind,
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenKind::Access)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    /// Verify signature, expiry and kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| Error::Unauthorized(format!("invalid token: {}", e)))?;

        if data.claims.kind != expected {
            return Err(Error::Unauthorized("wrong token kind".to_string()));
        }
        Ok(data.claims)
    }

    /// Trade a refresh token for a new pair
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue_pair(&claims.sub)
    }
}

/// Authenticated user id, taken from a valid access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Unauthorized("missing bearer token".to_string()))?;

        let claims = state.tokens.verify(token, TokenKind::Access)?;
        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret", 900, 3600)
    }

    #[test]
    fn test_issue_and_verify() {
        let pair = issuer().issue_pair("user-1").unwrap();
        let claims = issuer().verify(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let pair = issuer().issue_pair("user-1").unwrap();
        assert!(matches!(
            issuer().verify(&pair.access_token, TokenKind::Refresh),
            Err(Error::Unauthorized(_))
        ));
        assert!(issuer().refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_refresh_issues_new_pair() {
        let pair = issuer().issue_pair("user-1").unwrap();
        let next = issuer().refresh(&pair.refresh_token).unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);
        let claims = issuer().verify(&next.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = issuer().issue_pair("user-1").unwrap();
        let other = TokenIssuer::new(b"other-secret", 900, 3600);
        assert!(other.verify(&pair.access_token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_expired_rejected() {
        // default validation allows 60s of leeway
        let expired = TokenIssuer {
            access_ttl_secs: -120,
            ..issuer()
        };
        let pair = expired.issue_pair("user-1").unwrap();
        assert!(issuer().verify(&pair.access_token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let issuer = TokenIssuer::new(b"test-secret", u64::MAX, u64::MAX);
        assert_eq!(issuer.access_ttl_secs, i64::MAX);

        let pair = issuer.issue_pair("user-1").unwrap();
        let claims = issuer.verify(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.exp, i64::MAX);
        assert!(issuer.refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(issuer().verify("not.a.jwt", TokenKind::Access).is_err());
    }
}
