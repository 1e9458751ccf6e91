//! Signed access and refresh tokens (HS256 JWT).
//!
//! Both kinds carry only the user ID as `sub`; the role is looked up on each
//! request that needs it. The `typ` claim keeps a refresh token from being
//! accepted where an access token is required and vice versa.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use marketplace_core::UserId;

use crate::config::JwtConfig;

/// Errors produced while issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's `exp` is in the past.
    #[error("token has expired")]
    Expired,

    /// Malformed token, bad signature or unusable claims.
    #[error("invalid token")]
    Invalid,

    /// A refresh token was presented as an access token or vice versa.
    #[error("expected {expected} token")]
    WrongType {
        /// The kind the endpoint requires.
        expected: TokenKind,
    },

    /// Signing failed.
    #[error("token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        })
    }
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    typ: TokenKind,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl TokenIssuer {
    /// Build an issuer from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl_secs: i64::try_from(config.access_ttl.as_secs()).unwrap_or(i64::MAX),
            refresh_ttl_secs: i64::try_from(config.refresh_ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token of the given kind for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue(&self, user_id: UserId, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };
        self.sign(&claims)
    }

    /// Issue an access token and a refresh token for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenKind::Access)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    /// Verify a token and return the user it identifies.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::Invalid`, or
    /// `TokenError::WrongType` when `typ` is not `expected`.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<UserId, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.typ != expected {
            return Err(TokenError::WrongType { expected });
        }

        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenError::Invalid)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Encoding)
    }
}
