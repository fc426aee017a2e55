use crate::error::JambleError;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Session token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens carrying a user id.
#[derive(Clone)]
pub struct TokenIssuer {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
                ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            }),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.inner.ttl_secs
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, JambleError> {
        self.issue_at(user_id, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<String, JambleError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat.saturating_add(self.inner.ttl_secs),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )?)
    }

    /// Return the user id in a valid token, or 401.
    pub fn verify(&self, token: &str) -> Result<UserId, JambleError> {
        let data = decode::<Claims>(token, &self.inner.decoding, &self.inner.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                JambleError::Unauthorized("Invalid or expired token".to_string())
            })?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| JambleError::Unauthorized("Invalid token subject".to_string()))
    }
}
