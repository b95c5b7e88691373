//! Identity boundary: HS256 bearer tokens become [`SessionIdentity`] values.
//!
//! This is the only place raw gender claims are read. `sexo` wins over
//! `genero` when both are present.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;

use crate::core::gender::GenderBucket;
use crate::core::identity::{Role, SessionIdentity};
use crate::util::serde::UserId;

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer credential was presented.
    #[error("missing bearer token")]
    MissingToken,
    /// Signature, expiry or structure check failed.
    #[error("invalid token")]
    InvalidToken,
    /// The token verified but carries no usable user id.
    #[error("token has no user id")]
    MissingUserId,
}

/// Verifies identity tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Verifier for HS256 tokens signed with `secret`.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.leeway = 30;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify `token` and extract the session identity.
    pub fn verify(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        let claims = decode::<Value>(token, &self.key, &self.validation)
            .map(|t| t.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })?;
        identity_from_claims(&claims)
    }
}

/// Map verified claims onto a session identity.
pub fn identity_from_claims(claims: &Value) -> Result<SessionIdentity, AuthError> {
    let Some(obj) = claims.as_object() else {
        return Err(AuthError::InvalidToken);
    };
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::trim);

    let user_id = text("id")
        .or_else(|| text("sub"))
        .filter(|id| !id.is_empty())
        .ok_or(AuthError::MissingUserId)?
        .parse::<UserId>()
        .map_err(|_| AuthError::MissingUserId)?;

    let gender = text("sexo")
        .or_else(|| text("genero"))
        .and_then(GenderBucket::classify);
    let role = text("rol").and_then(|raw| raw.parse::<Role>().ok());
    let name = text("nombre").filter(|n| !n.is_empty()).map(str::to_string);

    Ok(SessionIdentity {
        user_id,
        role,
        name,
        gender,
    })
}

/// Token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
