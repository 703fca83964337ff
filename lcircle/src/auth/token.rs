//! Signed credential issuance and verification.
//!
//! Tokens are compact HS256 JWTs carrying {user id, email, role} with a fixed
//! validity window. There is no server-side revocation state: expiry is the
//! only invalidation mechanism (see the denylist seam in
//! [`crate::auth::identity`] for the injectable exception).

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::{api::models::users::Role, db::models::UserRecord, errors::Error as AppError, types::UserId};

/// Claims embedded in a signed credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: UserId,
    pub email: String,
    /// Role at mint time. A server-side role change is not reflected until
    /// the next login/refresh; see DESIGN.md.
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

/// Verification failures, distinguished so the authenticator can emit
/// different diagnostic codes for each.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
}

/// Mint a signed credential for a user.
///
/// Fails only if signing itself fails; a missing secret is a startup-fatal
/// configuration error caught by `Config::validate`, never a per-request
/// condition.
pub fn issue_token(user: &UserRecord, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| AppError::Internal {
        operation: format!("sign token: {e}"),
    })
}

/// Verify and decode a signed credential. Pure function over (secret, input).
pub fn verify_token(token: &str, secret: &str) -> Result<TokenClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    // No clock leeway: an expired token must report Expired the moment the
    // validity window closes, not up to a minute later.
    validation.leeway = 0;

    let token_data = decode::<TokenClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,

        jsonwebtoken::errors::ErrorKind::InvalidSignature | jsonwebtoken::errors::ErrorKind::Crypto(_) => {
            TokenError::SignatureInvalid
        }

        // Everything else is a shape problem: bad base64, wrong segment
        // count, missing claims, unexpected algorithm, broken JSON.
        _ => TokenError::Malformed,
    })?;

    Ok(token_data.claims)
}
