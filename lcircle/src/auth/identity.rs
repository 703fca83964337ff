//! Request-scoped authenticated identity.
//!
//! [`AuthenticatedUser`] is the extractor protected handlers take as an
//! argument: it parses the bearer credential, verifies it, reloads the
//! backing user from the store and rejects with one of the stable reason
//! codes on any failure. [`MaybeUser`] is the optional variant for endpoints
//! that merely behave differently for anonymous callers.
//!
//! The user record is fetched fresh on every request rather than trusted
//! from the claims, so deactivating an account takes effect on the very next
//! request that presents an otherwise-valid token.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, trace};

use crate::{
    api::models::users::Role,
    auth::token::{self, TokenClaims, TokenError},
    db::models::UserRecord,
    errors::{AuthCode, Error, Result},
    types::UserId,
    AppState,
};

/// Identity attached to a request after successful authentication.
///
/// Holds a reference to the freshly loaded record, not just the claims:
/// downstream handlers need live state such as `is_active` and the current
/// profile fields.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub user: UserRecord,
}

/// Injectable revocation check consulted by the authenticator after
/// signature verification. The shipped default never revokes anything
/// (expiry is the only invalidation mechanism); deployments needing true
/// logout-before-expiry plug in a real denylist here.
#[async_trait::async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn is_revoked(&self, claims: &TokenClaims) -> bool;
}

/// The default allow-all denylist.
pub struct NoDenylist;

#[async_trait::async_trait]
impl TokenDenylist for NoDenylist {
    async fn is_revoked(&self, _claims: &TokenClaims) -> bool {
        false
    }
}

/// Pull the bearer token out of the Authorization header: split on the
/// first space, the second segment is the token.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    let mut segments = value.splitn(2, ' ');
    let _scheme = segments.next();
    segments.next().filter(|t| !t.is_empty())
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthenticatedUser> {
    let token = bearer_token(parts).ok_or_else(|| Error::unauthenticated(AuthCode::NoToken, "Access token required"))?;

    let claims = token::verify_token(token, state.config.secret_key()).map_err(|e| match e {
        TokenError::Expired => Error::unauthenticated(AuthCode::TokenExpired, "Token expired"),
        TokenError::Malformed | TokenError::SignatureInvalid => {
            Error::unauthenticated(AuthCode::InvalidToken, "Invalid token")
        }
    })?;

    if state.denylist.is_revoked(&claims).await {
        trace!("Token for user {} is revoked", claims.sub);
        return Err(Error::unauthenticated(AuthCode::InvalidToken, "Invalid token"));
    }

    // Check the user still exists and is active
    let user = state
        .store
        .find_by_id(claims.sub)
        .await
        .map_err(Error::AuthLookupFailed)?;

    match user {
        Some(user) if user.is_active => {
            debug!("Authenticated user {}", user.id);
            Ok(AuthenticatedUser {
                user_id: user.id,
                email: claims.email,
                role: claims.role,
                user,
            })
        }
        _ => Err(Error::unauthenticated(
            AuthCode::InvalidUser,
            "Invalid token - user not found or inactive",
        )),
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authenticate(parts, state).await
    }
}

/// Optional authentication: never rejects. Any failure, from a missing
/// header to a deactivated user, collapses to `MaybeUser(None)`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(parts, state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::issue_token;
    use crate::db::models::UserUpdateRequest;
    use crate::test_utils::{test_state, test_user};
    use axum::http::Request;
    use std::time::Duration;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("http://localhost/test");
        if let Some(v) = value {
            builder = builder.header("authorization", v);
        }
        let (parts, _body) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_no_header_is_no_token() {
        let state = test_state().await;
        let mut parts = parts_with_auth(None);

        let err = AuthenticatedUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::NoToken));
    }

    #[tokio::test]
    async fn test_bare_scheme_is_no_token() {
        let state = test_state().await;
        let mut parts = parts_with_auth(Some("Bearer"));

        let err = AuthenticatedUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::NoToken));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid_token() {
        let state = test_state().await;
        let mut parts = parts_with_auth(Some("Bearer not.a.real.token"));

        let err = AuthenticatedUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::InvalidToken));
    }

    #[tokio::test]
    async fn test_valid_token_resolves_identity() {
        let state = test_state().await;
        let user = test_user(&state, Role::Student, "student@example.com").await;
        let token = issue_token(&user, state.config.secret_key(), Duration::from_secs(3600)).unwrap();

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let identity = AuthenticatedUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.role, Role::Student);
        assert!(identity.user.is_active);
    }

    #[tokio::test]
    async fn test_deactivated_user_fails_on_next_request() {
        let state = test_state().await;
        let user = test_user(&state, Role::Student, "gone@example.com").await;
        let token = issue_token(&user, state.config.secret_key(), Duration::from_secs(3600)).unwrap();

        // Token was valid; deactivate the account behind it
        state
            .store
            .update(
                user.id,
                &UserUpdateRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let err = AuthenticatedUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::InvalidUser));
    }

    #[tokio::test]
    async fn test_maybe_user_never_rejects() {
        let state = test_state().await;

        let mut parts = parts_with_auth(None);
        let MaybeUser(identity) = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(identity.is_none());

        let mut parts = parts_with_auth(Some("Bearer garbage"));
        let MaybeUser(identity) = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(identity.is_none());
    }
}
