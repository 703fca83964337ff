//! Access policy guards.
//!
//! A guard is a pure predicate over (identity, request-derived parameters):
//! no transport types, no I/O. Protected handlers invoke their guards in
//! sequence right after extraction and short-circuit on the first failure,
//! which keeps every policy unit-testable without a running server.

use crate::{
    api::models::users::Role,
    auth::identity::AuthenticatedUser,
    errors::{AuthCode, Error, Result},
    types::{BatchId, UserId},
};

/// Pass iff an identity is present and its role is in the allowed set.
///
/// A missing identity fails NO_AUTH, distinct from INSUFFICIENT_ROLE: the
/// first asks the client to authenticate, the second tells it no amount of
/// re-login with the same account will help.
pub fn require_role(identity: Option<&AuthenticatedUser>, allowed: &[Role]) -> Result<()> {
    let identity = identity.ok_or_else(|| Error::unauthenticated(AuthCode::NoAuth, "Authentication required"))?;

    if allowed.contains(&identity.role) {
        return Ok(());
    }

    let wanted = allowed.iter().map(Role::to_string).collect::<Vec<_>>().join(" or ");
    Err(Error::forbidden(
        AuthCode::InsufficientRole,
        format!("Access denied. Required role: {wanted}"),
    ))
}

/// Pass iff the caller is an admin or the target user is the caller itself.
///
/// The target id is resolved by the handler from path, then body, then query
/// parameters (first non-empty wins); an unresolvable target denies access
/// for non-admins rather than allowing it.
pub fn require_self_or_admin(identity: &AuthenticatedUser, target: Option<UserId>) -> Result<()> {
    if identity.role == Role::Admin {
        return Ok(());
    }

    if target == Some(identity.user_id) {
        return Ok(());
    }

    Err(Error::forbidden(
        AuthCode::AccessDenied,
        "Access denied - can only access your own data",
    ))
}

/// Resolve a target user id with the path > body > query precedence.
pub fn resolve_target_user(path: Option<UserId>, body: Option<UserId>, query: Option<UserId>) -> Option<UserId> {
    path.or(body).or(query)
}

/// Batch membership policy.
///
/// Enrollment records are not implemented yet, so the only shipped variant
/// is an explicit allow-all stand-in: a visible placeholder rather than
/// logic that silently passes. Swapping in a real enrollment check means
/// adding a variant here, not hunting for a buried TODO.
#[derive(Debug, Clone, Copy, Default)]
pub enum BatchAccessPolicy {
    /// Allow all recognized roles through (admin always passes regardless).
    #[default]
    AllowAll,
}

impl BatchAccessPolicy {
    pub fn check(&self, identity: &AuthenticatedUser, batch_id: Option<BatchId>) -> Result<()> {
        if batch_id.is_none() {
            return Err(Error::MissingResourceId {
                code: AuthCode::NoBatchId,
                message: "Batch ID required".to_string(),
            });
        }

        match (self, identity.role) {
            // Admin has access to all batches
            (_, Role::Admin) => Ok(()),
            (BatchAccessPolicy::AllowAll, Role::Tutor | Role::Student) => Ok(()),
            _ => Err(Error::forbidden(AuthCode::BatchAccessDenied, "Access denied to this batch")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserRecord;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn identity(role: Role) -> AuthenticatedUser {
        let id = Uuid::new_v4();
        AuthenticatedUser {
            user_id: id,
            email: "guard@example.com".to_string(),
            role,
            user: UserRecord {
                id,
                email: "guard@example.com".to_string(),
                password_hash: "$argon2id$irrelevant".to_string(),
                first_name: "Guard".to_string(),
                last_name: "Case".to_string(),
                role,
                phone: None,
                timezone: "Asia/Kolkata".to_string(),
                profile_data: json!({}),
                is_active: true,
                last_login: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_require_role_passes_on_membership() {
        let tutor = identity(Role::Tutor);
        assert!(require_role(Some(&tutor), &[Role::Tutor, Role::Admin]).is_ok());
    }

    #[test]
    fn test_require_role_mismatch_is_insufficient_role() {
        let student = identity(Role::Student);
        let err = require_role(Some(&student), &[Role::Tutor, Role::Admin]).unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::InsufficientRole));
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(err.user_message().contains("tutor or admin"));
    }

    #[test]
    fn test_require_role_without_identity_is_no_auth() {
        let err = require_role(None, &[Role::Admin]).unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::NoAuth));
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_self_or_admin() {
        let student = identity(Role::Student);

        // Own data passes
        assert!(require_self_or_admin(&student, Some(student.user_id)).is_ok());

        // Someone else's data fails ACCESS_DENIED
        let err = require_self_or_admin(&student, Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::AccessDenied));

        // Missing target denies rather than allows
        let err = require_self_or_admin(&student, None).unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::AccessDenied));

        // Admin passes for any target
        let admin = identity(Role::Admin);
        assert!(require_self_or_admin(&admin, Some(Uuid::new_v4())).is_ok());
        assert!(require_self_or_admin(&admin, None).is_ok());
    }

    #[test]
    fn test_target_resolution_precedence() {
        let (p, b, q) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(resolve_target_user(Some(p), Some(b), Some(q)), Some(p));
        assert_eq!(resolve_target_user(None, Some(b), Some(q)), Some(b));
        assert_eq!(resolve_target_user(None, None, Some(q)), Some(q));
        assert_eq!(resolve_target_user(None, None, None), None);
    }

    #[test]
    fn test_batch_policy_requires_an_id() {
        let admin = identity(Role::Admin);
        let err = BatchAccessPolicy::AllowAll.check(&admin, None).unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::NoBatchId));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_batch_policy_role_outcomes() {
        let policy = BatchAccessPolicy::AllowAll;
        let batch = Some(Uuid::new_v4());

        assert!(policy.check(&identity(Role::Admin), batch).is_ok());
        assert!(policy.check(&identity(Role::Tutor), batch).is_ok());
        assert!(policy.check(&identity(Role::Student), batch).is_ok());

        // Roles outside the recognized set are denied
        let err = policy.check(&identity(Role::Parent), batch).unwrap_err();
        assert_eq!(err.auth_code(), Some(AuthCode::BatchAccessDenied));
    }
}
