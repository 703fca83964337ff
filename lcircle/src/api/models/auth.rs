//! API request/response models for authentication flows.

use crate::api::models::users::{Role, SecureProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Required string fields default to empty when the key is absent, so a
// missing key and a present-but-empty value take the same 400 path through
// the flow's field validation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Defaults to student. Non-admin callers may not request admin.
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

/// Bootstrap payload for the very first admin account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: SecureProfile,
    /// Role-based landing page for the frontend router.
    pub redirect: String,
}

/// Short identity summary returned by the session check endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: crate::types::UserId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckResponse {
    pub authenticated: bool,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub success: bool,
    pub token: String,
    pub user: SecureProfile,
}

/// Lowercase and trim an email before lookup or storage so that the unique
/// index treats "Ann@Example.com " and "ann@example.com" as the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check; full deliverability validation is the mailer's job.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
