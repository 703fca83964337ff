//! API request/response models for users.

use crate::db::models::UserRecord;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Platform role. A closed enum so guard and redirect logic can match
/// exhaustively instead of comparing strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Tutor,
    Student,
    Parent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Tutor => "tutor",
            Role::Student => "student",
            Role::Parent => "parent",
        };
        write!(f, "{s}")
    }
}

impl Role {
    /// Dashboard landing path for this role, returned to the frontend after
    /// login/registration so it can route the user to the right dashboard.
    pub fn redirect_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Tutor => "/tutor",
            Role::Student | Role::Parent => "/student",
        }
    }
}

/// Role-aware projection of a user record, recomputed per request.
///
/// Two variants exist: the privileged view (self or admin) carries full
/// contact details; the public view abbreviates the last name to an initial
/// and omits contact fields entirely.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SecureProfile {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub profile_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl SecureProfile {
    /// Full view, for the subject themselves or an admin.
    pub fn privileged(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_active: user.is_active,
            timezone: user.timezone.clone(),
            created_at: user.created_at,
            display_name: None,
            email: Some(user.email.clone()),
            phone: user.phone.clone(),
            profile_data: Some(user.profile_data.clone()),
            last_login: user.last_login,
        }
    }

    /// Contact-privacy view for everyone else: last name abbreviated to an
    /// initial, no email/phone/profile data.
    pub fn public(user: &UserRecord) -> Self {
        let abbreviated = user
            .last_name
            .chars()
            .next()
            .map(|c| format!("{c}."))
            .unwrap_or_default();
        let display_name = format!("{} {}", user.first_name, abbreviated);

        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: abbreviated,
            role: user.role,
            is_active: user.is_active,
            timezone: user.timezone.clone(),
            created_at: user.created_at,
            display_name: Some(display_name),
            email: None,
            phone: None,
            profile_data: None,
            last_login: None,
        }
    }

    /// Pick the variant a given viewer is entitled to.
    pub fn for_viewer(user: &UserRecord, viewer_id: UserId, viewer_role: Role) -> Self {
        if viewer_role == Role::Admin || viewer_id == user.id {
            Self::privileged(user)
        } else {
            Self::public(user)
        }
    }
}

/// Fields a user (or an admin on their behalf) may change on their profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

/// Default number of users returned per page.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum number of users that can be requested per page.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Query parameters for listing users.
///
/// The raw values are clamped through the accessors, so a negative or
/// oversized parameter never reaches the store.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// Number of records to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    pub skip: Option<i64>,
    /// Maximum records to return (default: 50, max: 100)
    #[param(default = 50, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

impl ListUsersQuery {
    /// The skip value, floored at 0.
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    /// The limit value, clamped between 1 and [`MAX_LIST_LIMIT`].
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}
