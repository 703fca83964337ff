//! Test utilities (available with the `test-utils` feature).
//!
//! The centerpiece is [`MemoryStore`], an in-process [`CredentialStore`]
//! that lets the whole authentication stack run in tests without a
//! database.

use std::collections::HashMap;
use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    api::models::users::Role,
    auth::{password, token},
    config::Config,
    db::{
        errors::{DbError, Result as DbResult},
        models::{UserCreateRequest, UserFilter, UserRecord, UserUpdateRequest},
        store::CredentialStore,
    },
    types::UserId,
    AppState,
};

/// Password used for every account created through [`test_user`].
pub const TEST_PASSWORD: &str = "password123";

/// In-memory credential store mirroring the PostgreSQL behavior the rest of
/// the code relies on: email uniqueness surfaces as a unique violation,
/// updates of missing rows surface as not-found.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> DbResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, request: &UserCreateRequest) -> DbResult<UserRecord> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == request.email) {
            return Err(DbError::UniqueViolation {
                constraint: Some("users_email_key".to_string()),
                table: Some("users".to_string()),
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            role: request.role,
            phone: request.phone.clone(),
            timezone: request.timezone.clone().unwrap_or_else(|| "Asia/Kolkata".to_string()),
            profile_data: request.profile_data.clone(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: UserId, request: &UserUpdateRequest) -> DbResult<UserRecord> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(DbError::NotFound)?;

        if let Some(first_name) = &request.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &request.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(phone) = &request.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(timezone) = &request.timezone {
            user.timezone = timezone.clone();
        }
        if let Some(profile_data) = &request.profile_data {
            user.profile_data = profile_data.clone();
        }
        if let Some(password_hash) = &request.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn list(&self, filter: &UserFilter) -> DbResult<Vec<UserRecord>> {
        // PostgreSQL rejects negative LIMIT/OFFSET, so an unclamped caller
        // is a bug; fail loudly instead of papering over it.
        if filter.skip < 0 || filter.limit < 0 {
            return Err(DbError::Other(anyhow::anyhow!(
                "negative skip/limit reached the store: skip={} limit={}",
                filter.skip,
                filter.limit
            )));
        }

        let users = self.users.read().await;
        let mut all: Vec<UserRecord> = users.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn admin_exists(&self) -> DbResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.role == Role::Admin))
    }

    async fn touch_last_login(&self, id: UserId) -> DbResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

/// A config with deterministic secrets and cheap argon2 parameters.
pub fn test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key-for-signing".to_string()),
        ..Config::default()
    };
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;
    config
}

/// App state backed by an empty [`MemoryStore`].
pub async fn test_state() -> AppState {
    AppState::builder()
        .store(Arc::new(MemoryStore::default()) as Arc<dyn CredentialStore>)
        .config(test_config())
        .build()
}

/// A test server over the full router, backed by an empty [`MemoryStore`].
pub async fn test_server() -> (TestServer, AppState) {
    let state = test_state().await;
    let router = crate::build_router(state.clone()).expect("router should build");
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, state)
}

/// Create an active user with [`TEST_PASSWORD`] directly in the store.
pub async fn test_user(state: &AppState, role: Role, email: &str) -> UserRecord {
    let params = state.config.auth.password.argon2_params();
    let password_hash = password::hash_password(TEST_PASSWORD, params).expect("hashing should succeed");

    state
        .store
        .create(&UserCreateRequest {
            email: email.to_string(),
            password_hash,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            phone: None,
            timezone: None,
            profile_data: json!({}),
        })
        .await
        .expect("user creation should succeed")
}

/// Mint a valid bearer token for a user against the test secret.
pub fn test_token(state: &AppState, user: &UserRecord) -> String {
    token::issue_token(user, state.config.secret_key(), state.config.auth.token_expiry).expect("token should sign")
}

/// `Authorization` header value for a user.
pub fn bearer(state: &AppState, user: &UserRecord) -> String {
    format!("Bearer {}", test_token(state, user))
}
