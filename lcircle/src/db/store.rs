//! Credential store: the persistence boundary for user records.
//!
//! The rest of the application only ever talks to [`CredentialStore`], so
//! handlers and guards can be exercised against an in-memory implementation
//! in tests while production runs against PostgreSQL.

use crate::db::{
    errors::Result,
    models::{UserCreateRequest, UserFilter, UserRecord, UserUpdateRequest},
};
use crate::types::{abbrev_uuid, UserId};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Persistence operations needed by the authentication core.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// Create a user. A unique-violation on email surfaces as
    /// `DbError::UniqueViolation`, which the API layer maps to 409.
    async fn create(&self, request: &UserCreateRequest) -> Result<UserRecord>;

    /// Partially update a user; `None` fields are preserved.
    async fn update(&self, id: UserId, request: &UserUpdateRequest) -> Result<UserRecord>;

    /// List users, newest first.
    async fn list(&self, filter: &UserFilter) -> Result<Vec<UserRecord>>;

    /// Whether any admin account exists (bootstrap guard; racy by design,
    /// see DESIGN.md).
    async fn admin_exists(&self) -> Result<bool>;

    /// Record a successful login. At-most-once: callers treat failures here
    /// as non-fatal.
    async fn touch_last_login(&self, id: UserId) -> Result<()>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}

/// PostgreSQL-backed credential store.
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&self, request: &UserCreateRequest) -> Result<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, role, phone, timezone, profile_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'Asia/Kolkata'), $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.role)
        .bind(&request.phone)
        .bind(&request.timezone)
        .bind(&request.profile_data)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, id: UserId, request: &UserUpdateRequest) -> Result<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                timezone = COALESCE($5, timezone),
                profile_data = COALESCE($6, profile_data),
                password_hash = COALESCE($7, password_hash),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.phone)
        .bind(&request.timezone)
        .bind(&request.profile_data)
        .bind(&request.password_hash)
        .bind(request.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    #[instrument(skip(self), err)]
    async fn admin_exists(&self) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn touch_last_login(&self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
