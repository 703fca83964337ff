//! Identity issuance flows: login, registration, admin bootstrap, session
//! introspection.

use axum::{extract::State, http::StatusCode};
use serde_json::json;

use crate::{
    api::extract::Json,
    api::models::{
        auth::{
            is_valid_email, normalize_email, AuthResponse, CheckResponse, CreateAdminRequest, LoginRequest, LogoutResponse,
            RefreshResponse, RegisterRequest, UserSummary,
        },
        users::{Role, SecureProfile},
    },
    auth::{
        identity::{AuthenticatedUser, MaybeUser},
        password::{self, Argon2Params},
        token,
    },
    db::models::UserCreateRequest,
    errors::{AuthCode, Error},
    AppState,
};

/// Hash a password off the async runtime.
async fn hash_password_blocking(password: String, params: Argon2Params) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Verify a password off the async runtime.
async fn verify_password_blocking(password: String, digest: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &digest))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })
}

fn require_fields(fields: &[(&str, &str)]) -> Result<(), Error> {
    let missing: Vec<&str> = fields.iter().filter(|(_, v)| v.trim().is_empty()).map(|(name, _)| *name).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::BadRequest {
            message: format!("Missing required fields: {}", missing.join(", ")),
        })
    }
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<AuthResponse>, Error> {
    require_fields(&[("email", &request.email), ("password", &request.password)])?;

    let email = normalize_email(&request.email);
    let user = state.store.find_by_email(&email).await.map_err(Error::from)?;

    // Unknown email, wrong password and deactivated account all produce the
    // same 401 so the response does not disclose which accounts exist.
    let user = user.ok_or(Error::InvalidCredentials)?;
    if !user.is_active {
        return Err(Error::InvalidCredentials);
    }

    let verified = verify_password_blocking(request.password, user.password_hash.clone()).await?;
    if !verified {
        return Err(Error::InvalidCredentials);
    }

    // Best effort: a failed timestamp write must not fail the login
    if let Err(e) = state.store.touch_last_login(user.id).await {
        tracing::warn!("Failed to record last_login for {}: {e}", user.id);
    }

    let token = token::issue_token(&user, state.config.secret_key(), state.config.auth.token_expiry)?;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: SecureProfile::privileged(&user),
        redirect: user.role.redirect_path().to_string(),
    }))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Requested role requires an admin caller"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    require_fields(&[
        ("email", &request.email),
        ("password", &request.password),
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
    ])?;

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        });
    }

    let password_config = &state.config.auth.password;
    if request.password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if request.password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    // Anonymous callers only ever get student; privileged roles require an
    // authenticated admin.
    let role = request.role.unwrap_or(Role::Student);
    let caller_is_admin = caller.as_ref().is_some_and(|c| c.role == Role::Admin);
    if matches!(role, Role::Admin | Role::Tutor) && !caller_is_admin {
        return Err(Error::forbidden(
            AuthCode::InsufficientRole,
            format!("Only an admin may create {role} accounts"),
        ));
    }

    let password_hash = hash_password_blocking(request.password, password_config.argon2_params()).await?;

    let profile_data = match &caller {
        Some(caller) => json!({ "created_by": caller.user_id }),
        None => json!({}),
    };

    // Duplicate emails surface as a unique violation, mapped to 409
    let user = state
        .store
        .create(&UserCreateRequest {
            email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            role,
            phone: request.phone,
            timezone: request.timezone,
            profile_data,
        })
        .await?;

    let token = token::issue_token(&user, state.config.secret_key(), state.config.auth.token_expiry)?;
    tracing::info!("Registered {} account {}", user.role, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "Account created successfully".to_string(),
            token,
            user: SecureProfile::privileged(&user),
            redirect: user.role.redirect_path().to_string(),
        }),
    ))
}

/// Bootstrap the first admin account
#[utoipa::path(
    post,
    path = "/api/auth/create-admin",
    request_body = CreateAdminRequest,
    tag = "auth",
    responses(
        (status = 201, description = "Admin created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "An admin already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_admin(
    State(state): State<AppState>,
    Json(request): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    require_fields(&[
        ("email", &request.email),
        ("password", &request.password),
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
    ])?;

    // Flow-level check only; a concurrent duplicate is acceptable for a
    // one-time bootstrap endpoint.
    if state.store.admin_exists().await.map_err(Error::from)? {
        return Err(Error::Conflict {
            message: "Admin user already exists".to_string(),
        });
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        });
    }

    let password_config = &state.config.auth.password;
    if request.password.len() < password_config.admin_min_length {
        return Err(Error::BadRequest {
            message: format!("Admin password must be at least {} characters", password_config.admin_min_length),
        });
    }

    let password_hash = hash_password_blocking(request.password, password_config.argon2_params()).await?;

    let user = state
        .store
        .create(&UserCreateRequest {
            email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            role: Role::Admin,
            phone: request.phone,
            timezone: None,
            profile_data: json!({ "founder": true }),
        })
        .await?;

    let token = token::issue_token(&user, state.config.secret_key(), state.config.auth.token_expiry)?;
    tracing::info!("Bootstrap admin {} created", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "Admin account created successfully".to_string(),
            token,
            user: SecureProfile::privileged(&user),
            redirect: Role::Admin.redirect_path().to_string(),
        }),
    ))
}

/// Current user's own profile
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = SecureProfile),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn profile(identity: AuthenticatedUser) -> Json<SecureProfile> {
    // The extractor already reloaded the record this request
    Json(SecureProfile::privileged(&identity.user))
}

/// Exchange a valid token for a fresh one
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "New token issued", body = RefreshResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn refresh(State(state): State<AppState>, identity: AuthenticatedUser) -> Result<Json<RefreshResponse>, Error> {
    let token = token::issue_token(&identity.user, state.config.secret_key(), state.config.auth.token_expiry)?;

    Ok(Json(RefreshResponse {
        success: true,
        token,
        user: SecureProfile::privileged(&identity.user),
    }))
}

/// Acknowledge logout
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client discards its copy. Deployments that plug in a real denylist can
/// hook revocation here.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn logout(identity: AuthenticatedUser) -> Json<LogoutResponse> {
    tracing::info!("User {} logged out", identity.user_id);
    Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

/// Check whether the presented token still resolves to an active user
#[utoipa::path(
    get,
    path = "/api/auth/check",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session is valid", body = CheckResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn check(identity: AuthenticatedUser) -> Json<CheckResponse> {
    Json(CheckResponse {
        authenticated: true,
        user: UserSummary {
            id: identity.user_id,
            email: identity.email,
            role: identity.role,
        },
    })
}
