//! User directory endpoints.

use axum::extract::{Path, Query, State};

use crate::{
    api::extract::Json,
    api::models::users::{ListUsersQuery, Role, SecureProfile, UserUpdate},
    auth::{guards, identity::AuthenticatedUser},
    db::models::{UserFilter, UserUpdateRequest},
    errors::Error,
    types::UserId,
    AppState,
};
use uuid::Uuid;

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    params(ListUsersQuery),
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users, privileged view", body = Vec<SecureProfile>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_users(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<SecureProfile>>, Error> {
    guards::require_role(Some(&identity), &[Role::Admin])?;

    let users = state.store.list(&UserFilter::new(query.skip(), query.limit())).await?;
    let profiles = users.iter().map(SecureProfile::privileged).collect();
    Ok(Json(profiles))
}

/// Fetch one user
///
/// Everyone may look anyone up; the projection depends on who is asking.
/// Self and admins get the full record, everyone else the public view.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User to fetch")),
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile view for the caller", body = SecureProfile),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such user"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn get_user(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<SecureProfile>, Error> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
        })?;

    Ok(Json(SecureProfile::for_viewer(&user, identity.user_id, identity.role)))
}

/// Update profile fields (self or admin)
#[utoipa::path(
    patch,
    path = "/api/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User to update")),
    request_body = UserUpdate,
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated profile", body = SecureProfile),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not self and not admin"),
        (status = 404, description = "No such user"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn update_user(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(user_id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<SecureProfile>, Error> {
    guards::require_self_or_admin(&identity, guards::resolve_target_user(Some(user_id), None, None))?;

    let updated = state
        .store
        .update(
            user_id,
            &UserUpdateRequest {
                first_name: update.first_name,
                last_name: update.last_name,
                phone: update.phone,
                timezone: update.timezone,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(SecureProfile::privileged(&updated)))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{bearer, test_server, test_user};
    use crate::api::models::users::Role;
    use axum::http::StatusCode;
    use serde_json::Value;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_list_users_is_admin_only() {
        let (server, state) = test_server().await;
        let admin = test_user(&state, Role::Admin, "admin@example.com").await;
        let student = test_user(&state, Role::Student, "student@example.com").await;

        let response = server.get("/api/users").add_header("authorization", bearer(&state, &admin)).await;
        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 2);
        // Admin listing is the privileged view
        assert!(body.iter().all(|u| u.get("email").is_some()));

        let response = server
            .get("/api/users")
            .add_header("authorization", bearer(&state, &student))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "INSUFFICIENT_ROLE");

        let response = server.get("/api/users").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_users_pagination() {
        let (server, state) = test_server().await;
        let admin = test_user(&state, Role::Admin, "admin@example.com").await;
        for i in 0..5 {
            test_user(&state, Role::Student, &format!("s{i}@example.com")).await;
        }

        let response = server
            .get("/api/users")
            .add_query_param("skip", "2")
            .add_query_param("limit", "3")
            .add_header("authorization", bearer(&state, &admin))
            .await;
        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 3);
    }

    #[tokio::test]
    async fn test_list_users_clamps_hostile_pagination() {
        let (server, state) = test_server().await;
        let admin = test_user(&state, Role::Admin, "admin@example.com").await;
        test_user(&state, Role::Student, "student@example.com").await;

        // Negative limit is clamped to 1, not handed to the store
        let response = server
            .get("/api/users")
            .add_query_param("limit", "-1")
            .add_header("authorization", bearer(&state, &admin))
            .await;
        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 1);

        // Negative skip and an oversized limit behave like the defaults
        let response = server
            .get("/api/users")
            .add_query_param("skip", "-5")
            .add_query_param("limit", "100000")
            .add_header("authorization", bearer(&state, &admin))
            .await;
        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 2);
    }

    #[tokio::test]
    async fn test_get_user_view_depends_on_viewer() {
        let (server, state) = test_server().await;
        let ann = test_user(&state, Role::Student, "ann@example.com").await;
        let other = test_user(&state, Role::Student, "other@example.com").await;
        let admin = test_user(&state, Role::Admin, "admin@example.com").await;

        // Self: full view
        let response = server
            .get(&format!("/api/users/{}", ann.id))
            .add_header("authorization", bearer(&state, &ann))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "ann@example.com");
        assert_eq!(body["last_name"], "User");

        // Admin: full view of anyone
        let response = server
            .get(&format!("/api/users/{}", ann.id))
            .add_header("authorization", bearer(&state, &admin))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "ann@example.com");

        // Unrelated student: public view, contact fields stripped
        let response = server
            .get(&format!("/api/users/{}", ann.id))
            .add_header("authorization", bearer(&state, &other))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body.get("email").is_none() || body["email"].is_null());
        assert_eq!(body["last_name"], "U.");
    }

    #[tokio::test]
    async fn test_get_missing_user_is_404() {
        let (server, state) = test_server().await;
        let user = test_user(&state, Role::Student, "someone@example.com").await;

        let response = server
            .get(&format!("/api/users/{}", Uuid::new_v4()))
            .add_header("authorization", bearer(&state, &user))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_user_self_or_admin() {
        let (server, state) = test_server().await;
        let ann = test_user(&state, Role::Student, "ann@example.com").await;
        let other = test_user(&state, Role::Student, "other@example.com").await;
        let admin = test_user(&state, Role::Admin, "admin@example.com").await;

        // Self-update passes
        let response = server
            .patch(&format!("/api/users/{}", ann.id))
            .add_header("authorization", bearer(&state, &ann))
            .json(&serde_json::json!({ "first_name": "Annie" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["first_name"], "Annie");

        // Another student is denied with the stable code
        let response = server
            .patch(&format!("/api/users/{}", ann.id))
            .add_header("authorization", bearer(&state, &other))
            .json(&serde_json::json!({ "first_name": "Hijacked" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "ACCESS_DENIED");

        // Admin may update anyone
        let response = server
            .patch(&format!("/api/users/{}", ann.id))
            .add_header("authorization", bearer(&state, &admin))
            .json(&serde_json::json!({ "timezone": "Europe/London" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["timezone"], "Europe/London");
    }
}
