//! Batch endpoints.
//!
//! Batch CRUD is not built yet; the single endpoint here exists so the
//! batch access policy is wired into the HTTP surface from day one and the
//! frontend can already exercise the authorization outcomes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{auth::identity::AuthenticatedUser, errors::Error, types::BatchId, AppState};
use uuid::Uuid;

/// Fetch a batch (placeholder payload)
#[utoipa::path(
    get,
    path = "/api/batches/{batch_id}",
    params(("batch_id" = Uuid, Path, description = "Batch to fetch")),
    tag = "batches",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Batch payload"),
        (status = 400, description = "Missing batch id"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "No access to this batch"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, batch_id = %batch_id))]
pub async fn get_batch(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(batch_id): Path<BatchId>,
) -> Result<Json<Value>, Error> {
    state.batch_policy.check(&identity, Some(batch_id))?;

    Ok(Json(json!({
        "id": batch_id,
        "status": "not_implemented",
    })))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::{bearer, test_server, test_user};
    use axum::http::StatusCode;
    use serde_json::Value;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_batch_access_by_role() {
        let (server, state) = test_server().await;
        let batch_id = Uuid::new_v4();

        for role in [Role::Admin, Role::Tutor, Role::Student] {
            let user = test_user(&state, role, &format!("{role}@example.com")).await;
            server
                .get(&format!("/api/batches/{batch_id}"))
                .add_header("authorization", bearer(&state, &user))
                .await
                .assert_status_ok();
        }

        let parent = test_user(&state, Role::Parent, "parent@example.com").await;
        let response = server
            .get(&format!("/api/batches/{batch_id}"))
            .add_header("authorization", bearer(&state, &parent))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "BATCH_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_batch_requires_authentication() {
        let (server, _state) = test_server().await;
        let response = server.get(&format!("/api/batches/{}", Uuid::new_v4())).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
