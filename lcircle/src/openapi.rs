//! OpenAPI documentation for the API, served at `/api/docs`.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api;

/// Bearer token security scheme shared by all protected endpoints.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "JWT session token from `/api/auth/login`:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Learner Circle API",
        description = "Role-based educational platform backend"
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::register,
        api::handlers::auth::create_admin,
        api::handlers::auth::profile,
        api::handlers::auth::refresh,
        api::handlers::auth::logout,
        api::handlers::auth::check,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::batches::get_batch,
        api::handlers::health::health,
    ),
    components(schemas(
        api::models::auth::LoginRequest,
        api::models::auth::RegisterRequest,
        api::models::auth::CreateAdminRequest,
        api::models::auth::AuthResponse,
        api::models::auth::RefreshResponse,
        api::models::auth::CheckResponse,
        api::models::auth::LogoutResponse,
        api::models::auth::UserSummary,
        api::models::users::Role,
        api::models::users::SecureProfile,
        api::models::users::UserUpdate,
        api::handlers::health::HealthResponse,
    ))
)]
pub struct ApiDoc;
