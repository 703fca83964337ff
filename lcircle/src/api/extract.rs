//! Request extraction helpers.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::errors::Error;

/// `axum::Json` with the rejection mapped into the application error type.
///
/// An unparseable body (malformed JSON, a wrong-typed field, an unknown
/// enum value) is a client mistake, so it answers 400 with the standard
/// `{"error": ...}` shape rather than axum's plain-text 422.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::BadRequest {
                message: format!("Invalid request body: {}", rejection.body_text()),
            })?;
        Ok(Json(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
