//! API request and response data models.
//!
//! These structures define the public API contract and are kept distinct from
//! the database models in [`crate::db::models`] so the storage representation
//! can evolve without breaking the wire format. Everything here carries serde
//! derives plus `utoipa` annotations for the generated OpenAPI document.

pub mod auth;
pub mod users;
