//! Data persistence layer.
//!
//! The authentication core treats persistence as an external collaborator:
//! everything goes through the [`store::CredentialStore`] trait, with
//! [`store::PgCredentialStore`] as the production implementation (SQLx +
//! PostgreSQL). Test code swaps in an in-memory store.
//!
//! # Modules
//!
//! - [`store`]: the `CredentialStore` trait and its PostgreSQL implementation
//! - [`models`]: record and request structures matching the users table
//! - [`errors`]: store-specific error categorization from sqlx

pub mod errors;
pub mod models;
pub mod store;
