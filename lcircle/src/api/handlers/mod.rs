//! HTTP request handlers.
//!
//! Handlers are thin: extract, run the relevant guards, call the store,
//! shape the response. All authorization is explicit in the handler body
//! rather than hidden in router-level middleware.

pub mod auth;
pub mod batches;
pub mod health;
pub mod users;
