//! Authentication and authorization.
//!
//! Three layers, each independently testable:
//! - [`token`] and [`password`]: pure codecs over JWTs and argon2 digests
//! - [`identity`]: the per-request authenticator, exposed as axum extractors
//! - [`guards`]: access policies handlers invoke explicitly
//!
//! Identity is re-established from the credential store on every request, so
//! deactivating a user takes effect on their very next call even though their
//! token is still cryptographically valid.

pub mod guards;
pub mod identity;
pub mod password;
pub mod token;
