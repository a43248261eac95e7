//! HTTP server for snipvault.
//!
//! Exposes the snippet repository, revision history and diffs as a JSON API
//! for the presentation layer. Identity comes from an upstream sign-in layer
//! as request headers; see [`identity`].

pub mod identity;
pub mod routes;
pub mod state;

pub use identity::{Identity, USER_HEADER};
pub use routes::create_router;
pub use state::AppState;
