//! HTTP server for fabl.
//!
//! Exposes the blueprint store over a small JSON API: import, fetch, export
//! and list items, plus cookie-session login for accounts. Callers are
//! identified by a bearer token when they send one, otherwise by their
//! session cookie.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Authenticated, MaybeAuthenticated};
pub use config::{CorsConfig, DatabaseConfig, ServerConfig, SessionConfig};
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use server::FablServer;
pub use state::AppState;
