//! Client-side core for the deskboard dashboard.
//!
//! - `auth`: token storage and validation, session lifecycle, route guard,
//!   request signing with reactive renewal
//! - `api`: HTTP transport and the typed API client
//! - `services`: profile and notifications, bootstrapped on sign-in
//! - `app`: wiring all of the above into one `Deskboard`

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::Deskboard;
pub use auth::{AuthError, SessionManager, SessionState};
pub use config::{AuthConfig, Config, StorageBackend};
