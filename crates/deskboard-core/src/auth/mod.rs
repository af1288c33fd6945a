//! Authenticated-session subsystem.
//!
//! This module provides:
//! - `TokenStore`: in-memory access token, persisted refresh token, validation on read
//! - `SessionManager`: login, logout, deduplicated refresh, startup restoration
//! - `RouteGuard`: navigation gate with one silent renewal attempt
//! - `RequestInterceptor`: bearer signing and 401-triggered renewal with one retry
//!
//! Access tokens never touch durable storage. Only the refresh token does,
//! through a `KeyValueStore` (OS keychain, JSON file or memory).

pub mod clock;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod interceptor;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use guard::{GuardDecision, RouteGuard};
pub use hooks::{LogNavigator, Navigator, SessionHooks};
pub use interceptor::RequestInterceptor;
pub use session::{LoginRequest, Session, SessionManager, TokenPair};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};
pub use store::{SessionState, TokenStore};
pub use token::{AccessToken, Audience, Claims, TokenError, TokenValidator};
