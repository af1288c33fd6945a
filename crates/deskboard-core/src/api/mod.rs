//! HTTP plumbing for the deskboard REST API.
//!
//! `Transport` is the seam between the session subsystem and the network;
//! `ReqwestTransport` is the real implementation. `ApiClient` layers typed
//! JSON helpers and rate-limit backoff on top of the signing interceptor.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
