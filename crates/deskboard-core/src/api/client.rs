//! Typed client for the deskboard REST API.
//!
//! Every call goes through the `RequestInterceptor`, so requests are signed
//! with the current access token and recover once from an expired session.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::{ApiError, ApiRequest, ApiResponse};
use crate::auth::{RequestInterceptor, SessionManager};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for deskboard.
/// Clone is cheap - the interceptor and session share state through `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    interceptor: RequestInterceptor,
}

impl ApiClient {
    pub fn new(interceptor: RequestInterceptor) -> Self {
        Self { interceptor }
    }

    pub fn session(&self) -> &SessionManager {
        self.interceptor.session()
    }

    /// Send one request, backing off and retrying while the server answers 429.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.interceptor.send(request.clone()).await {
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path = %request.path, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                other => return other,
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self
            .execute(request)
            .await
            .with_context(|| format!("{} {} failed", method, path))?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    fn to_body<B: Serialize>(body: &B) -> Result<serde_json::Value> {
        serde_json::to_value(body).context("Failed to serialize request body")
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.fetch(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.fetch(ApiRequest::post(path, Self::to_body(body)?)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.fetch(ApiRequest::put(path, Self::to_body(body)?)).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.fetch(ApiRequest::patch(path, Self::to_body(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(ApiRequest::delete(path))
            .await
            .with_context(|| format!("DELETE {} failed", path))?;
        Ok(())
    }
}
