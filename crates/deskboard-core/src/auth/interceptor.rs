//! Outbound request signing with one-shot recovery from expired sessions.

use std::sync::Arc;

use tracing::{debug, warn};

use super::SessionManager;
use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};

/// Wraps a `Transport`, attaching the current access token and renewing the
/// session once when the server answers 401.
#[derive(Clone)]
pub struct RequestInterceptor {
    session: SessionManager,
    transport: Arc<dyn Transport>,
}

impl RequestInterceptor {
    pub fn new(session: SessionManager, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn is_auth_endpoint(&self, path: &str) -> bool {
        let prefix = self.session.config().auth_path_prefix.to_ascii_lowercase();
        path.to_ascii_lowercase().contains(&prefix)
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        // Signing the auth endpoints would make renewal depend on itself.
        if self.is_auth_endpoint(&request.path) {
            return self.transport.send(request).await;
        }

        let sent_token = self.session.access_token().map(|t| t.as_str().to_string());
        let outbound = match sent_token {
            Some(ref token) => request.with_bearer(token.as_str()),
            None => request.clone(),
        };

        let unauthorized = match self.transport.send(outbound).await {
            Err(e) if e.is_unauthorized() => e,
            other => return other,
        };

        // Someone else renewed while this request was out: use their token.
        if let Some(current) = self.session.access_token() {
            if sent_token.as_deref() != Some(current.as_str()) {
                debug!(path = %request.path, "401 on a superseded token, retrying with current token");
                return self.transport.send(request.with_bearer(current.as_str())).await;
            }
        }

        match self.session.refresh().await {
            Ok(pair) => {
                debug!(path = %request.path, "Session renewed, retrying request once");
                self.transport
                    .send(request.with_bearer(pair.access_token))
                    .await
            }
            Err(e) => {
                warn!(path = %request.path, error = %e, "Renewal after 401 failed, logging out");
                self.session.logout();
                Err(unauthorized)
            }
        }
    }
}
