//! Wiring for a complete client: transport, session, signing interceptor,
//! typed API client and the session-dependent services.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ApiClient, ReqwestTransport, Transport};
use crate::auth::{
    Clock, GuardDecision, KeyValueStore, Navigator, RequestInterceptor, RouteGuard, SessionManager,
    SystemClock,
};
use crate::config::{AuthConfig, Config};
use crate::services::{NotificationService, ProfileService};

/// A fully assembled deskboard client.
///
/// Owns the services; the session only holds weak references to them, so
/// dropping the `Deskboard` tears everything down.
pub struct Deskboard {
    session: SessionManager,
    api: ApiClient,
    guard: RouteGuard,
    profile: Arc<ProfileService>,
    notifications: Arc<NotificationService>,
}

impl Deskboard {
    /// Build a client against the real API described by `config`.
    pub fn new(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.api_base_url.as_str())
            .context("Failed to build HTTP client")?;
        let storage = config.open_storage()?;
        debug!(base_url = %config.api_base_url, storage = ?config.storage, "Assembling client");

        Ok(Self::with_parts(
            config.auth_config(),
            config.api_base_url.as_str(),
            Arc::new(transport),
            storage,
            Arc::new(SystemClock),
            navigator,
        ))
    }

    pub fn with_parts(
        auth: AuthConfig,
        base_url: &str,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = SessionManager::new(auth, transport.clone(), storage, clock, navigator);
        let api = ApiClient::new(RequestInterceptor::new(session.clone(), transport));
        let guard = RouteGuard::new(session.clone());

        let profile = Arc::new(ProfileService::new(api.clone()));
        let notifications = Arc::new(NotificationService::new(api.clone(), base_url));
        session.register_hooks(&profile);
        session.register_hooks(&notifications);

        Self {
            session,
            api,
            guard,
            profile,
            notifications,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn profile(&self) -> &ProfileService {
        &self.profile
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Check navigation to `target`, renewing the session silently if needed.
    pub async fn navigate(&self, target: &str) -> GuardDecision {
        self.guard.can_activate(target).await
    }
}
