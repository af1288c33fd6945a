//! Login, logout and token renewal against the auth endpoints.
//!
//! `SessionManager` is the only component that talks to `/auth/login` and
//! `/auth/refresh`. At most one refresh request is outstanding at a time:
//! concurrent callers attach to the running one and all receive its outcome.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::hooks::{Navigator, SessionHooks};
use super::storage::KeyValueStore;
use super::store::{SessionState, TokenStore};
use super::token::{AccessToken, TokenValidator};
use super::AuthError;
use crate::api::{ApiRequest, Transport};
use crate::config::AuthConfig;
use crate::utils::redact;

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Token pair returned by the login and refresh endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// An established session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: AccessToken,
}

impl Session {
    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    pub fn subject(&self) -> Option<&str> {
        self.token.subject()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.expires_at()
    }
}

type RefreshOutcome = Result<TokenPair, AuthError>;

struct InFlight {
    id: u64,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    store: TokenStore,
    config: AuthConfig,
    navigator: Arc<dyn Navigator>,
    hooks: RwLock<Vec<Weak<dyn SessionHooks>>>,
    in_flight: Mutex<Option<InFlight>>,
    next_flight: AtomicU64,
    // Set when a refresh starts a session from nothing (startup restore);
    // the first caller to observe it runs the dependent bootstrap.
    bootstrap_pending: AtomicBool,
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        let epoch = self.store.epoch();
        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("Refresh requested without a refresh token");
            return Err(AuthError::NoSession);
        };

        debug!(refresh_token = %redact(&refresh_token), "Requesting token refresh");
        let request = ApiRequest::post(
            self.config.refresh_path.as_str(),
            json!({ "refreshToken": refresh_token }),
        );

        let response = self.transport.send(request).await.map_err(|e| {
            error!(error = %e, "Refresh request failed");
            AuthError::RefreshFailed(e.to_string())
        })?;

        let pair: TokenPair = response
            .json()
            .map_err(|e| AuthError::RefreshFailed(format!("malformed refresh response: {}", e)))?;

        let (_, started) =
            self.store
                .set_tokens_for_epoch(epoch, &pair.access_token, &pair.refresh_token)?;
        if started {
            self.bootstrap_pending.store(true, Ordering::SeqCst);
        }

        info!(started, "Session tokens refreshed");
        Ok(pair)
    }

    fn live_hooks(&self) -> Vec<Arc<dyn SessionHooks>> {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        hooks.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Clears the in-flight slot when the refresh task ends, however it ends.
struct SettleGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        let mut slot = self.inner.lock_in_flight();
        if slot.as_ref().map(|flight| flight.id) == Some(self.id) {
            *slot = None;
        }
    }
}

/// Owns the session lifecycle. Clone is cheap; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        config: AuthConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let validator = TokenValidator::new(config.issuer.as_str(), config.audience.as_str());
        let store = TokenStore::new(storage, validator, clock, config.refresh_token_key.as_str());

        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                config,
                navigator,
                hooks: RwLock::new(Vec::new()),
                in_flight: Mutex::new(None),
                next_flight: AtomicU64::new(1),
                bootstrap_pending: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Register a dependent subsystem. Only a weak reference is kept, so the
    /// caller owns the hooks' lifetime.
    pub fn register_hooks<H: SessionHooks + 'static>(&self, hooks: &Arc<H>) {
        let weak: Weak<dyn SessionHooks> = Arc::downgrade(hooks) as Weak<dyn SessionHooks>;
        let mut registered = self.inner.hooks.write().unwrap_or_else(PoisonError::into_inner);
        registered.retain(|h| h.strong_count() > 0);
        registered.push(weak);
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.store.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.store.refresh_token()
    }

    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.inner.store.seconds_until_expiry()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.store.session_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.store.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_in_flight().is_some()
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<Session, AuthError> {
        let request = ApiRequest::post(
            self.inner.config.login_path.as_str(),
            json!({ "email": credentials.email, "password": credentials.password }),
        );

        let response = self.inner.transport.send(request).await.map_err(|e| {
            warn!(error = %e, email = %credentials.email, "Login failed");
            AuthError::from_login(e)
        })?;

        let pair: TokenPair = response
            .json()
            .map_err(|e| AuthError::ServerError(format!("malformed login response: {}", e)))?;

        let token = self
            .inner
            .store
            .set_tokens(&pair.access_token, &pair.refresh_token)?;
        info!(subject = ?token.subject(), "Login successful");

        self.inner.bootstrap_pending.store(false, Ordering::SeqCst);
        self.run_bootstrap().await;

        Ok(Session { token })
    }

    /// Exchange the refresh token for a new pair. Callers arriving while a
    /// refresh is outstanding share its result instead of sending another.
    ///
    /// Failure leaves the stored tokens alone; the caller decides whether to
    /// log out.
    pub async fn refresh(&self) -> Result<TokenPair, AuthError> {
        let outcome = {
            let mut slot = self.inner.lock_in_flight();
            match slot.as_ref() {
                Some(flight) => {
                    debug!(flight = flight.id, "Joining in-flight refresh");
                    flight.outcome.clone()
                }
                None => {
                    let id = self.inner.next_flight.fetch_add(1, Ordering::SeqCst);
                    let outcome = Self::start_refresh(Arc::clone(&self.inner), id);
                    *slot = Some(InFlight {
                        id,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        let result = outcome.await;
        if result.is_ok() && self.inner.bootstrap_pending.swap(false, Ordering::SeqCst) {
            self.run_bootstrap().await;
        }
        result
    }

    // The refresh runs on its own task so it completes even if every waiter
    // is dropped, and a panic inside it still settles the slot.
    fn start_refresh(inner: Arc<Inner>, id: u64) -> Shared<BoxFuture<'static, RefreshOutcome>> {
        let task = tokio::spawn(async move {
            let _settle = SettleGuard {
                inner: Arc::clone(&inner),
                id,
            };
            inner.perform_refresh().await
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Refresh task did not complete");
                    Err(AuthError::RefreshFailed("refresh task aborted".to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Startup restoration from the persisted refresh token.
    pub async fn try_restore_session(&self) -> Result<Session, AuthError> {
        if self.inner.store.refresh_token().is_none() {
            debug!("No refresh token, nothing to restore");
            return Err(AuthError::NoSession);
        }

        let pair = self.refresh().await?;
        let token = AccessToken::decode(&pair.access_token).map_err(AuthError::InvalidCredential)?;
        info!(subject = ?token.subject(), "Session restored");
        Ok(Session { token })
    }

    /// End the session: clear tokens, tear down dependents, go to login.
    /// Never fails and is safe to call when already logged out.
    pub fn logout(&self) {
        let previous = self.inner.store.session_state();
        self.inner.store.clear();
        self.inner.bootstrap_pending.store(false, Ordering::SeqCst);

        for hooks in self.inner.live_hooks() {
            hooks.on_session_ended();
        }

        self.inner.navigator.redirect(&self.inner.config.login_route);
        info!(?previous, "Logged out");
    }

    /// Send the user to the login surface without touching the session.
    pub(crate) fn redirect_to_login(&self) -> String {
        let route = self.inner.config.login_route.clone();
        self.inner.navigator.redirect(&route);
        route
    }

    async fn run_bootstrap(&self) {
        for hooks in self.inner.live_hooks() {
            if let Err(e) = hooks.on_session_established().await {
                warn!(error = %e, "Session bootstrap step failed, continuing");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiResponse};
    use crate::test_support::{
        harness, mint_token, pair_body, CountingHooks, MockTransport, AUDIENCE, ISSUER, NOW,
    };
    use std::sync::atomic::AtomicUsize;

    const LOGIN: &str = "/auth/login";
    const REFRESH: &str = "/auth/refresh";

    fn fresh_access() -> String {
        mint_token(ISSUER, AUDIENCE, NOW + 900)
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_stores_pair_and_runs_bootstrap() {
        let access = fresh_access();
        let body = pair_body(&access, "r-1");
        let h = harness(MockTransport::new(move |req| match req.path.as_str() {
            LOGIN => Ok(ApiResponse::new(200, body.clone())),
            _ => Err(ApiError::from_status(404, "")),
        }));
        let hooks = Arc::new(CountingHooks::default());
        h.session.register_hooks(&hooks);

        let session = h
            .session
            .login(&LoginRequest::new("ada@example.com", "pw"))
            .await
            .expect("login succeeds");

        assert_eq!(session.access_token().as_str(), access);
        assert_eq!(h.session.refresh_token().as_deref(), Some("r-1"));
        assert_eq!(h.session.session_state(), SessionState::Authenticated);
        assert_eq!(hooks.established(), 1);

        let sent = h.transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body.as_ref().unwrap()["email"], "ada@example.com");
        assert_eq!(sent[0].bearer, None);
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        for status in [400, 401] {
            let h = harness(MockTransport::new(move |_| Err(ApiError::from_status(status, ""))));
            let err = h
                .session
                .login(&LoginRequest::new("ada@example.com", "wrong"))
                .await
                .unwrap_err();
            assert_eq!(err, AuthError::InvalidCredentials);
            assert_eq!(h.session.session_state(), SessionState::LoggedOut);
        }
    }

    #[tokio::test]
    async fn test_login_server_and_transport_errors() {
        let h = harness(MockTransport::new(|_| Err(ApiError::from_status(502, "bad gateway"))));
        let err = h.session.login(&LoginRequest::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, AuthError::ServerError(_)));

        let h = harness(MockTransport::new(|_| Err(ApiError::NetworkError("refused".into()))));
        let err = h.session.login(&LoginRequest::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_invalid_server_token() {
        let bad = mint_token("https://elsewhere.example", AUDIENCE, NOW + 900);
        let body = pair_body(&bad, "r-1");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        let hooks = Arc::new(CountingHooks::default());
        h.session.register_hooks(&hooks);

        let err = h.session.login(&LoginRequest::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
        assert_eq!(h.session.refresh_token(), None);
        assert_eq!(hooks.established(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_failure_does_not_block_login() {
        let body = pair_body(&fresh_access(), "r-1");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        let failing = Arc::new(CountingHooks::failing());
        let healthy = Arc::new(CountingHooks::default());
        h.session.register_hooks(&failing);
        h.session.register_hooks(&healthy);

        assert!(h.session.login(&LoginRequest::new("a", "b")).await.is_ok());
        assert_eq!(failing.established(), 1);
        assert_eq!(healthy.established(), 1);
    }

    #[tokio::test]
    async fn test_dropped_hooks_are_skipped() {
        let body = pair_body(&fresh_access(), "r-1");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        let hooks = Arc::new(CountingHooks::default());
        h.session.register_hooks(&hooks);
        drop(hooks);

        assert!(h.session.login(&LoginRequest::new("a", "b")).await.is_ok());
        h.session.logout();
    }

    // -------------------------------------------------------------------------
    // Refresh
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_rotates_refresh_token() {
        let access = fresh_access();
        let body = pair_body(&access, "r-2");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        h.storage.set("refresh_token", "r-1").unwrap();

        let pair = h.session.refresh().await.expect("refresh succeeds");

        assert_eq!(pair.refresh_token, "r-2");
        assert_eq!(h.session.refresh_token().as_deref(), Some("r-2"));
        assert_eq!(h.session.access_token().unwrap().as_str(), access);

        let sent = h.transport.requests();
        assert_eq!(sent[0].path, REFRESH);
        assert_eq!(sent[0].body.as_ref().unwrap()["refreshToken"], "r-1");
        assert!(!h.session.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_tokens() {
        let h = harness(MockTransport::new(|_| Err(ApiError::from_status(401, ""))));
        h.storage.set("refresh_token", "r-1").unwrap();

        let err = h.session.refresh().await.unwrap_err();

        assert!(matches!(err, AuthError::RefreshFailed(_)));
        assert_eq!(h.session.refresh_token().as_deref(), Some("r-1"));
        assert!(h.navigator.redirects().is_empty());
        assert!(!h.session.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_without_token_makes_no_call() {
        let h = harness(MockTransport::new(|_| Err(ApiError::from_status(500, ""))));
        assert_eq!(h.session.refresh().await.unwrap_err(), AuthError::NoSession);
        assert_eq!(h.transport.count(REFRESH), 0);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_request() {
        let access = fresh_access();
        let body = pair_body(&access, "r-2");
        let gate = Arc::new(tokio::sync::RwLock::new(()));
        let transport = MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone())))
            .gated(REFRESH, gate.clone());
        let h = harness(transport);
        h.storage.set("refresh_token", "r-1").unwrap();

        let hold = gate.write().await;
        let callers = futures::future::join_all((0..5).map(|_| h.session.refresh()));
        let release = async {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            assert!(h.session.is_refreshing());
            drop(hold);
        };
        let (results, ()) = tokio::join!(callers, release);

        assert_eq!(h.transport.count(REFRESH), 1);
        assert_eq!(results.len(), 5);
        for result in &results {
            assert_eq!(result.as_ref().unwrap().access_token, access);
        }
        assert!(!h.session.is_refreshing());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_failure_shared() {
        let gate = Arc::new(tokio::sync::RwLock::new(()));
        let transport = MockTransport::new(|_| Err(ApiError::from_status(403, "reused")))
            .gated(REFRESH, gate.clone());
        let h = harness(transport);
        h.storage.set("refresh_token", "r-1").unwrap();

        let hold = gate.write().await;
        let callers = futures::future::join_all((0..3).map(|_| h.session.refresh()));
        let release = async {
            tokio::task::yield_now().await;
            drop(hold);
        };
        let (results, ()) = tokio::join!(callers, release);

        assert_eq!(h.transport.count(REFRESH), 1);
        let first = results[0].clone().unwrap_err();
        assert!(matches!(first, AuthError::RefreshFailed(_)));
        assert!(results.iter().all(|r| r.as_ref().unwrap_err() == &first));
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_hit_network() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let h = harness(MockTransport::new(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse::new(
                200,
                pair_body(&mint_token(ISSUER, AUDIENCE, NOW + 900), &format!("r-{}", n + 2)),
            ))
        }));
        h.storage.set("refresh_token", "r-1").unwrap();

        h.session.refresh().await.unwrap();
        h.session.refresh().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let sent = h.transport.requests();
        assert_eq!(sent[1].body.as_ref().unwrap()["refreshToken"], "r-2");
        assert_eq!(h.session.refresh_token().as_deref(), Some("r-3"));
    }

    #[tokio::test]
    async fn test_slot_clears_after_panicking_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let body = pair_body(&fresh_access(), "r-2");
        let h = harness(MockTransport::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("transport blew up");
            }
            Ok(ApiResponse::new(200, body.clone()))
        }));
        h.storage.set("refresh_token", "r-1").unwrap();

        let err = h.session.refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(_)));
        assert!(!h.session.is_refreshing());

        // A new refresh can start
        assert!(h.session.refresh().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_discards_result() {
        let body = pair_body(&fresh_access(), "r-2");
        let gate = Arc::new(tokio::sync::RwLock::new(()));
        let transport =
            MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))).gated(REFRESH, gate.clone());
        let h = harness(transport);
        h.storage.set("refresh_token", "r-1").unwrap();

        let hold = gate.write().await;
        let refresh = h.session.refresh();
        let interrupt = async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            h.session.logout();
            drop(hold);
        };
        let (result, ()) = tokio::join!(refresh, interrupt);

        assert!(result.is_err());
        assert_eq!(h.session.refresh_token(), None);
        assert!(h.session.access_token().is_none());
        assert_eq!(h.session.session_state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_invalid_token_from_refresh_is_rejected() {
        let expired = mint_token(ISSUER, AUDIENCE, NOW - 10);
        let body = pair_body(&expired, "r-2");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        h.storage.set("refresh_token", "r-1").unwrap();

        let err = h.session.refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
        // Rotation not applied
        assert_eq!(h.session.refresh_token().as_deref(), Some("r-1"));
    }

    // -------------------------------------------------------------------------
    // Restore
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_restore_without_refresh_token() {
        let h = harness(MockTransport::new(|_| Err(ApiError::from_status(500, ""))));
        let err = h.session.try_restore_session().await.unwrap_err();
        assert_eq!(err, AuthError::NoSession);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_runs_bootstrap_once() {
        let body = pair_body(&fresh_access(), "r-2");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        h.storage.set("refresh_token", "r-1").unwrap();
        let hooks = Arc::new(CountingHooks::default());
        h.session.register_hooks(&hooks);

        let session = h.session.try_restore_session().await.expect("restored");
        assert_eq!(session.subject(), Some("user-1"));
        assert_eq!(hooks.established(), 1);

        // Renewing an existing session does not re-run the bootstrap
        h.clock.advance(100);
        h.session.refresh().await.unwrap();
        assert_eq!(hooks.established(), 1);
    }

    // -------------------------------------------------------------------------
    // Logout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_logout_clears_and_navigates() {
        let body = pair_body(&fresh_access(), "r-1");
        let h = harness(MockTransport::new(move |_| Ok(ApiResponse::new(200, body.clone()))));
        let hooks = Arc::new(CountingHooks::default());
        h.session.register_hooks(&hooks);
        h.session.login(&LoginRequest::new("a", "b")).await.unwrap();

        h.session.logout();

        assert!(h.session.access_token().is_none());
        assert_eq!(h.session.refresh_token(), None);
        assert_eq!(h.storage.get("refresh_token").unwrap(), None);
        assert_eq!(hooks.ended(), 1);
        assert_eq!(h.navigator.redirects(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_logout_twice_same_end_state() {
        let h = harness(MockTransport::new(|_| Err(ApiError::from_status(500, ""))));
        h.storage.set("refresh_token", "r-1").unwrap();

        h.session.logout();
        let state_once = h.session.session_state();
        h.session.logout();

        assert_eq!(h.session.session_state(), state_once);
        assert_eq!(h.session.session_state(), SessionState::LoggedOut);
        assert_eq!(h.storage.get("refresh_token").unwrap(), None);
    }

    #[tokio::test]
    async fn test_time_left_follows_session_clock() {
        let h = harness(MockTransport::new(|_| Err(ApiError::from_status(500, ""))));
        assert_eq!(h.session.seconds_until_expiry(), None);

        h.session.store().set_tokens(&fresh_access(), "r-1").unwrap();
        assert_eq!(h.session.seconds_until_expiry(), Some(900));

        h.clock.advance(600);
        assert_eq!(h.session.seconds_until_expiry(), Some(300));

        h.clock.advance(300);
        assert_eq!(h.session.seconds_until_expiry(), None);
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let pair = TokenPair {
            access_token: "eyJhbGciOiJIUzI1NiJ9.payload.sig".into(),
            refresh_token: "refresh-secret-value".into(),
        };
        let shown = format!("{:?}", pair);
        assert!(!shown.contains("refresh-secret-value"));
        assert!(!shown.contains("payload"));

        let login = format!("{:?}", LoginRequest::new("ada@example.com", "hunter2"));
        assert!(login.contains("ada@example.com"));
        assert!(!login.contains("hunter2"));
    }
}
