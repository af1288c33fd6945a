//! Shared fixtures for unit tests: token minting, a scripted transport and a
//! fully wired `SessionManager`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::{ManualClock, MemoryStore, Navigator, SessionHooks, SessionManager};
use crate::config::AuthConfig;

pub const ISSUER: &str = "https://auth.deskboard.test";
pub const AUDIENCE: &str = "deskboard-web";
pub const NOW: i64 = 1_700_000_000;

/// Build an unsigned JWT-shaped token around an arbitrary payload.
pub fn mint_token_with(payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

pub fn mint_token(iss: &str, aud: &str, exp: i64) -> String {
    mint_token_with(json!({ "iss": iss, "aud": aud, "exp": exp, "sub": "user-1" }))
}

/// JSON body of a login/refresh response.
pub fn pair_body(access: &str, refresh: &str) -> String {
    json!({ "accessToken": access, "refreshToken": refresh }).to_string()
}

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Transport answering from a closure and recording every request.
pub struct MockTransport {
    handler: Handler,
    sent: Mutex<Vec<ApiRequest>>,
    gates: HashMap<String, Arc<tokio::sync::RwLock<()>>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
            gates: HashMap::new(),
        }
    }

    /// Requests to `path` wait until the gate can be read-locked, so a test
    /// holding the write lock keeps them outstanding.
    pub fn gated(mut self, path: &str, gate: Arc<tokio::sync::RwLock<()>>) -> Self {
        self.gates.insert(path.to_string(), gate);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(gate) = self.gates.get(&request.path) {
            let _open = gate.read().await;
        }

        // Called with no lock held so a panicking handler poisons nothing.
        (self.handler)(&request)
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

#[derive(Default)]
pub struct CountingHooks {
    established: AtomicUsize,
    ended: AtomicUsize,
    fail: bool,
}

impl CountingHooks {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn established(&self) -> usize {
        self.established.load(Ordering::SeqCst)
    }

    pub fn ended(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionHooks for CountingHooks {
    async fn on_session_established(&self) -> anyhow::Result<()> {
        self.established.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("bootstrap step failed");
        }
        Ok(())
    }

    fn on_session_ended(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub session: SessionManager,
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn harness(transport: MockTransport) -> Harness {
    let transport = Arc::new(transport);
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let navigator = Arc::new(RecordingNavigator::default());

    let session = SessionManager::new(
        AuthConfig::new(ISSUER, AUDIENCE),
        transport.clone(),
        storage.clone(),
        clock.clone(),
        navigator.clone(),
    );

    Harness {
        session,
        transport,
        storage,
        clock,
        navigator,
    }
}
