//! In-memory access token plus persisted refresh token.
//!
//! The store never talks to the network. Reads of the access token validate
//! on every call, so an expired token silently becomes "absent" without
//! anyone having to evict it.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::clock::Clock;
use super::storage::KeyValueStore;
use super::token::{AccessToken, TokenValidator};
use super::AuthError;

/// Derived session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SessionState {
    /// No usable access token and no refresh token.
    LoggedOut,
    /// A usable access token is held.
    Authenticated,
    /// Access token absent or expired, refresh token present.
    Renewable,
}

#[derive(Debug, Default)]
struct Held {
    access: Option<AccessToken>,
    // Bumped on every clear(); lets a late refresh detect that the session
    // it was renewing has since ended.
    epoch: u64,
}

pub struct TokenStore {
    held: RwLock<Held>,
    storage: Arc<dyn KeyValueStore>,
    validator: TokenValidator,
    clock: Arc<dyn Clock>,
    refresh_key: String,
    state_tx: watch::Sender<SessionState>,
}

impl TokenStore {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        validator: TokenValidator,
        clock: Arc<dyn Clock>,
        refresh_key: impl Into<String>,
    ) -> Self {
        let refresh_key = refresh_key.into();
        let initial = match storage.get(&refresh_key) {
            Ok(Some(_)) => SessionState::Renewable,
            _ => SessionState::LoggedOut,
        };
        let (state_tx, _) = watch::channel(initial);

        Self {
            held: RwLock::new(Held::default()),
            storage,
            validator,
            clock,
            refresh_key,
            state_tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Held> {
        self.held.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Held> {
        self.held.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The held access token, if it is still usable right now.
    pub fn access_token(&self) -> Option<AccessToken> {
        let held = self.read();
        let token = held.access.as_ref()?;
        match self.validator.check(token, self.clock.now()) {
            Ok(()) => Some(token.clone()),
            Err(reason) => {
                debug!(%reason, "Held access token is not usable");
                None
            }
        }
    }

    /// Seconds until the held access token expires, measured on the
    /// injected clock. `None` when no usable token is held.
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        let token = self.access_token()?;
        Some(token.seconds_until_expiry(self.clock.now()))
    }

    /// The persisted refresh token, verbatim. Storage failures read as absent.
    pub fn refresh_token(&self) -> Option<String> {
        let _held = self.read();
        self.load_refresh_token()
    }

    fn load_refresh_token(&self) -> Option<String> {
        match self.storage.get(&self.refresh_key) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token, treating as absent");
                None
            }
        }
    }

    /// Validate `access` and, if usable, store the pair. On any failure the
    /// previous pair stays in place.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<AccessToken, AuthError> {
        self.commit(None, access, refresh).map(|(token, _)| token)
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Like `set_tokens`, but refuses if the store was cleared since `epoch`.
    /// The flag is true when no access token was held before, i.e. this pair
    /// starts a session rather than renewing one.
    pub(crate) fn set_tokens_for_epoch(
        &self,
        epoch: u64,
        access: &str,
        refresh: &str,
    ) -> Result<(AccessToken, bool), AuthError> {
        self.commit(Some(epoch), access, refresh)
    }

    fn commit(
        &self,
        expected_epoch: Option<u64>,
        access: &str,
        refresh: &str,
    ) -> Result<(AccessToken, bool), AuthError> {
        let token = self
            .validator
            .validate(access, self.clock.now())
            .map_err(|reason| {
                warn!(%reason, "Rejected access token issued by server");
                AuthError::InvalidCredential(reason)
            })?;

        let mut held = self.write();
        if let Some(expected) = expected_epoch {
            if held.epoch != expected {
                debug!("Session ended while tokens were being renewed, discarding pair");
                return Err(AuthError::RefreshFailed(
                    "session ended while the refresh was in flight".to_string(),
                ));
            }
        }

        self.storage
            .set(&self.refresh_key, refresh)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        let started = held.access.replace(token.clone()).is_none();
        drop(held);

        self.state_tx.send_replace(SessionState::Authenticated);
        Ok((token, started))
    }

    /// Forget both tokens. Safe to call repeatedly.
    pub fn clear(&self) {
        let mut held = self.write();
        held.access = None;
        held.epoch += 1;
        if let Err(e) = self.storage.remove(&self.refresh_key) {
            warn!(error = %e, "Failed to remove persisted refresh token");
        }
        drop(held);

        self.state_tx.send_replace(SessionState::LoggedOut);
    }

    pub fn session_state(&self) -> SessionState {
        if self.access_token().is_some() {
            SessionState::Authenticated
        } else if self.refresh_token().is_some() {
            SessionState::Renewable
        } else {
            SessionState::LoggedOut
        }
    }

    /// Watch login/logout transitions. Expiry of the access token is not
    /// pushed; use `session_state()` for the current derived value.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }
}
