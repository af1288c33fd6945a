use tracing::{debug, warn};

use super::{AuthError, SessionManager};

/// Outcome of a navigation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Denied; the navigator has already been sent to this route.
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Gates navigation to protected views.
#[derive(Clone)]
pub struct RouteGuard {
    session: SessionManager,
}

impl RouteGuard {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Allow when a usable access token is held; otherwise make one silent
    /// renewal attempt if a refresh token exists. A failed renewal ends the
    /// session.
    pub async fn can_activate(&self, target: &str) -> GuardDecision {
        if self.session.access_token().is_some() {
            return GuardDecision::Allow;
        }

        if self.session.refresh_token().is_none() {
            debug!(target, "No session, redirecting to login");
            return self.deny();
        }

        match self.session.try_restore_session().await {
            Ok(_) => {
                debug!(target, "Session restored for navigation");
                GuardDecision::Allow
            }
            Err(e @ (AuthError::RefreshFailed(_) | AuthError::InvalidCredential(_))) => {
                // The refresh token is dead; drop it so later navigations
                // do not keep replaying it.
                warn!(target, error = %e, "Session could not be renewed, logging out");
                self.session.logout();
                GuardDecision::Redirect(self.session.config().login_route.clone())
            }
            Err(e) => {
                warn!(target, error = %e, "Could not restore session, redirecting to login");
                self.deny()
            }
        }
    }

    fn deny(&self) -> GuardDecision {
        GuardDecision::Redirect(self.session.redirect_to_login())
    }
}
