use async_trait::async_trait;
use tracing::info;

/// Lifecycle callbacks for subsystems that depend on a signed-in user
/// (profile, notifications).
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Runs after login or startup restoration. Errors are logged by the
    /// session manager and never fail the login.
    async fn on_session_established(&self) -> anyhow::Result<()>;

    /// Runs during logout. Must not block.
    fn on_session_ended(&self);
}

/// Moves the user to another surface (login screen, home).
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Navigator for headless use; records the redirect in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, path: &str) {
        info!(path, "Redirect requested");
    }
}
