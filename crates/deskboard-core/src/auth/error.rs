use thiserror::Error;

use super::token::TokenError;
use crate::api::ApiError;

/// Session-level failures.
///
/// `Clone` because a single refresh outcome is delivered to every caller that
/// attached to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The server handed us a token that fails validation. Never stored.
    #[error("server issued an unusable access token: {0}")]
    InvalidCredential(TokenError),

    /// Wrong email or password.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("authentication server error: {0}")]
    ServerError(String),

    /// No refresh token to restore from. Normal for anonymous visitors.
    #[error("no stored session")]
    NoSession,

    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("could not reach the authentication server: {0}")]
    Transport(String),

    #[error("could not persist credentials: {0}")]
    Storage(String),
}

impl AuthError {
    /// Classify a failed login exchange.
    pub(crate) fn from_login(err: ApiError) -> Self {
        match err {
            ApiError::NetworkError(msg) => AuthError::Transport(msg),
            other => match other.status() {
                Some(400) | Some(401) => AuthError::InvalidCredentials,
                _ => AuthError::ServerError(other.to_string()),
            },
        }
    }

    /// Short message suitable for showing to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password".to_string(),
            AuthError::Transport(msg) if msg.to_lowercase().contains("timed out") => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Transport(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            AuthError::NoSession | AuthError::RefreshFailed(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::InvalidCredential(_) | AuthError::ServerError(_) => {
                "The server could not sign you in right now. Please try again later.".to_string()
            }
            AuthError::Storage(_) => {
                "Could not save your sign-in on this device.".to_string()
            }
        }
    }
}
