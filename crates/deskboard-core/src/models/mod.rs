//! Data models for the resources the session bootstrap loads.
//!
//! - `UserProfile`: the signed-in user's name, email and avatar
//! - `AppNotification`, `NotificationType`: in-app notifications

pub mod notification;
pub mod user;

pub use notification::{AppNotification, NotificationType};
pub use user::UserProfile;
