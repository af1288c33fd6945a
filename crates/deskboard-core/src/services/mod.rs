//! Subsystems that only make sense for a signed-in user. Both implement
//! `SessionHooks`: they load on login or restore and reset on logout.

pub mod notifications;
pub mod profile;

pub use notifications::NotificationService;
pub use profile::ProfileService;
