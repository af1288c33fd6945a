//! In-app notifications: the list loaded over REST, items pushed by the live
//! stream, and the bookkeeping for that stream's connection.
//!
//! The live stream authenticates with the access token in its query string.
//! The URL is built fresh at each (re)connect so a renewed token is picked up.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::SessionHooks;
use crate::models::AppNotification;

const NOTIFICATIONS_PATH: &str = "/api/Notifications";
const HUB_PATH: &str = "/hubs/notifications";

/// An open live-stream connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConnection {
    pub endpoint: String,
    pub opened_at: DateTime<Utc>,
}

pub struct NotificationService {
    api: ApiClient,
    base_url: String,
    notifications: RwLock<Vec<AppNotification>>,
    toasts: RwLock<Vec<AppNotification>>,
    connection: Mutex<Option<LiveConnection>>,
}

impl NotificationService {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            notifications: RwLock::new(Vec::new()),
            toasts: RwLock::new(Vec::new()),
            connection: Mutex::new(None),
        }
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<LiveConnection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<AppNotification> {
        self.notifications.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn toasts(&self) -> Vec<AppNotification> {
        self.toasts.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn load_notifications(&self) -> Result<usize> {
        let list: Vec<AppNotification> = self.api.get(NOTIFICATIONS_PATH).await?;
        let count = list.len();
        *self.notifications.write().unwrap_or_else(PoisonError::into_inner) = list;
        debug!(count, "Notifications loaded");
        Ok(count)
    }

    /// Record a notification pushed by the server.
    pub fn handle_incoming(&self, notification: AppNotification) {
        debug!(id = %notification.id, kind = %notification.kind, "Notification received");
        self.notifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, notification.clone());
        self.toasts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }

    pub fn dismiss_toast(&self, id: &str) {
        self.toasts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|n| n.id != id);
    }

    /// Mark locally, then tell the server.
    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        {
            let mut list = self.notifications.write().unwrap_or_else(PoisonError::into_inner);
            for n in list.iter_mut().filter(|n| n.id == id) {
                n.read = true;
            }
        }
        let path = format!("{}/{}/read", NOTIFICATIONS_PATH, id);
        self.api.patch::<Value, _>(&path, &json!({})).await?;
        Ok(())
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        {
            let mut list = self.notifications.write().unwrap_or_else(PoisonError::into_inner);
            for n in list.iter_mut() {
                n.read = true;
            }
        }
        let path = format!("{}/read-all", NOTIFICATIONS_PATH);
        self.api.post::<Value, _>(&path, &json!({})).await?;
        Ok(())
    }

    pub async fn send_test_notification(&self) -> Result<AppNotification> {
        let path = format!("{}/test", NOTIFICATIONS_PATH);
        let notification: AppNotification = self.api.post(&path, &json!({})).await?;
        self.handle_incoming(notification.clone());
        Ok(notification)
    }

    /// Live-stream URL carrying the current access token, or `None` when no
    /// usable token is held.
    pub fn hub_url(&self) -> Option<String> {
        let token = self.api.session().access_token()?;
        Some(format!(
            "{}{}?access_token={}",
            self.base_url,
            HUB_PATH,
            token.as_str()
        ))
    }

    pub fn is_connected(&self) -> bool {
        self.lock_connection().is_some()
    }

    /// Open the live stream. Does nothing if it is already open.
    pub fn start_connection(&self) -> bool {
        let mut connection = self.lock_connection();
        if connection.is_some() {
            return true;
        }
        if self.api.session().access_token().is_none() {
            warn!("Live notifications not started: no usable access token");
            return false;
        }

        let endpoint = format!("{}{}", self.base_url, HUB_PATH);
        info!(%endpoint, "Live notifications connected");
        *connection = Some(LiveConnection {
            endpoint,
            opened_at: Utc::now(),
        });
        true
    }

    pub fn stop_connection(&self) {
        if self.lock_connection().take().is_some() {
            info!("Live notifications disconnected");
        }
    }

    pub fn clear(&self) {
        self.notifications.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.toasts.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl SessionHooks for NotificationService {
    async fn on_session_established(&self) -> Result<()> {
        let loaded = self.load_notifications().await;
        self.start_connection();
        loaded.map(|_| ())
    }

    fn on_session_ended(&self) {
        self.stop_connection();
        self.clear();
    }
}
