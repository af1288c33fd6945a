use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::auth::SessionHooks;
use crate::models::UserProfile;

const PROFILE_PATH: &str = "/api/User/profile";

/// Cached profile of the signed-in user.
pub struct ProfileService {
    api: ApiClient,
    profile: RwLock<UserProfile>,
    loaded: AtomicBool,
}

impl ProfileService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            profile: RwLock::new(UserProfile::default()),
            loaded: AtomicBool::new(false),
        }
    }

    fn store(&self, profile: UserProfile) {
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = profile;
    }

    pub fn profile(&self) -> UserProfile {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn initial(&self) -> String {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).initial()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Fetch and cache the profile. A failed load is logged and yields an
    /// empty profile; the cache is left as it was.
    pub async fn load_profile(&self) -> UserProfile {
        match self.api.get::<UserProfile>(PROFILE_PATH).await {
            Ok(profile) => {
                debug!(email = %profile.email, "Profile loaded");
                self.store(profile.clone());
                self.loaded.store(true, Ordering::SeqCst);
                profile
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Failed to load user profile");
                UserProfile::default()
            }
        }
    }

    /// Apply non-empty fields locally right away, then persist. The server's
    /// answer replaces the local values when it arrives.
    pub async fn update_profile(&self, name: &str, email: &str) -> Result<UserProfile> {
        {
            let mut profile = self.profile.write().unwrap_or_else(PoisonError::into_inner);
            if !name.is_empty() {
                profile.name = name.to_string();
            }
            if !email.is_empty() {
                profile.email = email.to_string();
            }
        }

        let updated: UserProfile = self
            .api
            .put(PROFILE_PATH, &json!({ "name": name, "email": email }))
            .await?;

        let mut profile = self.profile.write().unwrap_or_else(PoisonError::into_inner);
        profile.name = updated.name.clone();
        profile.email = updated.email.clone();
        Ok(profile.clone())
    }

    pub fn clear(&self) {
        self.store(UserProfile::default());
        self.loaded.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionHooks for ProfileService {
    async fn on_session_established(&self) -> Result<()> {
        self.load_profile().await;
        Ok(())
    }

    fn on_session_ended(&self) {
        self.clear();
    }
}
