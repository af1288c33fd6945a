use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Base64-encoded PNG bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Uppercased first letter of the name, or `?` when there is none.
    pub fn initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_deref()
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| format!("data:image/png;base64,{}", bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial() {
        let mut profile = UserProfile::default();
        assert_eq!(profile.initial(), "?");

        profile.name = "ada Lovelace".into();
        assert_eq!(profile.initial(), "A");

        profile.name = "émile".into();
        assert_eq!(profile.initial(), "É");
    }

    #[test]
    fn test_missing_fields_default() {
        let profile: UserProfile = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(profile.email, "");
        assert_eq!(profile.avatar_url(), None);
        assert!(!profile.is_empty());
    }
}
