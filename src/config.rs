use crate::error::{ClassifiedsError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000";

const SITE_ID_VAR: &str = "CLASSIFIEDS_SITE_ID";

/// Identifiers of the six SharePoint lists backing the marketplace.
///
/// Graph accepts a list's display name wherever it accepts the list GUID,
/// so the defaults are the names `initialize_lists` creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListIds {
    pub ads: String,
    pub categories: String,
    pub users: String,
    pub favorites: String,
    pub saved_searches: String,
    pub messages: String,
}

impl Default for ListIds {
    fn default() -> Self {
        Self {
            ads: "ClassifiedAds".to_string(),
            categories: "Categories".to_string(),
            users: "Users".to_string(),
            favorites: "Favorites".to_string(),
            saved_searches: "SavedSearches".to_string(),
            messages: "Messages".to_string(),
        }
    }
}

/// Application configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub tenant_id: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    /// Only list operations need a site; sign-in URLs work without one.
    pub site_id: Option<String>,
    pub graph_base_url: String,
    pub access_token: Option<String>,
    pub client_secret: Option<String>,
    pub list_ids: ListIds,
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| ClassifiedsError::Config(format!("{key} must be set")))
        };

        let redirect_uri =
            get("CLASSIFIEDS_REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
        let post_logout_redirect_uri =
            get("CLASSIFIEDS_POST_LOGOUT_URI").unwrap_or_else(|| redirect_uri.clone());

        let defaults = ListIds::default();
        let list_ids = ListIds {
            ads: get("CLASSIFIEDS_LIST_ADS").unwrap_or(defaults.ads),
            categories: get("CLASSIFIEDS_LIST_CATEGORIES").unwrap_or(defaults.categories),
            users: get("CLASSIFIEDS_LIST_USERS").unwrap_or(defaults.users),
            favorites: get("CLASSIFIEDS_LIST_FAVORITES").unwrap_or(defaults.favorites),
            saved_searches: get("CLASSIFIEDS_LIST_SAVED_SEARCHES")
                .unwrap_or(defaults.saved_searches),
            messages: get("CLASSIFIEDS_LIST_MESSAGES").unwrap_or(defaults.messages),
        };

        Ok(Self {
            client_id: require("CLASSIFIEDS_CLIENT_ID")?,
            tenant_id: require("CLASSIFIEDS_TENANT_ID")?,
            redirect_uri,
            post_logout_redirect_uri,
            site_id: get(SITE_ID_VAR),
            graph_base_url: get("CLASSIFIEDS_GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            access_token: get("CLASSIFIEDS_ACCESS_TOKEN"),
            client_secret: get("CLASSIFIEDS_CLIENT_SECRET"),
            list_ids,
        })
    }

    pub fn require_site_id(&self) -> Result<&str> {
        self.site_id
            .as_deref()
            .ok_or_else(|| ClassifiedsError::Config(format!("{SITE_ID_VAR} must be set")))
    }

    pub fn authority(&self) -> String {
        format!("https://login.microsoftonline.com/{}", self.tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn required_values_and_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLASSIFIEDS_CLIENT_ID", "client"),
            ("CLASSIFIEDS_TENANT_ID", "contoso"),
            ("CLASSIFIEDS_SITE_ID", "site-1"),
        ]))
        .unwrap();

        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.post_logout_redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.graph_base_url, DEFAULT_GRAPH_BASE_URL);
        assert_eq!(config.list_ids, ListIds::default());
        assert_eq!(config.authority(), "https://login.microsoftonline.com/contoso");
        assert!(config.access_token.is_none());
    }

    #[test]
    fn missing_tenant_is_reported_by_name() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CLASSIFIEDS_CLIENT_ID", "client"),
            ("CLASSIFIEDS_SITE_ID", "site-1"),
        ]))
        .unwrap_err();

        assert_matches!(
            err,
            ClassifiedsError::Config(msg) if msg.contains("CLASSIFIEDS_TENANT_ID")
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLASSIFIEDS_CLIENT_ID", "client"),
            ("CLASSIFIEDS_TENANT_ID", "contoso"),
            ("CLASSIFIEDS_SITE_ID", "site-1"),
            ("CLASSIFIEDS_ACCESS_TOKEN", "  "),
            ("CLASSIFIEDS_LIST_ADS", "0b6f-guid"),
        ]))
        .unwrap();

        assert!(config.access_token.is_none());
        assert_eq!(config.list_ids.ads, "0b6f-guid");
        assert_eq!(config.list_ids.messages, "Messages");
    }

    #[test]
    fn site_is_only_needed_for_list_access() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLASSIFIEDS_CLIENT_ID", "client"),
            ("CLASSIFIEDS_TENANT_ID", "contoso"),
        ]))
        .unwrap();

        assert!(config.site_id.is_none());
        assert_matches!(
            config.require_site_id(),
            Err(ClassifiedsError::Config(msg)) if msg.contains("CLASSIFIEDS_SITE_ID")
        );

        let config = AppConfig {
            site_id: Some("contoso.sharepoint.com,abc,def".to_string()),
            ..config
        };
        assert_eq!(config.require_site_id().unwrap(), "contoso.sharepoint.com,abc,def");
    }
}
