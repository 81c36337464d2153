use crate::config::AppConfig;
use crate::error::{ClassifiedsError, Result};
use crate::graph::traits::TokenProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Delegated permissions requested at sign-in.
pub const LOGIN_SCOPES: [&str; 6] = [
    "User.Read",
    "Sites.ReadWrite.All",
    "Sites.Manage.All",
    "User.ReadWrite.All",
    "Chat.ReadWrite",
    "ChatMessage.Send",
];

const APP_ONLY_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before Entra ID says they expire.
const EXPIRY_SKEW_SECS: i64 = 60;

/// A bearer token obtained out of band (e.g. from an interactive sign-in).
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// App-only token provider using the OAuth2 client-credentials grant.
pub struct ClientSecretCredential {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        authority: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self::with_http(http, authority, client_id, client_secret))
    }

    pub fn with_http(
        http: Client,
        authority: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth2/v2.0/token", authority.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", APP_ONLY_SCOPE),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClassifiedsError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifiedsError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClassifiedsError::Auth(format!("invalid token response: {e}")))?;

        let lifetime = token.expires_in.unwrap_or(3600);
        info!("Acquired app-only Graph token valid for {}s", lifetime);
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(lifetime - EXPIRY_SKEW_SECS),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
            debug!("Cached Graph token expired, requesting a new one");
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Interactive sign-in URL (authorization-code flow) for the configured app.
pub fn authorize_url(config: &AppConfig, state: &str) -> Result<String> {
    let scopes = LOGIN_SCOPES.join(" ");
    let url = Url::parse_with_params(
        &format!("{}/oauth2/v2.0/authorize", config.authority()),
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_mode", "query"),
            ("scope", scopes.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| ClassifiedsError::Config(format!("invalid authority URL: {e}")))?;
    Ok(url.into())
}

/// Sign-out URL that returns the user to the post-logout redirect URI.
pub fn logout_url(config: &AppConfig) -> Result<String> {
    let url = Url::parse_with_params(
        &format!("{}/oauth2/v2.0/logout", config.authority()),
        &[(
            "post_logout_redirect_uri",
            config.post_logout_redirect_uri.as_str(),
        )],
    )
    .map_err(|e| ClassifiedsError::Config(format!("invalid authority URL: {e}")))?;
    Ok(url.into())
}
