pub mod auth;
pub mod client;
pub mod odata;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use auth::{authorize_url, logout_url, ClientSecretCredential, StaticToken, LOGIN_SCOPES};
pub use client::GraphClient;
pub use odata::Filter;
pub use traits::{GraphTransport, TokenProvider};
pub use types::{GraphRequest, GraphResponse, RequestBody};

use crate::config::AppConfig;
use crate::error::{ClassifiedsError, Result};
use std::sync::Arc;
use tracing::info;

/// Build a Graph client for `config`: a delegated access token wins over the
/// app-only client-credentials flow.
pub fn connect(config: &AppConfig) -> Result<GraphClient> {
    let tokens: Arc<dyn TokenProvider> = match (&config.access_token, &config.client_secret) {
        (Some(token), _) => {
            info!("Using delegated access token from the environment");
            Arc::new(StaticToken::new(token.clone()))
        }
        (None, Some(secret)) => {
            info!("Using client-credentials flow for tenant {}", config.tenant_id);
            Arc::new(ClientSecretCredential::new(
                &config.authority(),
                config.client_id.clone(),
                secret.clone(),
            )?)
        }
        (None, None) => {
            return Err(ClassifiedsError::Config(
                "set CLASSIFIEDS_ACCESS_TOKEN or CLASSIFIEDS_CLIENT_SECRET to sign in".to_string(),
            ))
        }
    };

    GraphClient::new(config.graph_base_url.clone(), tokens)
}
