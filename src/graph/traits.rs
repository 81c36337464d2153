use crate::error::Result;
use crate::graph::types::{GraphRequest, GraphResponse};
use async_trait::async_trait;

/// Sends Graph requests. `GraphClient` is the HTTP implementation; the data
/// service only depends on this trait.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Send a request. Non-2xx statuses come back as `ClassifiedsError::Graph`.
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse>;
}

/// Source of bearer tokens for Graph
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}
