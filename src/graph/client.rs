use crate::error::{ClassifiedsError, Result};
use crate::graph::traits::{GraphTransport, TokenProvider};
use crate::graph::types::{GraphRequest, GraphResponse, RequestBody};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, IF_MATCH};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Authenticated Microsoft Graph client
#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GraphClient {
    /// Create a client bound to `base_url` that authenticates every request
    /// with tokens from `tokens`.
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("classifieds/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http(http, base_url, tokens))
    }

    /// Use an already configured reqwest client.
    pub fn with_http(
        http: Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &GraphRequest) -> String {
        if request.is_absolute() {
            request.path.clone()
        } else {
            format!("{}/{}", self.base_url, request.path.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl GraphTransport for GraphClient {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse> {
        let url = self.url_for(&request);
        let token = self.tokens.access_token().await?;

        debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(etag) = &request.if_match {
            builder = builder.header(IF_MATCH, etag.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Bytes {
                content,
                content_type,
            } => builder.header(CONTENT_TYPE, content_type).body(content),
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !status.is_success() {
            warn!("Graph returned status {} for {} {}", status, request.method, url);
            return Err(ClassifiedsError::from_graph_body(status.as_u16(), &body));
        }

        Ok(GraphResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::auth::StaticToken;
    use crate::graph::fake::StubServer;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn client(server: &StubServer) -> GraphClient {
        let http = Client::builder().no_proxy().build().unwrap();
        GraphClient::with_http(
            http,
            format!("{}/v1.0/", server.url()),
            Arc::new(StaticToken::new("token-123")),
        )
    }

    #[tokio::test]
    async fn base_url_drops_trailing_slash() {
        let server = StubServer::start(Vec::new()).await;
        assert_eq!(client(&server).base_url(), format!("{}/v1.0", server.url()));
    }

    #[tokio::test]
    async fn patch_carries_bearer_token_if_match_and_json() {
        let server = StubServer::start(vec![(200, json!({ "ViewCount": 4 }))]).await;

        let request = GraphRequest::patch(
            "/sites/site-1/lists/ClassifiedAds/items/7/fields",
            json!({ "ViewCount": 4 }),
        )
        .if_match("\"abc,3\"");
        let response = client(&server).send(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body["ViewCount"], 4);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let raw = &requests[0];
        assert!(raw.starts_with(
            "PATCH /v1.0/sites/site-1/lists/ClassifiedAds/items/7/fields HTTP/1.1\r\n"
        ));
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("authorization: bearer token-123\r\n"));
        assert!(lower.contains("if-match: \"abc,3\"\r\n"));
        assert!(lower.contains("accept: application/json\r\n"));
        assert!(lower.contains("content-type: application/json\r\n"));
        assert!(raw.ends_with(r#"{"ViewCount":4}"#));
    }

    #[tokio::test]
    async fn query_and_extra_headers_are_sent() {
        let server = StubServer::start(vec![(200, json!({ "value": [] }))]).await;

        let request = GraphRequest::get("sites/site-1/lists/Favorites/items")
            .query("$expand", "fields")
            .header("Prefer", "HonorNonIndexedQueriesWarningMayFailRandomly");
        client(&server).send(request).await.unwrap();

        let raw = &server.requests()[0];
        assert!(raw.starts_with(
            "GET /v1.0/sites/site-1/lists/Favorites/items?%24expand=fields HTTP/1.1\r\n"
        ));
        assert!(raw
            .to_ascii_lowercase()
            .contains("prefer: honornonindexedquerieswarningmayfailrandomly\r\n"));
    }

    #[tokio::test]
    async fn absolute_next_link_is_used_as_is() {
        let server = StubServer::start(vec![(200, json!({ "value": [] }))]).await;
        let next_link = format!("{}/v1.0/sites/s/lists/l/items?%24skiptoken=abc", server.url());

        client(&server).send(GraphRequest::get(next_link)).await.unwrap();

        let raw = &server.requests()[0];
        assert!(raw.starts_with("GET /v1.0/sites/s/lists/l/items?%24skiptoken=abc HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn image_bytes_keep_their_content_type() {
        let server = StubServer::start(vec![(201, json!({ "webUrl": "https://x/y.png" }))]).await;

        let request =
            GraphRequest::put_bytes("/drive/items/1/content", b"PNG".to_vec(), "image/png");
        let response = client(&server).send(request).await.unwrap();

        assert_eq!(response.status, 201);
        let raw = &server.requests()[0];
        assert!(raw.to_ascii_lowercase().contains("content-type: image/png\r\n"));
        assert!(raw.ends_with("\r\n\r\nPNG"));
    }

    #[tokio::test]
    async fn empty_success_body_reads_as_null() {
        let server = StubServer::start(vec![(200, Value::Null)]).await;

        let response = client(&server)
            .send(GraphRequest::delete("/sites/s/lists/l/items/1"))
            .await
            .unwrap();

        assert_eq!(response.body, Value::Null);
        assert!(server.requests()[0].starts_with("DELETE /v1.0/sites/s/lists/l/items/1 HTTP/1.1"));
    }

    #[tokio::test]
    async fn error_envelope_becomes_graph_error() {
        let server = StubServer::start(vec![(
            404,
            json!({ "error": { "code": "itemNotFound", "message": "Item not found" } }),
        )])
        .await;

        let err = client(&server)
            .send(GraphRequest::get("/sites/s/lists/l/items/missing"))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            ClassifiedsError::Graph { status: 404, ref code, ref message }
                if code == "itemNotFound" && message == "Item not found"
        );
    }
}
