//! Test doubles: a scripted in-memory transport for service tests and a
//! one-request-per-connection HTTP stub for the reqwest layer.

use crate::error::{ClassifiedsError, Result};
use crate::graph::traits::GraphTransport;
use crate::graph::types::{GraphRequest, GraphResponse};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

enum Reply {
    Ok(GraphResponse),
    Fail(u16, Value),
}

/// Replies to requests in the order they were scripted and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GraphRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, body: Value) -> Self {
        self.push(Reply::Ok(GraphResponse::ok(body)))
    }

    pub fn reply_created(self, body: Value) -> Self {
        self.push(Reply::Ok(GraphResponse::created(body)))
    }

    pub fn reply_empty(self) -> Self {
        self.push(Reply::Ok(GraphResponse::no_content()))
    }

    pub fn fail(self, status: u16, code: &str) -> Self {
        self.push(Reply::Fail(
            status,
            json!({"error": {"code": code, "message": format!("scripted {status}")}}),
        ))
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<GraphRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl GraphTransport for ScriptedTransport {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse> {
        let summary = format!("{} {}", request.method, request.path);
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Fail(status, body)) => {
                Err(ClassifiedsError::from_graph_body(status, &body))
            }
            None => panic!("no scripted reply left for {summary}"),
        }
    }
}

/// Serves the given `(status, body)` responses in order, one per
/// connection, and keeps the raw text of every request it read. Once the
/// responses run out the listener is dropped and further connects fail.
pub struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let raw = read_request(&mut socket).await;
                log.lock().unwrap().push(raw);

                let body = if body.is_null() { String::new() } else { body.to_string() };
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { url, requests }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);

        let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&raw[..head_end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if raw.len() >= head_end + 4 + body_len {
            break;
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}
