//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use llm_relay::config::RelayConfig;
use llm_relay::http::HttpServer;
use llm_relay::lifecycle::Shutdown;
use serde_json::Value;
use tokio::net::TcpListener;

pub const UPSTREAM_PATH: &str = "/api/v1/chat/completions";
pub const TEST_KEY: &str = "sk-test-key";

/// What the mock upstream answers for one call.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request as seen by the mock upstream.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedCall {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub body: Value,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    recorded: Arc<Mutex<Vec<RecordedCall>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, UPSTREAM_PATH)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.recorded.lock().unwrap().clone()
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Start a mock chat-completions upstream. `respond` gets the 0-based call index.
pub async fn start_programmable_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(u32) -> MockReply + Send + Sync + 'static,
{
    let calls = Arc::new(AtomicU32::new(0));
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let handler = {
        let calls = calls.clone();
        let recorded = recorded.clone();
        move |headers: HeaderMap, body: Bytes| {
            let calls = calls.clone();
            let recorded = recorded.clone();
            let respond = respond.clone();
            async move {
                let index = calls.fetch_add(1, Ordering::SeqCst);
                recorded.lock().unwrap().push(RecordedCall {
                    authorization: header_string(&headers, header::AUTHORIZATION.as_str()),
                    content_type: header_string(&headers, header::CONTENT_TYPE.as_str()),
                    title: header_string(&headers, "x-title"),
                    body: serde_json::from_slice(&body).unwrap_or(Value::Null),
                });

                let reply = respond(index);
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                (StatusCode::from_u16(reply.status).unwrap(), reply.body).into_response()
            }
        }
    };

    let app = Router::new().route(UPSTREAM_PATH, post(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream { addr, calls, recorded }
}

/// Mock upstream that always answers the same way.
#[allow(dead_code)]
pub async fn start_fixed_upstream(status: u16, body: &'static str) -> MockUpstream {
    start_programmable_upstream(move |_| MockReply::new(status, body)).await
}

/// Test configuration pointing at `upstream` with fast retries.
pub fn relay_config(upstream: &MockUpstream) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.endpoint = upstream.url();
    config.upstream.api_key = Some(TEST_KEY.into());
    config.retries.backoff_step_ms = 10;
    config.timeouts.attempt_ms = 5_000;
    config
}

/// A relay serving on an ephemeral port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl RunningRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(config: RelayConfig) -> RunningRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningRelay { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
