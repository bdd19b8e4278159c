//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, panic catcher, CORS, body limit)
//! - Answer unknown routes and wrong methods with JSON envelopes
//! - Bind server to listener
//! - Run the relay pipeline for `POST /api/myapi`
//! - Answer liveness probes on `GET /_health`

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::middleware::{ingress_filter, CorsPolicy};
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::http::response::{error_body, ResponseClassifier};
use crate::observability::metrics;
use crate::relay::{parse_inbound, PayloadNormalizer, RelayError, UpstreamClient};

/// Path of the relay endpoint.
pub const RELAY_PATH: &str = "/api/myapi";
/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/_health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub normalizer: Arc<PayloadNormalizer>,
    pub upstream: Arc<UpstreamClient>,
    pub classifier: Arc<ResponseClassifier>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails only if the outbound HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config)?;
        if !upstream.has_api_key() {
            tracing::warn!("No upstream API key configured; relay requests will answer 500");
        }

        let state = AppState {
            normalizer: Arc::new(PayloadNormalizer::new(&config.upstream)),
            upstream: Arc::new(upstream),
            classifier: Arc::new(ResponseClassifier::new(&config.responses)),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let routes = Router::new()
            .route(RELAY_PATH, post(relay_handler))
            .route(HEALTH_PATH, get(health_handler))
            .fallback(not_found)
            .method_not_allowed_fallback(method_not_allowed)
            .with_state(state);

        Self::with_layers(routes, config)
    }

    /// Wrap routes in the middleware stack, outermost last.
    ///
    /// The body limit is enforced by the `Bytes` extractor so oversize
    /// bodies reach `relay_handler` as a rejection and leave as JSON.
    fn with_layers(routes: Router, config: &RelayConfig) -> Router {
        let cors = Arc::new(CorsPolicy::new(
            &config.cors,
            config.listener.close_connections,
        ));

        routes
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(cors, ingress_filter))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint = %self.config.upstream.endpoint,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Relay handler: normalize, call upstream, classify.
async fn relay_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers);

    let outcome = match body {
        Ok(body) => relay(&state, &request_id, &body).await,
        Err(rejection) => Err(RelayError::from(rejection)),
    };

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                status = err.status().as_u16(),
                error = %err,
                "Relay failed"
            );
            err.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start_time);
    response
}

async fn relay(state: &AppState, request_id: &str, body: &[u8]) -> Result<Response, RelayError> {
    let inbound = parse_inbound(body).map_err(|e| RelayError::InvalidBody(e.to_string()))?;
    let payload = state.normalizer.normalize(inbound);

    tracing::debug!(
        request_id = %request_id,
        passthrough = payload.is_passthrough(),
        model = payload.model().unwrap_or("-"),
        "Payload normalized"
    );

    let reply = state.upstream.send(&payload, request_id).await?;
    let client_reply = state.classifier.classify(reply.status, &reply.body);

    if client_reply.status.is_success() {
        tracing::info!(request_id = %request_id, upstream_status = reply.status, "Relayed");
    } else {
        tracing::warn!(
            request_id = %request_id,
            upstream_status = reply.status,
            status = client_reply.status.as_u16(),
            "Upstream reply surfaced as error"
        );
    }

    Ok(client_reply.into_response())
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(error_body("not_found", "no such route")),
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(error_body("method_not_allowed", "method not supported on this route")),
    )
}

/// Convert a handler panic into the standard 502 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");
    metrics::record_panic();
    RelayError::Internal("unexpected failure while handling the request".into()).into_response()
}
