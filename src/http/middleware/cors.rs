//! Ingress filter: cross-origin policy and preflight short-circuit.
//!
//! Every request passes through here first. `OPTIONS` requests are answered
//! with `204 No Content` and never reach a handler; all other responses get
//! the CORS headers added on the way out.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{CorsConfig, CorsMode, OriginFallback};

/// Outcome of matching the request origin against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// Reflect this origin and allow credentials.
    Echo(HeaderValue),
    /// `Access-Control-Allow-Origin: *`, no credentials.
    Wildcard,
    /// No allow-origin header at all.
    Deny,
}

/// Compiled CORS policy, built once from configuration.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    mode: CorsMode,
    allowed_origins: Vec<HeaderValue>,
    fallback: OriginFallback,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    mirror_request_headers: bool,
    expose_headers: Option<HeaderValue>,
    max_age: Option<HeaderValue>,
    close_connections: bool,
}

fn join(values: &[String]) -> Option<HeaderValue> {
    if values.is_empty() {
        return None;
    }
    HeaderValue::from_str(&values.join(", ")).ok()
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig, close_connections: bool) -> Self {
        Self {
            mode: config.mode,
            allowed_origins: config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o.trim_end_matches('/')).ok())
                .collect(),
            fallback: config.fallback,
            allow_methods: join(&config.allow_methods),
            allow_headers: join(&config.allow_headers),
            mirror_request_headers: config.mirror_request_headers,
            expose_headers: join(&config.expose_headers),
            max_age: config.max_age_secs.map(HeaderValue::from),
            close_connections,
        }
    }

    /// Decide the allow-origin answer for a request origin.
    pub fn decide(&self, origin: Option<&HeaderValue>) -> OriginDecision {
        match (self.mode, origin) {
            (CorsMode::Wildcard, _) | (_, None) => OriginDecision::Wildcard,
            (CorsMode::Echo, Some(origin)) => OriginDecision::Echo(origin.clone()),
            (CorsMode::Allowlist, Some(origin)) => {
                let allowed = self
                    .allowed_origins
                    .iter()
                    .any(|a| a.as_bytes().eq_ignore_ascii_case(origin.as_bytes()));
                if allowed {
                    OriginDecision::Echo(origin.clone())
                } else {
                    match self.fallback {
                        OriginFallback::Wildcard => OriginDecision::Wildcard,
                        OriginFallback::Deny => OriginDecision::Deny,
                    }
                }
            }
        }
    }

    /// Write the CORS headers (and the close hint) onto a response.
    pub fn apply(
        &self,
        headers: &mut HeaderMap,
        decision: &OriginDecision,
        requested_headers: Option<&HeaderValue>,
        preflight: bool,
    ) {
        match decision {
            OriginDecision::Echo(origin) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
            OriginDecision::Wildcard => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            OriginDecision::Deny => {}
        }

        // Outside wildcard mode the allow-origin answer depends on the request origin.
        if self.mode != CorsMode::Wildcard {
            headers.append(header::VARY, HeaderValue::from_static("origin"));
        }

        if let Some(methods) = &self.allow_methods {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }

        let allow_headers = match requested_headers {
            Some(requested) if self.mirror_request_headers => Some(requested),
            _ => self.allow_headers.as_ref(),
        };
        if let Some(allow_headers) = allow_headers {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers.clone());
        }

        if let Some(expose) = &self.expose_headers {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone());
        }

        if preflight {
            if let Some(max_age) = &self.max_age {
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age.clone());
            }
        }

        if self.close_connections {
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
    }
}

/// Middleware applying the CORS policy to every request.
pub async fn ingress_filter(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = policy.decide(request.headers().get(header::ORIGIN));
    let requested_headers = request
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned();
    let preflight = request.method() == Method::OPTIONS;

    if decision == OriginDecision::Deny {
        tracing::debug!(
            origin = ?request.headers().get(header::ORIGIN),
            "Origin not in allowlist"
        );
    }

    let mut response = if preflight {
        tracing::debug!(path = %request.uri().path(), "Answering CORS preflight");
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    policy.apply(
        response.headers_mut(),
        &decision,
        requested_headers.as_ref(),
        preflight,
    );
    response
}
