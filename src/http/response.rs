//! Response classification.
//!
//! # Responsibilities
//! - Turn the raw upstream (status, body text) into the client response
//! - Stop HTML error pages from reaching JSON-consuming clients
//! - Surface upstream error statuses instead of masking them
//! - Guarantee well-formed JSON on success, even for non-JSON bodies
//!
//! # Design Decisions
//! - Classification is a pure function of (status, body); same input, same reply
//! - Successful JSON is relayed byte-for-byte, not re-serialized
//! - HTML detection wins over every status check

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use crate::config::{EmptySuccess, ErrorPassthrough, ResponseConfig};

/// Standard error envelope: `{"error": code, "message": message}`.
pub fn error_body(code: &str, message: &str) -> Value {
    json!({ "error": code, "message": message })
}

/// First `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Body of a client reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    /// Text already known to be valid JSON, sent verbatim.
    RawJson(String),
    Text(String),
}

/// Client-facing response produced by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientReply {
    pub status: StatusCode,
    pub body: ReplyBody,
}

impl ClientReply {
    fn json(status: StatusCode, body: Value) -> Self {
        Self { status, body: ReplyBody::Json(body) }
    }
}

impl IntoResponse for ClientReply {
    fn into_response(self) -> Response {
        match self.body {
            ReplyBody::Json(value) => (self.status, axum::Json(value)).into_response(),
            ReplyBody::RawJson(text) => (
                self.status,
                [(header::CONTENT_TYPE, "application/json")],
                text,
            )
                .into_response(),
            ReplyBody::Text(text) => (
                self.status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                text,
            )
                .into_response(),
        }
    }
}

/// Maps raw upstream replies onto client replies.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    error_passthrough: ErrorPassthrough,
    preview_chars: usize,
    empty_success: EmptySuccess,
}

impl ResponseClassifier {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            error_passthrough: config.error_passthrough,
            preview_chars: config.html_preview_chars,
            empty_success: config.empty_success,
        }
    }

    pub fn classify(&self, status: u16, body: &str) -> ClientReply {
        let trimmed = body.trim();

        if trimmed.starts_with('<') {
            let mut envelope = error_body(
                "upstream_html_response",
                "upstream returned an HTML page instead of JSON",
            );
            envelope["upstream_status"] = json!(status);
            envelope["preview"] = json!(preview(trimmed, self.preview_chars));
            return ClientReply::json(StatusCode::BAD_GATEWAY, envelope);
        }

        if !(200..300).contains(&status) {
            return self.error_reply(status, body);
        }

        if trimmed.is_empty() {
            return match self.empty_success {
                EmptySuccess::Envelope => ClientReply::json(StatusCode::OK, json!({ "ok": true, "raw": body })),
                EmptySuccess::Null => ClientReply::json(StatusCode::OK, Value::Null),
            };
        }

        match serde_json::from_str::<Value>(body) {
            Ok(_) => ClientReply {
                status: StatusCode::OK,
                body: ReplyBody::RawJson(body.to_string()),
            },
            Err(_) => ClientReply::json(StatusCode::OK, json!({ "ok": true, "raw": body })),
        }
    }

    fn error_reply(&self, status: u16, body: &str) -> ClientReply {
        let Ok(code) = StatusCode::from_u16(status) else {
            let mut envelope = error_body("upstream_invalid_status", "upstream returned an invalid status code");
            envelope["upstream_status"] = json!(status);
            return ClientReply::json(StatusCode::BAD_GATEWAY, envelope);
        };

        let parsed = serde_json::from_str::<Value>(body).ok();
        match self.error_passthrough {
            ErrorPassthrough::Raw => ClientReply {
                status: code,
                body: match parsed {
                    Some(_) => ReplyBody::RawJson(body.to_string()),
                    None => ReplyBody::Text(body.to_string()),
                },
            },
            ErrorPassthrough::Json => {
                let mut envelope = error_body("upstream_error", &format!("upstream answered {}", status));
                envelope["upstream_status"] = json!(status);
                envelope["body"] = parsed.unwrap_or_else(|| json!(body));
                ClientReply::json(code, envelope)
            }
        }
    }
}
