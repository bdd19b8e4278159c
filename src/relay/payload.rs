//! Payload normalization.
//!
//! Maps whatever object the frontend posted onto the chat-completions
//! schema the upstream expects. Bodies that already look like a provider
//! payload (they carry `messages` or `model`) are forwarded untouched;
//! anything else becomes a single user message built from `prompt`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::UpstreamConfig;

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body synthesized from a bare prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<Value>,
}

/// Body sent upstream for one inbound request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpstreamPayload {
    /// The client already sent a provider-shaped body.
    Passthrough(Map<String, Value>),
    Synthesized(ChatCompletionRequest),
}

impl UpstreamPayload {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, UpstreamPayload::Passthrough(_))
    }

    /// Model named in the payload, if any.
    pub fn model(&self) -> Option<&str> {
        match self {
            UpstreamPayload::Passthrough(body) => body.get("model").and_then(Value::as_str),
            UpstreamPayload::Synthesized(request) => Some(&request.model),
        }
    }
}

/// Decode an inbound request body into a JSON object.
///
/// An empty body is an empty object, and so is any JSON value that is not
/// an object. Only text that is not JSON at all is an error.
pub fn parse_inbound(bytes: &[u8]) -> Result<Map<String, Value>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Turns inbound bodies into upstream payloads using configured defaults.
#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    default_model: String,
    default_max_tokens: u32,
    default_temperature: f64,
    default_prompt: String,
}

impl PayloadNormalizer {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            default_max_tokens: config.default_max_tokens,
            default_temperature: config.default_temperature,
            default_prompt: config.default_prompt.clone(),
        }
    }

    /// Normalize one inbound body. Never fails: bad field types fall back
    /// to defaults.
    pub fn normalize(&self, body: Map<String, Value>) -> UpstreamPayload {
        if body.contains_key("messages") || body.contains_key("model") {
            return UpstreamPayload::Passthrough(body);
        }

        UpstreamPayload::Synthesized(ChatCompletionRequest {
            model: self.default_model.clone(),
            messages: vec![ChatMessage::user(self.prompt_text(body.get("prompt")))],
            max_tokens: body
                .get("max_tokens")
                .and_then(coerce_max_tokens)
                .unwrap_or(self.default_max_tokens),
            temperature: body
                .get("temperature")
                .and_then(Value::as_f64)
                .map(|t| t.clamp(0.0, 2.0))
                .unwrap_or(self.default_temperature),
            image_url: present(&body, "image_url"),
            image_base64: present(&body, "image_base64"),
        })
    }

    fn prompt_text(&self, prompt: Option<&Value>) -> String {
        match prompt {
            None | Some(Value::Null) => self.default_prompt.clone(),
            Some(Value::String(s)) if s.is_empty() => self.default_prompt.clone(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

fn present(body: &Map<String, Value>, key: &str) -> Option<Value> {
    body.get(key).filter(|v| !v.is_null()).cloned()
}

fn coerce_max_tokens(value: &Value) -> Option<u32> {
    let tokens = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };

    u32::try_from(tokens).ok().filter(|t| *t > 0)
}
