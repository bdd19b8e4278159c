//! Relay pipeline core.
//!
//! # Data Flow
//! ```text
//! inbound JSON body
//!     → payload.rs (normalize into an UpstreamPayload)
//!     → upstream.rs (bearer call with deadline + bounded retry)
//!     → http/response.rs (classify status + raw text for the client)
//! ```
//!
//! Failures at any step become a `RelayError`, which renders itself as a
//! JSON error envelope.

pub mod error;
pub mod payload;
pub mod upstream;

pub use error::{AttemptFailure, RelayError};
pub use payload::{parse_inbound, ChatCompletionRequest, ChatMessage, PayloadNormalizer, UpstreamPayload};
pub use upstream::{UpstreamClient, UpstreamReply};
