//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → middleware/cors.rs (CORS headers, preflight short-circuit)
//!     → relay pipeline (normalize → upstream call)
//!     → response.rs (classify upstream reply)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{ClientReply, ReplyBody, ResponseClassifier};
pub use server::{HttpServer, HEALTH_PATH, RELAY_PATH};
