//! Middleware stack for the API server.
//!
//! Layer order: Request → CORS → Tracing → Timeout → Body limit → Handler

pub mod cors;
pub mod timeout;
pub mod tracing;

pub use cors::create_cors_layer;
pub use timeout::TimeoutLayer;
pub use self::tracing::TracingLayer;
