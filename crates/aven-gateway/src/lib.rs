//! HTTP chat endpoint with health check, per-IP rate limiting and body limits.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::{ChatRequest, GatewayServer};
