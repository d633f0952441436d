//! Request and response bodies.

pub mod stats;
pub mod url;

pub use stats::{ClickView, ReferrerView, StatsResponse};
pub use url::{CreateUrlRequest, CreateUrlResponse, DeleteUrlResponse};

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}
