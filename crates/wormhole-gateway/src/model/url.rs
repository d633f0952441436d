use jiff::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub original_url: String,
    pub custom_alias: Option<String>,
    /// Lifetime of the link from now; omitted means it never expires.
    pub expire_in_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateUrlResponse {
    pub success: bool,
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
pub struct DeleteUrlResponse {
    pub success: bool,
    pub message: String,
}
