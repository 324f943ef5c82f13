/**
 * Contact Route
 * Accepts contact form submissions and records them in the log
 */
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::routes::SuccessResponse;

const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

lazy_static::lazy_static! {
    static ref EMAIL: regex::Regex = regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn validate_contact(req: &ContactRequest) -> ApiResult<()> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::bad_request("Name, email and message are required"));
    }
    if !EMAIL.is_match(req.email.trim()) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if req.message.len() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request("Message is too long"));
    }
    Ok(())
}

/// POST /api/contact
pub async fn submit_contact(ApiJson(payload): ApiJson<ContactRequest>) -> ApiResult<Json<SuccessResponse>> {
    validate_contact(&payload)?;
    tracing::info!(
        name = %payload.name.trim(),
        email = %payload.email.trim(),
        message_len = payload.message.len(),
        "contact form submission"
    );
    Ok(Json(SuccessResponse::ok()))
}
