/**
 * Authentication Routes
 * Single-admin password login issuing short-lived JWTs
 */
use axum::{extract::State, http::HeaderMap, Json};
use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::AppState;

/// Delay applied to every failed login attempt.
const FAILED_LOGIN_DELAY_MS: u64 = 500;

const ADMIN_SUBJECT: &str = "admin";

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create access token
pub fn create_access_token(
    config: &AuthConfig,
) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(config.token_ttl_hours);

    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        role: ADMIN_SUBJECT.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok((token, exp))
}

/// Verify and decode access token
pub fn verify_access_token(
    config: &AuthConfig,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Gate for every admin handler.
pub fn verify_auth(config: &AuthConfig, headers: &HeaderMap) -> ApiResult<Claims> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Authorization required".to_string()))?;

    verify_access_token(config, token).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })
}

async fn password_matches(password: String, hash: String) -> bool {
    if hash.is_empty() {
        return false;
    }
    // bcrypt is CPU-bound; keep the async executor free.
    tokio::task::spawn_blocking(move || verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let auth = &state.config.auth;
    if !password_matches(payload.password, auth.admin_password_hash.clone()).await {
        tracing::warn!("Failed admin login attempt");
        tokio::time::sleep(std::time::Duration::from_millis(FAILED_LOGIN_DELAY_MS)).await;
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let (access_token, expires_at) = create_access_token(auth).map_err(|e| {
        tracing::error!("Failed to create access token: {}", e);
        ApiError::Internal("Failed to create token".to_string())
    })?;

    tracing::info!("Successful admin login");
    Ok(Json(LoginResponse {
        success: true,
        access_token,
        expires_at,
    }))
}

/// POST /api/auth/verify
pub async fn verify_token(State(state): State<AppState>, headers: HeaderMap) -> Json<VerifyResponse> {
    let response = match verify_auth(&state.config.auth, &headers) {
        Ok(claims) => VerifyResponse {
            success: true,
            is_valid: true,
            expires_at: DateTime::from_timestamp(claims.exp, 0),
            error: None,
        },
        Err(e) => VerifyResponse {
            success: false,
            is_valid: false,
            expires_at: None,
            error: Some(e.to_string()),
        },
    };
    Json(response)
}
