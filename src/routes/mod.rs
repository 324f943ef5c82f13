/**
 * Routes Module
 * API route handlers
 */
use axum::http::{header, HeaderName};
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod blocks;
pub mod contact;
pub mod health;
pub mod media;
pub mod navigation;
pub mod pages;
pub mod posts;
pub mod profile;
pub mod public;
pub mod rss;

pub use crate::error::ErrorResponse;

/// Success response (for delete and reorder)
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Cache header for anonymous, read-only responses.
pub fn public_cache(max_age_secs: u64) -> [(HeaderName, String); 1] {
    [(
        header::CACHE_CONTROL,
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            max_age_secs,
            max_age_secs * 10
        ),
    )]
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, value)
    }

    pub fn json_request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_cache_header() {
        let [(name, value)] = public_cache(60);
        assert_eq!(name, header::CACHE_CONTROL);
        assert_eq!(value, "public, max-age=60, stale-while-revalidate=600");
    }
}
