/**
 * Block Routes
 */
use axum::Json;
use serde_json::Value;

use crate::content::{BlockContent, BlockType};
use crate::error::{ApiError, ApiPath, ApiResult};

/// GET /api/blocks/defaults/{block_type}
///
/// Starter content the editor inserts for a newly added block.
pub async fn block_defaults(ApiPath(block_type): ApiPath<String>) -> ApiResult<Json<Value>> {
    let block_type: BlockType = block_type
        .parse()
        .map_err(|e: crate::content::BlockError| ApiError::not_found(e.to_string()))?;
    let starter = BlockContent::starter(block_type)?;
    Ok(Json(starter.to_value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use axum::http::StatusCode;
    use crate::routes::test_support::{empty_request, send};

    fn router() -> Router {
        Router::new().route("/api/blocks/defaults/{block_type}", get(block_defaults))
    }

    #[tokio::test]
    async fn test_every_supported_type_has_valid_defaults() {
        for block_type in BlockType::ALL.iter().filter(|t| !t.is_reserved()) {
            let uri = format!("/api/blocks/defaults/{}", block_type.as_str());
            let (status, body) = send(router(), empty_request("GET", &uri, None)).await;
            assert_eq!(status, StatusCode::OK, "{}", block_type);
            assert!(BlockContent::parse_valid(*block_type, body).is_ok(), "{}", block_type);
        }
    }

    #[tokio::test]
    async fn test_hero_defaults() {
        let (_, body) = send(router(), empty_request("GET", "/api/blocks/defaults/hero", None)).await;
        assert_eq!(body["title"], "Hero Title");
    }

    #[tokio::test]
    async fn test_unknown_type_is_not_found() {
        let (status, _) = send(router(), empty_request("GET", "/api/blocks/defaults/carousel", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reserved_type_is_bad_request() {
        let (status, _) = send(router(), empty_request("GET", "/api/blocks/defaults/gallery", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
