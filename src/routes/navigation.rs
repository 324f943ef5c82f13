/**
 * Navigation Route
 * Sidebar page list for the public site
 */
use axum::{extract::State, response::IntoResponse, Json};

use crate::content::{flatten, HierarchicalPage};
use crate::db::models::Page;
use crate::db::pages;
use crate::routes::public_cache;
use crate::AppState;

/// GET /api/navigation
///
/// Published pages in display order with their nesting level. Navigation
/// must never block a page render, so a missing database or a failed
/// query yields an empty list.
pub async fn navigation(State(state): State<AppState>) -> impl IntoResponse {
    let items: Vec<HierarchicalPage<Page>> = match state.db.as_deref() {
        Some(pool) => match pages::list_published(pool).await {
            Ok(published) => flatten(&published),
            Err(e) => {
                tracing::warn!(error = %e, "navigation query failed, serving empty list");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    (public_cache(state.config.public_cache_secs), Json(items))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{empty_request, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_navigation_without_database_is_empty() {
        let app = crate::create_app(crate::test_state());
        let (status, body) = send(app, empty_request("GET", "/api/navigation", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }
}
