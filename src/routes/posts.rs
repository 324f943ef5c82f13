/**
 * Post Routes
 * Admin CRUD for posts
 */
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::content::is_hex_color;
use crate::db::models::{Post, PostStatus};
use crate::db::posts::{self, NewPost, PostFilter, PostUpdate};
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::routes::auth::verify_auth;
use crate::routes::SuccessResponse;
use crate::AppState;

const MAX_PAGE_SIZE: i64 = 100;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListPostsQuery {
    pub fn into_filter(self) -> PostFilter {
        PostFilter {
            status: self.status,
            category: self.category.filter(|c| !c.trim().is_empty()),
            featured: self.featured,
            tag: self.tag.filter(|t| !t.trim().is_empty()),
            limit: self.limit.map(|l| l.clamp(1, MAX_PAGE_SIZE)),
            offset: self.offset.map(|o| o.max(0)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub featured: bool,
    pub background_color: Option<String>,
    pub opacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
    pub background_color: Option<String>,
    pub opacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPostsRequest {
    #[serde(rename = "postIds", alias = "post_ids")]
    pub post_ids: Vec<Uuid>,
}

// ============================================================================
// Validation
// ============================================================================

/// Trim tags and drop empties and repeats, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn required(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn check_appearance(background_color: Option<&str>, opacity: Option<i32>) -> ApiResult<()> {
    if let Some(color) = background_color {
        if !is_hex_color(color) {
            return Err(ApiError::bad_request(
                "background_color must be a hex color like #RGB or #RRGGBB",
            ));
        }
    }
    if let Some(opacity) = opacity {
        if !(0..=100).contains(&opacity) {
            return Err(ApiError::bad_request("opacity must be between 0 and 100"));
        }
    }
    Ok(())
}

pub fn validate_new_post(payload: CreatePostRequest) -> ApiResult<NewPost> {
    let title = required("Title", &payload.title)?;
    let content = required("Content", &payload.content)?;
    check_appearance(payload.background_color.as_deref(), payload.opacity)?;

    Ok(NewPost {
        title,
        content,
        excerpt: payload.excerpt,
        image_url: payload.image_url,
        category: payload.category,
        tags: normalize_tags(payload.tags),
        status: payload.status,
        featured: payload.featured,
        background_color: payload.background_color,
        opacity: payload.opacity,
    })
}

pub fn validate_post_update(payload: UpdatePostRequest) -> ApiResult<PostUpdate> {
    let title = payload
        .title
        .as_deref()
        .map(|t| required("Title", t))
        .transpose()?;
    let content = payload
        .content
        .as_deref()
        .map(|c| required("Content", c))
        .transpose()?;
    check_appearance(payload.background_color.as_deref(), payload.opacity)?;

    Ok(PostUpdate {
        title,
        content,
        excerpt: payload.excerpt,
        image_url: payload.image_url,
        category: payload.category,
        tags: payload.tags.map(normalize_tags),
        status: payload.status,
        featured: payload.featured,
        background_color: payload.background_color,
        opacity: payload.opacity,
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ListPostsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    Ok(Json(posts::list(pool, &query.into_filter()).await?))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    verify_auth(&state.config.auth, &headers)?;
    let new_post = validate_new_post(payload)?;
    let pool = state.pool()?;
    let post = posts::create(pool, new_post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Post>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    posts::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    verify_auth(&state.config.auth, &headers)?;
    let changes = validate_post_update(payload)?;
    let pool = state.pool()?;
    Ok(Json(posts::update(pool, id, changes).await?))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    posts::delete(pool, id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/posts/reorder
pub async fn reorder_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ReorderPostsRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    crate::db::ensure_distinct(&payload.post_ids)?;
    let pool = state.pool()?;
    posts::reorder(pool, &payload.post_ids).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{empty_request, json_request, send};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create_request(value: serde_json::Value) -> CreatePostRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " rust ".to_string(),
            "web".to_string(),
            "".to_string(),
            "rust".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["rust".to_string(), "web".to_string()]);
    }

    #[test]
    fn test_new_post_defaults() {
        let post = validate_new_post(create_request(json!({
            "title": " Hello ",
            "content": "Body"
        })))
        .unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.status, PostStatus::Draft);
        assert!(!post.featured);
        assert_eq!(post.background_color, None);
        assert_eq!(post.opacity, None);
    }

    #[test]
    fn test_new_post_requires_title_and_content() {
        let err = validate_new_post(create_request(json!({ "title": "", "content": "x" })));
        assert!(matches!(err, Err(ApiError::BadRequest(msg)) if msg == "Title is required"));

        let err = validate_new_post(create_request(json!({ "title": "x", "content": " " })));
        assert!(matches!(err, Err(ApiError::BadRequest(msg)) if msg == "Content is required"));
    }

    #[test]
    fn test_appearance_validation() {
        assert!(check_appearance(Some("#fff"), Some(0)).is_ok());
        assert!(check_appearance(Some("#A1B2C3"), Some(100)).is_ok());
        assert!(check_appearance(Some("red"), None).is_err());
        assert!(check_appearance(Some("#abcd"), None).is_err());
        assert!(check_appearance(None, Some(101)).is_err());
        assert!(check_appearance(None, Some(-1)).is_err());
    }

    #[test]
    fn test_update_with_empty_title_is_rejected() {
        let payload: UpdatePostRequest = serde_json::from_value(json!({ "title": "" })).unwrap();
        assert!(validate_post_update(payload).is_err());
    }

    #[test]
    fn test_list_query_clamps_paging() {
        let filter = ListPostsQuery {
            limit: Some(5000),
            offset: Some(-3),
            category: Some(" ".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.limit, Some(MAX_PAGE_SIZE));
        assert_eq!(filter.offset, Some(0));
        assert_eq!(filter.category, None);
    }

    #[tokio::test]
    async fn test_list_posts_requires_auth() {
        let app = crate::create_app(crate::test_state());
        let (status, _) = send(app, empty_request("GET", "/api/posts", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_bad_request() {
        let state = crate::test_state();
        let token = crate::test_token(&state);
        let app = crate::create_app(state);
        let (status, _) = send(
            app,
            empty_request("GET", "/api/posts?status=archived", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_post_validation_runs_before_database() {
        let state = crate::test_state();
        let token = crate::test_token(&state);
        let req = json_request(
            "POST",
            "/api/posts",
            Some(&token),
            &json!({ "title": "Hi", "content": "Body", "opacity": 150 }),
        );
        let (status, body) = send(crate::create_app(state.clone()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "opacity must be between 0 and 100");

        let req = json_request(
            "POST",
            "/api/posts",
            Some(&token),
            &json!({ "title": "Hi", "content": "Body" }),
        );
        let (status, _) = send(crate::create_app(state), req).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
