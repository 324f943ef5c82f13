//! Portfolio CMS - library for app logic and testing

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod logging;
pub mod render;
pub mod routes;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::config::SiteConfig;
use crate::error::{ApiError, ApiResult};
use crate::routes::media::body_limit;
use crate::storage::{MediaStorage, UploadKind};

/// JSON request bodies are capped at 2 MB; uploads carry their own limits.
const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the service runs without a database.
    pub db: Option<Arc<PgPool>>,
    pub storage: Arc<MediaStorage>,
    pub config: Arc<SiteConfig>,
}

impl AppState {
    pub fn new(db: Option<Arc<PgPool>>, config: SiteConfig) -> Self {
        let storage = MediaStorage::new(config.upload_dir.clone(), config.upload_url_prefix.clone());
        Self {
            db,
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }

    /// The pool, or 503 when no database is configured.
    pub fn pool(&self) -> ApiResult<&PgPool> {
        self.db.as_deref().ok_or(ApiError::ServiceUnavailable)
    }
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn json_routes() -> Router<AppState> {
    use routes::*;

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify", post(auth::verify_token))
        .route("/api/pages", get(pages::list_pages).post(pages::create_page))
        .route("/api/pages/hierarchical", get(pages::hierarchical_pages))
        .route("/api/pages/reorder", post(pages::reorder_pages))
        .route(
            "/api/pages/{id}",
            get(pages::get_page)
                .put(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/api/pages/{id}/parent", patch(pages::set_page_parent))
        .route("/api/pages/{id}/move", post(pages::move_page))
        .route("/api/pages/{id}/nest", post(pages::nest_page))
        .route("/api/pages/{id}/unnest", post(pages::unnest_page))
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/reorder", post(posts::reorder_posts))
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/api/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/api/navigation", get(navigation::navigation))
        .route("/api/blocks/defaults/{block_type}", get(blocks::block_defaults))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/public/home", get(public::home))
        .route("/api/public/pages/{slug}", get(public::page_by_slug))
        .route("/api/public/posts", get(public::list_posts))
        .route("/api/public/posts/{slug}", get(public::post_by_slug))
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT))
}

fn upload_routes() -> Router<AppState> {
    use routes::media;

    Router::new()
        .route(
            "/api/media",
            get(media::list_media)
                .post(media::upload_media)
                .delete(media::delete_media)
                .layer(DefaultBodyLimit::max(body_limit(UploadKind::Media))),
        )
        .route(
            "/api/upload-image",
            post(media::upload_content_image)
                .layer(DefaultBodyLimit::max(body_limit(UploadKind::ContentImage))),
        )
        .route(
            "/api/upload-background",
            post(media::upload_background)
                .layer(DefaultBodyLimit::max(body_limit(UploadKind::Background))),
        )
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    let uploads = ServeDir::new(state.storage.root());

    // Public handlers set their own Cache-Control; everything else under
    // /api must not be cached.
    let api = json_routes()
        .merge(upload_routes())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        ));

    Router::new()
        .merge(api)
        .route("/rss.xml", get(routes::rss::rss_feed))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .nest_service(&state.config.upload_url_prefix, uploads)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn connect_database() -> Option<Arc<PgPool>> {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
        return None;
    }

    match db::init_pool(None).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
            Some(pool)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing without database.",
                e
            );
            None
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let config = SiteConfig::from_env();

    // Dropping the guards stops the background log writers.
    let _log_guards = logging::init(&config);

    routes::health::init_start_time();

    if config.is_production() && config.auth.uses_default_secret() {
        return Err(std::io::Error::other(
            "JWT_SECRET must be set to a secure, unique value in production",
        ));
    }
    if config.auth.admin_password_hash.is_empty() {
        tracing::warn!(
            "Neither ADMIN_PASSWORD_HASH nor ADMIN_PASSWORD is set. Admin login is disabled."
        );
    }

    let db = connect_database().await;
    let app = create_app(AppState::new(db, config));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Invalid HOST/PORT: {}", e))
    })?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

#[cfg(test)]
pub(crate) const TEST_PASSWORD: &str = "correct horse battery staple";

#[cfg(test)]
lazy_static::lazy_static! {
    static ref TEST_PASSWORD_HASH: String = bcrypt::hash(TEST_PASSWORD, 4).unwrap();
}

/// State with no database and a throwaway upload directory.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::config::{AuthConfig, ProfileDefaults};

    let upload_dir = tempfile::tempdir().unwrap().keep();
    AppState::new(
        None,
        SiteConfig {
            environment: "test".to_string(),
            site_url: "http://localhost:3000".to_string(),
            site_title: "Portfolio".to_string(),
            site_description: "Latest posts and projects".to_string(),
            upload_dir,
            upload_url_prefix: "/uploads".to_string(),
            public_cache_secs: 60,
            profile_defaults: ProfileDefaults::default(),
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                admin_password_hash: TEST_PASSWORD_HASH.clone(),
                token_ttl_hours: 1,
            },
        },
    )
}

#[cfg(test)]
pub(crate) fn test_token(state: &AppState) -> String {
    routes::auth::create_access_token(&state.config.auth).unwrap().0
}
