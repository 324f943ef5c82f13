pub mod models;
pub mod pages;
pub mod posts;
pub mod profile;

use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/portfolio".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<Arc<PgPool>, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(Arc::new(pool))
}

pub async fn health_check(pool: Option<&PgPool>) -> Result<std::time::Duration, sqlx::Error> {
    let pool =
        pool.ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(start.elapsed())
}

/// Schema statements, applied in order. Each one is idempotent.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS pages (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        meta_description TEXT,
        is_published BOOLEAN NOT NULL DEFAULT false,
        is_homepage BOOLEAN NOT NULL DEFAULT false,
        parent_id UUID REFERENCES pages(id) ON DELETE SET NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pages_sort_order ON pages(sort_order)",
    "CREATE INDEX IF NOT EXISTS idx_pages_parent_id ON pages(parent_id)",
    r#"
    CREATE TABLE IF NOT EXISTS content_blocks (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        page_id UUID NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
        block_type TEXT NOT NULL,
        content JSONB NOT NULL DEFAULT '{}'::jsonb,
        position INTEGER NOT NULL,
        is_visible BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (page_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        excerpt TEXT,
        content TEXT NOT NULL,
        image_url TEXT,
        category TEXT,
        tags TEXT[] NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
        featured BOOLEAN NOT NULL DEFAULT false,
        background_color TEXT NOT NULL DEFAULT '#000000',
        opacity INTEGER NOT NULL DEFAULT 100 CHECK (opacity BETWEEN 0 AND 100),
        sort_order INTEGER,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        published_at TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status)",
    "CREATE INDEX IF NOT EXISTS idx_posts_sort_order ON posts(sort_order)",
    "CREATE INDEX IF NOT EXISTS idx_posts_tags ON posts USING GIN(tags)",
    r#"
    CREATE TABLE IF NOT EXISTS profile_settings (
        setting_key TEXT PRIMARY KEY,
        setting_value TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

pub(crate) fn ensure_distinct(ids: &[Uuid]) -> Result<(), ApiError> {
    let mut seen = HashSet::with_capacity(ids.len());
    match ids.iter().find(|id| !seen.insert(**id)) {
        Some(dup) => Err(ApiError::bad_request(format!("Duplicate id {} in order", dup))),
        None => Ok(()),
    }
}

/// Assign `sort_order = index` to each id. `update_sql` binds `$1` = id and
/// `$2` = position; an id matching no row fails the whole order.
pub(crate) async fn apply_order(
    conn: &mut PgConnection,
    update_sql: &'static str,
    ids: &[Uuid],
    entity: &str,
) -> Result<(), ApiError> {
    for (position, id) in ids.iter().enumerate() {
        let result = sqlx::query(update_sql)
            .bind(id)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(format!("{} {} not found", entity, id)));
        }
    }
    Ok(())
}
