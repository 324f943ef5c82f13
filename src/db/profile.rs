/*!
 * Profile Settings
 * Key/value rows resolved against configured defaults
 *
 * A missing or NULL setting falls back to the configured default. An empty
 * string is kept as is and means the field is hidden.
 */
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::ProfileDefaults;
use crate::error::ApiResult;

pub const PROFILE_KEYS: [&str; 6] = [
    "profile_name",
    "profile_title",
    "linkedin_url",
    "instagram_url",
    "youtube_url",
    "background_image_url",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub linkedin_url: String,
    pub instagram_url: String,
    pub youtube_url: String,
    pub background_image_url: String,
}

/// Fields to store; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
    pub background_image_url: Option<String>,
}

impl ProfileUpdate {
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("profile_name", &self.name),
            ("profile_title", &self.title),
            ("linkedin_url", &self.linkedin_url),
            ("instagram_url", &self.instagram_url),
            ("youtube_url", &self.youtube_url),
            ("background_image_url", &self.background_image_url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

pub fn resolve(settings: &[(String, Option<String>)], defaults: &ProfileDefaults) -> Profile {
    let value = |key: &str, fallback: &str| -> String {
        settings
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.clone())
            .unwrap_or_else(|| fallback.to_string())
    };

    Profile {
        name: value("profile_name", &defaults.name),
        title: value("profile_title", &defaults.title),
        linkedin_url: value("linkedin_url", &defaults.linkedin_url),
        instagram_url: value("instagram_url", &defaults.instagram_url),
        youtube_url: value("youtube_url", &defaults.youtube_url),
        background_image_url: value("background_image_url", &defaults.background_image_url),
    }
}

pub async fn get(pool: &PgPool, defaults: &ProfileDefaults) -> ApiResult<Profile> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT setting_key, setting_value FROM profile_settings WHERE setting_key = ANY($1)",
    )
    .bind(&PROFILE_KEYS[..])
    .fetch_all(pool)
    .await?;
    Ok(resolve(&rows, defaults))
}

/// Upsert the provided fields in one statement and return the resolved profile.
pub async fn update(pool: &PgPool, changes: &ProfileUpdate, defaults: &ProfileDefaults) -> ApiResult<Profile> {
    let (keys, values): (Vec<&str>, Vec<&str>) = changes.entries().into_iter().unzip();

    if !keys.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO profile_settings (setting_key, setting_value, updated_at)
            SELECT k, v, now() FROM UNNEST($1::text[], $2::text[]) AS t(k, v)
            ON CONFLICT (setting_key)
            DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = now()
            "#,
        )
        .bind(&keys)
        .bind(&values)
        .execute(pool)
        .await?;
        tracing::info!(keys = ?keys, "profile settings updated");
    }

    get(pool, defaults).await
}
