/**
 * Profile Routes
 */
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};

use crate::db::profile::{self, Profile, ProfileUpdate};
use crate::error::{ApiJson, ApiResult};
use crate::routes::auth::verify_auth;
use crate::routes::public_cache;
use crate::AppState;

/// GET /api/profile
///
/// Without a database the configured defaults are served, so the public
/// site can still render its header.
pub async fn get_profile(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let defaults = &state.config.profile_defaults;
    let profile = match state.db.as_deref() {
        Some(pool) => profile::get(pool, defaults).await?,
        None => profile::resolve(&[], defaults),
    };
    Ok((public_cache(state.config.public_cache_secs), Json(profile)))
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    let profile = profile::update(pool, &payload, &state.config.profile_defaults).await?;
    Ok(Json(profile))
}
