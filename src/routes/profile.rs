//! Profile and dashboard stats endpoints

use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::AppState;
use crate::models::{Profile, ProfileUpdate, UserStats};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, ApiResult};
use crate::services::library;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me/profile", get(get_profile).patch(update_profile))
        .route("/stats", get(get_stats))
}

/// GET /me/profile
async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    Ok(Json(profile))
}

/// PATCH /me/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .store
        .update_profile(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    Ok(Json(profile))
}

/// GET /stats - Video counts by status and post counts by platform
async fn get_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<UserStats>> {
    Ok(Json(library::user_stats(state.store.as_ref(), user_id).await?))
}
