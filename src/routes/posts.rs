//! Post endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use crate::models::{Post, PostUpdate};
use crate::routes::auth::AuthUser;
use crate::services::error::ApiResult;
use crate::services::library;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/posts", get(list_posts)).route(
        "/posts/{id}",
        get(get_post).patch(update_post).delete(delete_post),
    )
}

/// GET /posts - Every post across the user's videos, newest first
async fn list_posts(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(state.store.list_user_posts(user_id).await?))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Post>> {
    Ok(Json(
        library::get_post(state.store.as_ref(), user_id, post_id).await?,
    ))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
    Json(update): Json<PostUpdate>,
) -> ApiResult<Json<Post>> {
    Ok(Json(
        library::update_post(state.store.as_ref(), user_id, post_id, &update).await?,
    ))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    library::delete_post(state.store.as_ref(), user_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
