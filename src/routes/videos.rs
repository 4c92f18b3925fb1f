//! Video library endpoints: search, upload, drafts and per-platform posts

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use crate::constants::MAX_FILE_SIZE;
use crate::models::{Platform, Post, PostUpdate, Video, VideoSearch, VideoUpdate, VideoWithPosts};
use crate::routes::auth::AuthUser;
use crate::services::drafts::{self, SaveDraftInput};
use crate::services::error::{ApiError, ApiResult};
use crate::services::library;
use crate::services::uploads::{self, FILE_TOO_LARGE, UploadResult, VideoStats};

/// Room for multipart framing on top of the largest accepted file
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/videos",
            get(search_videos)
                .post(upload_video)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/videos/recent", get(recent_videos))
        .route("/videos/limits", get(video_limits))
        .route(
            "/videos/{id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/{id}/draft", put(save_draft))
        .route("/videos/{id}/posts", get(video_posts))
        .route("/videos/{id}/posts/{platform}", put(set_platform_post))
}

/// GET /videos - Text/status/platform search with limit/offset
async fn search_videos(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(search): Query<VideoSearch>,
) -> ApiResult<Json<Vec<Video>>> {
    Ok(Json(
        library::search_videos(state.store.as_ref(), user_id, &search).await?,
    ))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, FILE_TOO_LARGE)
    } else {
        tracing::warn!(error = %e, "Malformed multipart upload");
        ApiError::bad_request(e.body_text())
    }
}

/// POST /videos - Upload a video to the free bucket
///
/// Multipart form with a single "file" field carrying the video bytes,
/// its file name and content type.
async fn upload_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResult>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        let result = uploads::upload_video_to_free_bucket(
            state.store.as_ref(),
            state.storage.as_ref(),
            user_id,
            &file_name,
            &content_type,
            data,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(result)));
    }

    Err(ApiError::bad_request("No file provided"))
}

#[derive(Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

/// GET /videos/recent - Dashboard list, newest first
async fn recent_videos(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<Video>>> {
    Ok(Json(
        library::recent_videos(state.store.as_ref(), user_id, query.limit).await?,
    ))
}

/// GET /videos/limits - Free-tier usage
async fn video_limits(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<VideoStats>> {
    Ok(Json(
        uploads::free_bucket_stats(state.store.as_ref(), user_id).await?,
    ))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<VideoWithPosts>> {
    Ok(Json(
        library::video_with_posts(state.store.as_ref(), user_id, video_id).await?,
    ))
}

async fn update_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<Uuid>,
    Json(update): Json<VideoUpdate>,
) -> ApiResult<Json<Video>> {
    Ok(Json(
        library::update_video(state.store.as_ref(), user_id, video_id, &update).await?,
    ))
}

/// DELETE /videos/{id} - Remove the object and the row (posts cascade)
async fn delete_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    uploads::delete_video_from_free_bucket(
        state.store.as_ref(),
        state.storage.as_ref(),
        user_id,
        video_id,
    )
    .await?;
    tracing::info!(%user_id, %video_id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /videos/{id}/draft - Save title/caption/platforms and schedule
async fn save_draft(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<Uuid>,
    Json(input): Json<SaveDraftInput>,
) -> ApiResult<Json<VideoWithPosts>> {
    Ok(Json(
        drafts::save_draft(state.store.as_ref(), user_id, video_id, &input).await?,
    ))
}

async fn video_posts(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(
        library::video_posts(state.store.as_ref(), user_id, video_id).await?,
    ))
}

/// PUT /videos/{id}/posts/{platform} - Create or update the video's post on a platform
async fn set_platform_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path((video_id, platform)): Path<(Uuid, Platform)>,
    Json(update): Json<PostUpdate>,
) -> ApiResult<Json<Post>> {
    state
        .store
        .get_video(user_id, video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    let post =
        drafts::create_or_update_post(state.store.as_ref(), video_id, platform, &update).await?;
    Ok(Json(post))
}
