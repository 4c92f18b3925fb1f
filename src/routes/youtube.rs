//! YouTube connection and upload endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use crate::models::ConnectedAccount;
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, ApiResult};
use crate::services::publish::{self, PublishResult};
use crate::services::youtube::{Privacy, YouTubeApi};
use crate::services::youtube_oauth::{self, CallbackParams};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/youtube", get(auth_youtube))
        .route("/auth/youtube/callback", post(auth_youtube_callback))
        .route(
            "/connections/youtube",
            get(get_connection).delete(disconnect),
        )
        .route("/youtube/upload", post(upload_video))
}

/// The configured YouTube client, or 503 when credentials are absent
pub fn youtube_api(state: &AppState) -> ApiResult<&dyn YouTubeApi> {
    state
        .youtube
        .as_deref()
        .ok_or_else(|| ApiError::unavailable("YouTube credentials not configured"))
}

#[derive(Serialize)]
struct AuthUrlResponse {
    url: String,
}

/// GET /auth/youtube - Consent URL for connecting a channel
async fn auth_youtube(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<AuthUrlResponse>> {
    let api = youtube_api(&state)?;
    let url = youtube_oauth::start_connect(state.store.as_ref(), api, user_id).await?;
    Ok(Json(AuthUrlResponse { url }))
}

/// POST /auth/youtube/callback - Finish the connect flow with `{code, state, error}`
async fn auth_youtube_callback(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(params): Json<CallbackParams>,
) -> ApiResult<Json<ConnectedAccount>> {
    let api = youtube_api(&state)?;
    let account =
        youtube_oauth::complete_connect(state.store.as_ref(), api, user_id, &params).await?;
    Ok(Json(account))
}

#[derive(Serialize)]
struct ConnectionResponse {
    connected: bool,
    account: Option<ConnectedAccount>,
}

/// GET /connections/youtube
async fn get_connection(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ConnectionResponse>> {
    let account = youtube_oauth::get_connection(state.store.as_ref(), user_id).await?;
    Ok(Json(ConnectionResponse {
        connected: account.is_some(),
        account,
    }))
}

/// DELETE /connections/youtube
async fn disconnect(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<StatusCode> {
    if !youtube_oauth::disconnect(state.store.as_ref(), user_id).await? {
        return Err(ApiError::not_found("YouTube account not connected"));
    }
    tracing::info!(%user_id, "YouTube disconnected");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct UploadRequest {
    video_id: Uuid,
    #[serde(default)]
    privacy: Privacy,
}

/// POST /youtube/upload - Publish a library video to the connected channel
async fn upload_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UploadRequest>,
) -> ApiResult<Json<PublishResult>> {
    let api = youtube_api(&state)?;
    let result = publish::upload_video_to_youtube(
        state.store.as_ref(),
        state.storage.as_ref(),
        api,
        user_id,
        req.video_id,
        req.privacy,
    )
    .await?;
    Ok(Json(result))
}
