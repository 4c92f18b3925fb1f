//! Serverless-style function endpoints called directly by the web client

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use crate::routes::auth::AuthUser;
use crate::routes::youtube::youtube_api;
use crate::services::error::{ApiError, ApiResult};
use crate::services::publish::{self, PublishResult};
use crate::services::youtube::Privacy;
use crate::services::youtube_oauth::{self, ExchangedTokens};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/functions/youtube-oauth-callback",
            post(youtube_oauth_callback),
        )
        .route("/functions/upload-to-youtube", post(upload_to_youtube))
}

#[derive(Deserialize)]
struct TokenExchangeRequest {
    code: Option<String>,
    redirect_uri: Option<String>,
}

/// POST /functions/youtube-oauth-callback - Code -> tokens plus channel info
async fn youtube_oauth_callback(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TokenExchangeRequest>,
) -> ApiResult<Json<ExchangedTokens>> {
    let api = youtube_api(&state)?;
    let tokens = youtube_oauth::exchange_code_for_tokens(
        api,
        req.code.as_deref(),
        req.redirect_uri.as_deref(),
    )
    .await?;
    tracing::info!(%user_id, channel = ?tokens.channel_id, "Exchanged YouTube authorization code");
    Ok(Json(tokens))
}

#[derive(Deserialize)]
struct UploadPostRequest {
    post_id: Option<Uuid>,
    #[serde(default)]
    privacy: Privacy,
}

/// POST /functions/upload-to-youtube - Resumable upload of one post
async fn upload_to_youtube(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UploadPostRequest>,
) -> ApiResult<Json<PublishResult>> {
    let post_id = req
        .post_id
        .ok_or_else(|| ApiError::bad_request("post_id is required"))?;
    let api = youtube_api(&state)?;

    let result = publish::publish_post_to_youtube(
        state.store.as_ref(),
        state.storage.as_ref(),
        api,
        user_id,
        post_id,
        req.privacy,
    )
    .await?;
    Ok(Json(result))
}
