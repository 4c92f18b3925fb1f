//! Publishing a post to YouTube through a resumable upload.
//!
//! The post row is only written once YouTube has accepted the bytes; any
//! earlier failure leaves it exactly as it was.

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::DEFAULT_TOKEN_EXPIRY_SECS;
use crate::models::{Platform, Post, PostStatus, PostUpdate};
use crate::services::drafts::{self, DraftError};
use crate::services::store::{Store, StoreError};
use crate::services::youtube::{Privacy, VideoMetadata, YouTubeApi, YouTubeError};
use crate::storage::{ObjectStorage, StorageError, content_type_for_path};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Post not found")]
    PostNotFound,
    #[error("Video not found or access denied")]
    VideoNotFound,
    #[error("Only YouTube posts can be uploaded")]
    WrongPlatform,
    #[error("YouTube account not connected")]
    NotConnected,
    #[error("Failed to get YouTube access token")]
    NoAccessToken,
    #[error("Failed to download video file: {0}")]
    Download(StorageError),
    #[error(transparent)]
    YouTube(#[from] YouTubeError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub success: bool,
    pub post_id: Uuid,
    pub youtube_id: String,
    pub message: String,
}

/// Upload a post's video to the owner's YouTube channel
pub async fn publish_post_to_youtube(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    api: &dyn YouTubeApi,
    user_id: Uuid,
    post_id: Uuid,
    privacy: Privacy,
) -> Result<PublishResult, PublishError> {
    let post = store
        .get_post(user_id, post_id)
        .await?
        .ok_or(PublishError::PostNotFound)?;
    if post.platform != Platform::Youtube {
        return Err(PublishError::WrongPlatform);
    }
    let video = store
        .get_video(user_id, post.video_id)
        .await?
        .ok_or(PublishError::VideoNotFound)?;

    let account = store
        .get_connected_account(user_id, Platform::Youtube)
        .await?
        .ok_or(PublishError::NotConnected)?;

    let tokens = api.refresh_access_token(&account.refresh_token).await?;
    let access_token = tokens.access_token.ok_or(PublishError::NoAccessToken)?;
    let expires_at =
        Utc::now() + Duration::seconds(tokens.expires_in.unwrap_or(DEFAULT_TOKEN_EXPIRY_SECS));
    if let Err(e) = store
        .update_access_token(user_id, Platform::Youtube, &access_token, expires_at)
        .await
    {
        // Not fatal: the refresh token still works next time
        tracing::warn!(%user_id, error = %e, "Failed to persist refreshed access token");
    }

    let data = storage
        .download(&video.storage_path)
        .await
        .map_err(PublishError::Download)?;
    let content_type = content_type_for_path(&video.storage_path);

    let metadata = VideoMetadata {
        title: video
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled Video".to_string()),
        description: video.caption.clone().unwrap_or_default(),
        privacy,
    };

    let session_url = api
        .start_resumable_upload(&access_token, &metadata, data.len(), content_type)
        .await?;
    let youtube_id = api
        .upload_to_session(&access_token, &session_url, data, content_type)
        .await?;

    let posted_at = Utc::now();
    store
        .update_post(
            post.id,
            &PostUpdate {
                status: Some(PostStatus::Posted),
                posted_at: Some(Some(posted_at)),
                platform_post_id: Some(Some(youtube_id.clone())),
                error_message: Some(None),
                ..Default::default()
            },
        )
        .await?;
    store.mark_video_posted(video.id, posted_at).await?;

    tracing::info!(%user_id, %post_id, %youtube_id, "Video uploaded to YouTube");

    Ok(PublishResult {
        success: true,
        post_id: post.id,
        youtube_id,
        message: "Video uploaded to YouTube successfully".to_string(),
    })
}

/// Ensure the video has a YouTube post, then publish it
pub async fn upload_video_to_youtube(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    api: &dyn YouTubeApi,
    user_id: Uuid,
    video_id: Uuid,
    privacy: Privacy,
) -> Result<PublishResult, PublishError> {
    store
        .get_video(user_id, video_id)
        .await?
        .ok_or(PublishError::VideoNotFound)?;

    let post: Post = drafts::create_or_update_post(
        store,
        video_id,
        Platform::Youtube,
        &PostUpdate {
            status: Some(PostStatus::Draft),
            ..Default::default()
        },
    )
    .await?;

    publish_post_to_youtube(store, storage, api, user_id, post.id, privacy).await
}

/// Record a failed attempt on the post (used by the scheduler)
pub async fn mark_failed(store: &dyn Store, post_id: Uuid, error: &PublishError) -> Result<(), StoreError> {
    store
        .update_post(
            post_id,
            &PostUpdate {
                status: Some(PostStatus::Failed),
                error_message: Some(Some(error.to_string())),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
