//! Free-tier video uploads: validation, the 3-video cap, and deletion.
//!
//! The cap is checked here before any side effect and enforced again by a
//! database trigger on insert. When the insert fails after the object was
//! stored, the object is removed so storage never holds orphans.

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{ALLOWED_VIDEO_EXTENSIONS, MAX_FILE_SIZE, MAX_VIDEOS};
use crate::models::{NewVideo, Video, VideoStatus};
use crate::services::store::{Store, StoreError};
use crate::storage::{ObjectStorage, StorageError};

pub const NOT_A_VIDEO: &str = "Please upload a video file.";
pub const FILE_TOO_LARGE: &str = "File too large. Maximum size is 50MB for free users.";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Invalid(String),
    #[error(
        "Upload limit reached. Free users can only upload 3 videos. Please delete existing videos to upload new ones."
    )]
    LimitReached,
    #[error("Video not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub path: String,
    pub url: String,
    pub video_id: Uuid,
}

/// Free-bucket usage for the upload screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStats {
    pub videos: Vec<Video>,
    pub total_videos: i64,
    pub remaining_slots: i64,
    pub can_upload: bool,
}

/// Check type, size and extension. Returns the lowercased extension.
pub fn validate_video_file(
    file_name: &str,
    content_type: &str,
    size: usize,
) -> Result<String, UploadError> {
    if !content_type.starts_with("video/") {
        return Err(UploadError::Invalid(NOT_A_VIDEO.to_string()));
    }

    if size > MAX_FILE_SIZE {
        return Err(UploadError::Invalid(FILE_TOO_LARGE.to_string()));
    }

    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::Invalid(format!(
            "Invalid video format. Allowed formats: {}",
            ALLOWED_VIDEO_EXTENSIONS.join(", ")
        )));
    }

    Ok(ext)
}

/// Title shown in the library: the file name minus its last extension
fn title_from_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// `<user_id>/<millis>-<random>.<ext>`
fn object_path(user_id: Uuid, ext: &str) -> String {
    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect();
    format!(
        "{}/{}-{}.{}",
        user_id,
        Utc::now().timestamp_millis(),
        suffix,
        ext
    )
}

pub async fn upload_video_to_free_bucket(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user_id: Uuid,
    file_name: &str,
    content_type: &str,
    data: Bytes,
) -> Result<UploadResult, UploadError> {
    let ext = validate_video_file(file_name, content_type, data.len())?;

    let count = store.count_videos(user_id).await?;
    if count >= MAX_VIDEOS {
        return Err(UploadError::LimitReached);
    }

    let path = object_path(user_id, &ext);
    let stored_path = storage.upload(&path, data, content_type).await?;
    let url = storage.public_url(&stored_path);

    let new_video = NewVideo {
        user_id,
        title: Some(title_from_file_name(file_name)),
        storage_path: stored_path.clone(),
        public_url: url.clone(),
        caption: None,
        status: VideoStatus::Draft,
        scheduled_at: None,
    };

    let video = match store.insert_video(&new_video).await {
        Ok(video) => video,
        Err(e) => {
            if let Err(cleanup) = storage.remove(std::slice::from_ref(&stored_path)).await {
                tracing::error!(path = %stored_path, error = %cleanup, "Failed to clean up uploaded file");
            }
            return Err(match e {
                StoreError::UploadLimit => UploadError::LimitReached,
                other => other.into(),
            });
        }
    };

    tracing::info!(%user_id, video_id = %video.id, path = %stored_path, "Video uploaded");

    Ok(UploadResult {
        path: stored_path,
        url,
        video_id: video.id,
    })
}

pub async fn free_bucket_stats(store: &dyn Store, user_id: Uuid) -> Result<VideoStats, UploadError> {
    let videos = store.list_videos(user_id).await?;
    let total_videos = videos.len() as i64;
    Ok(VideoStats {
        videos,
        total_videos,
        remaining_slots: (MAX_VIDEOS - total_videos).max(0),
        can_upload: total_videos < MAX_VIDEOS,
    })
}

/// Remove a video's object from storage, then its row (posts cascade)
pub async fn delete_video_from_free_bucket(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<(), UploadError> {
    let video = store
        .get_video(user_id, video_id)
        .await?
        .ok_or(UploadError::NotFound)?;

    if !video.storage_path.is_empty() {
        if let Err(e) = storage.remove(&[video.storage_path.clone()]).await {
            tracing::warn!(%video_id, error = %e, "Failed to remove video object");
        }
    }

    if !store.delete_video(user_id, video_id).await? {
        return Err(UploadError::NotFound);
    }
    Ok(())
}
