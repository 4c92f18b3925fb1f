//! Post-builder saves: a video's title, caption and schedule plus one post per
//! selected platform, reconciled against what's already stored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{
    Platform, Post, PostStatus, PostUpdate, VideoStatus, VideoUpdate, VideoWithPosts,
};
use crate::services::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Video not found")]
    NotFound,
    #[error("scheduled_at is required when scheduling")]
    MissingSchedule,
    #[error("Failed to save posts: {0}")]
    PostsFailed(String),
    #[error("Failed to find existing post after duplicate key error")]
    MissingExisting,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    #[default]
    Now,
    Schedule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveDraftInput {
    pub title: Option<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub schedule_type: ScheduleType,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Insert the (video, platform) post, or update it if it already exists
pub async fn create_or_update_post(
    store: &dyn Store,
    video_id: Uuid,
    platform: Platform,
    updates: &PostUpdate,
) -> Result<Post, DraftError> {
    match store.insert_post(video_id, platform, updates).await {
        Ok(post) => Ok(post),
        Err(StoreError::Duplicate(_)) => {
            let existing = store
                .find_post(video_id, platform)
                .await?
                .ok_or(DraftError::MissingExisting)?;
            store
                .update_post(existing.id, updates)
                .await?
                .ok_or(DraftError::MissingExisting)
        }
        Err(e) => Err(e.into()),
    }
}

/// Save the post builder state for a video.
///
/// Per-platform failures are collected; the save only fails outright when
/// every requested platform failed. Any failure restores the video's previous
/// title, caption, status and schedule.
pub async fn save_draft(
    store: &dyn Store,
    user_id: Uuid,
    video_id: Uuid,
    input: &SaveDraftInput,
) -> Result<VideoWithPosts, DraftError> {
    let scheduled = input.schedule_type == ScheduleType::Schedule;
    if scheduled && input.scheduled_at.is_none() {
        return Err(DraftError::MissingSchedule);
    }

    let original = store
        .get_video(user_id, video_id)
        .await?
        .ok_or(DraftError::NotFound)?;

    let mut platforms: Vec<Platform> = Vec::with_capacity(input.platforms.len());
    for platform in &input.platforms {
        if !platforms.contains(platform) {
            platforms.push(*platform);
        }
    }

    let scheduled_at = if scheduled { input.scheduled_at } else { None };

    let result = apply_draft(store, user_id, video_id, input, &platforms, scheduled_at).await;

    if let Err(e) = &result {
        tracing::warn!(%video_id, error = %e, "Draft save failed, restoring video");
        if let Err(rollback) = store
            .update_video(user_id, video_id, &VideoUpdate::restore(&original))
            .await
        {
            tracing::error!(%video_id, error = %rollback, "Failed to rollback video update");
        }
        return result;
    }

    let deselected: Vec<Platform> = Platform::ALL
        .iter()
        .copied()
        .filter(|p| !platforms.contains(p))
        .collect();
    if !deselected.is_empty() {
        if let Err(e) = store.delete_posts_for_platforms(video_id, &deselected).await {
            tracing::error!(%video_id, error = %e, "Failed to remove old platform posts");
        }
    }

    result
}

async fn apply_draft(
    store: &dyn Store,
    user_id: Uuid,
    video_id: Uuid,
    input: &SaveDraftInput,
    platforms: &[Platform],
    scheduled_at: Option<DateTime<Utc>>,
) -> Result<VideoWithPosts, DraftError> {
    let (video_status, post_status) = match scheduled_at {
        Some(_) => (VideoStatus::Scheduled, PostStatus::Scheduled),
        None => (VideoStatus::Draft, PostStatus::Draft),
    };

    let video = store
        .update_video(
            user_id,
            video_id,
            &VideoUpdate {
                title: input.title.clone().map(Some),
                caption: input.caption.clone().map(Some),
                status: Some(video_status),
                scheduled_at: Some(scheduled_at),
                posted_at: None,
            },
        )
        .await?
        .ok_or(DraftError::NotFound)?;

    let updates = PostUpdate {
        status: Some(post_status),
        scheduled_at: Some(scheduled_at),
        ..Default::default()
    };

    let mut posts = Vec::with_capacity(platforms.len());
    let mut errors = Vec::new();
    for platform in platforms {
        match create_or_update_post(store, video_id, *platform, &updates).await {
            Ok(post) => posts.push(post),
            Err(e) => {
                tracing::warn!(%video_id, %platform, error = %e, "Failed to save post");
                errors.push(e.to_string());
            }
        }
    }

    if !errors.is_empty() && posts.is_empty() {
        return Err(DraftError::PostsFailed(errors.join(", ")));
    }

    Ok(VideoWithPosts { video, posts })
}
