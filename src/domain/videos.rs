//! Video domain - DB queries for videos

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{NewVideo, Video, VideoSearch, VideoUpdate};

/// Count a user's videos (free-tier cap check)
pub async fn count_videos<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// All of a user's videos, newest first
pub async fn list_videos<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, title, storage_path, public_url, caption, status,
               scheduled_at, posted_at, created_at, updated_at
        FROM videos
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Escape LIKE wildcards so user input matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Filtered, paginated video listing.
/// Every filter is optional; NULL parameters disable their clause.
pub async fn search_videos<'e, E>(
    executor: E,
    user_id: Uuid,
    search: &VideoSearch,
    limit: i64,
    offset: i64,
) -> Result<Vec<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let pattern = search
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(like_pattern);

    sqlx::query_as(
        r#"
        SELECT id, user_id, title, storage_path, public_url, caption, status,
               scheduled_at, posted_at, created_at, updated_at
        FROM videos v
        WHERE v.user_id = $1
          AND ($2::text IS NULL OR v.title ILIKE $2 OR v.caption ILIKE $2)
          AND ($3::text IS NULL OR v.status = $3)
          AND ($4::text IS NULL OR EXISTS (
                SELECT 1 FROM posts p WHERE p.video_id = v.id AND p.platform = $4
              ))
        ORDER BY v.created_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(user_id)
    .bind(pattern)
    .bind(search.status.map(|s| s.as_str()))
    .bind(search.platform.map(|p| p.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn get_video<'e, E>(
    executor: E,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<Option<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, title, storage_path, public_url, caption, status,
               scheduled_at, posted_at, created_at, updated_at
        FROM videos WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(video_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Insert a video row. The upload-limit trigger may reject it.
pub async fn insert_video<'e, E>(executor: E, video: &NewVideo) -> Result<Video, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO videos (user_id, title, storage_path, public_url, caption, status, scheduled_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, title, storage_path, public_url, caption, status,
                  scheduled_at, posted_at, created_at, updated_at
        "#,
    )
    .bind(video.user_id)
    .bind(&video.title)
    .bind(&video.storage_path)
    .bind(&video.public_url)
    .bind(&video.caption)
    .bind(video.status)
    .bind(video.scheduled_at)
    .fetch_one(executor)
    .await
}

/// Apply a partial update; returns None if the video doesn't exist for this user
pub async fn update_video<'e, E>(
    executor: E,
    user_id: Uuid,
    video_id: Uuid,
    update: &VideoUpdate,
) -> Result<Option<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE videos SET
            title = CASE WHEN $3 THEN $4 ELSE title END,
            caption = CASE WHEN $5 THEN $6 ELSE caption END,
            status = COALESCE($7, status),
            scheduled_at = CASE WHEN $8 THEN $9 ELSE scheduled_at END,
            posted_at = CASE WHEN $10 THEN $11 ELSE posted_at END,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, storage_path, public_url, caption, status,
                  scheduled_at, posted_at, created_at, updated_at
        "#,
    )
    .bind(video_id)
    .bind(user_id)
    .bind(update.title.is_some())
    .bind(update.title.clone().flatten())
    .bind(update.caption.is_some())
    .bind(update.caption.clone().flatten())
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.scheduled_at.is_some())
    .bind(update.scheduled_at.flatten())
    .bind(update.posted_at.is_some())
    .bind(update.posted_at.flatten())
    .fetch_optional(executor)
    .await
}

/// Mark a video posted after one of its posts went out
pub async fn mark_video_posted<'e, E>(
    executor: E,
    video_id: Uuid,
    posted_at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE videos SET status = 'posted', posted_at = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(video_id)
    .bind(posted_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete a video row (posts cascade). Returns true if a row was removed.
pub async fn delete_video<'e, E>(
    executor: E,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM videos WHERE id = $1 AND user_id = $2")
        .bind(video_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
