//! Post domain - DB queries for per-platform posts

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{DuePost, Platform, Post, PostStatus, PostUpdate};

/// Posts for a set of videos, newest first
pub async fn list_posts_for_videos<'e, E>(
    executor: E,
    video_ids: &[Uuid],
) -> Result<Vec<Post>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, video_id, platform, platform_post_id, status, error_message,
               scheduled_at, posted_at, created_at, updated_at
        FROM posts
        WHERE video_id = ANY($1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(video_ids)
    .fetch_all(executor)
    .await
}

/// All posts across a user's videos, newest first
pub async fn list_user_posts<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Post>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT p.id, p.video_id, p.platform, p.platform_post_id, p.status, p.error_message,
               p.scheduled_at, p.posted_at, p.created_at, p.updated_at
        FROM posts p
        JOIN videos v ON v.id = p.video_id
        WHERE v.user_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Get a post, scoped to the owner of its video
pub async fn get_post<'e, E>(
    executor: E,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<Option<Post>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT p.id, p.video_id, p.platform, p.platform_post_id, p.status, p.error_message,
               p.scheduled_at, p.posted_at, p.created_at, p.updated_at
        FROM posts p
        JOIN videos v ON v.id = p.video_id
        WHERE p.id = $1 AND v.user_id = $2
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_post<'e, E>(
    executor: E,
    video_id: Uuid,
    platform: Platform,
) -> Result<Option<Post>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, video_id, platform, platform_post_id, status, error_message,
               scheduled_at, posted_at, created_at, updated_at
        FROM posts WHERE video_id = $1 AND platform = $2
        "#,
    )
    .bind(video_id)
    .bind(platform)
    .fetch_optional(executor)
    .await
}

/// Plain insert. Fails with a unique violation (`posts_video_id_platform_key`)
/// if the (video, platform) row already exists.
pub async fn insert_post<'e, E>(
    executor: E,
    video_id: Uuid,
    platform: Platform,
    fields: &PostUpdate,
) -> Result<Post, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO posts (video_id, platform, status, scheduled_at, posted_at, platform_post_id, error_message)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, video_id, platform, platform_post_id, status, error_message,
                  scheduled_at, posted_at, created_at, updated_at
        "#,
    )
    .bind(video_id)
    .bind(platform)
    .bind(fields.status.unwrap_or(PostStatus::Draft))
    .bind(fields.scheduled_at.flatten())
    .bind(fields.posted_at.flatten())
    .bind(fields.platform_post_id.clone().flatten())
    .bind(fields.error_message.clone().flatten())
    .fetch_one(executor)
    .await
}

pub async fn update_post<'e, E>(
    executor: E,
    post_id: Uuid,
    update: &PostUpdate,
) -> Result<Option<Post>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE posts SET
            status = COALESCE($2, status),
            scheduled_at = CASE WHEN $3 THEN $4 ELSE scheduled_at END,
            posted_at = CASE WHEN $5 THEN $6 ELSE posted_at END,
            platform_post_id = CASE WHEN $7 THEN $8 ELSE platform_post_id END,
            error_message = CASE WHEN $9 THEN $10 ELSE error_message END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, video_id, platform, platform_post_id, status, error_message,
                  scheduled_at, posted_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.scheduled_at.is_some())
    .bind(update.scheduled_at.flatten())
    .bind(update.posted_at.is_some())
    .bind(update.posted_at.flatten())
    .bind(update.platform_post_id.is_some())
    .bind(update.platform_post_id.clone().flatten())
    .bind(update.error_message.is_some())
    .bind(update.error_message.clone().flatten())
    .fetch_optional(executor)
    .await
}

/// Delete a post owned by the user. Returns true if a row was removed.
pub async fn delete_post<'e, E>(
    executor: E,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM posts
        WHERE id = $1
          AND video_id IN (SELECT id FROM videos WHERE user_id = $2)
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a video's posts on the given platforms
pub async fn delete_posts_for_platforms<'e, E>(
    executor: E,
    video_id: Uuid,
    platforms: &[Platform],
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let platforms: Vec<&str> = platforms.iter().map(|p| p.as_str()).collect();
    let result = sqlx::query("DELETE FROM posts WHERE video_id = $1 AND platform = ANY($2)")
        .bind(video_id)
        .bind(platforms)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Scheduled posts on `platform` whose time has passed, oldest first
pub async fn list_due_posts<'e, E>(
    executor: E,
    platform: Platform,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DuePost>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT p.id AS post_id, v.user_id
        FROM posts p
        JOIN videos v ON v.id = p.video_id
        WHERE p.platform = $1
          AND p.status = 'scheduled'
          AND p.scheduled_at IS NOT NULL
          AND p.scheduled_at <= $2
        ORDER BY p.scheduled_at ASC
        LIMIT $3
        "#,
    )
    .bind(platform)
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}
