//! Profile domain - DB queries for profiles

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Profile, ProfileUpdate};

pub async fn get_profile<'e, E>(executor: E, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, full_name, avatar_url, created_at, updated_at
        FROM profiles WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Update the provided fields; returns None if the profile row doesn't exist
pub async fn update_profile<'e, E>(
    executor: E,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<Profile>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE profiles SET
            full_name = CASE WHEN $2 THEN $3 ELSE full_name END,
            avatar_url = CASE WHEN $4 THEN $5 ELSE avatar_url END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, full_name, avatar_url, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(update.full_name.is_some())
    .bind(update.full_name.clone().flatten())
    .bind(update.avatar_url.is_some())
    .bind(update.avatar_url.clone().flatten())
    .fetch_optional(executor)
    .await
}
