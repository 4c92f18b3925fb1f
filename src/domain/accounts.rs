//! Connected account domain - OAuth credentials per (user, platform) and
//! pending OAuth states

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::constants::OAUTH_STATE_TTL_MINUTES;
use crate::models::{ConnectedAccount, NewConnectedAccount, OAuthState, Platform};

pub async fn save_oauth_state<'e, E>(
    executor: E,
    user_id: Uuid,
    platform: Platform,
    state: &str,
    code_verifier: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO oauth_states (state, user_id, platform, code_verifier)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(state)
    .bind(user_id)
    .bind(platform)
    .bind(code_verifier)
    .execute(executor)
    .await?;
    Ok(())
}

/// Consume a pending state. Returns None if it doesn't exist or has expired.
pub async fn take_oauth_state<'e, E>(
    executor: E,
    platform: Platform,
    state: &str,
) -> Result<Option<OAuthState>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    // Atomic DELETE + RETURNING so a state can only be redeemed once
    sqlx::query_as(
        r#"
        DELETE FROM oauth_states
        WHERE state = $1
          AND platform = $2
          AND created_at > NOW() - make_interval(mins => $3)
        RETURNING user_id, code_verifier
        "#,
    )
    .bind(state)
    .bind(platform)
    .bind(OAUTH_STATE_TTL_MINUTES as i32)
    .fetch_optional(executor)
    .await
}

/// Drop pending states created before `older_than`. Returns how many were removed.
pub async fn delete_expired_oauth_states<'e, E>(
    executor: E,
    older_than: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM oauth_states WHERE created_at < $1")
        .bind(older_than)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn upsert_connected_account<'e, E>(
    executor: E,
    account: &NewConnectedAccount,
) -> Result<ConnectedAccount, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO connected_accounts (
            user_id, platform, access_token, refresh_token, token_expires_at,
            platform_user_id, platform_username, platform_avatar_url
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, platform) DO UPDATE SET
            access_token = EXCLUDED.access_token,
            refresh_token = EXCLUDED.refresh_token,
            token_expires_at = EXCLUDED.token_expires_at,
            platform_user_id = EXCLUDED.platform_user_id,
            platform_username = EXCLUDED.platform_username,
            platform_avatar_url = EXCLUDED.platform_avatar_url,
            updated_at = NOW()
        RETURNING id, user_id, platform, access_token, refresh_token, token_expires_at,
                  platform_user_id, platform_username, platform_avatar_url,
                  created_at, updated_at
        "#,
    )
    .bind(account.user_id)
    .bind(account.platform)
    .bind(&account.access_token)
    .bind(&account.refresh_token)
    .bind(account.token_expires_at)
    .bind(&account.platform_user_id)
    .bind(&account.platform_username)
    .bind(&account.platform_avatar_url)
    .fetch_one(executor)
    .await
}

pub async fn get_connected_account<'e, E>(
    executor: E,
    user_id: Uuid,
    platform: Platform,
) -> Result<Option<ConnectedAccount>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, platform, access_token, refresh_token, token_expires_at,
               platform_user_id, platform_username, platform_avatar_url,
               created_at, updated_at
        FROM connected_accounts
        WHERE user_id = $1 AND platform = $2
        "#,
    )
    .bind(user_id)
    .bind(platform)
    .fetch_optional(executor)
    .await
}

/// Persist a freshly refreshed access token
pub async fn update_access_token<'e, E>(
    executor: E,
    user_id: Uuid,
    platform: Platform,
    access_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE connected_accounts SET
            access_token = $3,
            token_expires_at = $4,
            updated_at = NOW()
        WHERE user_id = $1 AND platform = $2
        "#,
    )
    .bind(user_id)
    .bind(platform)
    .bind(access_token)
    .bind(expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_connected_account<'e, E>(
    executor: E,
    user_id: Uuid,
    platform: Platform,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result =
        sqlx::query("DELETE FROM connected_accounts WHERE user_id = $1 AND platform = $2")
            .bind(user_id)
            .bind(platform)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}
