//! Connecting a user's YouTube channel.
//!
//! Start persists a CSRF state and PKCE verifier for the user; the callback
//! must present that state (unexpired, same user) before any code exchange.
//! Tokens never leave the server.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DEFAULT_TOKEN_EXPIRY_SECS;
use crate::models::{ConnectedAccount, NewConnectedAccount, Platform};
use crate::services::store::{Store, StoreError};
use crate::services::youtube::{self, ChannelInfo, YouTubeApi, YouTubeError};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("You denied access to your YouTube account")]
    Denied,
    #[error("{0}")]
    Provider(String),
    #[error("Missing authorization code")]
    MissingCode,
    #[error("Authorization code is required")]
    CodeRequired,
    #[error("Invalid state parameter")]
    InvalidState,
    #[error("Missing required OAuth tokens")]
    MissingTokens,
    #[error(transparent)]
    YouTube(#[from] YouTubeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Query/body of the provider redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// What the token-exchange function hands back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangedTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub channel_avatar: Option<String>,
}

/// Begin the flow; returns the consent URL to send the user to
pub async fn start_connect(
    store: &dyn Store,
    api: &dyn YouTubeApi,
    user_id: Uuid,
) -> Result<String, ConnectError> {
    let request = youtube::begin_authorization(api);
    store
        .save_oauth_state(
            user_id,
            Platform::Youtube,
            &request.state,
            &request.code_verifier,
        )
        .await?;
    Ok(request.url)
}

/// Code -> tokens, plus the channel behind them. A failed channel lookup
/// leaves the channel fields empty.
async fn exchange(
    api: &dyn YouTubeApi,
    code: &str,
    code_verifier: Option<&str>,
    redirect_uri: Option<&str>,
) -> Result<ExchangedTokens, ConnectError> {
    let tokens = api.exchange_code(code, code_verifier, redirect_uri).await?;

    let channel: Option<ChannelInfo> = match tokens.access_token.as_deref() {
        Some(access_token) => match api.my_channel(access_token).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::warn!(error = %e, "Channel lookup failed");
                None
            }
        },
        None => None,
    };

    let (channel_id, channel_title, channel_avatar) = match channel {
        Some(c) => (Some(c.id), c.title, c.avatar_url),
        None => (None, None, None),
    };

    Ok(ExchangedTokens {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        channel_id,
        channel_title,
        channel_avatar,
    })
}

/// Finish the flow for `user_id` and store the connection
pub async fn complete_connect(
    store: &dyn Store,
    api: &dyn YouTubeApi,
    user_id: Uuid,
    params: &CallbackParams,
) -> Result<ConnectedAccount, ConnectError> {
    if let Some(error) = params.error.as_deref() {
        return Err(if error == "access_denied" {
            ConnectError::Denied
        } else {
            ConnectError::Provider(error.to_string())
        });
    }

    let (Some(code), Some(state)) = (params.code.as_deref(), params.state.as_deref()) else {
        return Err(ConnectError::MissingCode);
    };

    let pending = store
        .take_oauth_state(Platform::Youtube, state)
        .await?
        .filter(|s| s.user_id == user_id)
        .ok_or(ConnectError::InvalidState)?;

    let exchanged = exchange(api, code, Some(&pending.code_verifier), None).await?;

    let (Some(access_token), Some(refresh_token)) =
        (exchanged.access_token, exchanged.refresh_token)
    else {
        return Err(ConnectError::MissingTokens);
    };

    let expires_in = exchanged.expires_in.unwrap_or(DEFAULT_TOKEN_EXPIRY_SECS);
    let account = store
        .upsert_connected_account(&NewConnectedAccount {
            user_id,
            platform: Platform::Youtube,
            access_token,
            refresh_token,
            token_expires_at: Utc::now() + Duration::seconds(expires_in),
            platform_user_id: exchanged.channel_id,
            platform_username: exchanged.channel_title,
            platform_avatar_url: exchanged.channel_avatar,
        })
        .await?;

    tracing::info!(%user_id, channel = ?account.platform_username, "YouTube connected");
    Ok(account)
}

/// Stand-alone code exchange used by the token-exchange function
pub async fn exchange_code_for_tokens(
    api: &dyn YouTubeApi,
    code: Option<&str>,
    redirect_uri: Option<&str>,
) -> Result<ExchangedTokens, ConnectError> {
    let code = code.filter(|c| !c.is_empty()).ok_or(ConnectError::CodeRequired)?;
    exchange(api, code, None, redirect_uri).await
}

pub async fn get_connection(
    store: &dyn Store,
    user_id: Uuid,
) -> Result<Option<ConnectedAccount>, ConnectError> {
    Ok(store
        .get_connected_account(user_id, Platform::Youtube)
        .await?)
}

/// Returns false if there was nothing to disconnect
pub async fn disconnect(store: &dyn Store, user_id: Uuid) -> Result<bool, ConnectError> {
    Ok(store
        .delete_connected_account(user_id, Platform::Youtube)
        .await?)
}
