//! Shared data models used across modules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Text-backed enum columns. Generates `as_str`, `FromStr`, `Display` and the
/// sqlx `Type/Decode/Encode` impls so the enum can live in `FromRow` structs.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                Ok(s.parse::<$name>()?)
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

/// Social platform a post targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Instagram,
    Youtube,
    Twitter,
}

text_enum!(Platform, "platform", {
    Tiktok => "tiktok",
    Instagram => "instagram",
    Youtube => "youtube",
    Twitter => "twitter",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Draft,
    Scheduled,
    Posted,
}

text_enum!(VideoStatus, "video status", {
    Draft => "draft",
    Scheduled => "scheduled",
    Posted => "posted",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Posted,
    Failed,
}

text_enum!(PostStatus, "post status", {
    Draft => "draft",
    Scheduled => "scheduled",
    Posted => "posted",
    Failed => "failed",
});

/// Distinguishes "field absent" (`None`) from "field set to null" (`Some(None)`)
/// in PATCH bodies.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub storage_path: String,
    pub public_url: String,
    pub caption: Option<String>,
    pub status: VideoStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub storage_path: String,
    pub public_url: String,
    pub caption: Option<String>,
    pub status: VideoStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Partial video update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub caption: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<VideoStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub posted_at: Option<Option<DateTime<Utc>>>,
}

impl VideoUpdate {
    /// Update that restores the user-editable fields of `video`
    pub fn restore(video: &Video) -> Self {
        Self {
            title: Some(video.title.clone()),
            caption: Some(video.caption.clone()),
            status: Some(video.status),
            scheduled_at: Some(video.scheduled_at),
            posted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub video_id: Uuid,
    pub platform: Platform,
    pub platform_post_id: Option<String>,
    pub status: PostStatus,
    pub error_message: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial post update; on insert, absent fields take their column defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostUpdate {
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub posted_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub platform_post_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub error_message: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoWithPosts {
    #[serde(flatten)]
    pub video: Video,
    pub posts: Vec<Post>,
}

/// A scheduled post whose time has come
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DuePost {
    pub post_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ConnectedAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: Platform,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub platform_user_id: Option<String>,
    pub platform_username: Option<String>,
    pub platform_avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConnectedAccount {
    pub user_id: Uuid,
    pub platform: Platform,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub platform_user_id: Option<String>,
    pub platform_username: Option<String>,
    pub platform_avatar_url: Option<String>,
}

/// Consumed OAuth state: who started the flow and their PKCE verifier
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OAuthState {
    pub user_id: Uuid,
    pub code_verifier: String,
}

/// Library search filters (all optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoSearch {
    pub query: Option<String>,
    pub status: Option<VideoStatus>,
    pub platform: Option<Platform>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub total_videos: usize,
    pub draft_videos: usize,
    pub scheduled_videos: usize,
    pub posted_videos: usize,
    pub platform_stats: BTreeMap<Platform, usize>,
}
