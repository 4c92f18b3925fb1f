//! Row storage seam over the hosted Postgres tables.
//!
//! Services talk to `dyn Store` so the multi-step flows (draft saving, uploads,
//! publishing) can run against an in-memory store in tests. `PgStore` is the
//! production implementation and simply delegates to the `domain` queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{accounts, posts, profiles, videos};
use crate::models::{
    ConnectedAccount, DuePost, NewConnectedAccount, NewVideo, OAuthState, Platform, Post,
    PostUpdate, Profile, ProfileUpdate, Video, VideoSearch, VideoUpdate,
};

/// Message raised by the database trigger guarding the free-tier cap
const UPLOAD_LIMIT_MARKER: &str = "Upload limit reached";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert hit a unique constraint (e.g. `posts_video_id_platform_key`)
    #[error("duplicate key value violates unique constraint {0}")]
    Duplicate(String),
    /// Insert rejected by the server-side upload limit trigger
    #[error("Upload limit reached")]
    UploadLimit,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate(db.constraint().unwrap_or("unknown").to_string());
            }
            if db.message().contains(UPLOAD_LIMIT_MARKER) {
                return StoreError::UploadLimit;
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<Profile>>;

    async fn count_videos(&self, user_id: Uuid) -> StoreResult<i64>;
    async fn list_videos(&self, user_id: Uuid) -> StoreResult<Vec<Video>>;
    async fn search_videos(
        &self,
        user_id: Uuid,
        search: &VideoSearch,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Video>>;
    async fn get_video(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<Option<Video>>;
    async fn insert_video(&self, video: &NewVideo) -> StoreResult<Video>;
    async fn update_video(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        update: &VideoUpdate,
    ) -> StoreResult<Option<Video>>;
    async fn mark_video_posted(&self, video_id: Uuid, posted_at: DateTime<Utc>)
    -> StoreResult<()>;
    async fn delete_video(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<bool>;

    async fn list_posts_for_videos(&self, video_ids: &[Uuid]) -> StoreResult<Vec<Post>>;
    async fn list_user_posts(&self, user_id: Uuid) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<Post>>;
    async fn find_post(&self, video_id: Uuid, platform: Platform) -> StoreResult<Option<Post>>;
    async fn insert_post(
        &self,
        video_id: Uuid,
        platform: Platform,
        fields: &PostUpdate,
    ) -> StoreResult<Post>;
    async fn update_post(&self, post_id: Uuid, update: &PostUpdate) -> StoreResult<Option<Post>>;
    async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool>;
    async fn delete_posts_for_platforms(
        &self,
        video_id: Uuid,
        platforms: &[Platform],
    ) -> StoreResult<u64>;
    async fn list_due_posts(
        &self,
        platform: Platform,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<DuePost>>;

    async fn save_oauth_state(
        &self,
        user_id: Uuid,
        platform: Platform,
        state: &str,
        code_verifier: &str,
    ) -> StoreResult<()>;
    async fn take_oauth_state(
        &self,
        platform: Platform,
        state: &str,
    ) -> StoreResult<Option<OAuthState>>;
    async fn purge_oauth_states(&self, older_than: DateTime<Utc>) -> StoreResult<u64>;
    async fn upsert_connected_account(
        &self,
        account: &NewConnectedAccount,
    ) -> StoreResult<ConnectedAccount>;
    async fn get_connected_account(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> StoreResult<Option<ConnectedAccount>>;
    async fn update_access_token(
        &self,
        user_id: Uuid,
        platform: Platform,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn delete_connected_account(&self, user_id: Uuid, platform: Platform)
    -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(profiles::get_profile(&self.db, user_id).await?)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<Profile>> {
        Ok(profiles::update_profile(&self.db, user_id, update).await?)
    }

    async fn count_videos(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(videos::count_videos(&self.db, user_id).await?)
    }

    async fn list_videos(&self, user_id: Uuid) -> StoreResult<Vec<Video>> {
        Ok(videos::list_videos(&self.db, user_id).await?)
    }

    async fn search_videos(
        &self,
        user_id: Uuid,
        search: &VideoSearch,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Video>> {
        Ok(videos::search_videos(&self.db, user_id, search, limit, offset).await?)
    }

    async fn get_video(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<Option<Video>> {
        Ok(videos::get_video(&self.db, user_id, video_id).await?)
    }

    async fn insert_video(&self, video: &NewVideo) -> StoreResult<Video> {
        Ok(videos::insert_video(&self.db, video).await?)
    }

    async fn update_video(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        update: &VideoUpdate,
    ) -> StoreResult<Option<Video>> {
        Ok(videos::update_video(&self.db, user_id, video_id, update).await?)
    }

    async fn mark_video_posted(
        &self,
        video_id: Uuid,
        posted_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        Ok(videos::mark_video_posted(&self.db, video_id, posted_at).await?)
    }

    async fn delete_video(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<bool> {
        Ok(videos::delete_video(&self.db, user_id, video_id).await?)
    }

    async fn list_posts_for_videos(&self, video_ids: &[Uuid]) -> StoreResult<Vec<Post>> {
        Ok(posts::list_posts_for_videos(&self.db, video_ids).await?)
    }

    async fn list_user_posts(&self, user_id: Uuid) -> StoreResult<Vec<Post>> {
        Ok(posts::list_user_posts(&self.db, user_id).await?)
    }

    async fn get_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<Post>> {
        Ok(posts::get_post(&self.db, user_id, post_id).await?)
    }

    async fn find_post(&self, video_id: Uuid, platform: Platform) -> StoreResult<Option<Post>> {
        Ok(posts::find_post(&self.db, video_id, platform).await?)
    }

    async fn insert_post(
        &self,
        video_id: Uuid,
        platform: Platform,
        fields: &PostUpdate,
    ) -> StoreResult<Post> {
        Ok(posts::insert_post(&self.db, video_id, platform, fields).await?)
    }

    async fn update_post(&self, post_id: Uuid, update: &PostUpdate) -> StoreResult<Option<Post>> {
        Ok(posts::update_post(&self.db, post_id, update).await?)
    }

    async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        Ok(posts::delete_post(&self.db, user_id, post_id).await?)
    }

    async fn delete_posts_for_platforms(
        &self,
        video_id: Uuid,
        platforms: &[Platform],
    ) -> StoreResult<u64> {
        Ok(posts::delete_posts_for_platforms(&self.db, video_id, platforms).await?)
    }

    async fn list_due_posts(
        &self,
        platform: Platform,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<DuePost>> {
        Ok(posts::list_due_posts(&self.db, platform, now, limit).await?)
    }

    async fn save_oauth_state(
        &self,
        user_id: Uuid,
        platform: Platform,
        state: &str,
        code_verifier: &str,
    ) -> StoreResult<()> {
        Ok(accounts::save_oauth_state(&self.db, user_id, platform, state, code_verifier).await?)
    }

    async fn take_oauth_state(
        &self,
        platform: Platform,
        state: &str,
    ) -> StoreResult<Option<OAuthState>> {
        Ok(accounts::take_oauth_state(&self.db, platform, state).await?)
    }

    async fn purge_oauth_states(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        Ok(accounts::delete_expired_oauth_states(&self.db, older_than).await?)
    }

    async fn upsert_connected_account(
        &self,
        account: &NewConnectedAccount,
    ) -> StoreResult<ConnectedAccount> {
        Ok(accounts::upsert_connected_account(&self.db, account).await?)
    }

    async fn get_connected_account(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> StoreResult<Option<ConnectedAccount>> {
        Ok(accounts::get_connected_account(&self.db, user_id, platform).await?)
    }

    async fn update_access_token(
        &self,
        user_id: Uuid,
        platform: Platform,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        Ok(
            accounts::update_access_token(&self.db, user_id, platform, access_token, expires_at)
                .await?,
        )
    }

    async fn delete_connected_account(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> StoreResult<bool> {
        Ok(accounts::delete_connected_account(&self.db, user_id, platform).await?)
    }
}
