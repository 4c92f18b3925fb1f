//! In-memory stand-ins for the store, object storage and YouTube seams.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::AppState;
use crate::models::{
    ConnectedAccount, DuePost, NewConnectedAccount, NewVideo, OAuthState, Platform, Post,
    PostStatus, PostUpdate, Profile, ProfileUpdate, Video, VideoSearch, VideoStatus, VideoUpdate,
};
use crate::services::cookies::{CookieSettings, SameSite};
use crate::services::inactivity::SessionActivity;
use crate::services::store::{Store, StoreError, StoreResult};
use crate::services::supabase_auth::AuthClient;
use crate::services::youtube::{ChannelInfo, TokenResponse, VideoMetadata, YouTubeApi, YouTubeError};
use crate::storage::{ObjectStorage, StorageError};

fn injected() -> StoreError {
    StoreError::Database(sqlx::Error::Protocol("injected failure".to_string()))
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    videos: Vec<Video>,
    posts: Vec<Post>,
    accounts: Vec<ConnectedAccount>,
    states: Vec<(String, Uuid, Platform, String, DateTime<Utc>)>,
    clock: i64,
}

impl Tables {
    /// Strictly increasing timestamps so "newest first" is deterministic
    fn now(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(self.clock)
    }

    fn owns_video(&self, user_id: Uuid, video_id: Uuid) -> bool {
        self.videos
            .iter()
            .any(|v| v.id == video_id && v.user_id == user_id)
    }
}

#[derive(Default)]
struct Faults {
    limit_on_video_insert: bool,
    hide_posts_from_lookup: bool,
    failing_post_platforms: HashSet<Platform>,
    fail_post_deletes: bool,
    /// Video updates left before every further one fails
    video_updates_left: Option<usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
    calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn call(&self) {
        *self.calls.lock().unwrap() += 1;
    }

    /// Number of trait calls made so far
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Backdate every pending OAuth state
    pub fn age_oauth_states(&self, by: Duration) {
        for entry in self.tables.lock().unwrap().states.iter_mut() {
            entry.4 -= by;
        }
    }

    pub fn seed_video(&self, user_id: Uuid) -> Video {
        self.seed_video_titled(user_id, "Seeded clip")
    }

    pub fn seed_video_titled(&self, user_id: Uuid, title: &str) -> Video {
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        let id = Uuid::new_v4();
        let video = Video {
            id,
            user_id,
            title: Some(title.to_string()),
            storage_path: format!("{}/{}.mp4", user_id, id),
            public_url: format!("https://storage.test/public/{}/{}.mp4", user_id, id),
            caption: Some("original caption".to_string()),
            status: VideoStatus::Draft,
            scheduled_at: None,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        t.videos.push(video.clone());
        video
    }

    pub fn seed_post(&self, video_id: Uuid, platform: Platform, status: PostStatus) -> Post {
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        let post = Post {
            id: Uuid::new_v4(),
            video_id,
            platform,
            platform_post_id: None,
            status,
            error_message: None,
            scheduled_at: (status == PostStatus::Scheduled).then_some(now),
            posted_at: (status == PostStatus::Posted).then_some(now),
            created_at: now,
            updated_at: now,
        };
        t.posts.push(post.clone());
        post
    }

    pub fn seed_youtube_account(&self, user_id: Uuid, refresh_token: &str) -> ConnectedAccount {
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        let account = ConnectedAccount {
            id: Uuid::new_v4(),
            user_id,
            platform: Platform::Youtube,
            access_token: Some("stale-access".to_string()),
            refresh_token: refresh_token.to_string(),
            token_expires_at: Some(now),
            platform_user_id: Some("UC-seeded".to_string()),
            platform_username: Some("Seeded Channel".to_string()),
            platform_avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        t.accounts.push(account.clone());
        account
    }

    pub fn seed_profile(&self, user_id: Uuid, full_name: &str) -> Profile {
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        let profile = Profile {
            id: user_id,
            full_name: Some(full_name.to_string()),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        t.profiles.insert(user_id, profile.clone());
        profile
    }

    pub fn remove_accounts(&self, user_id: Uuid) {
        self.tables
            .lock()
            .unwrap()
            .accounts
            .retain(|a| a.user_id != user_id);
    }

    pub fn set_video_status(&self, video_id: Uuid, status: VideoStatus) {
        let mut t = self.tables.lock().unwrap();
        if let Some(v) = t.videos.iter_mut().find(|v| v.id == video_id) {
            v.status = status;
        }
    }

    pub fn video(&self, id: Uuid) -> Option<Video> {
        let t = self.tables.lock().unwrap();
        t.videos.iter().find(|v| v.id == id).cloned()
    }

    pub fn videos_for(&self, user_id: Uuid) -> Vec<Video> {
        let t = self.tables.lock().unwrap();
        t.videos
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn post(&self, id: Uuid) -> Option<Post> {
        let t = self.tables.lock().unwrap();
        t.posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn posts_for(&self, video_id: Uuid) -> Vec<Post> {
        let t = self.tables.lock().unwrap();
        t.posts
            .iter()
            .filter(|p| p.video_id == video_id)
            .cloned()
            .collect()
    }

    pub fn youtube_account(&self, user_id: Uuid) -> Option<ConnectedAccount> {
        let t = self.tables.lock().unwrap();
        t.accounts
            .iter()
            .find(|a| a.user_id == user_id && a.platform == Platform::Youtube)
            .cloned()
    }

    /// Video inserts fail the way the upload-limit trigger does
    pub fn reject_video_inserts_with_limit(&self) {
        self.faults.lock().unwrap().limit_on_video_insert = true;
    }

    /// `find_post` returns nothing, as if the row vanished after a conflict
    pub fn hide_posts_from_lookup(&self) {
        self.faults.lock().unwrap().hide_posts_from_lookup = true;
    }

    pub fn fail_post_inserts_for(&self, platform: Platform) {
        self.faults
            .lock()
            .unwrap()
            .failing_post_platforms
            .insert(platform);
    }

    pub fn fail_post_deletes(&self) {
        self.faults.lock().unwrap().fail_post_deletes = true;
    }

    /// Let `n` video updates through, then fail the rest
    pub fn fail_video_updates_after(&self, n: usize) {
        self.faults.lock().unwrap().video_updates_left = Some(n);
    }
}

fn apply_post_update(post: &mut Post, update: &PostUpdate, now: DateTime<Utc>) {
    if let Some(status) = update.status {
        post.status = status;
    }
    if let Some(v) = update.scheduled_at {
        post.scheduled_at = v;
    }
    if let Some(v) = update.posted_at {
        post.posted_at = v;
    }
    if let Some(v) = &update.platform_post_id {
        post.platform_post_id = v.clone();
    }
    if let Some(v) = &update.error_message {
        post.error_message = v.clone();
    }
    post.updated_at = now;
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        self.call();
        Ok(self.tables.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<Profile>> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        Ok(t.profiles.get_mut(&user_id).map(|p| {
            if let Some(v) = &update.full_name {
                p.full_name = v.clone();
            }
            if let Some(v) = &update.avatar_url {
                p.avatar_url = v.clone();
            }
            p.updated_at = now;
            p.clone()
        }))
    }

    async fn count_videos(&self, user_id: Uuid) -> StoreResult<i64> {
        self.call();
        Ok(self.videos_for(user_id).len() as i64)
    }

    async fn list_videos(&self, user_id: Uuid) -> StoreResult<Vec<Video>> {
        self.call();
        let mut videos = self.videos_for(user_id);
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn search_videos(
        &self,
        user_id: Uuid,
        search: &VideoSearch,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Video>> {
        self.call();
        let t = self.tables.lock().unwrap();
        let needle = search
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let contains = |field: &Option<String>, needle: &str| {
            field
                .as_deref()
                .is_some_and(|f| f.to_lowercase().contains(needle))
        };

        let mut videos: Vec<Video> = t
            .videos
            .iter()
            .filter(|v| v.user_id == user_id)
            .filter(|v| match &needle {
                Some(n) => contains(&v.title, n) || contains(&v.caption, n),
                None => true,
            })
            .filter(|v| search.status.is_none_or(|s| v.status == s))
            .filter(|v| {
                search.platform.is_none_or(|p| {
                    t.posts
                        .iter()
                        .any(|post| post.video_id == v.id && post.platform == p)
                })
            })
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_video(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<Option<Video>> {
        self.call();
        Ok(self.video(video_id).filter(|v| v.user_id == user_id))
    }

    async fn insert_video(&self, video: &NewVideo) -> StoreResult<Video> {
        self.call();
        if self.faults.lock().unwrap().limit_on_video_insert {
            return Err(StoreError::UploadLimit);
        }
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        let row = Video {
            id: Uuid::new_v4(),
            user_id: video.user_id,
            title: video.title.clone(),
            storage_path: video.storage_path.clone(),
            public_url: video.public_url.clone(),
            caption: video.caption.clone(),
            status: video.status,
            scheduled_at: video.scheduled_at,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        t.videos.push(row.clone());
        Ok(row)
    }

    async fn update_video(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        update: &VideoUpdate,
    ) -> StoreResult<Option<Video>> {
        self.call();
        if let Some(left) = self.faults.lock().unwrap().video_updates_left.as_mut() {
            if *left == 0 {
                return Err(injected());
            }
            *left -= 1;
        }
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        Ok(t
            .videos
            .iter_mut()
            .find(|v| v.id == video_id && v.user_id == user_id)
            .map(|v| {
                if let Some(title) = &update.title {
                    v.title = title.clone();
                }
                if let Some(caption) = &update.caption {
                    v.caption = caption.clone();
                }
                if let Some(status) = update.status {
                    v.status = status;
                }
                if let Some(at) = update.scheduled_at {
                    v.scheduled_at = at;
                }
                if let Some(at) = update.posted_at {
                    v.posted_at = at;
                }
                v.updated_at = now;
                v.clone()
            }))
    }

    async fn mark_video_posted(
        &self,
        video_id: Uuid,
        posted_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        if let Some(v) = t.videos.iter_mut().find(|v| v.id == video_id) {
            v.status = VideoStatus::Posted;
            v.posted_at = Some(posted_at);
        }
        Ok(())
    }

    async fn delete_video(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<bool> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        if !t.owns_video(user_id, video_id) {
            return Ok(false);
        }
        t.videos.retain(|v| v.id != video_id);
        t.posts.retain(|p| p.video_id != video_id);
        Ok(true)
    }

    async fn list_posts_for_videos(&self, video_ids: &[Uuid]) -> StoreResult<Vec<Post>> {
        self.call();
        let t = self.tables.lock().unwrap();
        let mut posts: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| video_ids.contains(&p.video_id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn list_user_posts(&self, user_id: Uuid) -> StoreResult<Vec<Post>> {
        self.call();
        let t = self.tables.lock().unwrap();
        let mut posts: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| t.owns_video(user_id, p.video_id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn get_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<Post>> {
        self.call();
        let t = self.tables.lock().unwrap();
        Ok(t.posts
            .iter()
            .find(|p| p.id == post_id && t.owns_video(user_id, p.video_id))
            .cloned())
    }

    async fn find_post(&self, video_id: Uuid, platform: Platform) -> StoreResult<Option<Post>> {
        self.call();
        if self.faults.lock().unwrap().hide_posts_from_lookup {
            return Ok(None);
        }
        let t = self.tables.lock().unwrap();
        Ok(t.posts
            .iter()
            .find(|p| p.video_id == video_id && p.platform == platform)
            .cloned())
    }

    async fn insert_post(
        &self,
        video_id: Uuid,
        platform: Platform,
        fields: &PostUpdate,
    ) -> StoreResult<Post> {
        self.call();
        if self
            .faults
            .lock()
            .unwrap()
            .failing_post_platforms
            .contains(&platform)
        {
            return Err(injected());
        }
        let mut t = self.tables.lock().unwrap();
        if t.posts
            .iter()
            .any(|p| p.video_id == video_id && p.platform == platform)
        {
            return Err(StoreError::Duplicate("posts_video_id_platform_key".to_string()));
        }
        let now = t.now();
        let mut post = Post {
            id: Uuid::new_v4(),
            video_id,
            platform,
            platform_post_id: None,
            status: PostStatus::Draft,
            error_message: None,
            scheduled_at: None,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        apply_post_update(&mut post, fields, now);
        t.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: Uuid, update: &PostUpdate) -> StoreResult<Option<Post>> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        Ok(t.posts.iter_mut().find(|p| p.id == post_id).map(|p| {
            apply_post_update(p, update, now);
            p.clone()
        }))
    }

    async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let owned = t
            .posts
            .iter()
            .any(|p| p.id == post_id && t.owns_video(user_id, p.video_id));
        if owned {
            t.posts.retain(|p| p.id != post_id);
        }
        Ok(owned)
    }

    async fn delete_posts_for_platforms(
        &self,
        video_id: Uuid,
        platforms: &[Platform],
    ) -> StoreResult<u64> {
        self.call();
        if self.faults.lock().unwrap().fail_post_deletes {
            return Err(injected());
        }
        let mut t = self.tables.lock().unwrap();
        let before = t.posts.len();
        t.posts
            .retain(|p| !(p.video_id == video_id && platforms.contains(&p.platform)));
        Ok((before - t.posts.len()) as u64)
    }

    async fn list_due_posts(
        &self,
        platform: Platform,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<DuePost>> {
        self.call();
        let t = self.tables.lock().unwrap();
        let mut due: Vec<&Post> = t
            .posts
            .iter()
            .filter(|p| {
                p.platform == platform
                    && p.status == PostStatus::Scheduled
                    && p.scheduled_at.is_some_and(|at| at <= now)
            })
            .collect();
        due.sort_by_key(|p| p.scheduled_at);
        Ok(due
            .into_iter()
            .take(limit as usize)
            .filter_map(|p| {
                t.videos
                    .iter()
                    .find(|v| v.id == p.video_id)
                    .map(|v| DuePost {
                        post_id: p.id,
                        user_id: v.user_id,
                    })
            })
            .collect())
    }

    async fn save_oauth_state(
        &self,
        user_id: Uuid,
        platform: Platform,
        state: &str,
        code_verifier: &str,
    ) -> StoreResult<()> {
        self.call();
        self.tables.lock().unwrap().states.push((
            state.to_string(),
            user_id,
            platform,
            code_verifier.to_string(),
            Utc::now(),
        ));
        Ok(())
    }

    async fn take_oauth_state(
        &self,
        platform: Platform,
        state: &str,
    ) -> StoreResult<Option<OAuthState>> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let index = t
            .states
            .iter()
            .position(|(s, _, p, _, _)| s == state && *p == platform);
        Ok(index.map(|i| {
            let (_, user_id, _, code_verifier, _) = t.states.remove(i);
            OAuthState {
                user_id,
                code_verifier,
            }
        }))
    }

    async fn purge_oauth_states(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let before = t.states.len();
        t.states.retain(|(_, _, _, _, created_at)| *created_at >= older_than);
        Ok((before - t.states.len()) as u64)
    }

    async fn upsert_connected_account(
        &self,
        account: &NewConnectedAccount,
    ) -> StoreResult<ConnectedAccount> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let now = t.now();
        let existing = t
            .accounts
            .iter()
            .position(|a| a.user_id == account.user_id && a.platform == account.platform);
        let (id, created_at) = match existing {
            Some(i) => {
                let old = t.accounts.remove(i);
                (old.id, old.created_at)
            }
            None => (Uuid::new_v4(), now),
        };
        let row = ConnectedAccount {
            id,
            user_id: account.user_id,
            platform: account.platform,
            access_token: Some(account.access_token.clone()),
            refresh_token: account.refresh_token.clone(),
            token_expires_at: Some(account.token_expires_at),
            platform_user_id: account.platform_user_id.clone(),
            platform_username: account.platform_username.clone(),
            platform_avatar_url: account.platform_avatar_url.clone(),
            created_at,
            updated_at: now,
        };
        t.accounts.push(row.clone());
        Ok(row)
    }

    async fn get_connected_account(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> StoreResult<Option<ConnectedAccount>> {
        self.call();
        let t = self.tables.lock().unwrap();
        Ok(t.accounts
            .iter()
            .find(|a| a.user_id == user_id && a.platform == platform)
            .cloned())
    }

    async fn update_access_token(
        &self,
        user_id: Uuid,
        platform: Platform,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        if let Some(a) = t
            .accounts
            .iter_mut()
            .find(|a| a.user_id == user_id && a.platform == platform)
        {
            a.access_token = Some(access_token.to_string());
            a.token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn delete_connected_account(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> StoreResult<bool> {
        self.call();
        let mut t = self.tables.lock().unwrap();
        let before = t.accounts.len();
        t.accounts
            .retain(|a| !(a.user_id == user_id && a.platform == platform));
        Ok(t.accounts.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    uploaded: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::copy_from_slice(data));
    }

    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn removed_paths(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(StorageError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(path.to_string(), data);
        self.uploaded.lock().unwrap().push(path.to_string());
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        self.object(path).ok_or_else(|| StorageError::Api {
            status: 404,
            message: "Object not found".to_string(),
        })
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
            self.removed.lock().unwrap().push(path.clone());
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/public/{}", path)
    }
}

#[derive(Default)]
struct YouTubeCalls {
    exchanges: usize,
    last_verifier: Option<String>,
    refresh_token_used: Option<String>,
    last_init: Option<(VideoMetadata, usize)>,
    fail_init: bool,
    omit_refresh_token: bool,
    fail_channel: bool,
}

#[derive(Default)]
pub struct FakeYouTube {
    calls: Mutex<YouTubeCalls>,
}

impl FakeYouTube {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchanges(&self) -> usize {
        self.calls.lock().unwrap().exchanges
    }

    pub fn last_verifier(&self) -> Option<String> {
        self.calls.lock().unwrap().last_verifier.clone()
    }

    pub fn used_refresh_token(&self) -> Option<String> {
        self.calls.lock().unwrap().refresh_token_used.clone()
    }

    pub fn last_init(&self) -> Option<(VideoMetadata, usize)> {
        self.calls.lock().unwrap().last_init.clone()
    }

    pub fn fail_init(&self) {
        self.calls.lock().unwrap().fail_init = true;
    }

    pub fn omit_refresh_token(&self) {
        self.calls.lock().unwrap().omit_refresh_token = true;
    }

    pub fn fail_channel_lookup(&self) {
        self.calls.lock().unwrap().fail_channel = true;
    }
}

#[async_trait]
impl YouTubeApi for FakeYouTube {
    fn authorize_url(&self, state: &str, code_challenge: &str) -> String {
        format!(
            "https://accounts.test/o/oauth2/v2/auth?state={}&code_challenge={}",
            state, code_challenge
        )
    }

    async fn exchange_code(
        &self,
        _code: &str,
        code_verifier: Option<&str>,
        _redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, YouTubeError> {
        let mut calls = self.calls.lock().unwrap();
        calls.exchanges += 1;
        calls.last_verifier = code_verifier.map(str::to_string);
        Ok(TokenResponse {
            access_token: Some("access-1".to_string()),
            refresh_token: (!calls.omit_refresh_token).then(|| "refresh-1".to_string()),
            expires_in: Some(3600),
        })
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, YouTubeError> {
        self.calls.lock().unwrap().refresh_token_used = Some(refresh_token.to_string());
        Ok(TokenResponse {
            access_token: Some("access-1".to_string()),
            refresh_token: None,
            expires_in: Some(3599),
        })
    }

    async fn my_channel(&self, _access_token: &str) -> Result<Option<ChannelInfo>, YouTubeError> {
        if self.calls.lock().unwrap().fail_channel {
            return Err(YouTubeError::Api("quotaExceeded".to_string()));
        }
        Ok(Some(ChannelInfo {
            id: "UC-fake".to_string(),
            title: Some("Fake Channel".to_string()),
            avatar_url: Some("https://yt.test/avatar.jpg".to_string()),
        }))
    }

    async fn start_resumable_upload(
        &self,
        _access_token: &str,
        metadata: &VideoMetadata,
        content_length: usize,
        _content_type: &str,
    ) -> Result<String, YouTubeError> {
        let mut calls = self.calls.lock().unwrap();
        if calls.fail_init {
            return Err(YouTubeError::InitFailed("backendError".to_string()));
        }
        calls.last_init = Some((metadata.clone(), content_length));
        Ok("https://upload.test/session/1".to_string())
    }

    async fn upload_to_session(
        &self,
        _access_token: &str,
        _session_url: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Result<String, YouTubeError> {
        Ok("yt-video-1".to_string())
    }
}

pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-with-at-least-32-characters";

/// App state wired to the in-memory fakes. The auth client points nowhere.
pub fn test_state(
    store: Arc<MemoryStore>,
    storage: Arc<MemoryStorage>,
    youtube: Option<Arc<FakeYouTube>>,
) -> Arc<AppState> {
    Arc::new(AppState {
        store: store as Arc<dyn Store>,
        storage: storage as Arc<dyn ObjectStorage>,
        youtube: youtube.map(|yt| yt as Arc<dyn YouTubeApi>),
        auth: AuthClient::new("http://127.0.0.1:9", "anon", "http://localhost:5173"),
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        activity: SessionActivity::new(std::time::Duration::from_secs(300)),
        cookies: CookieSettings {
            secure: false,
            same_site: SameSite::Lax,
        },
    })
}

/// A valid access token for `user_id`, as the auth server would mint it
pub fn access_token_for(user_id: Uuid) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    let claims = crate::services::session::Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
        aud: "authenticated".to_string(),
        email: None,
        session_id: Some(Uuid::new_v4().to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .unwrap()
}
