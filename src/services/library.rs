//! Read-side library operations: stats, search, and per-user lookups that
//! need more than one query.

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, RECENT_VIDEOS_LIMIT};
use crate::models::{
    Platform, Post, PostStatus, PostUpdate, UserStats, Video, VideoSearch, VideoStatus,
    VideoUpdate, VideoWithPosts,
};
use crate::services::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Video counts by status, and posted posts per platform (every platform present)
pub fn compute_stats(videos: &[Video], posts: &[Post]) -> UserStats {
    let count = |status: VideoStatus| videos.iter().filter(|v| v.status == status).count();

    let mut platform_stats: BTreeMap<Platform, usize> =
        Platform::ALL.iter().map(|p| (*p, 0)).collect();
    for post in posts.iter().filter(|p| p.status == PostStatus::Posted) {
        *platform_stats.entry(post.platform).or_default() += 1;
    }

    UserStats {
        total_videos: videos.len(),
        draft_videos: count(VideoStatus::Draft),
        scheduled_videos: count(VideoStatus::Scheduled),
        posted_videos: count(VideoStatus::Posted),
        platform_stats,
    }
}

pub async fn user_stats(store: &dyn Store, user_id: Uuid) -> Result<UserStats, LibraryError> {
    let videos = store.list_videos(user_id).await?;
    let posts = if videos.is_empty() {
        Vec::new()
    } else {
        let ids: Vec<Uuid> = videos.iter().map(|v| v.id).collect();
        store.list_posts_for_videos(&ids).await?
    };
    Ok(compute_stats(&videos, &posts))
}

/// Clamp a requested page to sane bounds
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub async fn search_videos(
    store: &dyn Store,
    user_id: Uuid,
    search: &VideoSearch,
) -> Result<Vec<Video>, LibraryError> {
    let (limit, offset) = page_bounds(search.limit, search.offset);
    Ok(store.search_videos(user_id, search, limit, offset).await?)
}

pub async fn recent_videos(
    store: &dyn Store,
    user_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<Video>, LibraryError> {
    let search = VideoSearch::default();
    let limit = limit.unwrap_or(RECENT_VIDEOS_LIMIT).clamp(1, MAX_PAGE_SIZE);
    Ok(store.search_videos(user_id, &search, limit, 0).await?)
}

pub async fn video_with_posts(
    store: &dyn Store,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<VideoWithPosts, LibraryError> {
    let video = store
        .get_video(user_id, video_id)
        .await?
        .ok_or(LibraryError::NotFound("Video"))?;
    let posts = store.list_posts_for_videos(&[video.id]).await?;
    Ok(VideoWithPosts { video, posts })
}

pub async fn video_posts(
    store: &dyn Store,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<Vec<Post>, LibraryError> {
    Ok(video_with_posts(store, user_id, video_id).await?.posts)
}

pub async fn update_video(
    store: &dyn Store,
    user_id: Uuid,
    video_id: Uuid,
    update: &VideoUpdate,
) -> Result<Video, LibraryError> {
    store
        .update_video(user_id, video_id, update)
        .await?
        .ok_or(LibraryError::NotFound("Video"))
}

pub async fn get_post(store: &dyn Store, user_id: Uuid, post_id: Uuid) -> Result<Post, LibraryError> {
    store
        .get_post(user_id, post_id)
        .await?
        .ok_or(LibraryError::NotFound("Post"))
}

pub async fn update_post(
    store: &dyn Store,
    user_id: Uuid,
    post_id: Uuid,
    update: &PostUpdate,
) -> Result<Post, LibraryError> {
    // Ownership check; update_post itself is keyed by id only
    get_post(store, user_id, post_id).await?;
    store
        .update_post(post_id, update)
        .await?
        .ok_or(LibraryError::NotFound("Post"))
}

pub async fn delete_post(store: &dyn Store, user_id: Uuid, post_id: Uuid) -> Result<(), LibraryError> {
    if store.delete_post(user_id, post_id).await? {
        Ok(())
    } else {
        Err(LibraryError::NotFound("Post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[test]
    fn page_bounds_clamp() {
        assert_eq!(page_bounds(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(1000), Some(-5)), (MAX_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(0), Some(20)), (1, 20));
    }

    #[tokio::test]
    async fn stats_count_only_posted_posts() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let a = store.seed_video(user);
        let b = store.seed_video(user);
        store.set_video_status(b.id, VideoStatus::Posted);
        store.seed_post(a.id, Platform::Tiktok, PostStatus::Scheduled);
        store.seed_post(b.id, Platform::Youtube, PostStatus::Posted);
        store.seed_post(b.id, Platform::Twitter, PostStatus::Failed);
        // Someone else's posted video doesn't count
        let other = store.seed_video(Uuid::new_v4());
        store.seed_post(other.id, Platform::Youtube, PostStatus::Posted);

        let stats = user_stats(&store, user).await.unwrap();
        assert_eq!(stats.total_videos, 2);
        assert_eq!(stats.draft_videos, 1);
        assert_eq!(stats.posted_videos, 1);
        assert_eq!(stats.scheduled_videos, 0);
        assert_eq!(stats.platform_stats.len(), 4);
        assert_eq!(stats.platform_stats[&Platform::Youtube], 1);
        assert_eq!(stats.platform_stats[&Platform::Tiktok], 0);
        assert_eq!(stats.platform_stats[&Platform::Twitter], 0);
    }

    #[tokio::test]
    async fn search_filters_by_text_and_platform() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let cats = store.seed_video_titled(user, "Funny Cats");
        let dogs = store.seed_video_titled(user, "dogs at the park");
        store.seed_post(dogs.id, Platform::Instagram, PostStatus::Draft);

        let found = search_videos(
            &store,
            user,
            &VideoSearch {
                query: Some("cat".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(found.iter().map(|v| v.id).collect::<Vec<_>>(), vec![cats.id]);

        let found = search_videos(
            &store,
            user,
            &VideoSearch {
                platform: Some(Platform::Instagram),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(found.iter().map(|v| v.id).collect::<Vec<_>>(), vec![dogs.id]);
    }

    #[tokio::test]
    async fn posts_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let video = store.seed_video(owner);
        let post = store.seed_post(video.id, Platform::Tiktok, PostStatus::Draft);

        let stranger = Uuid::new_v4();
        assert!(matches!(
            update_post(&store, stranger, post.id, &PostUpdate::default()).await,
            Err(LibraryError::NotFound("Post"))
        ));
        assert!(matches!(
            delete_post(&store, stranger, post.id).await,
            Err(LibraryError::NotFound("Post"))
        ));
        assert!(video_with_posts(&store, stranger, video.id).await.is_err());

        let with_posts = video_with_posts(&store, owner, video.id).await.unwrap();
        assert_eq!(with_posts.posts.len(), 1);
        delete_post(&store, owner, post.id).await.unwrap();
        assert!(store.posts_for(video.id).is_empty());
    }
}
