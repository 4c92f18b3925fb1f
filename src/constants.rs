//! Application constants

/// Storage bucket for free-tier uploads
pub const BUCKET_NAME: &str = "FreeBucket";

/// Free-tier cap on stored videos per user
pub const MAX_VIDEOS: i64 = 3;

/// Maximum upload size for a single video (50 MB)
pub const MAX_FILE_SIZE: usize = 52_428_800;

/// Extensions accepted for uploaded videos
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] =
    &["mp4", "mov", "avi", "mkv", "webm", "flv", "wmv", "m4v"];

/// Default page size for paginated list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Maximum page size for paginated list endpoints
pub const MAX_PAGE_SIZE: i64 = 100;

/// Number of videos returned by the dashboard "recent" list
pub const RECENT_VIDEOS_LIMIT: i64 = 5;

/// OAuth CSRF state lifetime in minutes
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Assumed access token lifetime when the provider omits `expires_in`
pub const DEFAULT_TOKEN_EXPIRY_SECS: i64 = 3600;

/// Due posts picked up per scheduler tick
pub const SCHEDULER_BATCH_SIZE: i64 = 10;
