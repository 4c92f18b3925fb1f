//! Background scheduler: session and OAuth state housekeeping, plus publishing
//! of scheduled YouTube posts

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;
use crate::constants::{OAUTH_STATE_TTL_MINUTES, SCHEDULER_BATCH_SIZE};
use crate::models::Platform;
use crate::services::inactivity::Sweep;
use crate::services::publish;
use crate::services::youtube::{Privacy, YouTubeApi};

pub async fn start_background_scheduler(state: Arc<AppState>, check_interval_secs: u64) {
    if state.youtube.is_none() {
        tracing::info!("YouTube not configured, scheduled posts won't be published");
    }

    let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));
    tracing::info!(check_interval_secs, "Background scheduler started");

    loop {
        interval.tick().await;
        run_housekeeping(&state).await;
        if let Some(youtube) = &state.youtube {
            run_due_posts(&state, youtube.as_ref()).await;
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Housekeeping {
    pub sessions: Sweep,
    pub oauth_states: u64,
}

/// Time out idle sessions and drop OAuth states nobody came back for
pub async fn run_housekeeping(state: &AppState) -> Housekeeping {
    let sessions = state.activity.cleanup();
    if sessions.timed_out > 0 || sessions.purged > 0 {
        tracing::debug!(
            timed_out = sessions.timed_out,
            purged = sessions.purged,
            "Swept idle sessions"
        );
    }

    let cutoff = Utc::now() - chrono::Duration::minutes(OAUTH_STATE_TTL_MINUTES);
    let oauth_states = match state.store.purge_oauth_states(cutoff).await {
        Ok(removed) => {
            if removed > 0 {
                tracing::debug!(removed, "Purged expired OAuth states");
            }
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "Error purging OAuth states");
            0
        }
    };

    Housekeeping {
        sessions,
        oauth_states,
    }
}

/// Publish every due YouTube post once. Returns how many went out.
pub async fn run_due_posts(state: &AppState, youtube: &dyn YouTubeApi) -> usize {
    let due = match state
        .store
        .list_due_posts(Platform::Youtube, Utc::now(), SCHEDULER_BATCH_SIZE)
        .await
    {
        Ok(due) => due,
        Err(e) => {
            tracing::error!(error = %e, "Error finding due posts");
            return 0;
        }
    };

    let mut published = 0;
    for item in due {
        tracing::info!(post_id = %item.post_id, user_id = %item.user_id, "Publishing scheduled post");

        match publish::publish_post_to_youtube(
            state.store.as_ref(),
            state.storage.as_ref(),
            youtube,
            item.user_id,
            item.post_id,
            Privacy::Private,
        )
        .await
        {
            Ok(result) => {
                published += 1;
                tracing::info!(post_id = %item.post_id, youtube_id = %result.youtube_id, "Scheduled post published");
            }
            Err(e) => {
                tracing::error!(post_id = %item.post_id, error = %e, "Scheduled post failed");
                if let Err(mark) = publish::mark_failed(state.store.as_ref(), item.post_id, &e).await {
                    tracing::error!(post_id = %item.post_id, error = %mark, "Failed to mark post failed");
                }
            }
        }
    }
    published
}
