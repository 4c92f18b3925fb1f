pub mod auth;
pub mod functions;
pub mod posts;
pub mod profile;
pub mod videos;
pub mod youtube;

use axum::{Json, Router, http::StatusCode, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::services::drafts::DraftError;
use crate::services::error::ApiError;
use crate::services::library::LibraryError;
use crate::services::publish::PublishError;
use crate::services::store::StoreError;
use crate::services::supabase_auth::AuthError;
use crate::services::uploads::UploadError;
use crate::services::youtube::YouTubeError;
use crate::services::youtube_oauth::ConnectError;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(profile::routes())
        .merge(videos::routes())
        .merge(posts::routes())
        .merge(youtube::routes())
        .merge(functions::routes())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// Service error -> HTTP status
// ============================================================================

fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %e, "{}", context);
    ApiError::internal()
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        internal("Database error", e)
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::NotFound(_) => ApiError::not_found(e.to_string()),
            LibraryError::Store(e) => e.into(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Invalid(message) => ApiError::bad_request(message),
            UploadError::LimitReached => ApiError::forbidden(e.to_string()),
            UploadError::NotFound => ApiError::not_found(e.to_string()),
            UploadError::Store(e) => e.into(),
            UploadError::Storage(e) => internal("Storage error", e),
        }
    }
}

impl From<DraftError> for ApiError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::NotFound => ApiError::not_found(e.to_string()),
            DraftError::MissingSchedule => ApiError::bad_request(e.to_string()),
            DraftError::PostsFailed(_) | DraftError::MissingExisting => {
                tracing::error!(error = %e, "Draft save failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            DraftError::Store(e) => e.into(),
        }
    }
}

fn youtube_error(e: YouTubeError) -> ApiError {
    tracing::warn!(error = %e, "YouTube request failed");
    ApiError::new(StatusCode::BAD_GATEWAY, e.to_string())
}

impl From<ConnectError> for ApiError {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::YouTube(e) => youtube_error(e),
            ConnectError::Store(e) => e.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(e: PublishError) -> Self {
        match e {
            PublishError::PostNotFound | PublishError::VideoNotFound => {
                ApiError::not_found(e.to_string())
            }
            PublishError::WrongPlatform | PublishError::NotConnected => {
                ApiError::bad_request(e.to_string())
            }
            PublishError::NoAccessToken => ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()),
            PublishError::Download(_) => {
                tracing::error!(error = %e, "Video download failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            PublishError::YouTube(e) => youtube_error(e),
            PublishError::Draft(e) => e.into(),
            PublishError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_GATEWAY);
        match e {
            AuthError::Http(e) => {
                tracing::error!(error = %e, "Auth server unreachable");
                ApiError::new(status, "Authentication service unavailable")
            }
            AuthError::Api { message, .. } => ApiError::new(status, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStorage, MemoryStore, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_public() {
        let state = test_state(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStorage::new()),
            None,
        );
        let app = build_routes().with_state(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn upload_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(UploadError::LimitReached).status,
            StatusCode::FORBIDDEN
        );
        let invalid = ApiError::from(UploadError::Invalid("Please upload a video file.".into()));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message, "Please upload a video file.");
    }

    #[test]
    fn auth_server_errors_keep_their_status() {
        let err = ApiError::from(AuthError::Api {
            status: 400,
            message: "Invalid login credentials".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid login credentials");
    }
}
