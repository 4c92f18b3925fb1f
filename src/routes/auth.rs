//! Authentication and session management endpoints

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use uuid::Uuid;

use crate::AppState;
use crate::services::cookies::config::{ACCESS_TOKEN_NAME, REFRESH_TOKEN_NAME};
use crate::services::error::{ApiError, ApiResult, LogErr};
use crate::services::inactivity::Touch;
use crate::services::session::{self, SessionError};
use crate::services::supabase_auth::{Provider, Session, SignUpOutcome, User, UserMetadata};

pub fn routes() -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(login))
        .route("/auth/magic-link", post(magic_link))
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/logout", post(logout))
        .route("/auth/password/reset", post(reset_password))
        .route("/auth/password", put(update_password))
        .route("/auth/oauth/{provider}", get(oauth_url))
        .route("/auth/me", get(get_me))
        .route("/auth/user", put(update_user));

    // Burst of 10, then roughly one request per 6 seconds per client IP
    match GovernorConfigBuilder::default()
        .per_second(6)
        .burst_size(10)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
    {
        Some(config) => router.layer(GovernorLayer {
            config: config.into(),
        }),
        None => {
            tracing::warn!("Invalid rate limit config; auth routes are not rate limited");
            router
        }
    }
}

// ============================================================================
// Auth extractors - validate the access token and track inactivity
// ============================================================================

/// Authenticated request: the caller's user id plus the raw access token,
/// which auth-server calls made on the user's behalf need.
pub struct AuthSession {
    pub user_id: Uuid,
    pub access_token: String,
}

/// Extractor for handlers that only need the user id
pub struct AuthUser(pub Uuid);

/// Access token from `Authorization: Bearer`, falling back to the cookie
fn access_token_from(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer
        .map(str::to_string)
        .or_else(|| jar.get(ACCESS_TOKEN_NAME).map(|c| c.value().to_string()))
}

impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let access_token = access_token_from(&parts.headers, &jar)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let session = session::validate_access_token(&access_token, &state.jwt_secret)
            .map_err(|e| match e {
                SessionError::Expired => ApiError::unauthorized("Session expired"),
                SessionError::InvalidToken => ApiError::unauthorized("Invalid session"),
            })?;

        match state.activity.touch(&session.session_key, session.expires_at) {
            Touch::Active => {}
            Touch::TimedOut => {
                tracing::info!(user_id = %session.user_id, "Session timed out due to inactivity");
                if let Err(e) = state.auth.sign_out(&access_token).await {
                    tracing::warn!(error = %e, "Failed to revoke idle session");
                }
                return Err(ApiError::unauthorized(
                    "Session timed out due to inactivity",
                ));
            }
            Touch::Revoked => {
                return Err(ApiError::unauthorized(
                    "Session timed out due to inactivity",
                ));
            }
        }

        Ok(AuthSession {
            user_id: session.user_id,
            access_token,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        Ok(AuthUser(session.user_id))
    }
}

// ============================================================================
// Session endpoints
// ============================================================================

#[derive(Serialize)]
struct SessionResponse {
    user: User,
    expires_in: i64,
}

/// Set the session cookies and open a fresh inactivity window
fn session_response(state: &AppState, session: Session, status: StatusCode) -> ApiResult<Response> {
    let valid = session::validate_access_token(&session.access_token, &state.jwt_secret)
        .log_500("Auth server issued an unverifiable access token")?;
    state.activity.start(&valid.session_key, valid.expires_at);

    let access = state
        .cookies
        .access_cookie(&session.access_token, session.expires_in)?;
    let refresh = state.cookies.refresh_cookie(&session.refresh_token)?;

    let mut response = (
        status,
        Json(SessionResponse {
            user: session.user,
            expires_in: session.expires_in,
        }),
    )
        .into_response();
    response.headers_mut().append(SET_COOKIE, access);
    response.headers_mut().append(SET_COOKIE, refresh);
    Ok(response)
}

#[derive(Deserialize)]
struct SignUpRequest {
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// POST /auth/signup - Create an account; signs in unless email confirmation is pending
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Response> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let outcome = state
        .auth
        .sign_up(
            req.email.trim(),
            &req.password,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
        )
        .await?;

    match outcome {
        SignUpOutcome::Session(session) => session_response(&state, session, StatusCode::CREATED),
        SignUpOutcome::User(user) => Ok((
            StatusCode::CREATED,
            Json(json!({ "user": user, "confirmation_required": true })),
        )
            .into_response()),
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// POST /auth/login - Email + password sign-in
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let session = state
        .auth
        .sign_in_with_password(req.email.trim(), &req.password)
        .await?;
    session_response(&state, session, StatusCode::OK)
}

#[derive(Deserialize)]
struct EmailRequest {
    email: String,
}

/// POST /auth/magic-link - Email a one-time sign-in link
async fn magic_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.email.trim().is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    state.auth.sign_in_with_otp(req.email.trim()).await?;
    Ok(Json(json!({ "message": "Check your email for the login link" })))
}

/// POST /auth/password/reset - Email a password reset link
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.email.trim().is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    state.auth.reset_password_for_email(req.email.trim()).await?;
    Ok(Json(json!({ "message": "Check your email for the password reset link" })))
}

/// POST /auth/refresh - Exchange the refresh token cookie for a new session
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Response> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_NAME)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let session = state.auth.refresh_session(&refresh_token).await.map_err(|e| {
        tracing::debug!(error = %e, "Refresh rejected");
        ApiError::unauthorized("Session expired")
    })?;
    session_response(&state, session, StatusCode::OK)
}

/// POST /auth/logout - Revoke the session and clear cookies
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<Response> {
    if let Some(access_token) = access_token_from(&headers, &jar) {
        if let Ok(valid) = session::validate_access_token(&access_token, &state.jwt_secret) {
            state.activity.forget(&valid.session_key);
        }
        // Cookies are cleared regardless; the client is signed out either way
        if let Err(e) = state.auth.sign_out(&access_token).await {
            tracing::warn!(error = %e, "Failed to revoke session during logout");
        }
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, state.cookies.clear_access_cookie()?);
    response
        .headers_mut()
        .append(SET_COOKIE, state.cookies.clear_refresh_cookie()?);
    Ok(response)
}

/// GET /auth/oauth/{provider} - Provider sign-in URL
async fn oauth_url(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<Provider>,
) -> Json<serde_json::Value> {
    Json(json!({ "url": state.auth.provider_authorize_url(provider) }))
}

/// GET /auth/me - Current user from the auth server
async fn get_me(State(state): State<Arc<AppState>>, auth: AuthSession) -> ApiResult<Json<User>> {
    let user = state.auth.get_user(&auth.access_token).await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
struct PasswordRequest {
    password: String,
}

/// PUT /auth/password
async fn update_password(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Json(req): Json<PasswordRequest>,
) -> ApiResult<Json<User>> {
    if req.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }
    let user = state
        .auth
        .update_password(&auth.access_token, &req.password)
        .await?;
    tracing::info!(user_id = %auth.user_id, "Password updated");
    Ok(Json(user))
}

/// PUT /auth/user - Update name/avatar metadata
async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Json(metadata): Json<UserMetadata>,
) -> ApiResult<Json<User>> {
    let user = state
        .auth
        .update_metadata(&auth.access_token, &metadata)
        .await?;
    Ok(Json(user))
}
