//! Cookie building utilities for session management
//!
//! Centralizes cookie formatting so login, refresh and logout stay consistent.

use axum::http::HeaderValue;

use super::error::ApiError;

/// Cookie configuration constants
pub mod config {
    pub const ACCESS_TOKEN_NAME: &str = "access_token";
    pub const REFRESH_TOKEN_NAME: &str = "refresh_token";
    /// Refresh token max-age in seconds (30 days)
    pub const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
    pub const COOKIE_PATH: &str = "/";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// Parse `COOKIE_SAMESITE`; anything unrecognised falls back to Lax
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "none" => SameSite::None,
            "strict" => SameSite::Strict,
            _ => SameSite::Lax,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieSettings {
    fn build(&self, name: &str, value: &str, max_age: i64) -> Result<HeaderValue, ApiError> {
        let secure = if self.secure { " Secure;" } else { "" };
        let cookie = format!(
            "{}={}; HttpOnly;{} SameSite={}; Path={}; Max-Age={}",
            name,
            value,
            secure,
            self.same_site.as_str(),
            config::COOKIE_PATH,
            max_age
        );
        cookie.parse().map_err(|_| {
            tracing::error!(cookie = name, "Failed to parse cookie header");
            ApiError::internal()
        })
    }

    /// Access token cookie, living as long as the token itself
    pub fn access_cookie(&self, token: &str, expires_in: i64) -> Result<HeaderValue, ApiError> {
        self.build(config::ACCESS_TOKEN_NAME, token, expires_in)
    }

    pub fn refresh_cookie(&self, token: &str) -> Result<HeaderValue, ApiError> {
        self.build(
            config::REFRESH_TOKEN_NAME,
            token,
            config::REFRESH_TOKEN_MAX_AGE_SECS,
        )
    }

    pub fn clear_access_cookie(&self) -> Result<HeaderValue, ApiError> {
        self.build(config::ACCESS_TOKEN_NAME, "", 0)
    }

    pub fn clear_refresh_cookie(&self) -> Result<HeaderValue, ApiError> {
        self.build(config::REFRESH_TOKEN_NAME, "", 0)
    }
}
