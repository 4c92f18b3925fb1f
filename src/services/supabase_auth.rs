//! Client for the hosted auth server (GoTrue REST API).
//!
//! Sign-up, password and magic-link sign-in, provider sign-in URLs, session
//! refresh, sign-out and user updates. Errors carry the server's message so
//! routes can surface it verbatim.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl AuthError {
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Http(_) => 502,
            AuthError::Api { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    pub created_at: Option<String>,
    pub last_sign_in_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: User,
}

/// Sign-up returns a session when email confirmation is off, or just the
/// unconfirmed user otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(Session),
    User(User),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
    Discord,
    Twitter,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Discord => "discord",
            Provider::Twitter => "twitter",
        }
    }
}

/// User metadata written on profile updates; unset fields are sent as null
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    anon_key: String,
    site_url: String,
    http: Client,
}

impl AuthClient {
    pub fn new(supabase_url: &str, anon_key: &str, site_url: &str) -> Self {
        Self {
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn check(resp: Response) -> Result<Response, AuthError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.msg.or(b.error_description).or(b.message).or(b.error))
            .unwrap_or(text);
        Err(AuthError::Api { status, message })
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let resp = self
            .request(reqwest::Method::POST, "/signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "first_name": first_name, "last_name": last_name },
            }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let resp = self
            .request(reqwest::Method::POST, "/token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let resp = self
            .request(reqwest::Method::POST, "/token?grant_type=refresh_token")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Email a magic link that lands back on the site
    pub async fn sign_in_with_otp(&self, email: &str) -> Result<(), AuthError> {
        let path = format!("/otp?redirect_to={}", encode(&self.site_url));
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// URL the browser should visit to sign in with a third-party provider
    pub fn provider_authorize_url(&self, provider: Provider) -> String {
        format!(
            "{}/authorize?provider={}&redirect_to={}",
            self.base_url,
            provider.as_str(),
            encode(&self.site_url)
        )
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let resp = self
            .request(reqwest::Method::POST, "/logout")
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        let resp = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError> {
        let redirect = format!("{}/reset-password", self.site_url);
        let path = format!("/recover?redirect_to={}", encode(&redirect));
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.update_user(access_token, json!({ "password": password }))
            .await
    }

    pub async fn update_metadata(
        &self,
        access_token: &str,
        metadata: &UserMetadata,
    ) -> Result<User, AuthError> {
        self.update_user(access_token, json!({ "data": metadata }))
            .await
    }

    async fn update_user(
        &self,
        access_token: &str,
        body: serde_json::Value,
    ) -> Result<User, AuthError> {
        let resp = self
            .request(reqwest::Method::PUT, "/user")
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

fn encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}
