//! Google OAuth + YouTube Data API client.
//!
//! Covers the authorization-code flow (with PKCE), refresh-token grants, the
//! caller's channel lookup and the two-step resumable video upload.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CHANNELS_URL: &str = "https://www.googleapis.com/youtube/v3/channels?part=snippet&mine=true";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// "People & Blogs"
const DEFAULT_CATEGORY_ID: &str = "22";

#[derive(Debug, thiserror::Error)]
pub enum YouTubeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    OAuth(String),
    #[error("YouTube upload init failed: {0}")]
    InitFailed(String),
    #[error("Failed to get upload URL from YouTube")]
    MissingUploadUrl,
    #[error("YouTube upload failed: {0}")]
    UploadFailed(String),
    #[error("YouTube API error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Public,
    Unlisted,
}

/// Successful token endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(flatten)]
    token: TokenResponse,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelInfo {
    pub id: String,
    pub title: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct ChannelList {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Deserialize)]
struct ChannelItem {
    id: String,
    snippet: Option<ChannelSnippet>,
}

#[derive(Deserialize)]
struct ChannelSnippet {
    title: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Deserialize)]
struct UploadedVideo {
    id: String,
}

/// Snippet + status sent when initializing an upload
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub privacy: Privacy,
}

impl VideoMetadata {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "snippet": {
                "title": self.title,
                "description": self.description,
                "categoryId": DEFAULT_CATEGORY_ID,
            },
            "status": {
                "privacyStatus": self.privacy,
                "selfDeclaredMadeForKids": false,
            },
        })
    }
}

/// URL plus the secrets the caller must keep until the callback
pub struct AuthorizeRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

#[async_trait]
pub trait YouTubeApi: Send + Sync + 'static {
    /// Build the consent URL for the given state and PKCE challenge
    fn authorize_url(&self, state: &str, code_challenge: &str) -> String;

    /// Exchange an authorization code. `redirect_uri` overrides the configured one.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, YouTubeError>;

    async fn refresh_access_token(&self, refresh_token: &str)
    -> Result<TokenResponse, YouTubeError>;

    /// The authenticated user's channel, if they have one
    async fn my_channel(&self, access_token: &str) -> Result<Option<ChannelInfo>, YouTubeError>;

    /// Initialize a resumable upload and return the session URL
    async fn start_resumable_upload(
        &self,
        access_token: &str,
        metadata: &VideoMetadata,
        content_length: usize,
        content_type: &str,
    ) -> Result<String, YouTubeError>;

    /// Send the bytes to an upload session; returns the YouTube video id
    async fn upload_to_session(
        &self,
        access_token: &str,
        session_url: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, YouTubeError>;
}

/// Start an authorization request: fresh state and PKCE pair, plus the consent URL
pub fn begin_authorization(api: &dyn YouTubeApi) -> AuthorizeRequest {
    let state = generate_state();
    let (code_verifier, code_challenge) = generate_pkce();
    let url = api.authorize_url(&state, &code_challenge);
    AuthorizeRequest {
        url,
        state,
        code_verifier,
    }
}

/// Generate PKCE code verifier and S256 challenge
pub fn generate_pkce() -> (String, String) {
    let verifier_bytes: [u8; 32] = rand::rng().random();
    let code_verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(verifier_bytes);
    (code_verifier.clone(), pkce_challenge(&code_verifier))
}

pub fn pkce_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Random state for CSRF protection
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct YouTubeClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: Client,
}

impl YouTubeClient {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            http: Client::new(),
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, YouTubeError> {
        let resp = self.http.post(TOKEN_URL).form(params).send().await?;
        let text = resp.text().await?;
        let body: TokenBody = serde_json::from_str(&text)
            .map_err(|_| YouTubeError::OAuth(format!("Unexpected token response: {}", text)))?;

        if let Some(error) = body.error {
            return Err(YouTubeError::OAuth(body.error_description.unwrap_or(error)));
        }
        Ok(body.token)
    }
}

#[async_trait]
impl YouTubeApi for YouTubeClient {
    fn authorize_url(&self, state: &str, code_challenge: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}&code_challenge={}&code_challenge_method=S256",
            AUTHORIZE_URL,
            percent_encode(&self.client_id),
            percent_encode(&self.redirect_uri),
            percent_encode(&SCOPES.join(" ")),
            percent_encode(state),
            percent_encode(code_challenge)
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, YouTubeError> {
        let redirect_uri = redirect_uri.unwrap_or(&self.redirect_uri);
        let mut params = vec![
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier));
        }
        self.token_request(&params).await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, YouTubeError> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn my_channel(&self, access_token: &str) -> Result<Option<ChannelInfo>, YouTubeError> {
        let resp = self
            .http
            .get(CHANNELS_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(YouTubeError::Api(text));
        }

        let list: ChannelList = resp.json().await?;
        Ok(list.items.into_iter().next().map(|item| {
            let (title, avatar_url) = match item.snippet {
                Some(s) => (
                    s.title,
                    s.thumbnails.and_then(|t| t.default).and_then(|d| d.url),
                ),
                None => (None, None),
            };
            ChannelInfo {
                id: item.id,
                title,
                avatar_url,
            }
        }))
    }

    async fn start_resumable_upload(
        &self,
        access_token: &str,
        metadata: &VideoMetadata,
        content_length: usize,
        content_type: &str,
    ) -> Result<String, YouTubeError> {
        let resp = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", content_length.to_string())
            .json(&metadata.to_json())
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(YouTubeError::InitFailed(text));
        }

        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(YouTubeError::MissingUploadUrl)
    }

    async fn upload_to_session(
        &self,
        access_token: &str,
        session_url: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, YouTubeError> {
        let resp = self
            .http
            .put(session_url)
            .bearer_auth(access_token)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(YouTubeError::UploadFailed(text));
        }

        let video: UploadedVideo = resp.json().await?;
        Ok(video.id)
    }
}

fn percent_encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}
