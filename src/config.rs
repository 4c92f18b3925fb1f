use std::env;

use anyhow::{Context, Result, bail};

use crate::constants::BUCKET_NAME;
use crate::services::cookies::{CookieSettings, SameSite};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SITE_URL: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct YouTubeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub jwt_secret: String,
    pub storage_bucket: String,
    pub site_url: String,
    pub allowed_origins: Vec<String>,
    pub youtube: Option<YouTubeConfig>,
    pub inactivity_timeout_secs: u64,
    pub scheduler_interval_secs: u64,
    pub cookies: CookieSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let server_host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let supabase_anon_key =
            env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;
        let supabase_service_role_key = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .context("SUPABASE_SERVICE_ROLE_KEY must be set")?;
        let jwt_secret =
            env::var("SUPABASE_JWT_SECRET").context("SUPABASE_JWT_SECRET must be set")?;
        let storage_bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| BUCKET_NAME.to_string());

        let site_url = env::var("SITE_URL")
            .unwrap_or_else(|_| DEFAULT_SITE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(raw) => parse_allowed_origins(&raw),
            Err(_) => vec![site_url.clone()],
        };

        let youtube = match (
            env::var("YOUTUBE_CLIENT_ID").ok(),
            env::var("YOUTUBE_CLIENT_SECRET").ok(),
        ) {
            (Some(client_id), Some(client_secret)) => Some(YouTubeConfig {
                client_id,
                client_secret,
                redirect_uri: env::var("YOUTUBE_REDIRECT_URI")
                    .unwrap_or_else(|_| format!("{}/auth/youtube/callback", site_url)),
            }),
            _ => None,
        };

        let inactivity_timeout_secs = env::var("INACTIVITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .context("INACTIVITY_TIMEOUT_SECS must be an integer")?;
        let scheduler_interval_secs = parse_scheduler_interval(
            &env::var("SCHEDULER_INTERVAL_SECS").unwrap_or_else(|_| "60".to_string()),
        )?;

        let cookies = CookieSettings {
            secure: env::var("ENV").as_deref() == Ok("prod"),
            same_site: SameSite::parse(
                &env::var("COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()),
            ),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            server_host,
            server_port,
            supabase_url,
            supabase_anon_key,
            supabase_service_role_key,
            jwt_secret,
            storage_bucket,
            site_url,
            allowed_origins,
            youtube,
            inactivity_timeout_secs,
            scheduler_interval_secs,
            cookies,
        })
    }
}

fn parse_scheduler_interval(raw: &str) -> Result<u64> {
    let secs: u64 = raw
        .trim()
        .parse()
        .context("SCHEDULER_INTERVAL_SECS must be an integer")?;
    if secs == 0 {
        bail!("SCHEDULER_INTERVAL_SECS must be greater than zero");
    }
    Ok(secs)
}

/// Comma-separated origins; blanks dropped, trailing slashes trimmed
pub fn parse_allowed_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_origin_list() {
        assert_eq!(
            parse_allowed_origins("http://localhost:5173/, https://app.example.com ,,"),
            vec!["http://localhost:5173", "https://app.example.com"]
        );
        assert!(parse_allowed_origins("").is_empty());
    }

    #[test]
    fn scheduler_interval_must_be_positive() {
        assert_eq!(parse_scheduler_interval("60").unwrap(), 60);
        let err = parse_scheduler_interval("0").unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert!(parse_scheduler_interval("soon").is_err());
    }
}
