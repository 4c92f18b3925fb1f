mod config;
mod constants;
mod domain;
mod models;
mod routes;
mod scheduler;
mod services;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use services::cookies::CookieSettings;
use services::inactivity::SessionActivity;
use services::store::{PgStore, Store};
use services::supabase_auth::AuthClient;
use services::youtube::{YouTubeApi, YouTubeClient};
use storage::{ObjectStorage, SupabaseStorage};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    /// None when YouTube credentials are not configured
    pub youtube: Option<Arc<dyn YouTubeApi>>,
    pub auth: AuthClient,
    pub jwt_secret: Vec<u8>,
    pub activity: SessionActivity,
    pub cookies: CookieSettings,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("growth_api=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let storage = SupabaseStorage::new(
        &config.supabase_url,
        &config.storage_bucket,
        &config.supabase_service_role_key,
    );

    let youtube = match &config.youtube {
        Some(yt) => Some(Arc::new(YouTubeClient::new(
            &yt.client_id,
            &yt.client_secret,
            &yt.redirect_uri,
        )) as Arc<dyn YouTubeApi>),
        None => {
            tracing::warn!("YOUTUBE_CLIENT_ID/YOUTUBE_CLIENT_SECRET not set; YouTube routes disabled");
            None
        }
    };

    let state = Arc::new(AppState {
        store: Arc::new(PgStore::new(pool)),
        storage: Arc::new(storage),
        youtube,
        auth: AuthClient::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            &config.site_url,
        ),
        jwt_secret: config.jwt_secret.clone().into_bytes(),
        activity: SessionActivity::new(Duration::from_secs(config.inactivity_timeout_secs)),
        cookies: config.cookies,
    });

    // Publishes due YouTube posts and expires idle sessions
    tokio::spawn(scheduler::start_background_scheduler(
        state.clone(),
        config.scheduler_interval_secs,
    ));

    let app = routes::build_routes()
        .with_state(state)
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, "Listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server failed")?;

    Ok(())
}
