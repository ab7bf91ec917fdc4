mod cache;
mod embed;
mod error;
mod routes;
mod session;
mod storage;
mod templates;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    routing::get,
};
use tower_http::trace::TraceLayer;

use flagboard_flags::{FlagsClient, FlagsConfig, load_overrides};

use cache::PageCache;
use embed::{EmbedClient, EmbedConfig};
use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub flags: FlagsClient,
    pub embed: EmbedClient,
    pub cache: PageCache,
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub session_secret: String,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for FlagsClient {
    fn from_ref(state: &AppState) -> Self {
        state.flags.clone()
    }
}

impl FromRef<AppState> for EmbedClient {
    fn from_ref(state: &AppState) -> Self {
        state.embed.clone()
    }
}

impl FromRef<AppState> for PageCache {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Build the flag client from `FLAGS_*` environment variables.
fn load_flags_client() -> anyhow::Result<FlagsClient> {
    let mut config = FlagsConfig {
        sdk_key: env_nonempty("FLAGS_SDK_KEY"),
        ..FlagsConfig::default()
    };
    if let Some(url) = env_nonempty("FLAGS_BASE_URL") {
        config.base_url = url;
    }
    if let Some(url) = env_nonempty("FLAGS_EVENTS_URL") {
        config.events_url = url;
    }

    let overrides = match env_nonempty("FLAGBOARD_FLAGS_FILE") {
        Some(path) => {
            let overrides = load_overrides(&PathBuf::from(&path))?;
            tracing::info!("loaded {} flag overrides from {path}", overrides.len());
            overrides
        }
        None => HashMap::new(),
    };
    config.overrides = overrides;

    if config.sdk_key.is_none() {
        tracing::warn!("FLAGS_SDK_KEY not set — flag client is offline, defaults/overrides only");
    }

    Ok(FlagsClient::new(config)?)
}

/// Build the embed client from `EMBED_*` environment variables.
fn load_embed_client() -> anyhow::Result<EmbedClient> {
    let config = EmbedConfig {
        access_key_id: env_nonempty("EMBED_ACCESS_KEY_ID"),
        secret_access_key: env_nonempty("EMBED_SECRET_ACCESS_KEY"),
        api_url: env_nonempty("EMBED_API_URL")
            .unwrap_or_else(|| "https://analytics.flagboard.dev/api/v1".into()),
        account_id: env_nonempty("EMBED_ACCOUNT_ID").unwrap_or_default(),
        dashboard_id: env_nonempty("EMBED_DASHBOARD_ID").unwrap_or_default(),
    };
    if config.access_key_id.is_none() || config.secret_access_key.is_none() {
        tracing::info!("embed credentials not set — data export renders without the dashboard");
    }
    Ok(EmbedClient::new(config)?)
}

fn load_page_cache() -> PageCache {
    if std::env::var("FLAGBOARD_CACHE_DISABLED").is_ok() {
        tracing::info!("page cache disabled");
        return PageCache::disabled();
    }
    let ttl = env_nonempty("FLAGBOARD_CACHE_SECS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);
    PageCache::new(Duration::from_secs(ttl), true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flagboard_server=info,tower_http=info".into()),
        )
        .init();

    // Data directory
    let data_dir = std::env::var("FLAGBOARD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));

    tracing::info!("data directory: {}", data_dir.display());

    // Initialize database
    let db = storage::init_db(&data_dir)?;
    tracing::info!("database initialized");

    let session_secret = match env_nonempty("SESSION_SECRET") {
        Some(secret) => secret,
        None => {
            tracing::warn!("SESSION_SECRET not set — sessions will not survive a restart");
            flagboard_api::crypto::generate_secret().map_err(|e| anyhow::anyhow!("{e}"))?
        }
    };

    let flags = load_flags_client()?;
    let embed = load_embed_client()?;
    let cache = load_page_cache();

    let config = AppConfig { session_secret };

    let state = AppState {
        db,
        config,
        flags,
        embed,
        cache,
    };

    let app = Router::new()
        .route("/", get(routes::pages::index))
        .route("/dashboard", get(routes::pages::dashboard))
        .route("/dark", get(routes::pages::dark))
        .route("/experiments", get(routes::pages::experiments))
        .route("/operational", get(routes::pages::operational))
        .route("/release", get(routes::pages::release))
        .route("/dataexport", get(routes::dataexport::dataexport))
        .route(
            "/register",
            get(routes::auth::register_page).post(routes::auth::register),
        )
        .route(
            "/login",
            get(routes::auth::login_page).post(routes::auth::login),
        )
        .route("/logout", get(routes::auth::logout))
        .route("/profile", get(routes::account::profile))
        .route("/people", get(routes::account::people))
        .route("/settings", get(routes::account::settings))
        .route("/upgrade", get(routes::account::upgrade))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".into());
    tracing::info!("starting server on port {port}");
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
