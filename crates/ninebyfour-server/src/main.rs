mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ninebyfour_api::auth::{AppState, AppStateInner};
use ninebyfour_db::Database;
use ninebyfour_types::models::Role;

use crate::config::Config;

const DEFAULT_LOG_FILTER: &str =
    "ninebyfour=debug,ninebyfour_api=debug,ninebyfour_db=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open_with_pool_size(&config.db_path, config.db_pool_size)?;
    apply_startup_settings(&db, &config)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: config.token_ttl,
    });

    let app = ninebyfour_api::build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("ninebyfour server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn apply_startup_settings(db: &Database, config: &Config) -> anyhow::Result<()> {
    if let Some(enabled) = config.waitlist_enabled {
        db.set_waitlist_enabled(enabled)?;
        info!("Waitlist {} by configuration", if enabled { "enabled" } else { "disabled" });
    }

    for username in &config.admin_users {
        if db.set_role(username, Role::Admin)? {
            info!("Granted admin role to {}", username);
        } else {
            warn!("Configured admin {} has no account yet", username);
        }
    }

    Ok(())
}
