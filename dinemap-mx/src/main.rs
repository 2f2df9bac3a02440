//! dinemap-mx (Market Expansion) - Candidate market research and review
//!
//! Scores candidate cities for new restaurant markets and runs the
//! review workflow: signed vote links for the expansion team, consensus
//! tracking over their votes, and priority adjustments. Part of the
//! DineMap platform; shares dinemap.db with the other modules.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use dinemap_common::config::{RootFolderInitializer, RootFolderResolver};
use dinemap_common::db::init::init_database;
use dinemap_common::db::settings::{
    get_http_timeout_ms, get_places_api_url, get_research_api_url, load_or_init_token_secret,
};
use dinemap_mx::config::resolve_research_api_key;
use dinemap_mx::research::{HttpMarketResearcher, HttpPlaceCountValidator};
use dinemap_mx::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init, before
    // any database work can delay startup feedback
    info!(
        "Starting DineMap Market Expansion (dinemap-mx) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let resolver = RootFolderResolver::new("market-expansion");
    let root_folder = resolver.resolve();
    let toml_config = resolver.load_toml_config().unwrap_or_default();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    info!("✓ Database ready");

    let token_secret = load_or_init_token_secret(&pool).await?;
    info!("✓ Review link signing secret loaded");

    // Research providers come from settings. Missing config is not an
    // error; the research endpoint answers 409 until an operator fills
    // the URLs in.
    let timeout = Duration::from_millis(get_http_timeout_ms(&pool).await?);
    let api_key = resolve_research_api_key(&pool, &toml_config).await?;

    let mut state = AppState::new(pool.clone(), token_secret);

    match get_research_api_url(&pool).await? {
        Some(url) => {
            info!("✓ Research gateway: {}", url);
            state = state.with_researcher(Arc::new(HttpMarketResearcher::with_timeout(
                url,
                api_key.clone(),
                timeout,
            )));
        }
        None => info!("Research gateway not configured"),
    }

    match get_places_api_url(&pool).await? {
        Some(url) => {
            info!("✓ Place count validator: {}", url);
            state = state.with_count_validator(Arc::new(HttpPlaceCountValidator::with_timeout(
                url, api_key, timeout,
            )));
        }
        None => info!("Place count validation not configured"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:5842").await?;
    info!("dinemap-mx listening on http://0.0.0.0:5842");
    info!("Health check: http://0.0.0.0:5842/health");

    axum::serve(listener, app).await?;

    Ok(())
}
