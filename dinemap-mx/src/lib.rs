//! dinemap-mx library - Market Expansion module
//!
//! Tracks candidate cities for new-market openings: research scoring,
//! signed review links for the expansion team, and consensus tracking
//! over their votes.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod config;
pub mod consensus;
pub mod db;
pub mod error;
pub mod research;
pub mod scoring;

pub use error::{ApiError, ApiResult};

use research::{MarketResearcher, PlaceCountValidator};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// HMAC secret for signing review links
    pub token_secret: String,
    /// Research provider, None until configured in settings
    pub researcher: Option<Arc<dyn MarketResearcher>>,
    /// Place count validator, None until configured in settings
    pub count_validator: Option<Arc<dyn PlaceCountValidator>>,
}

impl AppState {
    /// Create new application state with no research providers
    pub fn new(db: SqlitePool, token_secret: String) -> Self {
        Self {
            db,
            token_secret,
            researcher: None,
            count_validator: None,
        }
    }

    /// Attach a research provider
    pub fn with_researcher(mut self, researcher: Arc<dyn MarketResearcher>) -> Self {
        self.researcher = Some(researcher);
        self
    }

    /// Attach a place count validator
    pub fn with_count_validator(mut self, validator: Arc<dyn PlaceCountValidator>) -> Self {
        self.count_validator = Some(validator);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/review/vote", get(api::review_vote))
        .route("/api/cities", get(api::list_cities).post(api::create_city))
        .route("/api/cities/:id", get(api::get_city))
        .route("/api/cities/:id/research", post(api::trigger_research))
        .route("/api/cities/:id/review-links", get(api::review_links))
        .merge(api::health_routes())
        .with_state(state)
}
