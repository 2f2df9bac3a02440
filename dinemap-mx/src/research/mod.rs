//! Market research pipeline
//!
//! Research for a candidate city comes from two independent upstream
//! services: a market researcher that produces per-category sub-scores
//! and place-count estimates, and a place index that can validate those
//! counts against real listings. Both sit behind traits so the pipeline
//! is testable without a network and deployments can run with either
//! service absent.

pub mod http;
pub mod service;

pub use http::{HttpMarketResearcher, HttpPlaceCountValidator};
pub use service::run_research;

use async_trait::async_trait;
use dinemap_common::db::models::ExpansionCity;
use std::collections::BTreeMap;
use thiserror::Error;

/// Research pipeline error types
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Request never reached the gateway or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Gateway answered with an error
    #[error("Gateway error: {0}")]
    Api(String),

    /// Gateway answered with something unreadable
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One research pass over a candidate city
#[derive(Debug, Clone)]
pub struct ResearchFindings {
    /// Per-category scores, 0-100 each
    pub sub_scores: BTreeMap<String, i64>,
    pub restaurant_estimate: i64,
    pub bar_estimate: i64,
    pub summary: Option<String>,
    pub notes: Option<String>,
}

/// Which place metric a validation call counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    Restaurant,
    Bar,
}

impl PlaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceKind::Restaurant => "restaurant",
            PlaceKind::Bar => "bar",
        }
    }
}

/// Produces market findings for a candidate city
#[async_trait]
pub trait MarketResearcher: Send + Sync {
    /// Human-readable provider name for logs
    fn name(&self) -> &'static str;

    async fn research(&self, city: &ExpansionCity) -> Result<ResearchFindings, ResearchError>;
}

/// Counts real listings of one kind in a city
///
/// Validation is advisory: callers degrade to the researcher's estimate
/// when a call fails, so implementations should just report errors
/// honestly rather than guess.
#[async_trait]
pub trait PlaceCountValidator: Send + Sync {
    /// Human-readable provider name for logs
    fn name(&self) -> &'static str;

    async fn count_places(
        &self,
        city: &ExpansionCity,
        kind: PlaceKind,
    ) -> Result<i64, ResearchError>;
}
