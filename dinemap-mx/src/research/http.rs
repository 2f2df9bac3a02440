//! HTTP research providers
//!
//! Thin clients for the platform's research gateway. Both speak the
//! gateway's JSON envelope: `status` is "ok" or "error", with an `error`
//! object carrying the message on failure. Endpoints and bearer keys come
//! from the settings table; `main` only constructs these when configured.

use crate::research::{
    MarketResearcher, PlaceCountValidator, PlaceKind, ResearchError, ResearchFindings,
};
use async_trait::async_trait;
use dinemap_common::db::models::ExpansionCity;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Default timeout for gateway requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Market researcher backed by the research gateway
pub struct HttpMarketResearcher {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMarketResearcher {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl MarketResearcher for HttpMarketResearcher {
    fn name(&self) -> &'static str {
        "research-gateway"
    }

    async fn research(&self, city: &ExpansionCity) -> Result<ResearchFindings, ResearchError> {
        debug!(city = %city.display_name(), "Requesting market research");

        let mut request = self
            .http_client
            .post(format!("{}/research", self.base_url))
            .json(&serde_json::json!({
                "city": city.name,
                "state": city.state,
            }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResearchError::Network(format!("Research request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Api(format!(
                "Research gateway returned {}: {}",
                status, body
            )));
        }

        let research: ResearchResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Parse(format!("Unreadable research response: {}", e)))?;

        if research.status != "ok" {
            return Err(ResearchError::Api(format!(
                "Research gateway error: {}",
                research
                    .error
                    .map_or("unknown error".to_string(), |e| e.message)
            )));
        }

        Ok(ResearchFindings {
            sub_scores: research.sub_scores,
            restaurant_estimate: research.restaurant_estimate.unwrap_or(0),
            bar_estimate: research.bar_estimate.unwrap_or(0),
            summary: research.summary,
            notes: research.notes,
        })
    }
}

/// Count validator backed by the place index
pub struct HttpPlaceCountValidator {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPlaceCountValidator {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl PlaceCountValidator for HttpPlaceCountValidator {
    fn name(&self) -> &'static str {
        "place-index"
    }

    async fn count_places(
        &self,
        city: &ExpansionCity,
        kind: PlaceKind,
    ) -> Result<i64, ResearchError> {
        debug!(city = %city.display_name(), kind = kind.as_str(), "Validating place count");

        let mut request = self
            .http_client
            .get(format!("{}/count", self.base_url))
            .query(&[
                ("city", city.name.as_str()),
                ("state", city.state.as_str()),
                ("kind", kind.as_str()),
            ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResearchError::Network(format!("Count request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Api(format!(
                "Place index returned {}: {}",
                status, body
            )));
        }

        let count: CountResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Parse(format!("Unreadable count response: {}", e)))?;

        if count.status != "ok" {
            return Err(ResearchError::Api(format!(
                "Place index error: {}",
                count.error.map_or("unknown error".to_string(), |e| e.message)
            )));
        }

        Ok(count.count)
    }
}

// ============================================================================
// Gateway Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ResearchResponse {
    status: String,
    #[serde(default)]
    sub_scores: BTreeMap<String, i64>,
    restaurant_estimate: Option<i64>,
    bar_estimate: Option<i64>,
    summary: Option<String>,
    notes: Option<String>,
    error: Option<GatewayError>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    status: String,
    #[serde(default)]
    count: i64,
    error: Option<GatewayError>,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    message: String,
}

// ============================================================================
// Tests
// ============================================================================
