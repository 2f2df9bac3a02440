//! Admin JSON API for expansion cities
//!
//! Consumed by the expansion dashboard and the link-dispatch job. The
//! platform gateway fronts these routes, so there is no auth here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use dinemap_common::db::models::{ExpansionCity, ReviewVote, VoteChoice};
use dinemap_common::db::settings::{get_public_base_url, load_review_roster};
use dinemap_common::token::generate_vote_token;

use crate::db::{activity, cities, votes};
use crate::error::{ApiError, ApiResult};
use crate::research::run_research;
use crate::scoring::{reconcile_count, ValidatedCount};
use crate::AppState;

/// City as served to the dashboard
#[derive(Debug, Serialize)]
pub struct CityResponse {
    pub guid: String,
    pub name: String,
    pub state: String,
    pub display_name: String,
    pub market_potential_score: i64,
    pub sub_scores: BTreeMap<String, i64>,
    /// Best available restaurant count, None until researched
    pub restaurant_count: Option<i64>,
    /// Best available bar count, None until researched
    pub bar_count: Option<i64>,
    pub priority: i64,
    pub review_status: String,
    pub research_summary: Option<String>,
    pub researched_at: Option<String>,
    pub created_at: String,
}

impl CityResponse {
    fn from_city(city: &ExpansionCity) -> Self {
        Self {
            guid: city.guid.to_string(),
            name: city.name.clone(),
            state: city.state.clone(),
            display_name: city.display_name(),
            market_potential_score: city.market_potential_score,
            sub_scores: city.sub_score_map(),
            restaurant_count: reconciled(city.restaurant_estimate, city.restaurant_validated),
            bar_count: reconciled(city.bar_estimate, city.bar_validated),
            priority: city.priority,
            review_status: city.review_status.clone(),
            research_summary: city.research_summary.clone(),
            researched_at: city.researched_at.clone(),
            created_at: city.created_at.clone(),
        }
    }
}

/// Validated count replaces the estimate only when it found something
fn reconciled(estimate: Option<i64>, validated: Option<i64>) -> Option<i64> {
    estimate.map(|est| reconcile_count(est, &ValidatedCount::from_column(validated)))
}

/// One reviewer's vote in a city detail response
#[derive(Debug, Serialize)]
pub struct VoteEntry {
    pub reviewer_email: String,
    pub reviewer_name: Option<String>,
    pub vote: String,
    pub voted_at: String,
}

impl VoteEntry {
    fn from_vote(vote: ReviewVote) -> Self {
        Self {
            reviewer_email: vote.reviewer_email,
            reviewer_name: vote.reviewer_name,
            vote: vote.vote,
            voted_at: vote.voted_at,
        }
    }
}

/// City detail: the row plus every current vote
#[derive(Debug, Serialize)]
pub struct CityDetailResponse {
    pub city: CityResponse,
    pub votes: Vec<VoteEntry>,
}

/// Request body for POST /api/cities
#[derive(Debug, Deserialize)]
pub struct CreateCityRequest {
    pub name: String,
    pub state: String,
}

/// One signed vote URL for one (reviewer, choice) pair
#[derive(Debug, Serialize)]
pub struct ReviewLink {
    pub reviewer_email: String,
    pub reviewer_name: String,
    pub vote: String,
    pub url: String,
}

/// GET /api/cities
///
/// Every tracked city, highest expansion interest first.
pub async fn list_cities(State(state): State<AppState>) -> ApiResult<Json<Vec<CityResponse>>> {
    let all = cities::list_cities(&state.db).await?;
    Ok(Json(all.iter().map(CityResponse::from_city).collect()))
}

/// POST /api/cities
///
/// Adds a candidate market at default priority with no research yet.
pub async fn create_city(
    State(state): State<AppState>,
    Json(req): Json<CreateCityRequest>,
) -> ApiResult<(StatusCode, Json<CityResponse>)> {
    let name = req.name.trim();
    let city_state = req.state.trim();

    if name.is_empty() || city_state.is_empty() {
        return Err(ApiError::BadRequest(
            "Both name and state are required".to_string(),
        ));
    }

    if cities::find_city_by_name_state(&state.db, name, city_state)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "{}, {} is already tracked",
            name, city_state
        )));
    }

    let city = cities::create_city(&state.db, name, city_state).await?;

    activity::record_activity_best_effort(
        &state.db,
        city.guid,
        "city_added",
        &format!("Added {} to the expansion pipeline", city.display_name()),
        None,
    )
    .await;

    info!("Tracking new expansion candidate {}", city.display_name());

    Ok((StatusCode::CREATED, Json(CityResponse::from_city(&city))))
}

/// GET /api/cities/:id
pub async fn get_city(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CityDetailResponse>> {
    let city_id = parse_city_id(&id)?;

    let city = cities::load_city(&state.db, city_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No city with id {}", city_id)))?;
    let city_votes = votes::votes_for_city(&state.db, city_id).await?;

    Ok(Json(CityDetailResponse {
        city: CityResponse::from_city(&city),
        votes: city_votes.into_iter().map(VoteEntry::from_vote).collect(),
    }))
}

/// POST /api/cities/:id/research
///
/// Runs the research pipeline synchronously and returns the updated
/// city. 409 when no research provider is configured.
pub async fn trigger_research(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CityResponse>> {
    let city_id = parse_city_id(&id)?;

    let Some(researcher) = &state.researcher else {
        return Err(ApiError::Conflict(
            "Research gateway is not configured".to_string(),
        ));
    };

    let city = cities::load_city(&state.db, city_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No city with id {}", city_id)))?;

    let updated = run_research(
        &state.db,
        &city,
        researcher.as_ref(),
        state.count_validator.as_deref(),
    )
    .await?;

    Ok(Json(CityResponse::from_city(&updated)))
}

/// GET /api/cities/:id/review-links
///
/// The three signed vote URLs for every roster member, ready for the
/// email dispatch job to drop into the review request.
pub async fn review_links(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ReviewLink>>> {
    let city_id = parse_city_id(&id)?;

    let city = cities::load_city(&state.db, city_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No city with id {}", city_id)))?;

    let roster = load_review_roster(&state.db).await?;
    let base_url = get_public_base_url(&state.db).await?;

    let mut links = Vec::with_capacity(roster.len() * VoteChoice::ALL.len());
    for reviewer in &roster {
        for choice in VoteChoice::ALL {
            let token =
                generate_vote_token(&state.token_secret, city.guid, &reviewer.email, choice);
            links.push(ReviewLink {
                reviewer_email: reviewer.email.clone(),
                reviewer_name: reviewer.name.clone(),
                vote: choice.as_str().to_string(),
                url: format!(
                    "{}/review/vote?city={}&email={}&vote={}&token={}",
                    base_url,
                    city.guid,
                    urlencoding::encode(&reviewer.email),
                    choice.as_str(),
                    token
                ),
            });
        }
    }

    Ok(Json(links))
}

fn parse_city_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid city id: {}", raw)))
}

// ============================================================================
// Tests
// ============================================================================
