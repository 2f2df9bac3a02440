//! Review vote endpoint
//!
//! Handles clicks on the signed links sent to the review team:
//! `GET /review/vote?city=<uuid>&email=<reviewer>&vote=<choice>&token=<hmac>`
//!
//! Every outcome renders an HTML page. A 400 is returned only when the
//! request itself is bad (missing/malformed parameters or a token that
//! does not verify), and that page never says which check failed. A
//! city that has been deleted and a storage failure are both 200s with
//! their own pages, since the link the reviewer clicked was genuine.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dinemap_common::db::models::VoteChoice;
use dinemap_common::db::settings::{get_admin_base_url, load_review_roster};
use dinemap_common::token::verify_vote_token;

use crate::api::pages;
use crate::consensus;
use crate::db::{activity, cities, votes};
use crate::AppState;

/// Query parameters of a review link
///
/// All fields are optional so that a link with a missing parameter still
/// reaches this handler and gets the generic failure page, rather than
/// an extractor rejection with a different body.
#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    pub city: Option<String>,
    pub email: Option<String>,
    pub vote: Option<String>,
    pub token: Option<String>,
}

/// Record one reviewer's vote from an emailed link
pub async fn review_vote(
    State(state): State<AppState>,
    Query(params): Query<VoteQuery>,
) -> Response {
    // Presence and shape checks first; none of these touch the database
    let (city_param, email, vote_param, token) = match (
        params.city.as_deref(),
        params.email.as_deref(),
        params.vote.as_deref(),
        params.token.as_deref(),
    ) {
        (Some(c), Some(e), Some(v), Some(t)) => (c, e, v, t),
        _ => {
            debug!("Review link rejected: missing parameter");
            return invalid_link_response();
        }
    };

    let Ok(city_id) = Uuid::parse_str(city_param) else {
        debug!("Review link rejected: malformed city id");
        return invalid_link_response();
    };
    let Some(choice) = VoteChoice::parse(vote_param) else {
        debug!("Review link rejected: unknown vote value");
        return invalid_link_response();
    };

    // The signature covers city, reviewer, and choice, so a verified
    // token proves the link was issued by us and has not been edited.
    if !verify_vote_token(&state.token_secret, city_id, email, choice, token) {
        warn!(
            "Review link rejected: token mismatch for city {} reviewer {}",
            city_id, email
        );
        return invalid_link_response();
    }

    match record_vote(&state, city_id, email, choice).await {
        Ok(Some(page)) => page.into_response(),
        Ok(None) => {
            info!(
                "Vote from {} arrived for city {} which is no longer tracked",
                email, city_id
            );
            pages::city_gone_page().into_response()
        }
        Err(e) => {
            error!("Failed to record vote for city {}: {:#}", city_id, e);
            pages::vote_failed_page().into_response()
        }
    }
}

fn invalid_link_response() -> Response {
    (StatusCode::BAD_REQUEST, pages::invalid_link_page()).into_response()
}

/// Store the vote, recompute consensus, and render the confirmation
///
/// Returns `Ok(None)` when the city row is gone. The vote write, the
/// consensus recompute, and the status/priority update share one
/// transaction so a partial failure cannot leave a vote counted without
/// its consensus outcome applied.
async fn record_vote(
    state: &AppState,
    city_id: Uuid,
    email: &str,
    choice: VoteChoice,
) -> anyhow::Result<Option<Html<String>>> {
    let roster = load_review_roster(&state.db).await?;
    let reviewer_name = roster
        .iter()
        .find(|r| r.email == email)
        .map(|r| r.name.clone());

    let mut tx = state.db.begin().await?;

    let Some(city) = cities::load_city(&mut *tx, city_id).await? else {
        return Ok(None);
    };
    let previous_status = city.status();

    votes::upsert_vote(&mut *tx, city_id, email, reviewer_name.as_deref(), choice).await?;
    let all_votes = votes::votes_for_city(&mut *tx, city_id).await?;

    let outcome = consensus::evaluate(&roster, &all_votes, previous_status);
    let priority = consensus::clamp_priority(city.priority + outcome.priority_delta);
    cities::update_review_outcome(&mut *tx, city_id, outcome.status, priority).await?;

    tx.commit().await?;

    info!(
        "Recorded vote {} from {} on {} (status {}, priority {})",
        choice,
        email,
        city.display_name(),
        outcome.status,
        priority
    );

    // The vote is committed; a lost audit row is logged, not fatal
    activity::record_activity_best_effort(
        &state.db,
        city_id,
        "vote_recorded",
        &format!("{} voted {} on {}", email, choice.as_str(), city.display_name()),
        Some(
            &serde_json::json!({
                "vote": choice.as_str(),
                "status": outcome.status.as_str(),
                "priority": priority,
            })
            .to_string(),
        ),
    )
    .await;

    let admin_base = get_admin_base_url(&state.db)
        .await
        .unwrap_or_else(|_| "http://localhost:5841".to_string());

    Ok(Some(pages::vote_recorded_page(
        &city,
        choice,
        &all_votes,
        outcome.status,
        &admin_base,
    )))
}
