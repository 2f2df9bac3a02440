//! Research orchestration
//!
//! Runs one research pass: findings from the researcher, advisory count
//! validation, reconciliation, weighted scoring, persistence, activity
//! entries. Validator trouble never fails the pass; a missing researcher
//! is the caller's problem (the API layer answers 409 before we get
//! here).

use crate::db::activity::record_activity_best_effort;
use crate::db::cities::{load_city, update_research_results, ResearchUpdate};
use crate::research::{MarketResearcher, PlaceCountValidator, PlaceKind};
use crate::scoring::{reconcile_count, ScoringWeights, ValidatedCount};
use anyhow::{Context, Result};
use dinemap_common::db::models::ExpansionCity;
use dinemap_common::db::settings::load_scoring_weights;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Run one research pass for a city and persist the outcome
///
/// Returns the reloaded city row. Fails only on researcher or database
/// errors; validation problems degrade to the researcher's estimates.
pub async fn run_research(
    pool: &SqlitePool,
    city: &ExpansionCity,
    researcher: &dyn MarketResearcher,
    validator: Option<&dyn PlaceCountValidator>,
) -> Result<ExpansionCity> {
    let weights = configured_weights(pool).await?;

    record_activity_best_effort(
        pool,
        city.guid,
        "research_started",
        &format!("Research via {} for {}", researcher.name(), city.display_name()),
        None,
    )
    .await;

    let findings = researcher
        .research(city)
        .await
        .with_context(|| format!("Research failed for {}", city.display_name()))?;

    let restaurant_validated = validate_count(validator, city, PlaceKind::Restaurant).await;
    let bar_validated = validate_count(validator, city, PlaceKind::Bar).await;

    let restaurant_count = reconcile_count(findings.restaurant_estimate, &restaurant_validated);
    let bar_count = reconcile_count(findings.bar_estimate, &bar_validated);

    let score = weights.weighted_score(&findings.sub_scores);

    let update = ResearchUpdate {
        sub_scores_json: serde_json::to_string(&findings.sub_scores)
            .context("Serialize sub-scores")?,
        market_potential_score: score,
        restaurant_estimate: Some(findings.restaurant_estimate),
        restaurant_validated: restaurant_validated.success.then_some(restaurant_validated.count),
        bar_estimate: Some(findings.bar_estimate),
        bar_validated: bar_validated.success.then_some(bar_validated.count),
        summary: findings.summary,
        notes: findings.notes,
    };
    update_research_results(pool, city.guid, &update).await?;

    info!(
        city = %city.display_name(),
        score,
        restaurant_count,
        bar_count,
        "Research pass complete"
    );

    record_activity_best_effort(
        pool,
        city.guid,
        "research_completed",
        &format!("Scored {} at {}", city.display_name(), score),
        Some(
            &serde_json::json!({
                "score": score,
                "restaurant_count": restaurant_count,
                "bar_count": bar_count,
            })
            .to_string(),
        ),
    )
    .await;

    let updated = load_city(pool, city.guid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("City {} vanished during research", city.guid))?;

    Ok(updated)
}

/// Scoring weights from settings, falling back to the compiled default
/// set when the key is absent (fresh or stripped-down databases)
async fn configured_weights(pool: &SqlitePool) -> Result<ScoringWeights> {
    let raw = load_scoring_weights(pool).await?;
    if raw.is_empty() {
        return Ok(ScoringWeights::default_set());
    }
    Ok(ScoringWeights::from_map(raw)?)
}

/// One advisory validation call; absence or failure degrades to
/// `success: false`
async fn validate_count(
    validator: Option<&dyn PlaceCountValidator>,
    city: &ExpansionCity,
    kind: PlaceKind,
) -> ValidatedCount {
    let Some(validator) = validator else {
        return ValidatedCount::failed();
    };

    match validator.count_places(city, kind).await {
        Ok(count) => ValidatedCount {
            success: true,
            count,
        },
        Err(e) => {
            warn!(
                "{} count validation via {} failed for {}: {}",
                kind.as_str(),
                validator.name(),
                city.display_name(),
                e
            );
            ValidatedCount::failed()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
