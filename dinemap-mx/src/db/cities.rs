//! Expansion city database operations

use anyhow::Result;
use dinemap_common::db::models::{ExpansionCity, ReviewStatus};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// Research output ready to persist on a city row
#[derive(Debug, Clone)]
pub struct ResearchUpdate {
    pub sub_scores_json: String,
    pub market_potential_score: i64,
    pub restaurant_estimate: Option<i64>,
    pub restaurant_validated: Option<i64>,
    pub bar_estimate: Option<i64>,
    pub bar_validated: Option<i64>,
    pub summary: Option<String>,
    pub notes: Option<String>,
}

/// Create a city at default priority with no votes
///
/// Callers are expected to have checked for an existing (name, state)
/// pair; a racing duplicate still trips the UNIQUE constraint here.
pub async fn create_city(pool: &SqlitePool, name: &str, state: &str) -> Result<ExpansionCity> {
    let guid = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO expansion_cities (guid, name, state, created_at, updated_at)
        VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(name)
    .bind(state)
    .execute(pool)
    .await?;

    let city = load_city(pool, guid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("City {} missing immediately after insert", guid))?;

    Ok(city)
}

/// Load one city by guid
pub async fn load_city(
    executor: impl SqliteExecutor<'_>,
    city_id: Uuid,
) -> Result<Option<ExpansionCity>> {
    let city = sqlx::query_as::<_, ExpansionCity>(
        r#"
        SELECT guid, name, state, sub_scores, market_potential_score,
               restaurant_estimate, restaurant_validated,
               bar_estimate, bar_validated,
               priority, review_status,
               research_summary, research_notes, researched_at,
               created_at, updated_at
        FROM expansion_cities
        WHERE guid = ?
        "#,
    )
    .bind(city_id.to_string())
    .fetch_optional(executor)
    .await?;

    Ok(city)
}

/// Find a city by its (name, state) pair
pub async fn find_city_by_name_state(
    pool: &SqlitePool,
    name: &str,
    state: &str,
) -> Result<Option<ExpansionCity>> {
    let city = sqlx::query_as::<_, ExpansionCity>(
        r#"
        SELECT guid, name, state, sub_scores, market_potential_score,
               restaurant_estimate, restaurant_validated,
               bar_estimate, bar_validated,
               priority, review_status,
               research_summary, research_notes, researched_at,
               created_at, updated_at
        FROM expansion_cities
        WHERE name = ? AND state = ?
        "#,
    )
    .bind(name)
    .bind(state)
    .fetch_optional(pool)
    .await?;

    Ok(city)
}

/// All tracked cities, highest expansion interest first
pub async fn list_cities(pool: &SqlitePool) -> Result<Vec<ExpansionCity>> {
    let cities = sqlx::query_as::<_, ExpansionCity>(
        r#"
        SELECT guid, name, state, sub_scores, market_potential_score,
               restaurant_estimate, restaurant_validated,
               bar_estimate, bar_validated,
               priority, review_status,
               research_summary, research_notes, researched_at,
               created_at, updated_at
        FROM expansion_cities
        ORDER BY priority DESC, market_potential_score DESC, name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(cities)
}

/// Persist one research run's output
pub async fn update_research_results(
    pool: &SqlitePool,
    city_id: Uuid,
    update: &ResearchUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE expansion_cities SET
            sub_scores = ?,
            market_potential_score = ?,
            restaurant_estimate = ?,
            restaurant_validated = ?,
            bar_estimate = ?,
            bar_validated = ?,
            research_summary = ?,
            research_notes = ?,
            researched_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&update.sub_scores_json)
    .bind(update.market_potential_score)
    .bind(update.restaurant_estimate)
    .bind(update.restaurant_validated)
    .bind(update.bar_estimate)
    .bind(update.bar_validated)
    .bind(&update.summary)
    .bind(&update.notes)
    .bind(city_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a consensus evaluation's status and adjusted priority
pub async fn update_review_outcome(
    executor: impl SqliteExecutor<'_>,
    city_id: Uuid,
    status: ReviewStatus,
    priority: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE expansion_cities SET
            review_status = ?,
            priority = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(status.as_str())
    .bind(priority)
    .bind(city_id.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dinemap_common::db::create_schema;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_load_city() {
        let pool = setup_test_db().await;

        let city = create_city(&pool, "Hershey", "PA").await.unwrap();
        assert_eq!(city.name, "Hershey");
        assert_eq!(city.state, "PA");
        assert_eq!(city.priority, 5);
        assert_eq!(city.status(), ReviewStatus::NoVotes);
        assert_eq!(city.market_potential_score, 0);
        assert!(city.sub_scores.is_none());

        let loaded = load_city(&pool, city.guid).await.unwrap().unwrap();
        assert_eq!(loaded.display_name(), "Hershey, PA");
    }

    #[tokio::test]
    async fn test_load_unknown_city_is_none() {
        let pool = setup_test_db().await;

        let loaded = load_city(&pool, Uuid::new_v4()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_state_rejected() {
        let pool = setup_test_db().await;

        create_city(&pool, "Hershey", "PA").await.unwrap();
        let dup = create_city(&pool, "Hershey", "PA").await;
        assert!(dup.is_err(), "UNIQUE(name, state) should reject the duplicate");

        // Same name in another state is a different market
        let other = create_city(&pool, "Hershey", "NE").await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_find_city_by_name_state() {
        let pool = setup_test_db().await;

        create_city(&pool, "Ithaca", "NY").await.unwrap();

        let found = find_city_by_name_state(&pool, "Ithaca", "NY").await.unwrap();
        assert!(found.is_some());

        let missing = find_city_by_name_state(&pool, "Ithaca", "MI").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_then_score() {
        let pool = setup_test_db().await;

        let low = create_city(&pool, "Altoona", "PA").await.unwrap();
        let high = create_city(&pool, "Bozeman", "MT").await.unwrap();
        let scored = create_city(&pool, "Asheville", "NC").await.unwrap();

        update_review_outcome(&pool, high.guid, ReviewStatus::ConsensusInterested, 8)
            .await
            .unwrap();
        update_review_outcome(&pool, low.guid, ReviewStatus::ConsensusReject, 0)
            .await
            .unwrap();

        // Same priority as default, higher score than default
        let update = ResearchUpdate {
            sub_scores_json: r#"{"dining_scene":90}"#.to_string(),
            market_potential_score: 72,
            restaurant_estimate: Some(40),
            restaurant_validated: None,
            bar_estimate: Some(12),
            bar_validated: None,
            summary: Some("Strong tourist corridor".to_string()),
            notes: None,
        };
        update_research_results(&pool, scored.guid, &update).await.unwrap();

        let cities = list_cities(&pool).await.unwrap();
        let names: Vec<&str> = cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bozeman", "Asheville", "Altoona"]);
    }

    #[tokio::test]
    async fn test_research_update_roundtrip() {
        let pool = setup_test_db().await;

        let city = create_city(&pool, "Missoula", "MT").await.unwrap();
        let update = ResearchUpdate {
            sub_scores_json: r#"{"dining_scene":70,"tourism":55}"#.to_string(),
            market_potential_score: 64,
            restaurant_estimate: Some(120),
            restaurant_validated: Some(85),
            bar_estimate: Some(30),
            bar_validated: None,
            summary: Some("College town, seasonal tourism".to_string()),
            notes: Some("Validator had no bar coverage".to_string()),
        };
        update_research_results(&pool, city.guid, &update).await.unwrap();

        let loaded = load_city(&pool, city.guid).await.unwrap().unwrap();
        assert_eq!(loaded.market_potential_score, 64);
        assert_eq!(loaded.restaurant_validated, Some(85));
        assert_eq!(loaded.bar_validated, None);
        assert!(loaded.researched_at.is_some());

        let subs = loaded.sub_score_map();
        assert_eq!(subs.get("dining_scene"), Some(&70));
        assert_eq!(subs.get("tourism"), Some(&55));
    }

    #[tokio::test]
    async fn test_update_review_outcome_inside_transaction() {
        let pool = setup_test_db().await;

        let city = create_city(&pool, "Durango", "CO").await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        update_review_outcome(&mut *tx, city.guid, ReviewStatus::Pending, 5)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = load_city(&pool, city.guid).await.unwrap().unwrap();
        assert_eq!(loaded.status(), ReviewStatus::Pending);
    }

    #[tokio::test]
    async fn test_negative_priority_rejected_by_schema() {
        let pool = setup_test_db().await;

        let city = create_city(&pool, "Taos", "NM").await.unwrap();
        let result = update_review_outcome(&pool, city.guid, ReviewStatus::ConsensusReject, -2).await;
        assert!(result.is_err(), "CHECK (priority >= 0) should reject");
    }
}
