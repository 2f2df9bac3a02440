//! Review vote database operations
//!
//! One row per (city, reviewer); re-voting replaces the previous choice
//! in place. Vote rows are the source of truth for consensus, so there
//! is no separate tally table to keep in sync.

use anyhow::Result;
use dinemap_common::db::models::{ReviewVote, VoteChoice};
use sqlx::SqliteExecutor;
use uuid::Uuid;

/// Insert or replace one reviewer's vote on a city
pub async fn upsert_vote(
    executor: impl SqliteExecutor<'_>,
    city_id: Uuid,
    reviewer_email: &str,
    reviewer_name: Option<&str>,
    choice: VoteChoice,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO review_votes (city_id, reviewer_email, reviewer_name, vote, voted_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(city_id, reviewer_email) DO UPDATE SET
            vote = excluded.vote,
            reviewer_name = excluded.reviewer_name,
            voted_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(city_id.to_string())
    .bind(reviewer_email)
    .bind(reviewer_name)
    .bind(choice.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

/// All current votes on a city
pub async fn votes_for_city(
    executor: impl SqliteExecutor<'_>,
    city_id: Uuid,
) -> Result<Vec<ReviewVote>> {
    let votes = sqlx::query_as::<_, ReviewVote>(
        r#"
        SELECT city_id, reviewer_email, reviewer_name, vote, voted_at
        FROM review_votes
        WHERE city_id = ?
        ORDER BY reviewer_email ASC
        "#,
    )
    .bind(city_id.to_string())
    .fetch_all(executor)
    .await?;

    Ok(votes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cities::create_city;
    use dinemap_common::db::create_schema;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_upsert_then_read_back() {
        let pool = setup_test_db().await;
        let city = create_city(&pool, "Hershey", "PA").await.unwrap();

        upsert_vote(&pool, city.guid, "alice@x.com", Some("Alice"), VoteChoice::Interested)
            .await
            .unwrap();

        let votes = votes_for_city(&pool, city.guid).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].reviewer_email, "alice@x.com");
        assert_eq!(votes[0].reviewer_name.as_deref(), Some("Alice"));
        assert_eq!(votes[0].choice(), Some(VoteChoice::Interested));
    }

    #[tokio::test]
    async fn test_revote_replaces_not_duplicates() {
        let pool = setup_test_db().await;
        let city = create_city(&pool, "Hershey", "PA").await.unwrap();

        upsert_vote(&pool, city.guid, "alice@x.com", None, VoteChoice::Interested)
            .await
            .unwrap();
        upsert_vote(&pool, city.guid, "alice@x.com", None, VoteChoice::Reject)
            .await
            .unwrap();

        let votes = votes_for_city(&pool, city.guid).await.unwrap();
        assert_eq!(votes.len(), 1, "Re-vote must replace, never add a row");
        assert_eq!(votes[0].choice(), Some(VoteChoice::Reject));
    }

    #[tokio::test]
    async fn test_identical_revote_is_idempotent() {
        let pool = setup_test_db().await;
        let city = create_city(&pool, "Hershey", "PA").await.unwrap();

        upsert_vote(&pool, city.guid, "alice@x.com", None, VoteChoice::NotNow)
            .await
            .unwrap();
        let first = votes_for_city(&pool, city.guid).await.unwrap();

        upsert_vote(&pool, city.guid, "alice@x.com", None, VoteChoice::NotNow)
            .await
            .unwrap();
        let second = votes_for_city(&pool, city.guid).await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].choice(), Some(VoteChoice::NotNow));
        // voted_at only ever moves forward
        assert!(second[0].voted_at >= first[0].voted_at);
    }

    #[tokio::test]
    async fn test_votes_scoped_per_city() {
        let pool = setup_test_db().await;
        let hershey = create_city(&pool, "Hershey", "PA").await.unwrap();
        let ithaca = create_city(&pool, "Ithaca", "NY").await.unwrap();

        upsert_vote(&pool, hershey.guid, "alice@x.com", None, VoteChoice::Interested)
            .await
            .unwrap();
        upsert_vote(&pool, ithaca.guid, "alice@x.com", None, VoteChoice::Reject)
            .await
            .unwrap();

        let hershey_votes = votes_for_city(&pool, hershey.guid).await.unwrap();
        assert_eq!(hershey_votes.len(), 1);
        assert_eq!(hershey_votes[0].choice(), Some(VoteChoice::Interested));

        let ithaca_votes = votes_for_city(&pool, ithaca.guid).await.unwrap();
        assert_eq!(ithaca_votes.len(), 1);
        assert_eq!(ithaca_votes[0].choice(), Some(VoteChoice::Reject));
    }

    #[tokio::test]
    async fn test_vote_for_unknown_city_violates_foreign_key() {
        let pool = setup_test_db().await;

        let result = upsert_vote(&pool, Uuid::new_v4(), "alice@x.com", None, VoteChoice::Interested).await;
        assert!(result.is_err());
    }
}
