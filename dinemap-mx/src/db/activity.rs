//! Activity log writes
//!
//! Append-only audit trail consumed by the admin dashboard. Writers in
//! the vote and research paths treat logging as best-effort; a full disk
//! must not turn a recorded vote into an error page.

use anyhow::Result;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::warn;
use uuid::Uuid;

/// Append one activity entry for a city
pub async fn record_activity(
    executor: impl SqliteExecutor<'_>,
    city_id: Uuid,
    action: &str,
    detail: &str,
    metadata: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_log (guid, city_id, action, detail, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(city_id.to_string())
    .bind(action)
    .bind(detail)
    .bind(metadata)
    .execute(executor)
    .await?;

    Ok(())
}

/// Append an activity entry, downgrading failure to a warning
pub async fn record_activity_best_effort(
    pool: &SqlitePool,
    city_id: Uuid,
    action: &str,
    detail: &str,
    metadata: Option<&str>,
) {
    if let Err(e) = record_activity(pool, city_id, action, detail, metadata).await {
        warn!("Failed to record activity '{}' for city {}: {}", action, city_id, e);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cities::create_city;
    use dinemap_common::db::create_schema;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_record_activity() {
        let pool = setup_test_db().await;
        let city = create_city(&pool, "Hershey", "PA").await.unwrap();

        record_activity(
            &pool,
            city.guid,
            "vote_recorded",
            "alice@x.com voted interested",
            Some(r#"{"vote":"interested"}"#),
        )
        .await
        .unwrap();

        let (count, action): (i64, String) = sqlx::query_as(
            "SELECT COUNT(*), MAX(action) FROM activity_log WHERE city_id = ?",
        )
        .bind(city.guid.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(action, "vote_recorded");
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failure() {
        let pool = setup_test_db().await;

        // Unknown city violates the foreign key; best-effort must not panic
        record_activity_best_effort(&pool, Uuid::new_v4(), "vote_recorded", "detail", None).await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
