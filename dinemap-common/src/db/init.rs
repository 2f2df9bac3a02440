//! Database initialization
//!
//! Creates dinemap.db on first run and brings the schema up idempotently.
//! Every DineMap service calls `init_database` at startup; all CREATE
//! statements use IF NOT EXISTS so concurrent service starts are safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Connection-level options so every pooled connection gets them. WAL
    // allows concurrent readers with one writer; several DineMap services
    // share this file.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes. Idempotent; also usable against an
/// in-memory pool in tests.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_expansion_cities_table(pool).await?;
    create_review_votes_table(pool).await?;
    create_activity_log_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the expansion_cities table
///
/// One row per candidate market. market_potential_score is derived from
/// sub_scores at research time and never hand-edited; review_status is
/// recomputed from review_votes on every vote.
pub async fn create_expansion_cities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expansion_cities (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            state TEXT NOT NULL,
            sub_scores TEXT,
            market_potential_score INTEGER NOT NULL DEFAULT 0,
            restaurant_estimate INTEGER,
            restaurant_validated INTEGER,
            bar_estimate INTEGER,
            bar_validated INTEGER,
            priority INTEGER NOT NULL DEFAULT 5,
            review_status TEXT NOT NULL DEFAULT 'no_votes'
                CHECK (review_status IN ('no_votes', 'pending', 'consensus_interested', 'consensus_not_now', 'consensus_reject', 'split_decision')),
            research_summary TEXT,
            research_notes TEXT,
            researched_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (name, state),
            CHECK (market_potential_score >= 0 AND market_potential_score <= 100),
            CHECK (priority >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_expansion_cities_priority ON expansion_cities(priority)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_expansion_cities_status ON expansion_cities(review_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the review_votes table
///
/// The composite primary key is the idempotence contract: a reviewer has
/// at most one current vote per city, overwritten in place on re-vote.
pub async fn create_review_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_votes (
            city_id TEXT NOT NULL REFERENCES expansion_cities(guid) ON DELETE CASCADE,
            reviewer_email TEXT NOT NULL,
            reviewer_name TEXT,
            vote TEXT NOT NULL CHECK (vote IN ('interested', 'not_now', 'reject')),
            voted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (city_id, reviewer_email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_review_votes_city ON review_votes(city_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the activity_log table
///
/// Append-only operational history. The review workflow writes it and
/// never reads it back; the admin dashboard renders it.
pub async fn create_activity_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_log (
            guid TEXT PRIMARY KEY,
            city_id TEXT NOT NULL REFERENCES expansion_cities(guid) ON DELETE CASCADE,
            action TEXT NOT NULL,
            detail TEXT,
            metadata TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activity_log_city ON activity_log(city_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize or repair default settings
///
/// Ensures all required settings exist with default values and resets
/// NULL values back to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Review workflow settings
    ensure_setting(pool, "expansion_reviewers", "[]").await?;
    ensure_setting(
        pool,
        "scoring_weights",
        r#"{"dining_scene":25,"population":20,"competition":15,"college_presence":15,"income_level":15,"tourism":10}"#,
    )
    .await?;

    // Link building
    ensure_setting(pool, "public_base_url", "http://localhost:5842").await?;
    ensure_setting(pool, "admin_base_url", "http://localhost:5841").await?;

    // Research gateway (empty = not configured)
    ensure_setting(pool, "research_api_url", "").await?;
    ensure_setting(pool, "places_api_url", "").await?;
    ensure_setting(pool, "research_api_key", "").await?;

    // HTTP client settings
    ensure_setting(pool, "http_request_timeout_ms", "30000").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races;
        // multiple services may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_schema_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();

        create_schema(&pool).await.unwrap();
        // Second run must not error
        create_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_review_status_check_constraint() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO expansion_cities (guid, name, state, review_status) VALUES ('x', 'Lititz', 'PA', 'bogus')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "Unknown review_status should violate CHECK");
    }

    #[tokio::test]
    async fn test_vote_check_constraint() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO expansion_cities (guid, name, state) VALUES ('c1', 'Lititz', 'PA')")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO review_votes (city_id, reviewer_email, vote) VALUES ('c1', 'a@x.com', 'maybe')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "Unknown vote value should violate CHECK");
    }

    #[tokio::test]
    async fn test_default_settings_initialized() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();
        init_default_settings(&pool).await.unwrap();

        let roster: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'expansion_reviewers'")
                .fetch_optional(&pool)
                .await
                .unwrap();
        assert_eq!(roster.as_deref(), Some("[]"));

        let weights: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'scoring_weights'")
                .fetch_optional(&pool)
                .await
                .unwrap();
        assert!(weights.unwrap().contains("\"dining_scene\":25"));
    }

    #[tokio::test]
    async fn test_ensure_setting_preserves_existing_value() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_settings_table(&pool).await.unwrap();

        sqlx::query("INSERT INTO settings (key, value) VALUES ('public_base_url', 'https://vote.dinemap.example')")
            .execute(&pool)
            .await
            .unwrap();

        ensure_setting(&pool, "public_base_url", "http://localhost:5842")
            .await
            .unwrap();

        let value: String =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'public_base_url'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(value, "https://vote.dinemap.example");
    }
}
