//! Settings database operations
//!
//! Typed accessors over the settings key-value table. Runtime-tunable
//! knobs (reviewer roster, scoring weights, gateway endpoints) live here
//! rather than in the TOML config so operators can change them without a
//! restart.

use crate::db::models::Reviewer;
use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use tracing::info;

#[cfg(test)]
use sqlx::SqlitePool;

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Load the recognized reviewer roster
///
/// Settings key `expansion_reviewers`: JSON array of `{email, name}`.
/// Duplicate emails are dropped, first entry wins.
pub async fn load_review_roster(db: &Pool<Sqlite>) -> Result<Vec<Reviewer>> {
    let raw = get_setting::<String>(db, "expansion_reviewers")
        .await?
        .unwrap_or_else(|| "[]".to_string());

    let mut roster: Vec<Reviewer> = serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("Invalid expansion_reviewers JSON: {}", e)))?;

    let mut seen = std::collections::HashSet::new();
    roster.retain(|r| seen.insert(r.email.clone()));

    Ok(roster)
}

/// Persist the reviewer roster
pub async fn save_review_roster(db: &Pool<Sqlite>, roster: &[Reviewer]) -> Result<()> {
    let json = serde_json::to_string(roster)
        .map_err(|e| Error::Internal(format!("Serialize roster failed: {}", e)))?;
    set_setting(db, "expansion_reviewers", json).await
}

/// Raw scoring weight map (category -> integer percent)
///
/// Settings key `scoring_weights`. Validation of the weight sum happens
/// in the scoring layer.
pub async fn load_scoring_weights(db: &Pool<Sqlite>) -> Result<BTreeMap<String, i64>> {
    let raw = get_setting::<String>(db, "scoring_weights")
        .await?
        .unwrap_or_default();

    if raw.is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("Invalid scoring_weights JSON: {}", e)))
}

/// Load the review-link token secret, generating and persisting it on
/// first use
///
/// The secret is a 64-char hex string. Rotating it invalidates every
/// outstanding review link; that is the revocation mechanism.
pub async fn load_or_init_token_secret(db: &Pool<Sqlite>) -> Result<String> {
    if let Some(secret) = get_setting::<String>(db, "review_token_secret").await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    let candidate: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    // Conditional upsert so concurrent first starts converge on a single
    // secret instead of clobbering each other's
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ('review_token_secret', ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value
         WHERE settings.value IS NULL OR settings.value = ''",
    )
    .bind(&candidate)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    let (stored,): (String,) =
        sqlx::query_as("SELECT value FROM settings WHERE key = 'review_token_secret'")
            .fetch_one(db)
            .await
            .map_err(Error::Database)?;

    if stored == candidate {
        info!("Generated review token secret");
    }

    Ok(stored)
}

/// Research gateway endpoint; None when not configured
pub async fn get_research_api_url(db: &Pool<Sqlite>) -> Result<Option<String>> {
    Ok(get_setting::<String>(db, "research_api_url")
        .await?
        .filter(|v| !v.is_empty()))
}

/// Place-count validation endpoint; None when not configured
pub async fn get_places_api_url(db: &Pool<Sqlite>) -> Result<Option<String>> {
    Ok(get_setting::<String>(db, "places_api_url")
        .await?
        .filter(|v| !v.is_empty()))
}

/// Research gateway API key; None when not configured
pub async fn get_research_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    Ok(get_setting::<String>(db, "research_api_key")
        .await?
        .filter(|v| !v.is_empty()))
}

/// Persist the research gateway API key
pub async fn set_research_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, "research_api_key", key).await
}

/// Base URL reviewers reach this service on (used to build signed links)
pub async fn get_public_base_url(db: &Pool<Sqlite>) -> Result<String> {
    Ok(get_setting::<String>(db, "public_base_url")
        .await?
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "http://localhost:5842".to_string()))
}

/// Base URL of the admin dashboard (linked from confirmation pages)
pub async fn get_admin_base_url(db: &Pool<Sqlite>) -> Result<String> {
    Ok(get_setting::<String>(db, "admin_base_url")
        .await?
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "http://localhost:5841".to_string()))
}

/// Outbound HTTP request timeout in milliseconds
pub async fn get_http_timeout_ms(db: &Pool<Sqlite>) -> Result<u64> {
    Ok(get_setting::<u64>(db, "http_request_timeout_ms")
        .await?
        .unwrap_or(30_000))
}

// ============================================================================
// Tests
// ============================================================================
