//! Configuration resolution for dinemap-mx
//!
//! Multi-tier resolution of the research gateway API key with
//! Database → ENV → TOML priority. The settings table is authoritative;
//! the environment variable and the module TOML file cover first runs
//! and headless deployments.

use dinemap_common::config::TomlConfig;
use dinemap_common::db::settings::{get_research_api_key, set_research_api_key};
use dinemap_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Resolve the research gateway API key from 3-tier configuration
///
/// Priority: Database → ENV (`DINEMAP_RESEARCH_API_KEY`) → TOML.
/// The gateway itself is optional, so no key is `Ok(None)` rather than
/// an error.
pub async fn resolve_research_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let mut sources = Vec::new();

    // Tier 1: settings table (authoritative)
    let db_key = get_research_api_key(db).await?;
    if let Some(key) = &db_key {
        if is_valid_key(key) {
            sources.push("database");
        }
    }

    // Tier 2: environment variable
    let env_key = std::env::var("DINEMAP_RESEARCH_API_KEY").ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    // Tier 3: TOML config
    let toml_key = toml_config.research_api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Research API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    // Resolution priority
    if let Some(key) = db_key {
        if is_valid_key(&key) {
            info!("Research API key loaded from database");
            return Ok(Some(key));
        }
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Research API key loaded from environment variable");
            return Ok(Some(key));
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Research API key loaded from TOML config");
            return Ok(Some(key.clone()));
        }
    }

    Ok(None)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

// ============================================================================
// Settings Sync and Write-Back
// ============================================================================

/// Sync settings from the database to the module TOML file
///
/// HashMap keys: "research_api_key" (future settings reuse the same path).
/// The write is best-effort; the database copy is already authoritative.
pub async fn sync_settings_to_toml(
    settings: HashMap<String, String>,
    toml_path: &Path,
) -> Result<()> {
    // Read existing TOML (or start from defaults)
    let mut config: TomlConfig = if toml_path.exists() {
        let content = std::fs::read_to_string(toml_path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?
    } else {
        TomlConfig::default()
    };

    if let Some(key) = settings.get("research_api_key") {
        config.research_api_key = Some(key.clone());
    }

    match dinemap_common::config::write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
            Ok(())
        }
    }
}

/// Migrate a key discovered in ENV/TOML into the settings table
///
/// ENV-sourced keys are also written back to the TOML file so the
/// deployment keeps working if the variable disappears.
pub async fn migrate_key_to_database(
    key: String,
    source: &str,
    db: &Pool<Sqlite>,
    toml_path: &Path,
) -> Result<()> {
    set_research_api_key(db, key.clone()).await?;

    if source == "environment" {
        let mut settings = HashMap::new();
        settings.insert("research_api_key".to_string(), key);
        sync_settings_to_toml(settings, toml_path).await?;
    }

    info!("Research API key migrated from {} to database", source);
    Ok(())
}
