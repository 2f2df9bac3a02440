//! Unit tests for TOML atomic write utilities
//!
//! Covers:
//! - Atomic file operations (temp sibling + rename)
//! - No temp file left behind after a successful write
//! - Existing fields preserved through a write/parse roundtrip
//! - Permissions 0600 on Unix (config may hold the research key)
//! - Loose-permission detection

use dinemap_common::config::{write_toml_config, LoggingConfig, TomlConfig};
#[cfg(unix)]
use dinemap_common::config::check_toml_permissions_loose;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_atomic_write_creates_target_and_cleans_temp() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/dinemap")),
        logging: LoggingConfig::default(),
        research_api_key: Some("key123".to_string()),
    };

    write_toml_config(&config, &target).unwrap();

    // Target exists and the temp sibling was renamed away
    assert!(target.exists());
    assert!(!temp_dir.path().join("market-expansion.toml.tmp").exists());
}

#[test]
fn test_atomic_write_renames_to_target() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/dinemap")),
        logging: LoggingConfig::default(),
        research_api_key: Some("key123".to_string()),
    };

    write_toml_config(&config, &target).unwrap();

    let content = std::fs::read_to_string(&target).unwrap();
    assert!(content.contains("research_api_key"));
    assert!(content.contains("key123"));
}

#[test]
fn test_atomic_write_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir
        .path()
        .join("nested")
        .join("dinemap")
        .join("market-expansion.toml");

    let config = TomlConfig {
        root_folder: None,
        logging: LoggingConfig::default(),
        research_api_key: Some("key123".to_string()),
    };

    write_toml_config(&config, &target).unwrap();
    assert!(target.exists());
}

#[test]
fn test_atomic_write_preserves_existing_fields() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/dinemap")),
        logging: LoggingConfig {
            level: "debug".to_string(),
            file: Some(PathBuf::from("/var/log/dinemap-mx.log")),
        },
        research_api_key: Some("key123".to_string()),
    };

    write_toml_config(&config, &target).unwrap();

    let content = std::fs::read_to_string(&target).unwrap();
    let parsed: TomlConfig = toml::from_str(&content).unwrap();

    assert_eq!(parsed.root_folder, Some(PathBuf::from("/srv/dinemap")));
    assert_eq!(parsed.logging.level, "debug");
    assert_eq!(parsed.logging.file, Some(PathBuf::from("/var/log/dinemap-mx.log")));
    assert_eq!(parsed.research_api_key, Some("key123".to_string()));
}

#[test]
#[cfg(unix)]
fn test_atomic_write_sets_permissions_0600() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    let config = TomlConfig {
        root_folder: None,
        logging: LoggingConfig::default(),
        research_api_key: Some("key123".to_string()),
    };

    write_toml_config(&config, &target).unwrap();

    let metadata = std::fs::metadata(&target).unwrap();
    let mode = metadata.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
#[cfg(not(unix))]
fn test_atomic_write_graceful_on_windows() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    let config = TomlConfig {
        root_folder: None,
        logging: LoggingConfig::default(),
        research_api_key: Some("key123".to_string()),
    };

    // Should succeed on Windows (no permission setting)
    write_toml_config(&config, &target).unwrap();
    assert!(target.exists());
}

#[test]
fn test_overwrite_replaces_previous_content() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    let first = TomlConfig {
        root_folder: Some(PathBuf::from("/old")),
        logging: LoggingConfig::default(),
        research_api_key: Some("old-key".to_string()),
    };
    write_toml_config(&first, &target).unwrap();

    let second = TomlConfig {
        root_folder: Some(PathBuf::from("/new")),
        logging: LoggingConfig::default(),
        research_api_key: None,
    };
    write_toml_config(&second, &target).unwrap();

    let parsed: TomlConfig = toml::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(parsed.root_folder, Some(PathBuf::from("/new")));
    assert_eq!(parsed.research_api_key, None);
}

#[test]
#[cfg(unix)]
fn test_check_permissions_detects_loose() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("market-expansion.toml");

    // Create file with loose permissions (0644)
    std::fs::write(&target, "test").unwrap();
    let mut perms = std::fs::metadata(&target).unwrap().permissions();
    perms.set_mode(0o644);
    std::fs::set_permissions(&target, perms).unwrap();

    assert!(check_toml_permissions_loose(&target).unwrap());

    // Tighten to 0600
    let mut perms = std::fs::metadata(&target).unwrap().permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(&target, perms).unwrap();

    assert!(!check_toml_permissions_loose(&target).unwrap());
}
