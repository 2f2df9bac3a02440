//! Configuration loading and root folder resolution
//!
//! Every DineMap service resolves its root folder through the same
//! priority chain:
//! 1. Explicit path supplied by the caller (launcher, test harness)
//! 2. `DINEMAP_ROOT_FOLDER` environment variable (legacy alias `DINEMAP_ROOT`)
//! 3. `root_folder` key in `~/.config/dinemap/<module>.toml`
//! 4. OS-dependent compiled default
//!
//! Missing or malformed config files never abort startup; resolution
//! degrades to the compiled default with a log line.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Compiled per-platform fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/dinemap (or /var/lib/dinemap for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("dinemap"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/dinemap"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/dinemap
        dirs::data_dir()
            .map(|d| d.join("dinemap"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/dinemap"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\dinemap
        dirs::data_local_dir()
            .map(|d| d.join("dinemap"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\dinemap"))
    } else {
        PathBuf::from("./dinemap_data")
    }
}

/// Logging section of the per-module TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Per-module TOML config file (`~/.config/dinemap/<module>.toml`)
///
/// All fields are optional so old config files keep parsing as the
/// schema grows.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Key for the research gateway; the settings table takes precedence
    pub research_api_key: Option<String>,
}

/// Resolves the service root folder via the 4-tier priority chain
pub struct RootFolderResolver {
    module_name: String,
    explicit: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            explicit: None,
        }
    }

    /// Highest-priority override (launcher argument, test harness)
    pub fn with_explicit_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.explicit = Some(root.into());
        self
    }

    /// Resolve the root folder. Never fails; the compiled default is the
    /// terminal fallback.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.explicit {
            debug!("Root folder from explicit override: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var("DINEMAP_ROOT_FOLDER") {
            debug!("Root folder from DINEMAP_ROOT_FOLDER: {}", path);
            return PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("DINEMAP_ROOT") {
            debug!("Root folder from DINEMAP_ROOT: {}", path);
            return PathBuf::from(path);
        }

        if let Some(config) = self.load_toml_config() {
            if let Some(root) = config.root_folder {
                debug!(
                    "Root folder from {}.toml: {}",
                    self.module_name,
                    root.display()
                );
                return root;
            }
        }

        let defaults = CompiledDefaults::for_current_platform();
        debug!(
            "Root folder from compiled default: {}",
            defaults.root_folder.display()
        );
        defaults.root_folder
    }

    /// Path of this module's TOML config file, if the platform has a
    /// user config directory
    pub fn config_file_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("dinemap").join(format!("{}.toml", self.module_name)))
    }

    /// Load the module TOML config. Missing, unreadable, or malformed
    /// files resolve to None rather than an error.
    pub fn load_toml_config(&self) -> Option<TomlConfig> {
        let path = self.config_file_path()?;
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<TomlConfig>(&contents) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Ignoring malformed config {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Ignoring unreadable config {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Write a module TOML config atomically (write temp sibling, then rename)
///
/// The file can hold the research gateway key, so on Unix the temp file
/// is restricted to 0600 before the rename makes it visible. The rename
/// keeps readers from ever observing a half-written config.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    // Temp file must be a sibling so the rename stays on one filesystem
    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// True when the config file is readable or writable by group/other
#[cfg(unix)]
pub fn check_toml_permissions_loose(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path)?;
    Ok(metadata.permissions().mode() & 0o077 != 0)
}

/// Prepares a resolved root folder for use
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder (and parents) if missing. Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Path of the shared database file inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root.join("dinemap.db")
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
