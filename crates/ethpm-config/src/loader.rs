//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::{GithubConfig, GlobalConfig, IpfsConfig, StoreConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Directory name every package store must carry
pub const PACKAGES_DIR_NAME: &str = "ethpm_packages";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Global config (`<ethpmcli root>/config.toml`) - overrides defaults
/// 3. Environment variables - overrides the file
/// 4. Explicit caller overrides - highest priority (handled by caller via `GlobalConfig::merge`)
pub struct ConfigLoader {
    /// Root override; the environment decides when unset
    root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Read `config.toml` from `root` instead of the ethpmcli root
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Load the global config (optional) and apply environment overrides
    pub fn load(&self) -> ConfigResult<GlobalConfig> {
        let path = self.config_path()?;

        let mut config = if path.exists() {
            GlobalConfig::load_from_file(&path)?
        } else {
            GlobalConfig::default()
        };

        config.merge(&env_overrides());
        config.validate()?;
        Ok(config)
    }

    /// Path of the global config file
    pub fn config_path(&self) -> ConfigResult<PathBuf> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => ethpmcli_root()?,
        };
        Ok(root.join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variable overrides
///
/// `ETHPM_IPFS_GATEWAY`, `ETHPM_IPFS_API`, `ETHPM_PACKAGES_DIR`, `GITHUB_TOKEN`
fn env_overrides() -> GlobalConfig {
    let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

    GlobalConfig {
        ipfs: Some(IpfsConfig {
            gateway: var("ETHPM_IPFS_GATEWAY"),
            api: var("ETHPM_IPFS_API"),
        }),
        github: Some(GithubConfig {
            api_token: var("GITHUB_TOKEN"),
        }),
        store: Some(StoreConfig {
            packages_dir: var("ETHPM_PACKAGES_DIR").map(PathBuf::from),
        }),
    }
}

/// Root directory for ethpmcli data
///
/// `$XDG_ETHPMCLI_ROOT`, else `$XDG_DATA_HOME/ethpmcli`, else the platform
/// data directory joined with `ethpmcli`.
pub fn ethpmcli_root() -> ConfigResult<PathBuf> {
    if let Some(root) = env::var_os("XDG_ETHPMCLI_ROOT").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    if let Some(data_home) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(data_home).join("ethpmcli"));
    }
    let data = dirs::data_dir().ok_or(ConfigError::DataDirNotFound)?;
    Ok(data.join("ethpmcli"))
}

/// Resolve the package store directory
///
/// An explicit directory must already exist and be named `ethpm_packages`.
/// Without one, `<cwd>/ethpm_packages` is created when missing.
pub fn resolve_packages_dir(explicit: Option<&Path>, cwd: &Path) -> ConfigResult<PathBuf> {
    match explicit {
        Some(dir) => {
            if !dir.is_dir() {
                return Err(ConfigError::InvalidPath {
                    path: dir.to_path_buf(),
                    reason: "not an existing directory".to_string(),
                });
            }
            if dir.file_name().and_then(|n| n.to_str()) != Some(PACKAGES_DIR_NAME) {
                return Err(ConfigError::InvalidPath {
                    path: dir.to_path_buf(),
                    reason: format!("directory must be named '{}'", PACKAGES_DIR_NAME),
                });
            }
            Ok(dir.to_path_buf())
        }
        None => {
            let dir = cwd.join(PACKAGES_DIR_NAME);
            if !dir.is_dir() {
                std::fs::create_dir_all(&dir)?;
            }
            Ok(dir)
        }
    }
}
