//! ethPM Configuration System
//!
//! Provides configuration management for the ethPM installer:
//! - Global user configuration (`<ethpmcli root>/config.toml`)
//! - Environment variable overrides
//! - Packages-directory resolution
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config (`<ethpmcli root>/config.toml`)
//! 3. Environment variables (`ETHPM_*`, `GITHUB_TOKEN`)
//! 4. Explicit caller overrides
//!
//! # Example
//!
//! ```no_run
//! use ethpm_config::{resolve_packages_dir, ConfigLoader};
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load().unwrap();
//! let store = resolve_packages_dir(config.packages_dir(), Path::new(".")).unwrap();
//! ```

pub mod global;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Data directory not found")]
    DataDirNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::{GithubConfig, GlobalConfig, IpfsConfig, StoreConfig, DEFAULT_IPFS_GATEWAY};
pub use loader::{ethpmcli_root, resolve_packages_dir, ConfigLoader, PACKAGES_DIR_NAME};
