//! ethPM package installation core
//!
//! Resolves package URIs (content-addressed, hosted blob, on-chain registry
//! and verified-source locators) into validated manifests, stages complete
//! package trees in scratch directories and promotes them into an
//! `ethpm_packages` store with a per-level `ethpm.lock`.

pub mod backend;
pub mod cid;
pub mod context;
pub mod fetch;
pub mod install;
pub mod list;
pub mod lockfile;
pub mod logging;
pub mod manifest;
pub mod package;
pub mod prompt;
pub mod resolver;
pub mod scratch;
pub mod uninstall;
pub mod update;
pub mod uri;
pub mod validator;
pub mod writer;

use std::path::PathBuf;

pub use backend::{
    BlobHost, ContentStore, RegistryClient, Release, SchemaValidator, SourceVerifier,
    VerifiedContract,
};
pub use context::{Backends, Context, StoreDir};
pub use fetch::{resolve_manifest_uri, ResolvedManifest};
pub use install::{install_package, InstallState};
pub use list::{list_installed, InstalledPackageTree};
pub use lockfile::{LockEntry, Lockfile};
pub use manifest::Manifest;
pub use package::{InstallRequest, Package};
pub use prompt::{ScriptedPrompt, StdinPrompt, VersionPrompt};
pub use resolver::{resolve_install_uri, ResolvedLocator};
pub use uninstall::uninstall_package;
pub use update::update_package;
pub use uri::PackageUri;
pub use validator::{ValidationError, Validator};

/// Name of the store directory and of every nested dependency directory
pub const PACKAGES_DIR: &str = "ethpm_packages";
/// Lock-file name, one per directory level with dependents
pub const LOCKFILE_NAME: &str = "ethpm.lock";
/// Directory holding a package's source files
pub const SOURCES_DIR: &str = "sources";
/// Manifest file name inside an installed package
pub const MANIFEST_FILE: &str = "manifest.json";
/// Documentation file name inside an installed package
pub const DOCUMENTATION_FILE: &str = "documentation.md";

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("{uri} is not a supported uri. Supported uris are: {supported}")]
    UriNotSupported { uri: String, supported: &'static str },

    #[error("Invalid manifest: {0}")]
    ManifestValidation(String),

    #[error("Content hash mismatch for {uri}: expected {expected}, found {actual}")]
    Integrity {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error(
        "Installation conflict: package '{package_name}' aliased to '{alias}' is already \
         installed at {}. Try installing it under a different alias.",
        path.display()
    )]
    InstallConflict {
        alias: String,
        package_name: String,
        path: PathBuf,
    },

    #[error("{0}")]
    AliasResolution(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{backend} backend failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackageError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a collaborator failure
    pub fn backend(backend: &'static str, message: impl ToString) -> Self {
        Self::Backend {
            backend,
            message: message.to_string(),
        }
    }

    /// Create an unsupported-uri error listing every supported scheme
    pub fn uri_not_supported(uri: impl Into<String>) -> Self {
        Self::UriNotSupported {
            uri: uri.into(),
            supported: uri::SUPPORTED_SCHEMES,
        }
    }
}

impl From<ethpm_config::ConfigError> for PackageError {
    fn from(err: ethpm_config::ConfigError) -> Self {
        PackageError::Configuration(err.to_string())
    }
}

impl From<Vec<ValidationError>> for PackageError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        PackageError::ManifestValidation(messages.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
