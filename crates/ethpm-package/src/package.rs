//! Package assembly
//!
//! A [`Package`] is everything known about one install target after
//! resolution, fetch and validation. Building one touches the network
//! collaborators but never the filesystem.

use crate::context::Backends;
use crate::fetch::resolve_manifest_uri;
use crate::lockfile::LockEntry;
use crate::manifest::Manifest;
use crate::resolver::resolve_install_uri;
use crate::validator::Validator;
use crate::{PackageError, Result};
use tracing::debug;

/// What the caller asked to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub install_uri: String,
    pub alias: Option<String>,
    /// Required for verified-source installs only
    pub package_name: Option<String>,
    /// Required for verified-source installs only
    pub package_version: Option<String>,
}

impl InstallRequest {
    pub fn new(install_uri: impl Into<String>) -> Self {
        Self {
            install_uri: install_uri.into(),
            alias: None,
            package_name: None,
            package_version: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    pub fn with_package_version(mut self, version: impl Into<String>) -> Self {
        self.package_version = Some(version.into());
        self
    }
}

/// A resolved, validated package ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub alias: String,
    pub install_uri: String,
    pub manifest_uri: String,
    pub registry_address: Option<String>,
    pub content_hash: String,
    /// Manifest bytes exactly as fetched
    pub raw_manifest: Vec<u8>,
    pub manifest: Manifest,
}

impl Package {
    /// Resolve, fetch and validate `request`
    pub fn resolve(request: &InstallRequest, backends: &Backends) -> Result<Self> {
        if let Some(alias) = &request.alias {
            validate_alias(alias)?;
        }

        let locator = resolve_install_uri(request, backends)?;
        let resolved = resolve_manifest_uri(&locator.manifest_uri, backends)?;
        let manifest = Validator::validate(&resolved.raw_bytes, backends.schema())?;

        let alias = request
            .alias
            .clone()
            .unwrap_or_else(|| manifest.package_name.clone());
        debug!(alias = %alias, manifest_uri = %locator.manifest_uri, "assembled package");

        Ok(Self {
            alias,
            install_uri: request.install_uri.clone(),
            manifest_uri: locator.manifest_uri,
            registry_address: locator.registry_address,
            content_hash: resolved.content_hash,
            raw_manifest: resolved.raw_bytes,
            manifest,
        })
    }

    pub fn package_name(&self) -> &str {
        &self.manifest.package_name
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    /// Lock-file projection of this package
    pub fn lock_entry(&self) -> LockEntry {
        LockEntry {
            alias: self.alias.clone(),
            install_uri: self.install_uri.clone(),
            registry_address: self.registry_address.clone(),
            resolved_content_hash: self.content_hash.clone(),
            resolved_package_name: self.manifest.package_name.clone(),
            resolved_uri: self.manifest_uri.clone(),
            resolved_version: self.manifest.version.clone(),
        }
    }
}

/// Aliases become directory names, so they follow the package-name rule
pub fn validate_alias(alias: &str) -> Result<()> {
    Validator::validate_package_name(alias)
        .map_err(|e| PackageError::ManifestValidation(format!("Invalid alias '{}': {}", alias, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryContentStore;

    const OWNED: &str = r#"{"manifest_version":"2","package_name":"owned","sources":{"./contracts/Owned.sol":"contract Owned {}\n"},"version":"1.0.0"}"#;

    fn backends_with_owned() -> (Backends, String) {
        let store = MemoryContentStore::new();
        let uri = store.add(OWNED);
        (Backends::new(store), uri)
    }

    #[test]
    fn test_alias_defaults_to_package_name() {
        let (backends, uri) = backends_with_owned();
        let package = Package::resolve(&InstallRequest::new(uri), &backends).unwrap();
        assert_eq!(package.alias, "owned");
        assert_eq!(package.version(), "1.0.0");
    }

    #[test]
    fn test_explicit_alias_wins() {
        let (backends, uri) = backends_with_owned();
        let package =
            Package::resolve(&InstallRequest::new(uri).with_alias("owned-alias"), &backends)
                .unwrap();
        assert_eq!(package.alias, "owned-alias");
        assert_eq!(package.package_name(), "owned");
    }

    #[test]
    fn test_alias_cannot_escape_store() {
        let (backends, uri) = backends_with_owned();
        let err = Package::resolve(&InstallRequest::new(uri).with_alias("../owned"), &backends)
            .unwrap_err();
        assert!(matches!(err, PackageError::ManifestValidation(_)));
    }

    #[test]
    fn test_lock_entry_projection() {
        let (backends, uri) = backends_with_owned();
        let package = Package::resolve(&InstallRequest::new(uri.clone()), &backends).unwrap();
        let entry = package.lock_entry();

        assert_eq!(entry.alias, "owned");
        assert_eq!(entry.install_uri, uri);
        assert_eq!(entry.resolved_uri, uri);
        assert_eq!(format!("ipfs://{}", entry.resolved_content_hash), uri);
        assert_eq!(entry.registry_address, None);
        assert_eq!(entry.resolved_package_name, "owned");
        assert_eq!(entry.resolved_version, "1.0.0");
        assert_eq!(entry, package.lock_entry());
    }

    #[test]
    fn test_invalid_manifest_is_rejected() {
        let store = MemoryContentStore::new();
        let uri = store.add(r#"{"package_name":"owned"}"#);
        let backends = Backends::new(store);
        assert!(matches!(
            Package::resolve(&InstallRequest::new(uri), &backends),
            Err(PackageError::ManifestValidation(_))
        ));
    }
}
