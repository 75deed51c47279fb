//! Explicit installation context
//!
//! Everything the engines touch outside their arguments comes from here: the
//! store directory and the collaborator set.

use crate::backend::{
    BlobHost, ContentStore, GithubBlobHost, IpfsGateway, RegistryClient, SchemaValidator,
    SourceVerifier, Unconfigured,
};
use crate::validator::BasicSchemaValidator;
use crate::{PackageError, Result, LOCKFILE_NAME, PACKAGES_DIR};
use ethpm_config::GlobalConfig;
use std::path::{Path, PathBuf};

/// A validated `ethpm_packages` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDir {
    path: PathBuf,
}

impl StoreDir {
    /// Use an existing store directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(PackageError::Configuration(format!(
                "{} is not an existing directory",
                path.display()
            )));
        }
        if path.file_name().and_then(|n| n.to_str()) != Some(PACKAGES_DIR) {
            return Err(PackageError::Configuration(format!(
                "{} must be a directory named '{}'",
                path.display(),
                PACKAGES_DIR
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Use `<parent>/ethpm_packages`, creating it when missing
    pub fn create_in(parent: impl AsRef<Path>) -> Result<Self> {
        let path = ethpm_config::resolve_packages_dir(None, parent.as_ref())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.path.join(LOCKFILE_NAME)
    }

    pub fn package_path(&self, alias: &str) -> PathBuf {
        self.path.join(alias)
    }
}

/// Collaborators consumed by the engines
pub struct Backends {
    content_store: Box<dyn ContentStore>,
    blob_host: Box<dyn BlobHost>,
    registry: Box<dyn RegistryClient>,
    source_verifier: Box<dyn SourceVerifier>,
    schema: Box<dyn SchemaValidator>,
}

impl Backends {
    /// Start from a content store; everything else is unconfigured until set
    pub fn new(content_store: impl ContentStore + 'static) -> Self {
        Self {
            content_store: Box::new(content_store),
            blob_host: Box::new(Unconfigured),
            registry: Box::new(Unconfigured),
            source_verifier: Box::new(Unconfigured),
            schema: Box::new(BasicSchemaValidator),
        }
    }

    pub fn with_blob_host(mut self, blob_host: impl BlobHost + 'static) -> Self {
        self.blob_host = Box::new(blob_host);
        self
    }

    pub fn with_registry(mut self, registry: impl RegistryClient + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn with_source_verifier(mut self, verifier: impl SourceVerifier + 'static) -> Self {
        self.source_verifier = Box::new(verifier);
        self
    }

    pub fn with_schema(mut self, schema: impl SchemaValidator + 'static) -> Self {
        self.schema = Box::new(schema);
        self
    }

    pub fn content_store(&self) -> &dyn ContentStore {
        self.content_store.as_ref()
    }

    pub fn blob_host(&self) -> &dyn BlobHost {
        self.blob_host.as_ref()
    }

    pub fn registry(&self) -> &dyn RegistryClient {
        self.registry.as_ref()
    }

    pub fn source_verifier(&self) -> &dyn SourceVerifier {
        self.source_verifier.as_ref()
    }

    pub fn schema(&self) -> &dyn SchemaValidator {
        self.schema.as_ref()
    }
}

/// Store plus collaborators
pub struct Context {
    pub store: StoreDir,
    pub backends: Backends,
}

impl Context {
    pub fn new(store: StoreDir, backends: Backends) -> Self {
        Self { store, backends }
    }

    /// Wire the HTTP adapters from configuration
    ///
    /// The registry and verified-source collaborators have no HTTP adapter
    /// here; attach them with [`Backends::with_registry`] and
    /// [`Backends::with_source_verifier`] before calling the engines that need
    /// them.
    pub fn from_config(config: &GlobalConfig, cwd: &Path) -> Result<Self> {
        let store_path = ethpm_config::resolve_packages_dir(config.packages_dir(), cwd)?;
        let store = StoreDir::open(store_path)?;

        let gateway = IpfsGateway::new(
            config.ipfs_gateway(),
            config.ipfs_api().map(str::to_string),
        )?;
        let github = GithubBlobHost::new(config.github_token().map(str::to_string))?;

        Ok(Self {
            store,
            backends: Backends::new(gateway).with_blob_host(github),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_requires_store_name() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            StoreDir::open(temp.path()),
            Err(PackageError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_in_makes_store() {
        let temp = TempDir::new().unwrap();
        let store = StoreDir::create_in(temp.path()).unwrap();
        assert!(store.path().is_dir());
        assert_eq!(store.lockfile_path(), temp.path().join(PACKAGES_DIR).join(LOCKFILE_NAME));
        assert!(StoreDir::open(store.path()).is_ok());
    }

    #[test]
    fn test_from_config_uses_cwd_store() {
        let temp = TempDir::new().unwrap();
        let context = Context::from_config(&GlobalConfig::default(), temp.path()).unwrap();
        assert_eq!(context.store.path(), temp.path().join(PACKAGES_DIR));
    }
}
