//! In-memory collaborators for offline use and tests

use super::{BlobHost, ContentStore, RegistryClient, Release, SourceVerifier, VerifiedContract};
use crate::uri::PackageUri;
use crate::{cid, PackageError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Content store backed by a map of CID -> bytes
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    objects: RefCell<HashMap<String, Vec<u8>>>,
    pins: Cell<usize>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` under their real CID and return the `ipfs://` URI
    pub fn add(&self, bytes: impl Into<Vec<u8>>) -> String {
        let bytes = bytes.into();
        let cid = cid::content_hash(&bytes);
        self.objects.borrow_mut().insert(cid.clone(), bytes);
        format!("ipfs://{}", cid)
    }

    /// Store `bytes` under an arbitrary CID, bypassing hashing
    pub fn insert_raw(&self, cid: &str, bytes: impl Into<Vec<u8>>) {
        self.objects.borrow_mut().insert(cid.to_string(), bytes.into());
    }

    pub fn contains(&self, cid: &str) -> bool {
        self.objects.borrow().contains_key(cid)
    }

    /// Number of `pin` calls served so far
    pub fn pin_count(&self) -> usize {
        self.pins.get()
    }
}

impl ContentStore for MemoryContentStore {
    fn fetch(&self, cid: &str) -> Result<Vec<u8>> {
        self.objects
            .borrow()
            .get(cid)
            .cloned()
            .ok_or_else(|| PackageError::backend("ipfs", format!("{} not found", cid)))
    }

    fn pin(&self, bytes: &[u8]) -> Result<String> {
        self.pins.set(self.pins.get() + 1);
        let cid = cid::content_hash(bytes);
        self.objects
            .borrow_mut()
            .entry(cid.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(cid)
    }
}

/// Blob host backed by a map of URI -> bytes
#[derive(Debug, Default)]
pub struct MemoryBlobHost {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.insert(uri.into(), bytes.into());
    }
}

impl BlobHost for MemoryBlobHost {
    fn fetch(&self, uri: &PackageUri) -> Result<Vec<u8>> {
        self.blobs
            .get(&uri.to_string())
            .cloned()
            .ok_or_else(|| PackageError::backend("github", format!("{} not found", uri)))
    }
}

/// Registry holding releases per (address, chain id, package name)
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    releases: HashMap<(String, u64, String), Vec<Release>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a release. Addresses compare case-insensitively.
    pub fn publish(
        &mut self,
        registry_address: &str,
        chain_id: u64,
        package_name: &str,
        version: &str,
        manifest_uri: &str,
    ) {
        self.releases
            .entry(key(registry_address, chain_id, package_name))
            .or_default()
            .push(Release {
                version: version.to_string(),
                manifest_uri: manifest_uri.to_string(),
            });
    }
}

fn key(address: &str, chain_id: u64, package_name: &str) -> (String, u64, String) {
    (address.to_lowercase(), chain_id, package_name.to_string())
}

impl RegistryClient for MemoryRegistry {
    fn get_release(
        &self,
        registry_address: &str,
        chain_id: u64,
        package_name: &str,
        version: &str,
    ) -> Result<String> {
        self.get_all_versions(registry_address, chain_id, package_name)?
            .into_iter()
            .find(|release| release.version == version)
            .map(|release| release.manifest_uri)
            .ok_or_else(|| {
                PackageError::backend(
                    "registry",
                    format!(
                        "{}@{} not found on registry {}",
                        package_name, version, registry_address
                    ),
                )
            })
    }

    fn get_all_versions(
        &self,
        registry_address: &str,
        chain_id: u64,
        package_name: &str,
    ) -> Result<Vec<Release>> {
        self.releases
            .get(&key(registry_address, chain_id, package_name))
            .cloned()
            .ok_or_else(|| {
                PackageError::backend(
                    "registry",
                    format!(
                        "{} is not available on registry {}",
                        package_name, registry_address
                    ),
                )
            })
    }
}

/// Verified-source service backed by a map of (address, chain id)
#[derive(Debug, Default)]
pub struct MemorySourceVerifier {
    contracts: HashMap<(String, u64), VerifiedContract>,
}

impl MemorySourceVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str, chain_id: u64, contract: VerifiedContract) {
        self.contracts
            .insert((address.to_lowercase(), chain_id), contract);
    }
}

impl SourceVerifier for MemorySourceVerifier {
    fn lookup(&self, address: &str, chain_id: u64) -> Result<VerifiedContract> {
        self.contracts
            .get(&(address.to_lowercase(), chain_id))
            .cloned()
            .ok_or_else(|| {
                PackageError::backend(
                    "etherscan",
                    format!("contract {} is not verified on chain {}", address, chain_id),
                )
            })
    }
}
