//! Collaborator contracts consumed by the installer
//!
//! Network backends, the registry contract, the verified-source lookup and
//! JSON-Schema validation all live behind these traits. The installer never
//! reaches for them implicitly; they arrive through [`crate::Context`].

use crate::uri::PackageUri;
use crate::validator::ValidationError;
use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod http;
pub mod memory;

pub use http::{GithubBlobHost, IpfsGateway};
pub use memory::{MemoryBlobHost, MemoryContentStore, MemoryRegistry, MemorySourceVerifier};

/// Content-addressed blob store (IPFS)
pub trait ContentStore {
    /// Fetch the bytes behind a CID. Integrity is checked by the caller.
    fn fetch(&self, cid: &str) -> Result<Vec<u8>>;

    /// Store and pin `bytes`, returning their CID. Pinning the same bytes
    /// twice must return the same CID.
    fn pin(&self, bytes: &[u8]) -> Result<String>;
}

/// Hosted git blob endpoint. Identifiers are trusted, not recomputed.
pub trait BlobHost {
    fn fetch(&self, uri: &PackageUri) -> Result<Vec<u8>>;
}

/// One published release on a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    pub manifest_uri: String,
}

/// On-chain package registry
pub trait RegistryClient {
    /// Manifest URI of `package_name@version`
    fn get_release(
        &self,
        registry_address: &str,
        chain_id: u64,
        package_name: &str,
        version: &str,
    ) -> Result<String>;

    /// Every published release of `package_name`, in publication order
    fn get_all_versions(
        &self,
        registry_address: &str,
        chain_id: u64,
        package_name: &str,
    ) -> Result<Vec<Release>>;
}

/// Verified contract data returned by a source-verification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedContract {
    pub contract_name: String,
    pub source_code: String,
    pub abi: Value,
    pub compiler: Value,
    pub runtime_bytecode: String,
    /// `blockchain://<genesis>/block/<latest block>` at lookup time
    pub block_uri: String,
}

/// Verified-source lookup service (etherscan)
pub trait SourceVerifier {
    fn lookup(&self, address: &str, chain_id: u64) -> Result<VerifiedContract>;
}

/// JSON-Schema validation of a parsed manifest
pub trait SchemaValidator {
    fn validate(&self, manifest: &Value) -> std::result::Result<(), Vec<ValidationError>>;
}

/// Stand-in for collaborators the caller did not wire up
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl RegistryClient for Unconfigured {
    fn get_release(&self, address: &str, chain_id: u64, _: &str, _: &str) -> Result<String> {
        Err(PackageError::Configuration(format!(
            "no registry client configured for registry {} on chain {}",
            address, chain_id
        )))
    }

    fn get_all_versions(&self, address: &str, chain_id: u64, _: &str) -> Result<Vec<Release>> {
        Err(PackageError::Configuration(format!(
            "no registry client configured for registry {} on chain {}",
            address, chain_id
        )))
    }
}

impl SourceVerifier for Unconfigured {
    fn lookup(&self, address: &str, chain_id: u64) -> Result<VerifiedContract> {
        Err(PackageError::Configuration(format!(
            "no verified-source service configured (contract {} on chain {})",
            address, chain_id
        )))
    }
}

impl BlobHost for Unconfigured {
    fn fetch(&self, uri: &PackageUri) -> Result<Vec<u8>> {
        Err(PackageError::Configuration(format!(
            "no blob host configured for {}",
            uri
        )))
    }
}
