//! Package URI classification
//!
//! Every locator the installer understands parses into one [`PackageUri`]
//! variant. Dispatch elsewhere is an exhaustive `match` on that variant.

use crate::{cid, PackageError, Result};
use std::fmt;

/// Literal list of supported schemes, quoted in `UriNotSupported` errors
pub const SUPPORTED_SCHEMES: &str =
    "ipfs, github blob (https://api.github.com), erc1319/ethpm registry, etherscan";

/// Chain ids with a verified-source lookup service
pub const VERIFIED_SOURCE_CHAIN_IDS: [u64; 5] = [1, 3, 4, 5, 42];

const GITHUB_BLOB_PREFIX: &str = "https://api.github.com/repos/";

/// A classified package locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageUri {
    /// `ipfs://<cid>`
    ContentAddressed { cid: String },
    /// `https://api.github.com/repos/<owner>/<repo>/git/blobs/<sha>`
    HostedBlob {
        owner: String,
        repo: String,
        blob_sha: String,
    },
    /// `erc1319://<address>:<chain_id>/<package_name>@<version>`
    Registry {
        address: String,
        chain_id: u64,
        package_name: String,
        version: String,
    },
    /// `etherscan://<address>:<chain_id>`
    VerifiedSource { address: String, chain_id: u64 },
}

impl PackageUri {
    /// Classify `uri`, failing with `UriNotSupported` for anything unrecognized
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let parsed = if let Some(rest) = strip_registry_scheme(uri) {
            parse_registry(rest)
        } else if let Some(rest) = uri.strip_prefix("etherscan://") {
            parse_verified_source(rest)
        } else if let Some(rest) = strip_ipfs_scheme(uri) {
            parse_ipfs(rest)
        } else if let Some(rest) = uri.strip_prefix(GITHUB_BLOB_PREFIX) {
            parse_github_blob(rest)
        } else {
            None
        };
        parsed.ok_or_else(|| PackageError::uri_not_supported(uri))
    }

    /// Whether the referenced bytes can be fetched directly
    pub fn is_fetchable(&self) -> bool {
        matches!(
            self,
            PackageUri::ContentAddressed { .. } | PackageUri::HostedBlob { .. }
        )
    }

    /// Whether the locator names a release on an on-chain registry
    pub fn is_registry(&self) -> bool {
        matches!(self, PackageUri::Registry { .. })
    }

    /// Same registry release, different version
    pub fn with_version(&self, new_version: &str) -> Option<Self> {
        match self {
            PackageUri::Registry {
                address,
                chain_id,
                package_name,
                ..
            } => Some(PackageUri::Registry {
                address: address.clone(),
                chain_id: *chain_id,
                package_name: package_name.clone(),
                version: new_version.to_string(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for PackageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageUri::ContentAddressed { cid } => write!(f, "ipfs://{}", cid),
            PackageUri::HostedBlob {
                owner,
                repo,
                blob_sha,
            } => write!(
                f,
                "{}{}/{}/git/blobs/{}",
                GITHUB_BLOB_PREFIX, owner, repo, blob_sha
            ),
            PackageUri::Registry {
                address,
                chain_id,
                package_name,
                version,
            } => write!(
                f,
                "erc1319://{}:{}/{}@{}",
                address, chain_id, package_name, version
            ),
            PackageUri::VerifiedSource { address, chain_id } => {
                write!(f, "etherscan://{}:{}", address, chain_id)
            }
        }
    }
}

/// Whether `value` is a `0x`-prefixed 20-byte hex string (any casing)
pub fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

fn strip_registry_scheme(uri: &str) -> Option<&str> {
    uri.strip_prefix("erc1319://")
        .or_else(|| uri.strip_prefix("ethpm://"))
}

fn strip_ipfs_scheme(uri: &str) -> Option<&str> {
    uri.strip_prefix("ipfs://")
        .or_else(|| uri.strip_prefix("ipfs:/"))
}

fn parse_address_and_chain(authority: &str) -> Option<(String, u64)> {
    let (address, chain) = authority.split_once(':')?;
    if !is_hex_address(address) {
        return None;
    }
    let chain_id = chain.parse::<u64>().ok()?;
    Some((address.to_string(), chain_id))
}

fn parse_registry(rest: &str) -> Option<PackageUri> {
    let (authority, release) = rest.split_once('/')?;
    let (address, chain_id) = parse_address_and_chain(authority)?;
    let (package_name, version) = release.trim_end_matches('/').split_once('@')?;
    if package_name.is_empty() || version.is_empty() || version.contains('/') {
        return None;
    }
    Some(PackageUri::Registry {
        address,
        chain_id,
        package_name: package_name.to_string(),
        version: version.to_string(),
    })
}

fn parse_verified_source(rest: &str) -> Option<PackageUri> {
    let (address, chain_id) = parse_address_and_chain(rest.trim_end_matches('/'))?;
    if !VERIFIED_SOURCE_CHAIN_IDS.contains(&chain_id) {
        return None;
    }
    Some(PackageUri::VerifiedSource { address, chain_id })
}

fn parse_ipfs(rest: &str) -> Option<PackageUri> {
    let cid = rest.trim_end_matches('/');
    if !cid::is_cid_v0(cid) {
        return None;
    }
    Some(PackageUri::ContentAddressed {
        cid: cid.to_string(),
    })
}

fn parse_github_blob(rest: &str) -> Option<PackageUri> {
    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        [owner, repo, "git", "blobs", sha]
            if !owner.is_empty()
                && !repo.is_empty()
                && sha.len() == 40
                && sha.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            Some(PackageUri::HostedBlob {
                owner: owner.to_string(),
                repo: repo.to_string(),
                blob_sha: sha.to_string(),
            })
        }
        _ => None,
    }
}
