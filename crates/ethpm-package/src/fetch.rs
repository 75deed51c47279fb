//! Manifest and content fetching with integrity checks

use crate::backend::ContentStore;
use crate::context::Backends;
use crate::uri::PackageUri;
use crate::{cid, PackageError, Result};
use tracing::debug;

/// Raw manifest bytes plus the content hash they were fetched under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub raw_bytes: Vec<u8>,
    pub content_hash: String,
}

/// Fetch the bytes behind a directly fetchable manifest URI
///
/// Registry and verified-source locators must be resolved to a fetchable
/// URI first and fail here with `UriNotSupported`.
pub fn resolve_manifest_uri(uri: &str, backends: &Backends) -> Result<ResolvedManifest> {
    let parsed = PackageUri::parse(uri)?;
    fetch_package_uri(&parsed, backends)
}

pub(crate) fn fetch_package_uri(uri: &PackageUri, backends: &Backends) -> Result<ResolvedManifest> {
    match uri {
        PackageUri::ContentAddressed { cid } => {
            let raw_bytes = fetch_verified(backends.content_store(), cid)?;
            Ok(ResolvedManifest {
                raw_bytes,
                content_hash: cid.clone(),
            })
        }
        PackageUri::HostedBlob { blob_sha, .. } => {
            debug!(uri = %uri, "fetching hosted blob");
            let raw_bytes = backends.blob_host().fetch(uri)?;
            Ok(ResolvedManifest {
                raw_bytes,
                content_hash: blob_sha.clone(),
            })
        }
        PackageUri::Registry { .. } | PackageUri::VerifiedSource { .. } => {
            Err(PackageError::uri_not_supported(uri.to_string()))
        }
    }
}

/// Fetch `cid` and check the bytes hash back to it
pub fn fetch_verified(store: &dyn ContentStore, cid: &str) -> Result<Vec<u8>> {
    debug!(cid = %cid, "fetching content");
    let bytes = store.fetch(cid)?;
    let actual = cid::content_hash(&bytes);
    if actual != cid {
        return Err(PackageError::Integrity {
            uri: format!("ipfs://{}", cid),
            expected: cid.to_string(),
            actual,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBlobHost, MemoryContentStore};

    const GITHUB_URI: &str =
        "https://api.github.com/repos/ethpm/py-ethpm/git/blobs/a7232a93f1e9e75d606f6c1da18aa16037e03480";

    #[test]
    fn test_fetch_content_addressed_manifest() {
        let store = MemoryContentStore::new();
        let uri = store.add(&b"{\"manifest_version\":\"2\"}"[..]);
        let backends = Backends::new(store);

        let resolved = resolve_manifest_uri(&uri, &backends).unwrap();
        assert_eq!(resolved.raw_bytes, b"{\"manifest_version\":\"2\"}");
        assert_eq!(format!("ipfs://{}", resolved.content_hash), uri);
    }

    #[test]
    fn test_tampered_content_is_integrity_error() {
        let store = MemoryContentStore::new();
        store.insert_raw("QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o", "hello world!\n");
        let backends = Backends::new(store);

        let err = resolve_manifest_uri(
            "ipfs://QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o",
            &backends,
        )
        .unwrap_err();
        assert!(matches!(err, PackageError::Integrity { .. }));
    }

    #[test]
    fn test_hosted_blob_trusts_sha() {
        let mut host = MemoryBlobHost::new();
        host.insert(GITHUB_URI, "anything");
        let backends = Backends::new(MemoryContentStore::new()).with_blob_host(host);

        let resolved = resolve_manifest_uri(GITHUB_URI, &backends).unwrap();
        assert_eq!(resolved.content_hash, "a7232a93f1e9e75d606f6c1da18aa16037e03480");
    }

    #[test]
    fn test_registry_uri_is_not_fetchable() {
        let backends = Backends::new(MemoryContentStore::new());
        let err = resolve_manifest_uri(
            "erc1319://0x6b5DA3cA4286Baa7fBaf64EEEE1834C7d430B729:1/owned@1.0.0",
            &backends,
        )
        .unwrap_err();
        assert!(matches!(err, PackageError::UriNotSupported { .. }));
    }
}
