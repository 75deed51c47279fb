//! Install-URI resolution
//!
//! Turns whatever the user asked to install into a directly fetchable
//! manifest URI. Registry locators are looked up on-chain; verified-source
//! locators get a synthesized manifest pinned to the content store.

use crate::backend::VerifiedContract;
use crate::context::Backends;
use crate::manifest;
use crate::package::InstallRequest;
use crate::uri::PackageUri;
use crate::validator::to_checksum_address;
use crate::{PackageError, Result};
use serde_json::json;
use tracing::{debug, info};

/// Fetchable manifest URI plus the registry it came from, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocator {
    pub manifest_uri: String,
    pub registry_address: Option<String>,
}

/// Resolve `request.install_uri` to a fetchable manifest URI
pub fn resolve_install_uri(request: &InstallRequest, backends: &Backends) -> Result<ResolvedLocator> {
    let uri = PackageUri::parse(&request.install_uri)?;

    match &uri {
        PackageUri::Registry {
            address,
            chain_id,
            package_name,
            version,
        } => {
            let manifest_uri =
                backends
                    .registry()
                    .get_release(address, *chain_id, package_name, version)?;
            debug!(install_uri = %uri, manifest_uri = %manifest_uri, "resolved registry release");
            Ok(ResolvedLocator {
                manifest_uri,
                registry_address: Some(address.clone()),
            })
        }
        PackageUri::VerifiedSource { address, chain_id } => {
            let (package_name, version) =
                match (&request.package_name, &request.package_version) {
                    (Some(name), Some(version)) => (name.as_str(), version.as_str()),
                    _ => {
                        return Err(PackageError::ManifestValidation(format!(
                            "Installing {} requires a package name and a package version",
                            uri
                        )))
                    }
                };
            let contract = backends.source_verifier().lookup(address, *chain_id)?;
            let raw = synthesize_manifest(&contract, address, package_name, version)?;
            let cid = backends.content_store().pin(raw.as_bytes())?;
            info!(install_uri = %uri, cid = %cid, "pinned verified-source manifest");
            Ok(ResolvedLocator {
                manifest_uri: format!("ipfs://{}", cid),
                registry_address: None,
            })
        }
        PackageUri::ContentAddressed { .. } | PackageUri::HostedBlob { .. } => {
            Ok(ResolvedLocator {
                manifest_uri: request.install_uri.trim().to_string(),
                registry_address: None,
            })
        }
    }
}

/// Build a compact, sorted-key manifest around one verified contract
pub fn synthesize_manifest(
    contract: &VerifiedContract,
    address: &str,
    package_name: &str,
    version: &str,
) -> Result<String> {
    let name = &contract.contract_name;
    let address = to_checksum_address(address).ok_or_else(|| {
        PackageError::ManifestValidation(format!("{} is not a valid address", address))
    })?;

    let document = json!({
        "manifest_version": "2",
        "package_name": package_name,
        "version": version,
        "sources": {
            (format!("./{}.sol", name)): contract.source_code,
        },
        "contract_types": {
            name.as_str(): {
                "abi": contract.abi,
                "compiler": contract.compiler,
                "runtime_bytecode": { "bytecode": contract.runtime_bytecode },
            },
        },
        "deployments": {
            contract.block_uri.as_str(): {
                name.as_str(): {
                    "address": address,
                    "contract_type": name,
                },
            },
        },
    });

    Ok(manifest::to_compact_json(document)?)
}
