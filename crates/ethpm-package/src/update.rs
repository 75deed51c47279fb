//! Update engine
//!
//! Swaps a registry-installed package for another published version. The
//! uninstall and the install both run against one scratch copy of the store,
//! which replaces the store only when both succeeded.

use crate::context::{Context, StoreDir};
use crate::install::install_into;
use crate::lockfile::Lockfile;
use crate::package::{InstallRequest, Package};
use crate::prompt::{choose_version, rejection, VersionPrompt};
use crate::scratch::StoreTransaction;
use crate::uninstall::{check_installed, remove_from};
use crate::uri::PackageUri;
use crate::{PackageError, Result};
use semver::Version;
use tracing::info;

const UPDATABLE_SCHEMES: &str = "erc1319/ethpm registry";

/// Update the package installed under `alias`
///
/// With `target_version` the prompt is skipped, but the version is checked
/// exactly like an interactive answer.
pub fn update_package(
    alias: &str,
    context: &Context,
    prompt: &mut dyn VersionPrompt,
    target_version: Option<&str>,
) -> Result<()> {
    check_installed(alias, &context.store)?;
    let lock_path = context.store.lockfile_path();
    let installed = Lockfile::load(&lock_path)?
        .get(alias)
        .cloned()
        .ok_or_else(|| {
            PackageError::AliasResolution(format!(
                "{} has no entry in {}.",
                alias,
                lock_path.display()
            ))
        })?;

    let install_uri = PackageUri::parse(&installed.install_uri)?;
    let PackageUri::Registry {
        address,
        chain_id,
        package_name,
        ..
    } = &install_uri
    else {
        return Err(PackageError::UriNotSupported {
            uri: installed.install_uri.clone(),
            supported: UPDATABLE_SCHEMES,
        });
    };

    let releases = context
        .backends
        .registry()
        .get_all_versions(address, *chain_id, package_name)?;
    let current = releases
        .iter()
        .find(|release| release.version == installed.resolved_version)
        .ok_or_else(|| {
            PackageError::AliasResolution(format!(
                "{}@{} not found on registry {}.",
                package_name, installed.resolved_version, address
            ))
        })?;
    if current.manifest_uri != installed.resolved_uri {
        return Err(PackageError::Integrity {
            uri: installed.install_uri.clone(),
            expected: installed.resolved_uri.clone(),
            actual: current.manifest_uri.clone(),
        });
    }

    let versions = sorted_versions(releases.iter().map(|r| r.version.clone()).collect());
    info!(
        registry = %address,
        "{} versions of {} found: {}",
        versions.len(),
        package_name,
        versions.join(", ")
    );

    let target = match target_version {
        Some(version) => match rejection(version, &installed.resolved_version, &versions) {
            Some(reason) => return Err(PackageError::AliasResolution(reason)),
            None => version.to_string(),
        },
        None => choose_version(prompt, &installed.resolved_version, &versions)?,
    };

    let updated_uri = install_uri
        .with_version(&target)
        .ok_or_else(|| PackageError::uri_not_supported(installed.install_uri.clone()))?;
    let request = InstallRequest::new(updated_uri.to_string()).with_alias(alias);
    let package = Package::resolve(&request, &context.backends)?;

    let tx = StoreTransaction::begin(&context.store)?;
    let scratch_store = StoreDir::open(tx.store_path())?;
    remove_from(alias, scratch_store.path())?;
    install_into(&package, &scratch_store, &context.backends)?;
    tx.commit()?;

    info!(alias = %alias, "{} successfully updated to version {}.", alias, target);
    Ok(())
}

/// Semantic versions in order, anything unparseable first by text
fn sorted_versions(mut versions: Vec<String>) -> Vec<String> {
    versions.sort_by_key(|v| (Version::parse(v).ok(), v.clone()));
    versions
}
