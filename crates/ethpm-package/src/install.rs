//! Installation engine
//!
//! `Requested -> Staging -> Staged -> Promoted`, or `Failed` with no visible
//! effect on the store. The package tree and a scratch-local lock-file are
//! built in a private directory first; only promotion touches the store.

use crate::context::{Backends, Context, StoreDir};
use crate::package::Package;
use crate::writer::write_package_tree;
use crate::{lockfile, PackageError, Result, LOCKFILE_NAME, PACKAGES_DIR};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const PROMOTE_PREFIX: &str = ".ethpm-promote-";

/// Installation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Requested,
    Staging,
    Staged,
    Promoted,
    Failed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallState::Requested => "requested",
            InstallState::Staging => "staging",
            InstallState::Staged => "staged",
            InstallState::Promoted => "promoted",
            InstallState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Install `package` into the context's store under `package.alias`
pub fn install_package(package: &Package, context: &Context) -> Result<()> {
    install_into(package, &context.store, &context.backends)
}

/// Install into an explicit store; shared with the update engine
pub(crate) fn install_into(package: &Package, store: &StoreDir, backends: &Backends) -> Result<()> {
    let mut state = InstallState::Requested;
    let result = run(package, store, backends, &mut state);
    if let Err(e) = &result {
        warn!(alias = %package.alias, from = %state, error = %e, "install failed");
        state = InstallState::Failed;
    }
    debug!(alias = %package.alias, state = %state, "install finished");
    result
}

fn transition(alias: &str, state: &mut InstallState, next: InstallState) {
    debug!(alias = %alias, from = %*state, to = %next, "install state");
    *state = next;
}

fn run(
    package: &Package,
    store: &StoreDir,
    backends: &Backends,
    state: &mut InstallState,
) -> Result<()> {
    let alias = package.alias.as_str();
    let destination = store.package_path(alias);
    if destination.exists() {
        return Err(PackageError::InstallConflict {
            alias: alias.to_string(),
            package_name: package.package_name().to_string(),
            path: store.path().to_path_buf(),
        });
    }

    transition(alias, state, InstallState::Staging);
    let scratch = tempfile::Builder::new()
        .prefix(".ethpm-install-")
        .tempdir()
        .map_err(|e| PackageError::io(std::env::temp_dir(), e))?;
    let staged_store = scratch.path().join(PACKAGES_DIR);
    let staged_package = staged_store.join(alias);
    write_package_tree(package, &staged_package, backends)?;
    lockfile::upsert(&staged_store.join(LOCKFILE_NAME), alias, package.lock_entry())?;

    transition(alias, state, InstallState::Staged);
    promote(&staged_package, store, alias)?;
    lockfile::upsert(&store.lockfile_path(), alias, package.lock_entry())?;

    transition(alias, state, InstallState::Promoted);
    info!(
        alias = %alias,
        package = %package.package_name(),
        version = %package.version(),
        store = %store.path().display(),
        "installed package"
    );
    Ok(())
}

/// Copy the staged tree into a hidden sibling inside the store, then rename
/// it into place
fn promote(staged_package: &Path, store: &StoreDir, alias: &str) -> Result<()> {
    let holding = tempfile::Builder::new()
        .prefix(PROMOTE_PREFIX)
        .tempdir_in(store.path())
        .map_err(|e| PackageError::io(store.path(), e))?;
    let copied = holding.path().join(alias);
    crate::scratch::copy_dir_all(staged_package, &copied)?;

    let destination = store.package_path(alias);
    fs::rename(&copied, &destination).map_err(|e| PackageError::io(&destination, e))?;
    Ok(())
}
