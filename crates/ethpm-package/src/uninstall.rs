//! Uninstall engine

use crate::context::StoreDir;
use crate::lockfile::{self, Lockfile};
use crate::scratch::StoreTransaction;
use crate::{PackageError, Result, LOCKFILE_NAME};
use std::fs;
use std::path::{Component, Path};
use tracing::info;

/// Remove the package installed under `alias` from the store
///
/// The package directory and its lock-file entry disappear together: both
/// are removed from a scratch copy of the store, which then replaces it.
pub fn uninstall_package(alias: &str, store: &StoreDir) -> Result<()> {
    check_installed(alias, store)?;

    let tx = StoreTransaction::begin(store)?;
    remove_from(alias, &tx.store_path())?;
    tx.commit()?;

    info!(alias = %alias, store = %store.path().display(), "uninstalled package");
    Ok(())
}

/// Fail unless a package directory named `alias` exists
///
/// When `alias` is really a package name installed under other aliases, the
/// error lists them.
pub(crate) fn check_installed(alias: &str, store: &StoreDir) -> Result<()> {
    if is_plain_alias(alias) && store.package_path(alias).is_dir() {
        return Ok(());
    }

    let lockfile = Lockfile::load(&store.lockfile_path())?;
    let aliases = lockfile.aliases_for_package(alias);
    if aliases.is_empty() {
        Err(PackageError::AliasResolution(format!(
            "No package with the name {} found installed under {}.",
            alias,
            store.path().display()
        )))
    } else {
        Err(PackageError::AliasResolution(format!(
            "Found {} installed under the alias(es): {}. To uninstall an aliased package, \
             use the alias as the uninstall argument.",
            alias,
            aliases.join(", ")
        )))
    }
}

/// A single visible path component
fn is_plain_alias(alias: &str) -> bool {
    let mut components = Path::new(alias).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !alias.starts_with('.')
}

/// Delete `alias` and its lock entry inside a store-shaped directory
pub(crate) fn remove_from(alias: &str, store_path: &Path) -> Result<()> {
    let package_dir = store_path.join(alias);
    fs::remove_dir_all(&package_dir).map_err(|e| PackageError::io(&package_dir, e))?;
    lockfile::remove(&store_path.join(LOCKFILE_NAME), alias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::LockEntry;
    use tempfile::TempDir;

    fn store_with(alias: &str, package_name: &str) -> (TempDir, StoreDir) {
        let temp = TempDir::new().unwrap();
        let store = StoreDir::create_in(temp.path()).unwrap();
        fs::create_dir_all(store.package_path(alias)).unwrap();
        fs::write(store.package_path(alias).join("manifest.json"), "{}").unwrap();
        lockfile::upsert(
            &store.lockfile_path(),
            alias,
            LockEntry {
                alias: alias.to_string(),
                install_uri: "ipfs://QmbeVyFLSuEUxiXKwSsEjef6icpdTdA4kGG9BcrJXKNKUW".to_string(),
                registry_address: None,
                resolved_content_hash: "QmbeVyFLSuEUxiXKwSsEjef6icpdTdA4kGG9BcrJXKNKUW".to_string(),
                resolved_package_name: package_name.to_string(),
                resolved_uri: "ipfs://QmbeVyFLSuEUxiXKwSsEjef6icpdTdA4kGG9BcrJXKNKUW".to_string(),
                resolved_version: "1.0.0".to_string(),
            },
        )
        .unwrap();
        (temp, store)
    }

    #[test]
    fn test_uninstall_removes_dir_and_entry() {
        let (_temp, store) = store_with("owned", "owned");
        uninstall_package("owned", &store).unwrap();

        assert!(!store.package_path("owned").exists());
        assert!(Lockfile::load(&store.lockfile_path()).unwrap().is_empty());
    }

    #[test]
    fn test_uninstall_by_package_name_names_aliases() {
        let (_temp, store) = store_with("my-owned", "owned");
        let err = uninstall_package("owned", &store).unwrap_err();

        assert!(matches!(err, PackageError::AliasResolution(_)));
        let message = err.to_string();
        assert!(message.contains("my-owned"));
        assert!(message.contains("use the alias as the uninstall argument"));
        assert!(store.package_path("my-owned").exists());
    }

    #[test]
    fn test_uninstall_unknown_names_store() {
        let (_temp, store) = store_with("owned", "owned");
        let err = uninstall_package("wallet", &store).unwrap_err();
        assert!(err
            .to_string()
            .contains(&format!("found installed under {}", store.path().display())));
    }

    #[test]
    fn test_uninstall_rejects_paths() {
        let (_temp, store) = store_with("owned", "owned");
        assert!(uninstall_package("", &store).is_err());
        assert!(uninstall_package("..", &store).is_err());
        assert!(uninstall_package("owned/../owned", &store).is_err());
        assert!(store.path().exists());
    }
}
