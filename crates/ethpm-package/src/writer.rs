//! Package tree writer
//!
//! Materializes a [`Package`] into a directory: the manifest bytes, every
//! source, the documentation and, recursively, each build dependency under
//! its own `ethpm_packages` level with its own lock-file. The target is
//! always a scratch location; callers promote or discard it.

use crate::context::Backends;
use crate::fetch::{fetch_package_uri, fetch_verified};
use crate::lockfile;
use crate::package::{InstallRequest, Package};
use crate::uri::PackageUri;
use crate::{
    PackageError, Result, DOCUMENTATION_FILE, LOCKFILE_NAME, MANIFEST_FILE, PACKAGES_DIR,
    SOURCES_DIR,
};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Write `package` into `package_dir`, creating it
pub fn write_package_tree(package: &Package, package_dir: &Path, backends: &Backends) -> Result<()> {
    let mut resolution_path = vec![package.manifest_uri.clone()];
    write_tree(package, package_dir, backends, &mut resolution_path)
}

fn write_tree(
    package: &Package,
    package_dir: &Path,
    backends: &Backends,
    resolution_path: &mut Vec<String>,
) -> Result<()> {
    debug!(alias = %package.alias, dir = %package_dir.display(), "writing package tree");
    create_dir(package_dir)?;
    write_file(&package_dir.join(MANIFEST_FILE), &package.raw_manifest)?;
    write_sources(package, &package_dir.join(SOURCES_DIR), backends)?;
    write_docs(package, package_dir, backends)?;

    if package.manifest.build_dependencies.is_empty() {
        return Ok(());
    }

    let deps_dir = package_dir.join(PACKAGES_DIR);
    create_dir(&deps_dir)?;
    for (name, uri) in &package.manifest.build_dependencies {
        let request = InstallRequest::new(uri.clone()).with_alias(name.clone());
        let dependency = Package::resolve(&request, backends)?;

        if resolution_path.contains(&dependency.manifest_uri) {
            let mut cycle = resolution_path.clone();
            cycle.push(dependency.manifest_uri.clone());
            return Err(PackageError::ManifestValidation(format!(
                "Build dependency cycle detected: {}",
                cycle.join(" -> ")
            )));
        }

        resolution_path.push(dependency.manifest_uri.clone());
        write_tree(&dependency, &deps_dir.join(name), backends, resolution_path)?;
        resolution_path.pop();

        lockfile::upsert(&deps_dir.join(LOCKFILE_NAME), name, dependency.lock_entry())?;
    }
    Ok(())
}

fn write_sources(package: &Package, sources_dir: &Path, backends: &Backends) -> Result<()> {
    for (relative, value) in &package.manifest.sources {
        let target = sources_dir.join(source_path(relative)?);
        let contents = resolve_source(value, backends)?;
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        write_file(&target, contents.as_bytes())?;
    }
    Ok(())
}

/// Source text: fetched for content URIs, verbatim otherwise
fn resolve_source(value: &str, backends: &Backends) -> Result<String> {
    let bytes = match PackageUri::parse(value) {
        Ok(uri) if uri.is_fetchable() => fetch_package_uri(&uri, backends)?.raw_bytes,
        _ => return Ok(value.to_string()),
    };
    let text = String::from_utf8(bytes).map_err(|e| {
        PackageError::ManifestValidation(format!("source {} is not UTF-8: {}", value, e))
    })?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Relative path under `sources/`; anything escaping that root is rejected
fn source_path(relative: &str) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PackageError::ManifestValidation(format!(
                    "Source path '{}' escapes the sources directory",
                    relative
                )))
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(PackageError::ManifestValidation(format!(
            "Source path '{}' does not name a file",
            relative
        )));
    }
    Ok(clean)
}

fn write_docs(package: &Package, package_dir: &Path, backends: &Backends) -> Result<()> {
    let Some(link) = package.manifest.documentation_uri() else {
        return Ok(());
    };
    match PackageUri::parse(link) {
        Ok(PackageUri::ContentAddressed { cid }) => {
            let docs = fetch_verified(backends.content_store(), &cid)?;
            write_file(&package_dir.join(DOCUMENTATION_FILE), &docs)
        }
        _ => {
            debug!(link = %link, "documentation link is not content-addressed, skipping");
            Ok(())
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| PackageError::io(path, e))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| PackageError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBlobHost, MemoryContentStore};
    use crate::lockfile::Lockfile;
    use tempfile::TempDir;

    fn resolve(store: MemoryContentStore, uri: &str) -> (Backends, Package) {
        let backends = Backends::new(store);
        let package = Package::resolve(&InstallRequest::new(uri), &backends).unwrap();
        (backends, package)
    }

    #[test]
    fn test_source_path_guard() {
        assert_eq!(
            source_path("./contracts/Owned.sol").unwrap(),
            PathBuf::from("contracts/Owned.sol")
        );
        assert!(source_path("../Owned.sol").is_err());
        assert!(source_path("./contracts/../../Owned.sol").is_err());
        assert!(source_path("/etc/passwd").is_err());
        assert!(source_path("./").is_err());
    }

    #[test]
    fn test_writes_inline_and_fetched_sources() {
        let store = MemoryContentStore::new();
        let source_uri = store.add("contract Owned {}\n\n");
        let manifest = format!(
            r#"{{"manifest_version":"2","package_name":"owned","sources":{{"./Inline.sol":"contract Inline {{}}\n","./contracts/Owned.sol":"{}"}},"version":"1.0.0"}}"#,
            source_uri
        );
        let uri = store.add(manifest.clone());
        let (backends, package) = resolve(store, &uri);

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("owned");
        write_package_tree(&package, &dir, &backends).unwrap();

        assert_eq!(fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap(), manifest);
        assert_eq!(
            fs::read_to_string(dir.join("sources/contracts/Owned.sol")).unwrap(),
            "contract Owned {}"
        );
        assert_eq!(
            fs::read_to_string(dir.join("sources/Inline.sol")).unwrap(),
            "contract Inline {}\n"
        );
    }

    #[test]
    fn test_writes_documentation() {
        let store = MemoryContentStore::new();
        let docs_uri = store.add("# Owned\n");
        let uri = store.add(format!(
            r#"{{"manifest_version":"2","meta":{{"links":{{"documentation":"{}"}}}},"package_name":"owned","version":"1.0.0"}}"#,
            docs_uri
        ));
        let (backends, package) = resolve(store, &uri);

        let temp = TempDir::new().unwrap();
        write_package_tree(&package, temp.path(), &backends).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join(DOCUMENTATION_FILE)).unwrap(),
            "# Owned\n"
        );
    }

    #[test]
    fn test_nested_dependency_gets_own_lockfile() {
        let store = MemoryContentStore::new();
        let owned_uri =
            store.add(r#"{"manifest_version":"2","package_name":"owned","version":"1.0.0"}"#);
        let wallet_uri = store.add(format!(
            r#"{{"build_dependencies":{{"owned":"{}"}},"manifest_version":"2","package_name":"wallet","version":"1.0.0"}}"#,
            owned_uri
        ));
        let (backends, package) = resolve(store, &wallet_uri);

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("wallet");
        write_package_tree(&package, &dir, &backends).unwrap();

        assert!(dir.join("ethpm_packages/owned/manifest.json").exists());
        let nested = Lockfile::load(&dir.join("ethpm_packages/ethpm.lock")).unwrap();
        let entry = nested.get("owned").unwrap();
        assert_eq!(entry.resolved_uri, owned_uri);
        assert_eq!(entry.install_uri, owned_uri);
    }

    #[test]
    fn test_dependency_cycle_is_rejected() {
        let blob = "https://api.github.com/repos/ethpm/ethpm-spec/git/blobs/8f9dc767d4c8b31fec4a08d9c0858d4f37b83180";
        let mut host = MemoryBlobHost::new();
        host.insert(
            blob,
            format!(
                r#"{{"build_dependencies":{{"looping":"{}"}},"manifest_version":"2","package_name":"looping","version":"1.0.0"}}"#,
                blob
            ),
        );
        let backends = Backends::new(MemoryContentStore::new()).with_blob_host(host);
        let package = Package::resolve(&InstallRequest::new(blob), &backends).unwrap();

        let temp = TempDir::new().unwrap();
        let err = write_package_tree(&package, temp.path(), &backends).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
