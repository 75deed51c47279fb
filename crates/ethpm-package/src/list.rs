//! Installed-package listing

use crate::context::StoreDir;
use crate::lockfile::Lockfile;
use crate::manifest::Manifest;
use crate::scratch::is_scratch_name;
use crate::{PackageError, Result, LOCKFILE_NAME, MANIFEST_FILE, PACKAGES_DIR};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// One installed package and its installed build dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackageTree {
    pub depth: usize,
    pub alias: String,
    pub package_name: String,
    pub version: String,
    pub resolved_uri: String,
    pub children: Vec<InstalledPackageTree>,
}

impl InstalledPackageTree {
    /// `- ` per level, name, alias when it differs, version and resolved URI,
    /// followed by one line per dependency
    pub fn format_for_display(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        let _ = write!(out, "{}{}", "- ".repeat(self.depth), self.package_name);
        if self.alias != self.package_name {
            let _ = write!(out, " (alias: {})", self.alias);
        }
        let _ = write!(out, "=={} --- ({})", self.version, self.resolved_uri);
        for child in &self.children {
            out.push('\n');
            child.render(out);
        }
    }
}

/// Every package installed in `store`, sorted by alias
pub fn list_installed(store: &StoreDir) -> Result<Vec<InstalledPackageTree>> {
    read_level(store.path(), 0)
}

fn read_level(level: &Path, depth: usize) -> Result<Vec<InstalledPackageTree>> {
    let lockfile = Lockfile::load(&level.join(LOCKFILE_NAME))?;

    let mut aliases = Vec::new();
    for entry in fs::read_dir(level).map_err(|e| PackageError::io(level, e))? {
        let entry = entry.map_err(|e| PackageError::io(level, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && !is_scratch_name(&name) {
            aliases.push(name);
        }
    }
    aliases.sort();

    aliases
        .into_iter()
        .map(|alias| read_package(level, alias, &lockfile, depth))
        .collect()
}

fn read_package(
    level: &Path,
    alias: String,
    lockfile: &Lockfile,
    depth: usize,
) -> Result<InstalledPackageTree> {
    let package_dir = level.join(&alias);
    let manifest_path = package_dir.join(MANIFEST_FILE);
    let raw = fs::read(&manifest_path).map_err(|e| PackageError::io(&manifest_path, e))?;
    let manifest: Manifest = serde_json::from_slice(&raw)?;

    let resolved_uri = lockfile
        .get(&alias)
        .map(|entry| entry.resolved_uri.clone())
        .ok_or_else(|| {
            PackageError::AliasResolution(format!(
                "{} is installed under {} but has no lock-file entry.",
                alias,
                level.display()
            ))
        })?;

    let deps_dir = package_dir.join(PACKAGES_DIR);
    let children = if deps_dir.is_dir() {
        read_level(&deps_dir, depth + 1)?
    } else {
        Vec::new()
    };

    Ok(InstalledPackageTree {
        depth,
        alias,
        package_name: manifest.package_name,
        version: manifest.version,
        resolved_uri,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_display() {
        let tree = InstalledPackageTree {
            depth: 0,
            alias: "my-wallet".to_string(),
            package_name: "wallet".to_string(),
            version: "1.0.0".to_string(),
            resolved_uri: "ipfs://QmRMSm4k37mr2T3A2MGxAj2eAHGR5veibVt1t9Leh5waV1".to_string(),
            children: vec![InstalledPackageTree {
                depth: 1,
                alias: "owned".to_string(),
                package_name: "owned".to_string(),
                version: "1.0.0".to_string(),
                resolved_uri: "ipfs://QmbeVyFLSuEUxiXKwSsEjef6icpdTdA4kGG9BcrJXKNKUW".to_string(),
                children: Vec::new(),
            }],
        };

        assert_eq!(
            tree.format_for_display(),
            "wallet (alias: my-wallet)==1.0.0 --- (ipfs://QmRMSm4k37mr2T3A2MGxAj2eAHGR5veibVt1t9Leh5waV1)\n\
             - owned==1.0.0 --- (ipfs://QmbeVyFLSuEUxiXKwSsEjef6icpdTdA4kGG9BcrJXKNKUW)"
        );
    }

    #[test]
    fn test_empty_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = StoreDir::create_in(temp.path()).unwrap();
        assert!(list_installed(&store).unwrap().is_empty());
    }
}
