//! Package lockfile (ethpm.lock)
//!
//! One JSON object per store level mapping alias to install provenance.
//! Writes always go through a temp file in the same directory followed by a
//! rename, so readers see either the old or the new file.

use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Locked package entry
///
/// Fields are declared in alphabetical order so serialization comes out with
/// sorted keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockEntry {
    pub alias: String,
    pub install_uri: String,
    pub registry_address: Option<String>,
    pub resolved_content_hash: String,
    pub resolved_package_name: String,
    pub resolved_uri: String,
    pub resolved_version: String,
}

/// Lockfile structure (ethpm.lock)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Lockfile {
    entries: BTreeMap<String, LockEntry>,
}

impl Lockfile {
    /// Create new empty lockfile
    pub fn new() -> Self {
        Self::default()
    }

    /// Load lockfile from file; a missing file is an empty lockfile
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(PackageError::io(path, e)),
        }
    }

    /// Parse lockfile from JSON
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Sorted keys, 4-space indent, trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| {
            PackageError::ManifestValidation(format!("lockfile is not UTF-8: {}", e))
        })
    }

    /// Atomically write lockfile to `path`
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_json_string()?;
        let parent = path
            .parent()
            .ok_or_else(|| PackageError::Configuration(format!("{} has no parent", path.display())))?;

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| PackageError::io(parent, e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| PackageError::io(temp.path(), e))?;
        temp.persist(path)
            .map_err(|e| PackageError::io(path, e.error))?;
        debug!(path = %path.display(), entries = self.entries.len(), "wrote lockfile");
        Ok(())
    }

    pub fn get(&self, alias: &str) -> Option<&LockEntry> {
        self.entries.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Add or replace the entry for `alias`
    pub fn insert(&mut self, alias: impl Into<String>, entry: LockEntry) {
        self.entries.insert(alias.into(), entry);
    }

    pub fn remove(&mut self, alias: &str) -> Option<LockEntry> {
        self.entries.remove(alias)
    }

    /// Aliases whose entry resolved to `package_name`, sorted
    pub fn aliases_for_package(&self, package_name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.resolved_package_name == package_name)
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LockEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read `lock_path`, set `alias` to `entry`, write it back atomically
pub fn upsert(lock_path: &Path, alias: &str, entry: LockEntry) -> Result<()> {
    let mut lockfile = Lockfile::load(lock_path)?;
    lockfile.insert(alias, entry);
    lockfile.write_to_file(lock_path)
}

/// Read `lock_path`, drop `alias`, write it back atomically
///
/// A level without dependents carries no lock-file, so removing the last
/// entry deletes the file.
pub fn remove(lock_path: &Path, alias: &str) -> Result<()> {
    let mut lockfile = Lockfile::load(lock_path)?;
    lockfile.remove(alias);
    if lockfile.is_empty() {
        return match std::fs::remove_file(lock_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(PackageError::io(lock_path, e)),
            _ => Ok(()),
        };
    }
    lockfile.write_to_file(lock_path)
}
