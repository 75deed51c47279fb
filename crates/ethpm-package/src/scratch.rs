//! Scratch workspaces for whole-store mutations
//!
//! A [`StoreTransaction`] copies the store next to itself, lets the caller
//! mutate the copy, and on commit swaps the copy in with two renames.
//! Dropping an uncommitted transaction discards the copy.

use crate::context::StoreDir;
use crate::{PackageError, Result, PACKAGES_DIR};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error};
use walkdir::WalkDir;

const SCRATCH_PREFIX: &str = ".ethpm-scratch-";
const BACKUP_DIR: &str = ".previous";

/// A private copy of the store awaiting commit or discard
pub struct StoreTransaction {
    store: PathBuf,
    scratch: TempDir,
}

impl StoreTransaction {
    /// Copy the whole store into a scratch directory on the same filesystem
    pub fn begin(store: &StoreDir) -> Result<Self> {
        let parent = store.path().parent().ok_or_else(|| {
            PackageError::Configuration(format!("{} has no parent", store.path().display()))
        })?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| PackageError::io(parent, e))?;

        copy_dir_all(store.path(), &scratch.path().join(PACKAGES_DIR))?;
        debug!(store = %store.path().display(), scratch = %scratch.path().display(), "began store transaction");

        Ok(Self {
            store: store.path().to_path_buf(),
            scratch,
        })
    }

    /// The scratch copy, laid out exactly like the store
    pub fn store_path(&self) -> PathBuf {
        self.scratch.path().join(PACKAGES_DIR)
    }

    /// Replace the real store with the scratch copy
    pub fn commit(self) -> Result<()> {
        let copy = self.store_path();
        let backup = self.scratch.path().join(BACKUP_DIR);

        fs::rename(&self.store, &backup).map_err(|e| PackageError::io(&self.store, e))?;
        if let Err(e) = fs::rename(&copy, &self.store) {
            return Err(roll_back(self.scratch, &self.store, e));
        }
        debug!(store = %self.store.display(), "committed store transaction");
        Ok(())
    }
}

/// Move the backed-up store in `scratch` back to `store` after a failed swap
///
/// If that move fails too, the scratch directory is kept on disk so the
/// backup survives, and the error names where it is.
fn roll_back(scratch: TempDir, store: &Path, cause: io::Error) -> PackageError {
    let backup = scratch.path().join(BACKUP_DIR);
    match fs::rename(&backup, store) {
        Ok(()) => PackageError::io(store, cause),
        Err(restore) => {
            let backup = scratch.keep().join(BACKUP_DIR);
            error!(
                store = %store.display(),
                backup = %backup.display(),
                "could not restore the store after a failed commit"
            );
            PackageError::io(
                &backup,
                io::Error::other(format!(
                    "replacing {} failed ({}) and restoring it failed ({}); the original \
                     store is preserved at {}",
                    store.display(),
                    cause,
                    restore,
                    backup.display()
                )),
            )
        }
    }
}

/// Recursively copy `src` to `dst`, creating `dst`
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            PackageError::io(path, std::io::Error::other(e.to_string()))
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| PackageError::io(entry.path(), std::io::Error::other(e.to_string())))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| PackageError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| PackageError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

/// Whether `name` is one of our scratch or staging entries
pub fn is_scratch_name(name: &str) -> bool {
    name.starts_with('.')
}
