//! Exclusive advisory lock held for the duration of a bundle build.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::layout::BundleLayout;

/// RAII guard: unlocks on drop. The lock file itself is left in place.
#[derive(Debug)]
pub struct BundleLock {
    file: File,
    path: PathBuf,
}

impl BundleLock {
    /// Take the bundle lock, failing immediately if another build holds it.
    pub fn acquire(layout: &BundleLayout) -> Result<Self> {
        let path = layout.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating lock directory '{}'", parent.display()))?;
        }

        // Never unlink the lock file: a second process could then lock a new
        // inode at the same path while the first still holds the old one.
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening lock file '{}'", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            bail!(
                "another bundle build holds the lock '{}'; wait for it to finish",
                path.display()
            );
        }

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BundleLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_fails_until_release() {
        let tmp = TempDir::new().unwrap();
        let layout = BundleLayout::new(tmp.path());

        let held = BundleLock::acquire(&layout).unwrap();
        assert!(held.path().is_file());
        assert!(BundleLock::acquire(&layout).is_err());

        drop(held);
        assert!(BundleLock::acquire(&layout).is_ok());
    }
}
