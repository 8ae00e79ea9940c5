//! One run at a time per browser/audio-device pair.

use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::Path;
use tracing::debug;

pub struct RunLock {
    file: File,
}

impl RunLock {
    /// Take the lock or fail immediately if another run holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open run lock {}", path.display()))?;
        file.try_lock_exclusive()
            .map_err(|_| anyhow!("Another run is already in flight ({})", path.display()))?;
        debug!("Acquired run lock {:?}", path);
        Ok(Self { file })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            debug!("Failed to release run lock: {err:?}");
        }
    }
}
