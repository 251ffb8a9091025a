//! Working-area cache for downloaded CVE data.
//!
//! The downloader stores the cvelistV5 archive and the unpacked JSON
//! records under the configured raw directory. An archive younger than the
//! TTL is reused instead of downloaded again.
//!
//! # Example
//!
//! ```no_run
//! use cvec_db::{Cache, Config};
//!
//! let config = Config::load()?;
//! let cache = Cache::from_config(&config);
//!
//! if cache.is_fresh(&config.archive_path()) {
//!     println!("Reusing downloaded archive");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

use crate::config::Config;

/// Raw download artifacts with TTL-based reuse.
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.raw_dir,
            Duration::from_secs(config.archive_ttl_hours * 3600),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensures the cache directory exists.
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("Failed to create cache directory: {}", self.dir.display())
            })?;
        }
        Ok(())
    }

    /// Returns true if `path` exists and was modified within the TTL.
    pub fn is_fresh(&self, path: &Path) -> bool {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };

        match SystemTime::now().duration_since(modified) {
            Ok(elapsed) => elapsed < self.ttl,
            // Modified in the future (clock skew)
            Err(_) => true,
        }
    }

    /// Removes the downloaded archive and all unpacked records.
    pub fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            debug!(path = %path.display(), "Removing cached data");
            if path.is_dir() {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            } else {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_not_fresh() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path(), Duration::from_secs(3600));
        assert!(!cache.is_fresh(&dir.path().join("cvelistV5.zip")));
    }

    #[test]
    fn test_new_file_is_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cvelistV5.zip");
        fs::write(&path, b"zip").unwrap();

        let cache = Cache::new(dir.path(), Duration::from_secs(3600));
        assert!(cache.is_fresh(&path));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cvelistV5.zip");
        fs::write(&path, b"zip").unwrap();

        let cache = Cache::new(dir.path(), Duration::ZERO);
        assert!(!cache.is_fresh(&path));
    }

    #[test]
    fn test_clear_removes_files_and_dirs() {
        let dir = tempdir().unwrap();
        let records = dir.path().join("cves").join("2024");
        fs::create_dir_all(&records).unwrap();
        fs::write(records.join("CVE-2024-0001.json"), "{}").unwrap();
        fs::write(dir.path().join("cvelistV5.zip"), b"zip").unwrap();

        let cache = Cache::new(dir.path(), Duration::from_secs(3600));
        cache.clear().unwrap();

        assert!(dir.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_missing_dir_is_ok() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path().join("absent"), Duration::from_secs(1));
        assert!(cache.clear().is_ok());
    }
}
