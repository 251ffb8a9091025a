//! Download and extraction steps that run before the manifest is built.
//!
//! | Service | Trait | Produces |
//! |---------|-------|----------|
//! | [`CvelistDownloader`] | [`Downloader`] | per-record JSON under `<raw_dir>/cves/` |
//! | [`ParquetExtractor`] | [`Extractor`] | parquet tables plus [`Stats`] |
//!
//! Both take the run's [`Config`](crate::Config) by value at construction and
//! never mutate it.

mod download;
mod extract;

pub use download::{record_target, CvelistDownloader};
pub use extract::{count_rows, ParquetExtractor, CVES_FILE};

use crate::manifest::Stats;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Fetches raw CVE records into the working area.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the human-readable name of this downloader.
    fn name(&self) -> &'static str;

    /// Fetches the raw archive and returns its path.
    async fn download(&self) -> Result<PathBuf>;

    /// Unpacks the archive into a per-record layout and returns the number
    /// of records written.
    fn extract(&self) -> Result<usize>;
}

/// Output of an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub stats: Stats,
    /// Data files written, in write order.
    pub files: Vec<PathBuf>,
}

impl ExtractResult {
    /// Number of CVE records extracted, zero if unreported.
    pub fn cves(&self) -> u64 {
        self.stats
            .get("cves")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }
}

/// Normalizes raw records into columnar data files.
pub trait Extractor {
    fn extract_all(&self, output_dir: &Path) -> Result<ExtractResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_result_cves() {
        let mut result = ExtractResult::default();
        assert_eq!(result.cves(), 0);

        result.stats.insert("cves".to_string(), json!(12345));
        assert_eq!(result.cves(), 12345);
    }
}
