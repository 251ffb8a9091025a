use crate::cache::Cache;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::RangeInclusive;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Downloads the cvelistV5 repository archive and unpacks the records for
/// the configured years.
pub struct CvelistDownloader {
    config: Config,
    client: reqwest::Client,
    show_progress: bool,
}

impl CvelistDownloader {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while downloading.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = match total {
            Some(len) => {
                let pb = ProgressBar::new(len);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {bytes} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb
            }
        };
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Downloading cvelistV5...");
        pb
    }
}

#[async_trait]
impl super::Downloader for CvelistDownloader {
    fn name(&self) -> &'static str {
        "cvelistV5"
    }

    async fn download(&self) -> Result<PathBuf> {
        let cache = Cache::from_config(&self.config);
        cache.ensure_dir()?;

        let archive = self.config.archive_path();
        if cache.is_fresh(&archive) {
            info!(path = %archive.display(), "Reusing downloaded archive");
            return Ok(archive);
        }

        info!(url = %self.config.archive_url, "Downloading CVE archive");
        let mut response = self
            .client
            .get(&self.config.archive_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.config.archive_url))?
            .error_for_status()
            .with_context(|| format!("Failed to fetch {}", self.config.archive_url))?;

        let pb = self.progress_bar(response.content_length());

        // Write next to the target and rename, so an interrupted download
        // never looks like a fresh archive.
        let partial = archive.with_extension("zip.part");
        let mut file = File::create(&partial)
            .with_context(|| format!("Failed to create {}", partial.display()))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .with_context(|| format!("Failed to write {}", partial.display()))?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        file.sync_all()?;
        drop(file);

        fs::rename(&partial, &archive)
            .with_context(|| format!("Failed to move archive to {}", archive.display()))?;

        pb.finish_with_message("Download complete");
        info!(bytes = written, path = %archive.display(), "Archive downloaded");

        Ok(archive)
    }

    fn extract(&self) -> Result<usize> {
        let archive_path = self.config.archive_path();
        let file = File::open(&archive_path).with_context(|| {
            format!(
                "Archive not found at {}. Download it first.",
                archive_path.display()
            )
        })?;
        let mut archive = zip::ZipArchive::new(file)
            .with_context(|| format!("Failed to open zip archive {}", archive_path.display()))?;

        // Records from a previous, wider horizon must not leak into this run.
        let records_dir = self.config.records_dir();
        if records_dir.exists() {
            fs::remove_dir_all(&records_dir)
                .with_context(|| format!("Failed to clear {}", records_dir.display()))?;
        }

        let years = self.config.current_year_range();
        let mut count = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }

            let Some(name) = entry.enclosed_name() else {
                warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
                continue;
            };
            let Some(relative) = record_target(&name, &years) else {
                continue;
            };

            let dest = records_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)
                .with_context(|| format!("Failed to create {}", dest.display()))?;
            io::copy(&mut entry, &mut out)
                .with_context(|| format!("Failed to unpack {}", dest.display()))?;

            count += 1;
        }

        debug!(records = count, dir = %records_dir.display(), "Unpacked CVE records");
        Ok(count)
    }
}

/// Maps an archive entry such as
/// `cvelistV5-main/cves/2024/0xxx/CVE-2024-0001.json` to its location below
/// the records directory (`2024/0xxx/CVE-2024-0001.json`).
///
/// Returns `None` for entries that are not CVE records or fall outside
/// `years`.
pub fn record_target(entry: &Path, years: &RangeInclusive<i32>) -> Option<PathBuf> {
    let parts: Vec<&str> = entry
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let cves_idx = parts.iter().position(|p| *p == "cves")?;
    let rest = &parts[cves_idx + 1..];
    let (year, file_name) = (rest.first()?, rest.last()?);

    if rest.len() < 2 || !file_name.starts_with("CVE-") || !file_name.ends_with(".json") {
        return None;
    }
    if !years.contains(&year.parse::<i32>().ok()?) {
        return None;
    }

    Some(rest.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Downloader;
    use chrono::Datelike;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_record_target_in_range() {
        let target = record_target(
            Path::new("cvelistV5-main/cves/2024/0xxx/CVE-2024-0001.json"),
            &(2020..=2026),
        );
        assert_eq!(target, Some(PathBuf::from("2024/0xxx/CVE-2024-0001.json")));
    }

    #[test]
    fn test_record_target_out_of_range() {
        let target = record_target(
            Path::new("cvelistV5-main/cves/1999/0xxx/CVE-1999-0001.json"),
            &(2020..=2026),
        );
        assert_eq!(target, None);
    }

    #[test]
    fn test_record_target_ignores_non_records() {
        let years = 2020..=2026;
        for entry in [
            "cvelistV5-main/README.md",
            "cvelistV5-main/cves/delta.json",
            "cvelistV5-main/cves/deltaLog.json",
            "cvelistV5-main/cves/2024/0xxx/notes.txt",
            "cvelistV5-main/.github/workflows/CVE-2024-0001.json",
        ] {
            assert_eq!(record_target(Path::new(entry), &years), None, "{}", entry);
        }
    }

    #[test]
    fn test_extract_unpacks_records_in_horizon() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_raw_dir(dir.path()).with_years(2);
        let year = chrono::Utc::now().year();

        let recent = format!("cvelistV5-main/cves/{}/0xxx/CVE-{}-0001.json", year, year);
        let last_year = format!(
            "cvelistV5-main/cves/{}/1xxx/CVE-{}-1001.json",
            year - 1,
            year - 1
        );
        let old = "cvelistV5-main/cves/2001/0xxx/CVE-2001-0001.json".to_string();
        write_archive(
            &config.archive_path(),
            &[
                ("cvelistV5-main/README.md", "readme"),
                (recent.as_str(), "{}"),
                (last_year.as_str(), "{}"),
                (old.as_str(), "{}"),
            ],
        );

        // Stale record from an earlier run
        let stale = config.records_dir().join("2001").join("CVE-2001-0002.json");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "{}").unwrap();

        let downloader = CvelistDownloader::new(config.clone());
        assert_eq!(downloader.extract().unwrap(), 2);

        let expected = config
            .records_dir()
            .join(year.to_string())
            .join("0xxx")
            .join(format!("CVE-{}-0001.json", year));
        assert!(expected.exists());
        assert!(!stale.exists());
    }

    #[test]
    fn test_extract_without_archive_fails() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_raw_dir(dir.path());

        let err = CvelistDownloader::new(config).extract().unwrap_err();
        assert!(err.to_string().contains("Archive not found"));
    }

    #[tokio::test]
    async fn test_download_reuses_fresh_archive() {
        let dir = tempdir().unwrap();
        let mut config = Config::default().with_raw_dir(dir.path());
        // Unroutable, so any network attempt would fail the test
        config.archive_url = "http://127.0.0.1:9/cvelistV5.zip".to_string();
        fs::write(config.archive_path(), b"zip").unwrap();

        let downloader = CvelistDownloader::new(config.clone());
        assert_eq!(downloader.download().await.unwrap(), config.archive_path());
        assert_eq!(downloader.name(), "cvelistV5");
    }
}
