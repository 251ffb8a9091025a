use super::{list_data_files, sha256_file, Manifest};
use crate::error::{ManifestError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of checking one file against the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Ok,
    Missing,
    SizeMismatch,
    HashMismatch,
    /// Data file present on disk but absent from the manifest.
    Untracked,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Ok => "ok",
            FileStatus::Missing => "missing",
            FileStatus::SizeMismatch => "size mismatch",
            FileStatus::HashMismatch => "hash mismatch",
            FileStatus::Untracked => "untracked",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub name: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub manifest: Manifest,
    pub checks: Vec<FileCheck>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status == FileStatus::Ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileCheck> {
        self.checks.iter().filter(|c| c.status != FileStatus::Ok)
    }
}

/// Re-hashes the data files in `dir` and compares them with the manifest
/// stored there.
///
/// Size is compared first; the file is only hashed when sizes agree.
pub fn verify_manifest(dir: &Path) -> Result<VerificationReport> {
    let manifest = Manifest::load(dir)?;
    let mut checks = Vec::with_capacity(manifest.files.len());

    for entry in &manifest.files {
        let path = dir.join(&entry.name);
        let actual_size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(file = %entry.name, "Catalogued file is missing");
                checks.push(FileCheck {
                    name: entry.name.clone(),
                    status: FileStatus::Missing,
                    expected_size: Some(entry.size),
                    actual_size: None,
                });
                continue;
            }
            Err(e) => return Err(ManifestError::io(&path, e)),
        };

        let status = if actual_size != entry.size {
            FileStatus::SizeMismatch
        } else if sha256_file(&path)? != entry.sha256.to_ascii_lowercase() {
            FileStatus::HashMismatch
        } else {
            FileStatus::Ok
        };

        debug!(file = %entry.name, status = %status, "Checked data file");

        checks.push(FileCheck {
            name: entry.name.clone(),
            status,
            expected_size: Some(entry.size),
            actual_size: Some(actual_size),
        });
    }

    let tracked: BTreeSet<&str> = manifest.files.iter().map(|f| f.name.as_str()).collect();
    for (name, path) in list_data_files(dir)? {
        if tracked.contains(name.as_str()) {
            continue;
        }

        let actual_size = fs::metadata(&path)
            .map_err(|e| ManifestError::io(&path, e))?
            .len();
        checks.push(FileCheck {
            name,
            status: FileStatus::Untracked,
            expected_size: None,
            actual_size: Some(actual_size),
        });
    }

    Ok(VerificationReport { manifest, checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{build_manifest, Stats};
    use tempfile::tempdir;

    fn built_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cves.parquet"), b"cve rows").unwrap();
        fs::write(dir.path().join("cwes.parquet"), b"cwe rows").unwrap();
        build_manifest(dir.path(), Stats::new()).unwrap();
        dir
    }

    fn status_of(report: &VerificationReport, name: &str) -> FileStatus {
        report
            .checks
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.status)
            .unwrap()
    }

    #[test]
    fn test_verify_fresh_manifest_passes() {
        let dir = built_dir();
        let report = verify_manifest(dir.path()).unwrap();

        assert!(report.passed());
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_verify_detects_modified_content() {
        let dir = built_dir();
        // Same length, different bytes
        fs::write(dir.path().join("cves.parquet"), b"CVE ROWS").unwrap();

        let report = verify_manifest(dir.path()).unwrap();
        assert!(!report.passed());
        assert_eq!(status_of(&report, "cves.parquet"), FileStatus::HashMismatch);
        assert_eq!(status_of(&report, "cwes.parquet"), FileStatus::Ok);
    }

    #[test]
    fn test_verify_detects_size_change() {
        let dir = built_dir();
        fs::write(dir.path().join("cwes.parquet"), b"more cwe rows").unwrap();

        let report = verify_manifest(dir.path()).unwrap();
        assert_eq!(status_of(&report, "cwes.parquet"), FileStatus::SizeMismatch);
    }

    #[test]
    fn test_verify_detects_missing_file() {
        let dir = built_dir();
        fs::remove_file(dir.path().join("cves.parquet")).unwrap();

        let report = verify_manifest(dir.path()).unwrap();
        assert!(!report.passed());
        assert_eq!(status_of(&report, "cves.parquet"), FileStatus::Missing);
    }

    #[test]
    fn test_verify_detects_untracked_file() {
        let dir = built_dir();
        fs::write(dir.path().join("extra.parquet"), b"new").unwrap();

        let report = verify_manifest(dir.path()).unwrap();
        assert!(!report.passed());
        assert_eq!(status_of(&report, "extra.parquet"), FileStatus::Untracked);
    }

    #[test]
    fn test_verify_without_manifest_fails() {
        let dir = tempdir().unwrap();
        let err = verify_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[test]
    fn test_verify_refuses_entries_outside_directory() {
        let root = tempdir().unwrap();
        let dir = root.path().join("data");
        fs::create_dir(&dir).unwrap();
        fs::write(root.path().join("secret.txt"), b"secret").unwrap();

        let entry = serde_json::json!({
            "name": "../secret.txt",
            "size": 6,
            "sha256": crate::manifest::sha256_file(&root.path().join("secret.txt")).unwrap(),
        });
        let doc = serde_json::json!({
            "schema_version": crate::manifest::MANIFEST_SCHEMA_VERSION,
            "generated_at": "2026-01-01T00:00:00Z",
            "cvec_db_version": "0.1.0",
            "stats": {},
            "files": [entry.clone(), entry],
        });
        fs::write(dir.join("manifest.json"), doc.to_string()).unwrap();

        let err = verify_manifest(&dir).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidManifest { .. }));
    }
}
