//! Manifest construction and integrity verification.
//!
//! A manifest is a JSON document written next to the generated parquet
//! files. It lets downstream consumers check that the files they fetched are
//! byte-identical to what the builder produced.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "generated_at": "2026-10-17T08:15:02.118Z",
//!   "cvec_db_version": "0.1.0",
//!   "stats": { "cves": 12345 },
//!   "files": [
//!     { "name": "cves.parquet", "size": 1048576, "sha256": "a3b2c1d4..." }
//!   ]
//! }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cvec_db::manifest::{build_manifest, Stats};
//! use std::path::Path;
//!
//! let mut stats = Stats::new();
//! stats.insert("cves".to_string(), 42.into());
//!
//! let path = build_manifest(Path::new("data"), stats)?;
//! println!("Manifest created: {}", path.display());
//! # Ok::<(), cvec_db::ManifestError>(())
//! ```

mod hash;
mod verify;

pub use hash::{sha256_file, HASH_CHUNK_SIZE};
pub use verify::{verify_manifest, FileCheck, FileStatus, VerificationReport};

use crate::error::{ManifestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compatibility tag for manifest consumers. Bump on any format change.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// File name of the manifest inside the data directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Extension of the data files catalogued by the manifest.
pub const DATA_FILE_EXTENSION: &str = "parquet";

/// Version string recorded as `cvec_db_version`.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Summary values passed through from the extraction step.
///
/// Kept open-ended; keys serialize in sorted order.
pub type Stats = serde_json::Map<String, serde_json::Value>;

/// One catalogued data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Base name of the file, unique within a manifest.
    pub name: String,
    /// Byte length at the time of hashing.
    pub size: u64,
    /// Lowercase hex SHA-256 of the full file contents.
    pub sha256: String,
}

/// Metadata describing one build of the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub cvec_db_version: String,
    pub stats: Stats,
    pub files: Vec<FileEntry>,
}

impl Manifest {
    /// Scans `dir` and assembles a manifest stamped with the current time.
    ///
    /// # Errors
    ///
    /// Fails if `dir` is missing or not a directory, or if any data file
    /// cannot be read. Nothing is written in either case.
    pub fn generate(dir: &Path, stats: Stats) -> Result<Self> {
        let files = scan_data_files(dir)?;

        Ok(Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            generated_at: Utc::now(),
            cvec_db_version: TOOL_VERSION.to_string(),
            stats,
            files,
        })
    }

    /// Loads `manifest.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;
        let path = dir.join(MANIFEST_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|e| ManifestError::io(&path, e))?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| ManifestError::InvalidManifest {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(ManifestError::InvalidManifest {
                path,
                reason: format!(
                    "unsupported schema_version {} (expected {})",
                    manifest.schema_version, MANIFEST_SCHEMA_VERSION
                ),
            });
        }

        if let Err(reason) = manifest.check_file_names() {
            return Err(ManifestError::InvalidManifest { path, reason });
        }

        Ok(manifest)
    }

    /// Every entry must be a plain base name, listed once.
    fn check_file_names(&self) -> std::result::Result<(), String> {
        let mut seen = BTreeSet::new();
        for entry in &self.files {
            let is_base_name = Path::new(&entry.name)
                .file_name()
                .map(|n| n == std::ffi::OsStr::new(&entry.name))
                .unwrap_or(false);
            if !is_base_name {
                return Err(format!("file entry {:?} is not a plain file name", entry.name));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(format!("file entry {:?} is listed more than once", entry.name));
            }
        }
        Ok(())
    }

    /// Writes the manifest as indented JSON to `dir/manifest.json`.
    ///
    /// The document goes to a temporary file first and is renamed over the
    /// target, so readers never observe a half-written manifest.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(self)?;
        let path = dir.join(MANIFEST_FILE_NAME);
        let tmp_path = dir.join(format!(".{}.tmp", MANIFEST_FILE_NAME));

        if let Err(e) = fs::write(&tmp_path, content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ManifestError::io(&tmp_path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ManifestError::io(&path, e));
        }

        Ok(path)
    }

    /// Returns the entry for `name`, if catalogued.
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Builds a manifest for the data files in `output_dir` and writes it to
/// `output_dir/manifest.json`, replacing any previous manifest.
///
/// Returns the path of the written manifest.
///
/// # Errors
///
/// Returns [`ManifestError::DirectoryNotFound`] if `output_dir` does not
/// exist, [`ManifestError::NotADirectory`] if it is a file, and
/// [`ManifestError::Io`] if a data file becomes unreadable mid-scan.
pub fn build_manifest(output_dir: &Path, stats: Stats) -> Result<PathBuf> {
    let manifest = Manifest::generate(output_dir, stats)?;
    let path = manifest.write_to(output_dir)?;

    info!(
        path = %path.display(),
        files = manifest.files.len(),
        "Manifest written"
    );

    Ok(path)
}

/// Lists data files in `dir` as `(name, path)` pairs, sorted by name.
///
/// Files whose names are not valid UTF-8 cannot be recorded faithfully and
/// are skipped with a warning.
pub fn list_data_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    ensure_dir(dir)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ManifestError::io(dir, e))? {
        let entry = entry.map_err(|e| ManifestError::io(dir, e))?;
        let path = entry.path();

        let is_data_file = path
            .extension()
            .map(|ext| ext == DATA_FILE_EXTENSION)
            .unwrap_or(false);
        if !is_data_file {
            continue;
        }

        let file_type = entry.file_type().map_err(|e| ManifestError::io(&path, e))?;
        if file_type.is_dir() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(file = ?raw, "Skipping data file with non UTF-8 name");
                continue;
            }
        };

        files.push((name, path));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Hashes every data file in `dir`, in name order.
pub fn scan_data_files(dir: &Path) -> Result<Vec<FileEntry>> {
    list_data_files(dir)?
        .into_iter()
        .map(|(name, path)| file_entry(name, &path))
        .collect()
}

fn file_entry(name: String, path: &Path) -> Result<FileEntry> {
    let size = fs::metadata(path)
        .map_err(|e| ManifestError::io(path, e))?
        .len();
    let sha256 = sha256_file(path)?;

    debug!(file = %name, size, sha256 = %sha256, "Hashed data file");

    Ok(FileEntry { name, size, sha256 })
}

fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ManifestError::NotADirectory(dir.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ManifestError::DirectoryNotFound(dir.to_path_buf()))
        }
        Err(e) => Err(ManifestError::io(dir, e)),
    }
}
