//! Cross-platform path resolution.
//!
//! Downloaded raw data lives in the user cache directory and the config
//! file in the user config directory.

use std::path::PathBuf;

const APP_DIR: &str = "cvec-db";

/// Returns the cache directory for cvec-db.
///
/// Platform-specific locations:
/// - Linux: `~/.cache/cvec-db/`
/// - macOS: `~/Library/Caches/cvec-db/`
/// - Windows: `%LOCALAPPDATA%\cvec-db\`
///
/// Falls back to `/tmp/cvec-db/` if no cache directory can be determined.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
}

/// Returns the directory holding `config.toml`.
///
/// Platform-specific locations:
/// - Linux: `~/.config/cvec-db/`
/// - macOS: `~/Library/Application Support/cvec-db/`
/// - Windows: `%APPDATA%\cvec-db\`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(cache_dir().ends_with(APP_DIR));
        assert!(config_dir().ends_with(APP_DIR));
    }
}
