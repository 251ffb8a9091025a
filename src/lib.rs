pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod model;
pub mod output;
pub mod platform;
pub mod service;

pub use cache::Cache;
pub use config::Config;
pub use error::ManifestError;
pub use manifest::{build_manifest, FileEntry, Manifest, Stats};
pub use service::{Downloader, ExtractResult, Extractor};
