//! CVE record types.
//!
//! - [`CveRecord`] - a raw CVE JSON 5.x record as published in cvelistV5
//! - [`Cvss`] - the preferred CVSS score of a record
//!
//! # Example
//!
//! ```
//! use cvec_db::model::CveRecord;
//!
//! let json = r#"{
//!     "cveMetadata": { "cveId": "CVE-2024-0001", "state": "PUBLISHED" },
//!     "containers": { "cna": {
//!         "descriptions": [{ "lang": "en", "value": "Buffer overflow" }]
//!     } }
//! }"#;
//!
//! let record: CveRecord = serde_json::from_str(json).unwrap();
//! assert_eq!(record.cve_id(), "CVE-2024-0001");
//! assert_eq!(record.year(), Some(2024));
//! assert_eq!(record.description(), Some("Buffer overflow"));
//! ```

mod record;

pub use record::*;
