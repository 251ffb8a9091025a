mod cli;
mod json;

pub use cli::print_cli_table;
pub use json::print_json;

use crate::manifest::VerificationReport;
use anyhow::Result;

/// Output format for verification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_report(report: &VerificationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(report),
        OutputFormat::Json => print_json(report),
    }
}

/// Format report to string for file output
pub fn format_report_to_string(report: &VerificationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json::JsonReport::from(report))?),
        OutputFormat::Table => Ok(cli::render_table(report)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{build_manifest, verify_manifest, Stats};
    use std::fs;
    use std::str::FromStr;
    use tempfile::tempdir;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table"), Ok(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("JSON"), Ok(OutputFormat::Json));
        assert!(OutputFormat::from_str("sarif").is_err());
    }

    #[test]
    fn test_json_report_has_passed_flag() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cves.parquet"), b"rows").unwrap();
        build_manifest(dir.path(), Stats::new()).unwrap();
        let report = verify_manifest(dir.path()).unwrap();

        let rendered = format_report_to_string(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["passed"], serde_json::json!(true));
        assert_eq!(value["checks"][0]["status"], serde_json::json!("ok"));
        assert_eq!(value["manifest"]["files"][0]["name"], serde_json::json!("cves.parquet"));
    }
}
