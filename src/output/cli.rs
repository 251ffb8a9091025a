use crate::manifest::{FileStatus, VerificationReport};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "File")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Actual")]
    actual: String,
}

pub fn print_cli_table(report: &VerificationReport) -> Result<()> {
    println!("{}", render_table(report));
    Ok(())
}

pub(crate) fn render_table(report: &VerificationReport) -> String {
    let manifest = &report.manifest;
    let mut out = String::new();

    out.push_str(&format!(
        "Manifest generated at: {} (cvec-db {}, schema {})\n\n",
        manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        manifest.cvec_db_version,
        manifest.schema_version
    ));

    if report.checks.is_empty() {
        out.push_str("No data files listed.\n");
    } else {
        let rows: Vec<CheckRow> = report
            .checks
            .iter()
            .map(|c| CheckRow {
                name: c.name.clone(),
                status: format_status(c.status),
                expected: format_size(c.expected_size),
                actual: format_size(c.actual_size),
            })
            .collect();

        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    out.push('\n');
    let failures = report.failures().count();
    if failures == 0 {
        out.push_str(&format!("PASS: {} files verified", report.checks.len()));
    } else {
        out.push_str(&format!(
            "FAIL: {} of {} files do not match the manifest",
            failures,
            report.checks.len()
        ));
    }
    out
}

fn format_status(status: FileStatus) -> String {
    match status {
        FileStatus::Ok => "OK".to_string(),
        other => other.as_str().to_uppercase(),
    }
}

fn format_size(size: Option<u64>) -> String {
    match size {
        Some(bytes) => format_bytes(bytes),
        None => "-".to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{build_manifest, verify_manifest, Stats};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_status() {
        assert_eq!(format_status(FileStatus::Ok), "OK");
        assert_eq!(format_status(FileStatus::HashMismatch), "HASH MISMATCH");
    }

    #[test]
    fn test_render_table_pass_and_fail() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cves.parquet"), b"rows").unwrap();
        build_manifest(dir.path(), Stats::new()).unwrap();

        let rendered = render_table(&verify_manifest(dir.path()).unwrap());
        assert!(rendered.contains("cves.parquet"));
        assert!(rendered.contains("PASS: 1 files verified"));

        fs::write(dir.path().join("cves.parquet"), b"ROWS").unwrap();
        let rendered = render_table(&verify_manifest(dir.path()).unwrap());
        assert!(rendered.contains("HASH MISMATCH"));
        assert!(rendered.contains("FAIL: 1 of 1"));
    }
}
