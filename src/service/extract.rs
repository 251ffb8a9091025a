use crate::config::Config;
use crate::manifest::Stats;
use crate::model::CveRecord;
use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Main table, one row per CVE.
pub const CVES_FILE: &str = "cves.parquet";
const PRODUCTS_FILE: &str = "products.parquet";
const CWES_FILE: &str = "cwes.parquet";
const REFERENCES_FILE: &str = "references.parquet";

/// Normalizes unpacked CVE JSON records into parquet tables.
pub struct ParquetExtractor {
    config: Config,
}

impl ParquetExtractor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Record files below the records directory, in path order.
    fn record_paths(&self, records_dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(records_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                name.starts_with("CVE-") && name.ends_with(".json")
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();
        paths
    }
}

impl super::Extractor for ParquetExtractor {
    fn extract_all(&self, output_dir: &Path) -> Result<super::ExtractResult> {
        let records_dir = self.config.records_dir();
        if !records_dir.is_dir() {
            bail!(
                "No CVE records found at {}. Run 'cvec-db download-json' first.",
                records_dir.display()
            );
        }

        let years = self.config.current_year_range();
        let mut tables = Tables::default();
        let mut skipped: u64 = 0;

        for path in self.record_paths(&records_dir) {
            let record: CveRecord = match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable CVE record");
                    skipped += 1;
                    continue;
                }
            };

            match record.year() {
                Some(year) if years.contains(&year) => tables.push(&record),
                _ => debug!(cve = %record.cve_id(), "Outside years horizon"),
            }
        }

        let files = tables.write(output_dir)?;

        let mut stats = Stats::new();
        stats.insert("cves".to_string(), tables.cves.len().into());
        stats.insert("products".to_string(), tables.products.len().into());
        stats.insert("cwes".to_string(), tables.cwes.len().into());
        stats.insert("references".to_string(), tables.references.len().into());
        stats.insert("skipped".to_string(), skipped.into());

        info!(
            cves = tables.cves.len(),
            skipped,
            dir = %output_dir.display(),
            "Extraction complete"
        );

        Ok(super::ExtractResult { stats, files })
    }
}

struct CveRow {
    cve_id: String,
    state: Option<String>,
    assigner: Option<String>,
    date_published: Option<String>,
    date_updated: Option<String>,
    title: Option<String>,
    description: Option<String>,
    cvss_score: Option<f64>,
    cvss_severity: Option<String>,
    cvss_version: Option<String>,
}

#[derive(Default)]
struct Tables {
    cves: Vec<CveRow>,
    products: Vec<(String, String, String)>,
    cwes: Vec<(String, String)>,
    references: Vec<(String, String)>,
}

impl Tables {
    fn push(&mut self, record: &CveRecord) {
        let cve_id = record.cve_id().to_string();
        let meta = &record.cve_metadata;
        let cvss = record.cvss();

        self.cves.push(CveRow {
            cve_id: cve_id.clone(),
            state: meta.state.clone(),
            assigner: meta.assigner_short_name.clone(),
            date_published: meta.date_published.clone(),
            date_updated: meta.date_updated.clone(),
            title: record.title().map(str::to_string),
            description: record.description().map(str::to_string),
            cvss_score: cvss.as_ref().map(|c| c.score),
            cvss_severity: cvss.as_ref().and_then(|c| c.severity.clone()),
            cvss_version: cvss.as_ref().map(|c| c.version.to_string()),
        });

        for (vendor, product) in record.products() {
            self.products.push((cve_id.clone(), vendor, product));
        }
        for cwe in record.cwes() {
            self.cwes.push((cve_id.clone(), cwe));
        }
        for url in record.references() {
            self.references.push((cve_id.clone(), url.to_string()));
        }
    }

    fn write(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let cves = self.cves.as_slice();

        let tables: Vec<(&str, Vec<(&str, ArrayRef)>)> = vec![
            (
                CVES_FILE,
                vec![
                    ("cve_id", optional_column(cves, |r| Some(r.cve_id.clone()))),
                    ("state", optional_column(cves, |r| r.state.clone())),
                    ("assigner", optional_column(cves, |r| r.assigner.clone())),
                    ("date_published", optional_column(cves, |r| r.date_published.clone())),
                    ("date_updated", optional_column(cves, |r| r.date_updated.clone())),
                    ("title", optional_column(cves, |r| r.title.clone())),
                    ("description", optional_column(cves, |r| r.description.clone())),
                    (
                        "cvss_score",
                        Arc::new(Float64Array::from(
                            cves.iter().map(|r| r.cvss_score).collect::<Vec<_>>(),
                        )) as ArrayRef,
                    ),
                    ("cvss_severity", optional_column(cves, |r| r.cvss_severity.clone())),
                    ("cvss_version", optional_column(cves, |r| r.cvss_version.clone())),
                ],
            ),
            (
                PRODUCTS_FILE,
                vec![
                    ("cve_id", string_column(self.products.iter().map(|p| &p.0))),
                    ("vendor", string_column(self.products.iter().map(|p| &p.1))),
                    ("product", string_column(self.products.iter().map(|p| &p.2))),
                ],
            ),
            (
                CWES_FILE,
                vec![
                    ("cve_id", string_column(self.cwes.iter().map(|c| &c.0))),
                    ("cwe_id", string_column(self.cwes.iter().map(|c| &c.1))),
                ],
            ),
            (
                REFERENCES_FILE,
                vec![
                    ("cve_id", string_column(self.references.iter().map(|r| &r.0))),
                    ("url", string_column(self.references.iter().map(|r| &r.1))),
                ],
            ),
        ];

        let mut written = Vec::with_capacity(tables.len());
        for (name, columns) in tables {
            let path = output_dir.join(name);
            write_parquet(&path, columns)?;
            debug!(path = %path.display(), "Wrote parquet table");
            written.push(path);
        }
        Ok(written)
    }
}

fn optional_column(rows: &[CveRow], f: fn(&CveRow) -> Option<String>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn string_column<'a>(values: impl Iterator<Item = &'a String>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) -> Result<()> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(
        schema.clone(),
        columns.into_iter().map(|(_, array)| array).collect(),
    )?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Row count of a parquet file, read from its footer.
pub fn count_rows(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read parquet metadata from {}", path.display()))?;
    Ok(builder.metadata().file_metadata().num_rows().max(0) as u64)
}
