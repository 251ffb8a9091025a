use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cvec_db::{
    cache::Cache,
    config::Config,
    manifest::{build_manifest, verify_manifest, Stats},
    output::{format_report_to_string, print_report, OutputFormat},
    service::{count_rows, CvelistDownloader, Downloader, Extractor, ParquetExtractor, CVES_FILE},
};
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const VERIFY_FAILED: u8 = 2;
}

#[derive(Parser)]
#[command(name = "cvec-db")]
#[command(
    author,
    version,
    about = "CVE database builder - generates parquet files for cvec tool"
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the CVE database: download JSON files, extract to parquet, write manifest
    Build {
        /// Output directory for parquet files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of years to include
        #[arg(short, long)]
        years: Option<u32>,

        /// Skip downloading, use existing JSON files
        #[arg(long)]
        skip_download: bool,
    },

    /// Download CVE JSON files from the cvelistV5 repository
    DownloadJson {
        /// Number of years to include
        #[arg(short, long)]
        years: Option<u32>,
    },

    /// Extract already downloaded CVE JSON files to parquet
    ExtractParquet {
        /// Output directory for parquet files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of years to include
        #[arg(short, long)]
        years: Option<u32>,
    },

    /// Generate a manifest file for existing parquet files
    Manifest {
        /// Directory containing parquet files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Check parquet files against their manifest
    Verify {
        /// Directory containing parquet files and manifest.json
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write the report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Remove the downloaded archive and unpacked JSON records
    ClearCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "cvec_db=debug,warn" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let config = Config::load_or_default();

    match cli.command {
        Commands::Build {
            output,
            years,
            skip_download,
        } => {
            let config = apply_overrides(config, output, years);
            run_build(&config, skip_download).await
        }
        Commands::DownloadJson { years } => {
            let config = apply_overrides(config, None, years);
            let count = download_records(&config).await?;
            println!("Downloaded and extracted {} CVE JSON files", count);
            Ok(exit_codes::SUCCESS)
        }
        Commands::ExtractParquet { output, years } => {
            let config = apply_overrides(config, output, years);
            ensure_output_dir(&config)?;
            extract_and_manifest(&config)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Manifest { data_dir } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            run_manifest(data_dir)
        }
        Commands::Verify {
            data_dir,
            format,
            output,
        } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            run_verify(data_dir, &format, output)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let cache = Cache::from_config(&config);
            cache.clear()?;
            println!("Cache cleared: {}", cache.dir().display());
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Command-line flags take precedence over the config file.
fn apply_overrides(config: Config, output: Option<PathBuf>, years: Option<u32>) -> Config {
    let config = match output {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };
    match years {
        Some(years) => config.with_years(years),
        None => config,
    }
}

fn ensure_output_dir(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.data_dir.display()
        )
    })
}

async fn run_build(config: &Config, skip_download: bool) -> Result<u8> {
    ensure_output_dir(config)?;

    if !skip_download {
        download_records(config).await?;
        println!("Download complete.");
    }

    extract_and_manifest(config)?;
    println!("Build complete!");
    Ok(exit_codes::SUCCESS)
}

async fn download_records(config: &Config) -> Result<usize> {
    println!(
        "Downloading CVE data (last {} years)...",
        config.default_years
    );

    let downloader =
        CvelistDownloader::new(config.clone()).with_progress(std::io::stderr().is_terminal());
    info!(source = downloader.name(), "Fetching CVE records");
    downloader.download().await?;
    downloader.extract()
}

fn extract_and_manifest(config: &Config) -> Result<()> {
    println!("Extracting CVE data to parquet...");
    let extractor = ParquetExtractor::new(config.clone());
    let result = extractor.extract_all(&config.data_dir)?;
    println!("Extracted {} CVEs", result.cves());
    for file in &result.files {
        info!(file = %file.display(), "Wrote parquet table");
    }

    println!("Creating manifest...");
    let manifest_path = build_manifest(&config.data_dir, result.stats)?;
    println!("Manifest created: {}", manifest_path.display());
    Ok(())
}

fn run_manifest(data_dir: PathBuf) -> Result<u8> {
    if !data_dir.exists() {
        eprintln!("Error: Directory {} does not exist", data_dir.display());
        return Ok(exit_codes::ERROR);
    }

    let mut stats = Stats::new();
    let cves_parquet = data_dir.join(CVES_FILE);
    if cves_parquet.exists() {
        stats.insert("cves".to_string(), count_rows(&cves_parquet)?.into());
    }

    let manifest_path = build_manifest(&data_dir, stats)?;
    println!("Manifest created: {}", manifest_path.display());
    Ok(exit_codes::SUCCESS)
}

fn run_verify(data_dir: PathBuf, format: &str, output: Option<PathBuf>) -> Result<u8> {
    let format = OutputFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?;
    let report = verify_manifest(&data_dir)?;

    if let Some(path) = output {
        fs::write(&path, format_report_to_string(&report, format)?)?;
        println!("Report written to: {}", path.display());
    } else {
        print_report(&report, format)?;
    }

    if report.passed() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::VERIFY_FAILED)
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'cvec-db config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
