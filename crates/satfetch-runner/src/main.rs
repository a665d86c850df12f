//! `satfetch` command-line entry point.
//!
//! Usage: satfetch <INPUT.xlsx|INPUT.csv> [--config run.yaml] [--full | --demo-rows N] [...]

use clap::{ArgAction, Parser};
use satfetch_export::EsriExportFetcher;
use satfetch_runner::{Dataset, FetchConfig, FetchDriver, Result, RunMode};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Fetch one satellite image per coordinate row and save it as <row_index>.png.
#[derive(Parser, Debug)]
#[command(name = "satfetch", version, about)]
struct Cli {
    /// Spreadsheet (.xlsx, .xls, .ods) or CSV file with a header row and latitude/longitude columns
    input: PathBuf,

    /// YAML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the images
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Output width and height in pixels
    #[arg(long)]
    image_size: Option<u32>,

    /// Bounding box half-width in degrees
    #[arg(long)]
    zoom_delta: Option<f64>,

    /// Pause after each fetched image, in seconds
    #[arg(long = "sleep", value_name = "SECS")]
    request_sleep_secs: Option<f64>,

    /// HTTP request timeout, in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    request_timeout_secs: Option<f64>,

    /// Export endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Header of the latitude column
    #[arg(long)]
    lat_column: Option<String>,

    /// Header of the longitude column
    #[arg(long)]
    lon_column: Option<String>,

    /// Process every row instead of the demo sample
    #[arg(long, conflicts_with = "demo_rows")]
    full: bool,

    /// Process only the first N rows
    #[arg(long, value_name = "N")]
    demo_rows: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut FetchConfig) {
        if let Some(dir) = &self.image_dir {
            config.image_dir = dir.clone();
        }
        if let Some(size) = self.image_size {
            config.image_size = size;
        }
        if let Some(delta) = self.zoom_delta {
            config.zoom_delta = delta;
        }
        if let Some(secs) = self.request_sleep_secs {
            config.request_sleep_secs = secs;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(column) = &self.lat_column {
            config.lat_column = column.clone();
        }
        if let Some(column) = &self.lon_column {
            config.lon_column = column.clone();
        }
        if self.full {
            config.demo_mode = false;
        }
        if let Some(rows) = self.demo_rows {
            config.demo_mode = true;
            config.demo_rows = rows;
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => FetchConfig::from_yaml_file(path)?,
        None => FetchConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    satfetch_metrics::describe_metrics();

    let dataset = Dataset::from_path(&cli.input, &config.lat_column, &config.lon_column)?;
    info!("Loaded {} rows from {}", dataset.len(), cli.input.display());

    let mode = config.run_mode();
    match mode {
        RunMode::Demo { rows } => info!("Running in DEMO mode: fetching {} images only", rows),
        RunMode::Full => info!("Running FULL mode: fetching all images"),
    }

    let fetcher = EsriExportFetcher::new(config.export_params()?)?;
    let driver = FetchDriver::new(fetcher, &config.image_dir, config.request_sleep()?)?
        .with_progress(!cli.no_progress);

    let summary = driver.run(dataset.select(mode));
    info!("Done: {}", summary);
    if !summary.failed.is_empty() {
        warn!("Failed rows (retried on next run): {:?}", summary.failed);
    }

    let stats = driver.source().download_stats();
    info!(
        "{} requests sent, {} images fetched, {} bytes downloaded",
        stats.requests_sent, stats.images_fetched, stats.bytes_downloaded
    );

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
