//! CLI for CI runner cost attribution
//!
//! Run `cost-attribution --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use cost_attribution::attribution::{
    DEFAULT_ACCOUNT_ID, DEFAULT_ROGUE_THRESHOLD_HOURS, DEFAULT_WORKLOAD,
};
use cost_attribution::providers::cloudability::CLOUDABILITY_API_HOST;
use cost_attribution::query::DEFAULT_WINDOW_DAYS;
use cost_attribution::{
    sink, upload, AttributedCostReport, CiRunnerReport, CloudabilityClient, Measure,
    MeasureCatalog, RogueThreshold, S3Destination, TokenSource,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cost-attribution")]
#[command(about = "Get CI runner costs from Cloudability, split into normal and rogue usage")]
#[command(version)]
#[command(group(
    ArgGroup::new("token_source")
        .required(true)
        .args(["token", "token_env_var", "token_command"])
))]
struct Cli {
    /// The log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Cloudability token
    #[arg(long)]
    token: Option<String>,

    /// Environment variable holding the Cloudability token
    #[arg(long)]
    token_env_var: Option<String>,

    /// Command printing the Cloudability token, e.g. "pass cloudability_secret"
    #[arg(long)]
    token_command: Option<String>,

    /// How many days to retrieve
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    days: u32,

    /// Cloudability API host
    #[arg(long, env = "CLOUDABILITY_API_HOST", default_value = CLOUDABILITY_API_HOST)]
    api_host: String,

    /// Read the measure catalog from a JSON file instead of the API
    #[arg(long)]
    measures_file: Option<PathBuf>,

    /// Cloud account the CI runners bill to
    #[arg(long, default_value = DEFAULT_ACCOUNT_ID)]
    account_id: String,

    /// Workload tag value of the CI runners
    #[arg(long, default_value = DEFAULT_WORKLOAD)]
    workload: String,

    /// Hours per resource not counted as rogue usage
    #[arg(long, default_value_t = DEFAULT_ROGUE_THRESHOLD_HOURS)]
    rogue_threshold_hours: f64,

    /// S3 bucket to upload the exported file to, implies passing credentials
    #[arg(long)]
    bucket_name: Option<String>,

    /// AWS access key id, required to upload
    #[arg(long)]
    aws_access_key_id: Option<String>,

    /// AWS secret access key, required to upload
    #[arg(long)]
    aws_secret_access_key: Option<String>,

    /// AWS region of the bucket
    #[arg(long, default_value = upload::DEFAULT_REGION)]
    region_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write result on stdout
    Print,

    /// Export as CSV
    Csv {
        /// The output file
        #[arg(long)]
        filename: PathBuf,
    },

    /// Export as JSON
    Json {
        /// The output file
        #[arg(long)]
        filename: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.directive()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Reject a bucket without credentials before any API call
    let destination = S3Destination::from_options(
        cli.bucket_name.clone(),
        cli.aws_access_key_id.clone(),
        cli.aws_secret_access_key.clone(),
        cli.region_name.clone(),
    )?;

    let token = token_source(&cli)?
        .resolve()
        .await
        .context("Failed to get Cloudability token")?;
    let client = CloudabilityClient::with_host(token, &cli.api_host)?;

    let catalog = match &cli.measures_file {
        Some(path) => MeasureCatalog::load(&read_measures(path)?).await,
        None => MeasureCatalog::load(&client).await,
    }
    .context("Failed to load measure catalog")?;
    info!(measures = catalog.len(), "Loaded measure catalog");

    let report = CiRunnerReport {
        account_id: cli.account_id.clone(),
        workload: cli.workload.clone(),
        window_days: cli.days,
        threshold: RogueThreshold::new(cli.rogue_threshold_hours)?,
    }
    .run(&client, &catalog)
    .await
    .context("Failed to compute CI runner costs")?;

    let filename = match &cli.command {
        Commands::Print => {
            print!("{}", sink::render_table(&report));
            if destination.is_some() {
                warn!("Nothing to upload when printing; ignoring --bucket-name");
            }
            return Ok(());
        }
        Commands::Csv { filename } => {
            export(&report, filename, |report, file| sink::write_csv(report, file))?;
            filename
        }
        Commands::Json { filename } => {
            export(&report, filename, |report, file| sink::write_json(report, file))?;
            filename
        }
    };

    if let Some(destination) = &destination {
        destination
            .upload(filename)
            .await
            .with_context(|| format!("Failed to upload {} to S3", filename.display()))?;
    }

    Ok(())
}

fn token_source(cli: &Cli) -> Result<TokenSource> {
    if let Some(token) = &cli.token {
        return Ok(TokenSource::Literal(token.clone()));
    }
    if let Some(name) = &cli.token_env_var {
        return Ok(TokenSource::EnvVar(name.clone()));
    }
    if let Some(command) = &cli.token_command {
        return Ok(TokenSource::Command(command.clone()));
    }
    bail!("no Cloudability token was provided")
}

fn read_measures(path: &Path) -> Result<Vec<Measure>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid measures in {}", path.display()))
}

fn export<F>(report: &AttributedCostReport, filename: &Path, write: F) -> Result<()>
where
    F: FnOnce(&AttributedCostReport, BufWriter<File>) -> cost_attribution::Result<()>,
{
    let file = File::create(filename)
        .with_context(|| format!("Failed to create {}", filename.display()))?;
    write(report, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", filename.display()))?;
    info!(path = %filename.display(), rows = report.len(), "Wrote report");
    Ok(())
}
