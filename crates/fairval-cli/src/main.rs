//! Command-line interface for fairval

mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fairval_engine::config::parse_as_of;
use fairval_engine::{AnalysisEngine, EngineConfig, SecurityDirectory, SourceSet};
use fairval_utils::LogFormat;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fairval")]
#[command(version, about = "Company valuation from filings, prices and sector peers", long_about = None)]
struct Cli {
    /// Directory holding directory.json and the per-source data files
    #[arg(long, env = "FAIRVAL_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Fetch filings, market and sector data from this HTTP service instead
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Analysis date (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    as_of: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Per-attempt provider timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Value a company by listing code or name
    Analyze { query: String },
    /// Show which security a query resolves to
    Resolve { query: String },
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::default().with_env()?;
        if let Some(raw) = &self.as_of {
            config.as_of = Some(parse_as_of(raw)?);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn sources(&self) -> anyhow::Result<SourceSet> {
        match &self.base_url {
            Some(base_url) => Ok(SourceSet::from_base_url(base_url)?),
            None => Ok(SourceSet::from_data_dir(&self.data_dir)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    fairval_utils::init_tracing_with(cli.log_format, "warn")?;

    let directory_path = cli.data_dir.join("directory.json");
    let directory = SecurityDirectory::load(&directory_path)
        .await
        .with_context(|| format!("loading {}", directory_path.display()))?;

    info!("Starting fairval with {} securities", directory.len());
    let engine = AnalysisEngine::new(cli.engine_config()?, directory, cli.sources()?)?;

    match &cli.command {
        Command::Analyze { query } => {
            let result = engine.analyze(query).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", output::render_result(&result));
            }
        }
        Command::Resolve { query } => {
            let identity = engine.resolve(query)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!("{}", output::render_identity(&identity));
            }
        }
    }

    Ok(())
}
