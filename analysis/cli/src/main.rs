//! MEGAGO - GO Term Set Similarity Client
//!
//! Command line front end for a remote MEGAGO analysis service. One analysis
//! session is created per invocation and handed to the command runner.
//!
//! # Usage
//!
//! ```bash
//! # Compare two inline lists
//! megago compare --list1 "GO:0008150;GO:0009987" --list2 "GO:0005575"
//!
//! # Compare lists stored in files, print the full snapshot as JSON
//! megago compare --file1 a.txt --file2 b.txt --json
//!
//! # Batch mode: ID,TERMS1,TERMS2 per line
//! megago batch pairs.csv > scores.csv
//!
//! # Look up term metadata / check the service
//! megago resolve GO:0008150 GO:0005575
//! megago ping
//!
//! # Verbose logging
//! RUST_LOG=megago_core=trace megago compare ...
//! ```

mod runner;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::info;

use megago_core::{
    load_config, load_config_from_path, AnalysisMode, AnalysisSession, ConfigOverrides,
    DuplicatePolicy, HttpAnalysisBackend,
};

/// MEGAGO - compare two sets of GO terms using a remote analysis service
#[derive(Parser, Debug)]
#[command(name = "megago")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "MEGAGO_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Analysis service base URL
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Dispatch mode (sync or async)
    #[arg(long, value_parser = parse_mode, global = true)]
    mode: Option<AnalysisMode>,

    /// Delay between progress requests in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..), global = true)]
    poll_interval_ms: Option<u64>,

    /// Per-request timeout in milliseconds (0 disables)
    #[arg(long, value_name = "MS", global = true)]
    request_timeout_ms: Option<u64>,

    /// Drop repeated identifiers from each term list
    #[arg(long, global = true)]
    dedup: bool,

    /// Debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two term lists
    Compare {
        /// Term list 1 (separated by ';', ',' or whitespace)
        #[arg(long, value_name = "TERMS", required_unless_present = "file1", conflicts_with = "file1")]
        list1: Option<String>,

        /// Term list 2
        #[arg(long, value_name = "TERMS", required_unless_present = "file2", conflicts_with = "file2")]
        list2: Option<String>,

        /// Read term list 1 from a file
        #[arg(long, value_name = "FILE")]
        file1: Option<PathBuf>,

        /// Read term list 2 from a file
        #[arg(long, value_name = "FILE")]
        file2: Option<PathBuf>,

        /// Print the session snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare every ID,TERMS1,TERMS2 row of a CSV file
    Batch {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print metadata for term identifiers as JSON
    Resolve {
        /// Term identifiers
        #[arg(required = true, value_name = "TERM")]
        terms: Vec<String>,
    },

    /// Check that the analysis service is reachable
    Ping,
}

fn parse_mode(s: &str) -> Result<AnalysisMode, String> {
    AnalysisMode::parse(s).ok_or_else(|| format!("unknown mode {s:?} (expected sync or async)"))
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            mode: self.mode,
            request_timeout_ms: self.request_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
            duplicate_policy: self.dedup.then_some(DuplicatePolicy::Remove),
        }
    }
}

/// Initialize logging; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("megago_cli={level},megago_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            load_config_from_path(Some(path.clone()))
        }
        None => load_config(),
    }
    .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);

    info!(
        source = %config.source(),
        base_url = %config.backend.base_url,
        mode = %config.session.mode,
        "Configuration loaded"
    );

    let base_url = config.backend.base_url.clone();
    let backend =
        HttpAnalysisBackend::new(config.backend).context("Invalid service configuration")?;
    let session = AnalysisSession::new(backend, config.session);

    // Output is buffered and written asynchronously once the command ends
    let mut out = Vec::new();
    let result = match args.command {
        Command::Compare {
            list1,
            list2,
            file1,
            file2,
            json,
        } => {
            let list1 = runner::read_terms(list1.as_deref(), file1.as_deref()).await?;
            let list2 = runner::read_terms(list2.as_deref(), file2.as_deref()).await?;
            runner::compare(&session, list1, list2, json, &mut out).await
        }
        Command::Batch { input } => {
            let content = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read batch file {}", input.display()))?;
            runner::batch(&session, &content, &mut out).await
        }
        Command::Resolve { terms } => {
            runner::resolve(session.backend().as_ref(), &terms, &mut out).await
        }
        Command::Ping => runner::ping(session.backend().as_ref(), &base_url, &mut out).await,
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;
    result
}
