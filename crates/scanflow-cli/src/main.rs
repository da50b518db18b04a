//! scanflow command-line interface.
//!
//! ```text
//! scanflow extract scan.pdf --mode auto --format json
//! scanflow batch page1.png page2.png --config scanflow.toml
//! ```
//!
//! Exits with status 1 when any document did not succeed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scanflow::{DocumentResult, ExtractionConfig, ExtractionMode, Extractor};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Primary engine, fallback when confidence is low
    Auto,
    /// Primary engine only
    Primary,
    /// Fallback engine only
    Fallback,
}

impl From<CliMode> for ExtractionMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Auto => ExtractionMode::Auto,
            CliMode::Primary => ExtractionMode::PrimaryOnly,
            CliMode::Fallback => ExtractionMode::FallbackOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "scanflow", version)]
#[command(about = "Extract text from scanned images and PDFs with OCR", long_about = None)]
struct Cli {
    /// Configuration file (.toml or .json); defaults to a discovered scanflow.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from one document
    Extract {
        path: PathBuf,

        /// Engine selection mode (defaults to the configured mode)
        #[arg(short, long, value_enum)]
        mode: Option<CliMode>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Extract text from several documents concurrently
    Batch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, value_enum)]
        mode: Option<CliMode>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_text(path: &std::path::Path, result: &DocumentResult) {
    println!("# {}", path.display());
    if result.succeeded {
        println!(
            "pages: {}  lines: {}  confidence: {:.1}%  workers: {}",
            result.page_count,
            result.line_count,
            result.confidence * 100.0,
            result.parallel_workers
        );
        for engine in &result.engines_used {
            println!("  {}", engine);
        }
        println!("{}", result.text);
    } else {
        println!("error: {}", result.error.as_deref().unwrap_or("extraction failed"));
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let config = ExtractionConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let default_mode = config.default_mode;
    let extractor = Extractor::new(config).context("Failed to set up extractor")?;

    let (paths, results, format) = match cli.command {
        Commands::Extract { path, mode, format } => {
            let mode = mode.map(ExtractionMode::from).unwrap_or(default_mode);
            let result = extractor.extract(&path, mode).await;
            (vec![path], vec![result], format)
        }
        Commands::Batch { paths, mode, format } => {
            let mode = mode.map(ExtractionMode::from).unwrap_or(default_mode);
            let results = extractor.batch_extract(paths.clone(), mode).await;
            (paths, results, format)
        }
    };

    match format {
        OutputFormat::Json => {
            let json = if results.len() == 1 {
                serde_json::to_string_pretty(&results[0])?
            } else {
                serde_json::to_string_pretty(&results)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            for (path, result) in paths.iter().zip(&results) {
                print_text(path, result);
            }
        }
    }

    if results.iter().all(|r| r.succeeded) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
