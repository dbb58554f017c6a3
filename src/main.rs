#![warn(unused_extern_crates)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodlens::config::Config;
use moodlens::{AnalysisError, Analyzer, ErrorResponse, Identity, JsonlStore, MediaItem, Pipeline, RecordStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a batch of images and/or videos for one user
    Analyze {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        username: String,

        /// Files to analyze. `.mp4`, `.avi` and `.mov` are read as video
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the most recent stored analysis for a user
    Latest {
        #[arg(long)]
        user_id: String,
    },
}

fn main() -> Result<ExitCode> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = CmdArgs::parse();
    let store = JsonlStore::new(&args.config.store);

    match args.command {
        Command::Analyze {
            user_id,
            username,
            files,
        } => {
            // no submissions are accepted without both models
            let pipeline = match Pipeline::load(&args.config) {
                Ok(pipeline) => pipeline,
                Err(e) => return report(&e),
            };
            let analyzer = Analyzer::new(pipeline, store);

            let items = read_items(&files)?;
            let submitter = Identity { user_id, username };

            match analyzer.submit(&submitter, &items) {
                Ok(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => report(&e),
            }
        }
        Command::Latest { user_id } => match store.latest_for(&user_id)? {
            Some(stored) => {
                println!("{}", serde_json::to_string_pretty(&stored)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                debug!("No analyses stored for {user_id}");
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

fn report(e: &AnalysisError) -> Result<ExitCode> {
    error!("Analysis failed: {e}");
    println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(e))?);
    Ok(ExitCode::FAILURE)
}

fn read_items(files: &[PathBuf]) -> Result<Vec<MediaItem>> {
    files
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(MediaItem::new(filename, bytes))
        })
        .collect()
}
