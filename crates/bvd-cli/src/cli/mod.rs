//! CLI for the BVD batch video downloader.

mod commands;

use anyhow::Result;
use bvd_core::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_add, run_batch, run_fetch_tool};

/// Top-level CLI for the BVD batch video downloader.
#[derive(Debug, Parser)]
#[command(name = "bvd")]
#[command(about = "BVD: batch video downloader driving yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every URL in a list file.
    Run {
        /// Path to the URL list (one URL per line; blank lines and # comments are skipped).
        list: PathBuf,

        /// Destination directory handed to the tool via -P (overrides the config).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<String>,

        /// Extra yt-dlp flags as one quoted string (overrides the config).
        #[arg(long, value_name = "OPTS")]
        options: Option<String>,

        /// Download up to N URLs concurrently (overrides the config).
        #[arg(long, value_name = "N")]
        jobs: Option<u32>,
    },

    /// Expand [start-end] ranges and print the concrete URLs.
    Add {
        /// URLs, optionally containing one bracketed numeric range each.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Fetch the yt-dlp binary into the managed location if it is missing.
    FetchTool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut settings = config::load_or_init()?;
        tracing::debug!("loaded settings: {:?}", settings);

        match cli.command {
            CliCommand::Run {
                list,
                output_dir,
                options,
                jobs,
            } => {
                if let Some(dir) = output_dir {
                    settings.output_directory = dir;
                }
                if let Some(opts) = options {
                    settings.additional_options = opts;
                }
                if let Some(jobs) = jobs {
                    settings.parallelism = jobs;
                }
                run_batch(&list, &settings).await?;
            }
            CliCommand::Add { urls } => run_add(&urls),
            CliCommand::FetchTool => run_fetch_tool().await?,
        }

        Ok(())
    }
}
