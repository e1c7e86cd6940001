mod aggregate;
mod config;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "slc-inspections",
    about = "Salt Lake County food-service inspection crawler",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the establishment listing and write the tables to disk
    Scrape {
        /// Number of listing pages to crawl
        #[arg(
            short,
            long,
            env = "SLC_PAGES",
            default_value_t = 54,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        pages: u32,

        /// Only scrape the listing; skip detail views and inspection history
        #[arg(long)]
        no_detail: bool,

        /// Output directory (overrides output.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "slc_inspections=info,warn",
        1 => "slc_inspections=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { pages, no_detail, out } => {
            if let Some(dir) = out {
                config.output.dir = dir;
            }
            let pages = NonZeroU32::new(pages).context("--pages must be at least 1")?;

            let stats = Pipeline::new(config).run(pages, !no_detail).await?;

            println!("─────────────────────────────────");
            println!("  Inspection crawl");
            println!("─────────────────────────────────");
            println!("  Establishments : {}", utils::fmt_count(stats.establishments));
            println!("  Details        : {}", utils::fmt_count(stats.details));
            println!("  Inspections    : {}", utils::fmt_count(stats.inspections));
            println!("  Output         : {}", stats.output_dir.display());
            println!("─────────────────────────────────");
        }

        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
