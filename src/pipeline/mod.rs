//! Pipeline orchestrator: crawl → flat files.
//!
//! One run opens a fresh portal session, crawls the requested pages and
//! writes the three tables plus `manifest.json` to the output directory.
//! The session (and its cookie jar) is dropped as soon as the crawl ends.
//!
//! On an aborted crawl the rows gathered before the failure are still
//! written when `output.write_partial` is set; the manifest says so and the
//! run returns the crawl error.

use crate::aggregate::CrawlResult;
use crate::config::AppConfig;
use crate::scraper::error::CrawlFailure;
use crate::scraper::http_client::HttpClient;
use crate::scraper::InspectionCrawler;
use crate::storage::{Exporter, FailureNote, RunManifest, RunStatus};
use crate::utils::Timer;
use anyhow::{Context, Result};
use chrono::Utc;
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, page_count: NonZeroU32, with_detail: bool) -> Result<PipelineStats> {
        let started_at = Utc::now();

        let outcome = {
            let _t = Timer::start(format!(
                "Crawl of {} page(s){}",
                page_count,
                if with_detail { " with detail" } else { "" }
            ));
            let client = HttpClient::new(&self.config.scraper)?;
            let crawler = InspectionCrawler::new(client, &self.config.scraper)
                .context("Failed to build crawler")?;
            crawler.scrape(page_count, with_detail).await
        };

        let (result, failure) = match outcome {
            Ok(result) => (result, None),
            Err(CrawlFailure { position, error, partial }) => (*partial, Some((position, error))),
        };

        if result.summaries.is_empty() {
            warn!("No establishments scraped");
        }

        let exporter = Exporter::open(&self.config.output.dir)?;
        let write_tables = failure.is_none() || self.config.output.write_partial;
        if write_tables {
            let _t = Timer::start("Export");
            exporter.write_tables(&result)?;
        } else {
            warn!("Crawl aborted; partial tables not written (output.write_partial = false)");
        }

        let manifest = RunManifest {
            status: if failure.is_some() { RunStatus::Aborted } else { RunStatus::Complete },
            started_at,
            finished_at: Utc::now(),
            pages_requested: page_count.get(),
            with_detail,
            establishments: result.summaries.len(),
            details: result.details.len(),
            inspections: result.inspections.len(),
            tables_written: write_tables,
            failure: failure.as_ref().map(|(position, error)| FailureNote {
                position: position.to_string(),
                message: error.to_string(),
            }),
        };
        exporter.write_manifest(&manifest)?;

        if let Some((position, error)) = failure {
            return Err(anyhow::Error::new(error).context(format!("Crawl aborted at {}", position)));
        }

        let stats = PipelineStats::from_result(&result, exporter.dir().to_path_buf());
        info!(
            "=== Done: {} establishments | {} details | {} inspections ===",
            stats.establishments, stats.details, stats.inspections
        );
        Ok(stats)
    }
}

#[derive(Debug)]
pub struct PipelineStats {
    pub establishments: usize,
    pub details: usize,
    pub inspections: usize,
    pub output_dir: PathBuf,
}

impl PipelineStats {
    fn from_result(result: &CrawlResult, output_dir: PathBuf) -> Self {
        Self {
            establishments: result.summaries.len(),
            details: result.details.len(),
            inspections: result.inspections.len(),
            output_dir,
        }
    }
}
