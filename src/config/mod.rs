use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Portal root, including the cookieless session segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_establishments_path")]
    pub establishments_path: String,

    /// The "return to list" button posts to the inspection page, not the listing.
    #[serde(default = "default_inspections_path")]
    pub inspections_path: String,

    #[serde(default = "default_category_filter")]
    pub category_filter: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// CSS selector tried before falling back to `detail_table_ordinal`.
    #[serde(default)]
    pub detail_table_selector: Option<String>,

    #[serde(default = "default_detail_table_ordinal")]
    pub detail_table_ordinal: usize,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_true")]
    pub write_partial: bool,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://public.cdpehs.com/UTEnvPbl/(S(k0syxpuqsqqd4heivxxp41if))/".to_string()
}
fn default_establishments_path() -> String {
    "VW_EST_PUBLIC/ShowVW_EST_PUBLICTablePage.aspx".to_string()
}
fn default_inspections_path() -> String {
    "INSPECTION/ShowINSPECTIONTablePage.aspx".to_string()
}
fn default_category_filter() -> String {
    "Food Service".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    250
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.90 Safari/537.36"
        .to_string()
}
fn default_detail_table_ordinal() -> usize {
    8
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_true() -> bool {
    true
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            establishments_path: default_establishments_path(),
            inspections_path: default_inspections_path(),
            category_filter: default_category_filter(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            user_agent: default_user_agent(),
            detail_table_selector: None,
            detail_table_ordinal: default_detail_table_ordinal(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write_partial: true,
        }
    }
}

// ── Endpoints ────────────────────────────────────────────────────────────────

/// Resolved absolute URLs for the two pages the crawl talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub establishments: Url,
    pub inspections: Url,
}

impl ScraperConfig {
    pub fn endpoints(&self) -> Result<Endpoints> {
        // Url::join drops the last path segment unless the base ends in '/'
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        let base = Url::parse(&base).with_context(|| format!("Invalid base_url {:?}", base))?;

        Ok(Endpoints {
            establishments: base
                .join(self.establishments_path.trim_start_matches('/'))
                .context("Invalid establishments_path")?,
            inspections: base
                .join(self.inspections_path.trim_start_matches('/'))
                .context("Invalid inspections_path")?,
        })
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SLC").separator("__"))
            .build()
            .context("Failed to assemble configuration sources")?;

        cfg.try_deserialize()
            .context("Configuration does not match the expected schema")
    }
}
