use std::fmt;

use crate::aggregate::CrawlResult;
use crate::models::row_label;

/// Failures while reading a response body.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing required state field {0}")]
    MissingStateField(&'static str),

    #[error("no table matching {0}")]
    TableNotFound(String),

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Anything that stops a crawl. None of these are retried: the remote
/// session only accepts the payload emitted by its latest response.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("{method} {url} failed: {source}")]
    Network {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("unexpected server state: expected {expected} ({detail})")]
    State {
        expected: &'static str,
        detail: String,
    },
}

/// Where in the list/detail/back cycle a crawl was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub page: Option<u32>,
    pub row: Option<usize>,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.page, self.row) {
            (None, _) => write!(f, "landing page"),
            (Some(page), None) => write!(f, "page {}", page),
            (Some(page), Some(row)) => write!(f, "page {}, row {}", page, row_label(row)),
        }
    }
}

/// A crawl that aborted, carrying whatever had been aggregated before it did.
#[derive(Debug, thiserror::Error)]
#[error("crawl aborted at {position}: {error}")]
pub struct CrawlFailure {
    pub position: Position,
    #[source]
    pub error: CrawlError,
    pub partial: Box<CrawlResult>,
}
