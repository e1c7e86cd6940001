pub mod detail;
pub mod error;
pub mod http_client;
pub mod list;
pub mod machine;
pub mod parsers;
pub mod state;

use crate::aggregate::CrawlResult;
use crate::config::{Endpoints, ScraperConfig};
use crate::models::{row_label, RowKey};
use anyhow::Result;
use scraper::Html;
use std::num::NonZeroU32;
use tracing::{debug, error, info};
use url::Url;

use self::error::{CrawlError, CrawlFailure, Position};
use self::http_client::Transport;
use self::machine::{Endpoint, NavState, Navigator, Outgoing};
use self::parsers::{extract_hidden_fields, has_table, page_title, TableSelector};
use self::state::StatePayload;

/// Fail with a state error unless `doc` is the view we navigated to.
/// Session expiry and server error pages still carry a view state, so the
/// hidden fields alone cannot tell us where the server thinks we are.
pub(crate) fn expect_view(
    doc: &Html,
    marker: &TableSelector,
    expected: &'static str,
) -> Result<(), CrawlError> {
    if has_table(doc, marker)? {
        return Ok(());
    }
    Err(CrawlError::State {
        expected,
        detail: format!("no {} in page titled {:?}", marker, page_title(doc)),
    })
}

// ── Crawler ───────────────────────────────────────────────────────────────────

/// Replays the portal's list → detail → back postback cycle over one session.
pub struct InspectionCrawler<T: Transport> {
    transport: T,
    endpoints: Endpoints,
    category_filter: String,
    detail_table: TableSelector,
}

impl<T: Transport> InspectionCrawler<T> {
    pub fn new(transport: T, config: &ScraperConfig) -> Result<Self> {
        let ordinal = TableSelector::ordinal(config.detail_table_ordinal);
        let detail_table = match &config.detail_table_selector {
            Some(css) => TableSelector::css(css.as_str()).or(ordinal),
            None => ordinal,
        };

        Ok(Self {
            transport,
            endpoints: config.endpoints()?,
            category_filter: config.category_filter.clone(),
            detail_table,
        })
    }

    /// Crawl `page_count` listing pages, optionally opening every row's
    /// detail view. Requests are strictly sequential; the first failure ends
    /// the crawl and hands back whatever was gathered so far.
    pub async fn scrape(
        &self,
        page_count: NonZeroU32,
        with_detail: bool,
    ) -> Result<CrawlResult, CrawlFailure> {
        let nav = Navigator::new(page_count.get(), with_detail, self.category_filter.as_str());
        let mut result = CrawlResult::new();
        let mut payload = StatePayload::new();
        let mut rows_on_page = 0usize;
        let mut step = nav.start();

        while let Some(request) = step.request.take() {
            let state = step.state;
            announce(state, page_count.get());

            match self.visit(state, request, &mut payload, &mut result).await {
                Ok(Some(rows)) => rows_on_page = rows,
                Ok(None) => {}
                Err(err) => {
                    let position = Position {
                        page: state.page(),
                        row: state.row(),
                    };
                    error!("Crawl aborted at {}: {}", position, err);
                    return Err(CrawlFailure {
                        position,
                        error: err,
                        partial: Box::new(result),
                    });
                }
            }

            step = nav.transition(state, rows_on_page, &payload);
        }

        info!(
            "Crawl complete: {} establishments, {} details, {} inspections",
            result.summaries.len(),
            result.details.len(),
            result.inspections.len()
        );
        Ok(result)
    }

    /// Send one request and fold its response into `payload` and `result`.
    /// Returns the rendered row count when the response is a listing page.
    async fn visit(
        &self,
        state: NavState,
        request: Outgoing,
        payload: &mut StatePayload,
        result: &mut CrawlResult,
    ) -> Result<Option<usize>, CrawlError> {
        let url = self.url(request.endpoint());
        let body = match &request {
            Outgoing::Get(_) => self.transport.get(url).await?,
            Outgoing::Post(_, form) => self.transport.post(url, form).await?,
        };

        // Html is !Send; keep it clear of the await above
        let doc = Html::parse_document(&body);
        payload.merge(extract_hidden_fields(&doc)?);

        match state {
            NavState::Landing | NavState::Done => Ok(None),
            NavState::ListPage { page } => list::absorb_page(&doc, page, result).map(Some),
            NavState::DetailView { page, row } => {
                detail::absorb_detail(&doc, RowKey::new(page, row), &self.detail_table, result)
                    .map(|_| None)
            }
            NavState::Returning { page, row } => {
                detail::absorb_return(&doc, RowKey::new(page, row)).map(|_| None)
            }
        }
    }

    fn url(&self, endpoint: Endpoint) -> &Url {
        match endpoint {
            Endpoint::Establishments => &self.endpoints.establishments,
            Endpoint::Inspections => &self.endpoints.inspections,
        }
    }
}

fn announce(state: NavState, page_count: u32) {
    match state {
        NavState::Landing => info!("Opening establishment listing"),
        NavState::ListPage { page } => info!("Scraping page {} of {}", page, page_count),
        NavState::DetailView { page, row } => {
            info!("Scraping detail for page {}, row {}", page, row_label(row))
        }
        NavState::Returning { page, row } => {
            debug!("Returning to list from page {}, row {}", page, row_label(row))
        }
        NavState::Done => {}
    }
}
