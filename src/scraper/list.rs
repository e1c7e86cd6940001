use scraper::Html;
use tracing::{info, warn};

use super::error::CrawlError;
use super::expect_view;
use super::machine::LIST_GRID_ID;
use super::parsers::{extract_grid, TableSelector};
use crate::aggregate::CrawlResult;
use crate::models::{EstablishmentSummary, RowKey};

/// Absorb one listing page into `result`.
///
/// Returns the number of rows rendered in the grid. That count, not the
/// number of new rows, decides how many detail buttons exist on the page.
pub fn absorb_page(doc: &Html, page: u32, result: &mut CrawlResult) -> Result<usize, CrawlError> {
    let grid_sel = TableSelector::id(LIST_GRID_ID);
    expect_view(doc, &grid_sel, "establishment list")?;

    let grid = extract_grid(doc, &grid_sel)?;
    let rendered = grid.len();
    if grid.is_empty() {
        warn!("Page {} rendered no establishments; past the last page?", page);
    }

    let added = result.summaries.extend(
        grid.records()
            .into_iter()
            .enumerate()
            .map(|(row, fields)| EstablishmentSummary {
                key: RowKey::new(page, row),
                fields,
            }),
    );

    info!("  Page {}: {} establishments ({} new)", page, rendered, added);
    Ok(rendered)
}
