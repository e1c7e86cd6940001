use scraper::Html;
use tracing::{debug, info, warn};

use super::error::CrawlError;
use super::expect_view;
use super::machine::{INSPECTION_GRID_ID, LIST_GRID_ID};
use super::parsers::{extract_grid, extract_transposed_record, TableSelector};
use crate::aggregate::CrawlResult;
use crate::models::{EstablishmentDetail, InspectionRecord, RowKey};

/// Absorb the detail view opened for listing row `key`: the transposed
/// establishment table plus its inspection history.
pub fn absorb_detail(
    doc: &Html,
    key: RowKey,
    detail_table: &TableSelector,
    result: &mut CrawlResult,
) -> Result<(), CrawlError> {
    let history_sel = TableSelector::id(INSPECTION_GRID_ID);
    expect_view(doc, &history_sel, "inspection detail")?;

    let fields = extract_transposed_record(doc, detail_table)?;
    let history = extract_grid(doc, &history_sel)?;
    if fields.is_empty() {
        warn!("Detail table for page {} row {} is empty", key.page, key.label());
    }

    result.details.push(EstablishmentDetail { key, fields });
    let added = result.inspections.extend(
        history
            .records()
            .into_iter()
            .map(|fields| InspectionRecord { key, fields }),
    );

    info!(
        "  Detail page {} row {}: {} inspections ({} new)",
        key.page,
        key.label(),
        history.len(),
        added
    );
    Ok(())
}

/// The "return to list" response must put us back on the listing; its
/// hidden fields are the baseline for whatever is posted next.
pub fn absorb_return(doc: &Html, key: RowKey) -> Result<(), CrawlError> {
    expect_view(doc, &TableSelector::id(LIST_GRID_ID), "establishment list")?;
    debug!("  Back on list after page {} row {}", key.page, key.label());
    Ok(())
}
