//! Append-only accumulation of the three output tables.

use std::collections::HashSet;

use tracing::warn;

use crate::models::{EstablishmentDetail, EstablishmentSummary, InspectionRecord, Record};

/// An append-only table that drops (and logs) rows it has already seen.
#[derive(Debug, Clone)]
pub struct Table<R: Record> {
    rows: Vec<R>,
    seen: HashSet<R::DedupKey>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<R: Record> Table<R> {
    /// Returns `false` when `row` duplicates one already held.
    pub fn push(&mut self, row: R) -> bool {
        if !self.seen.insert(row.dedup_key()) {
            warn!("Dropping duplicate row (page {}, row {})", row.key().page, row.key().label());
            return false;
        }
        self.rows.push(row);
        true
    }

    /// Appends every row, returning how many were new.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = R>) -> usize {
        let mut added = 0;
        for row in rows {
            if self.push(row) {
                added += 1;
            }
        }
        added
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = &R> {
        self.rows.iter().filter(move |r| r.key().page == page)
    }
}

/// Everything one crawl produced.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub summaries: Table<EstablishmentSummary>,
    pub details: Table<EstablishmentDetail>,
    pub inspections: Table<InspectionRecord>,
}

impl CrawlResult {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fields, RowKey};

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        Fields(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_identical_inspection_rescrape_is_dropped() {
        let mut table = Table::default();
        let row = InspectionRecord {
            key: RowKey::new(1, 2),
            fields: fields(&[("Date", "01/02/2023"), ("Score", "95")]),
        };
        assert!(table.push(row.clone()));
        assert!(!table.push(row.clone()));
        // same content on a different establishment is kept
        assert!(table.push(InspectionRecord { key: RowKey::new(1, 3), ..row }));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_summary_count_matches_distinct_rows_per_page() {
        let mut result = CrawlResult::new();
        let rows = [("A", 0), ("B", 1), ("A", 2)];
        let added = result.summaries.extend(rows.iter().map(|(name, i)| EstablishmentSummary {
            key: RowKey::new(1, *i),
            fields: fields(&[("Name", name)]),
        }));
        assert_eq!(added, 2);
        assert_eq!(result.summaries.on_page(1).count(), 2);
        assert_eq!(result.summaries.on_page(2).count(), 0);
    }

    #[test]
    fn test_details_keep_distinct_keys() {
        let mut result = CrawlResult::new();
        for row in 0..3 {
            result.details.push(EstablishmentDetail {
                key: RowKey::new(2, row),
                fields: fields(&[("Address", "1 Main St")]),
            });
        }
        assert_eq!(result.details.len(), 3);
        assert_eq!(result.details.rows()[2].key, RowKey::new(2, 2));
    }
}
