// ── Row identity ──────────────────────────────────────────────────────────────

/// Zero-padded label for a row index within a list page.
/// 0 → "00" | 19 → "19" | 99 → "99"
pub fn row_label(row: usize) -> String {
    format!("{:02}", row)
}

/// Composite identity of a listing row: the page it was scraped from and its
/// zero-based position on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub page: u32,
    pub row: usize,
}

impl RowKey {
    pub fn new(page: u32, row: usize) -> Self {
        Self { page, row }
    }

    pub fn label(&self) -> String {
        row_label(self.row)
    }
}

// ── Fields ────────────────────────────────────────────────────────────────────

/// Ordered (column, value) pairs for one parsed row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fields(pub Vec<(String, String)>);

impl Fields {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// A table lifted out of an HTML response: header names plus raw cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pair every row with the header names. Short rows are padded with empty
    /// strings; cells beyond the header are dropped.
    pub fn records(&self) -> Vec<Fields> {
        self.rows
            .iter()
            .map(|cells| {
                Fields(
                    self.columns
                        .iter()
                        .enumerate()
                        .map(|(i, col)| (col.clone(), cells.get(i).cloned().unwrap_or_default()))
                        .collect(),
                )
            })
            .collect()
    }
}

// ── Output records ────────────────────────────────────────────────────────────

/// One row of the establishment listing grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EstablishmentSummary {
    pub key: RowKey,
    pub fields: Fields,
}

/// The establishment detail view, transposed into a single record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EstablishmentDetail {
    pub key: RowKey,
    pub fields: Fields,
}

/// One row of an establishment's inspection history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InspectionRecord {
    pub key: RowKey,
    pub fields: Fields,
}

/// Common view over the three output record kinds.
pub trait Record {
    type DedupKey: std::hash::Hash + Eq + Clone + std::fmt::Debug;

    fn key(&self) -> RowKey;
    fn fields(&self) -> &Fields;
    /// Content compared when de-duplicating appends.
    fn dedup_key(&self) -> Self::DedupKey;
}

impl Record for EstablishmentSummary {
    // A listing row's position is incidental: the same establishment
    // rendered twice on one page is one establishment.
    type DedupKey = (u32, Fields);

    fn key(&self) -> RowKey {
        self.key
    }
    fn fields(&self) -> &Fields {
        &self.fields
    }
    fn dedup_key(&self) -> Self::DedupKey {
        (self.key.page, self.fields.clone())
    }
}

impl Record for EstablishmentDetail {
    type DedupKey = (RowKey, Fields);

    fn key(&self) -> RowKey {
        self.key
    }
    fn fields(&self) -> &Fields {
        &self.fields
    }
    fn dedup_key(&self) -> Self::DedupKey {
        (self.key, self.fields.clone())
    }
}

impl Record for InspectionRecord {
    type DedupKey = (RowKey, Fields);

    fn key(&self) -> RowKey {
        self.key
    }
    fn fields(&self) -> &Fields {
        &self.fields
    }
    fn dedup_key(&self) -> Self::DedupKey {
        (self.key, self.fields.clone())
    }
}
