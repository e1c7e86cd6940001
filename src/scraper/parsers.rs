use std::collections::HashMap;
use std::fmt;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::error::ParseError;
use super::state::{StatePayload, VIEWSTATE, VIEWSTATE_GENERATOR};
use crate::models::{Fields, Grid};

// ── Table selection ───────────────────────────────────────────────────────────

/// How a table is located in a response.
///
/// Grids rendered by the portal carry stable ids. The establishment detail
/// table does not, so it is found by its position among every `<table>` in
/// the document (nested layout tables included, document order, zero-based).
/// Positions shift whenever the upstream layout changes; prefer a selector
/// and keep the ordinal as the fallback via [`TableSelector::or`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelector {
    Id(String),
    Css(String),
    Ordinal(usize),
    Either(Box<TableSelector>, Box<TableSelector>),
}

impl TableSelector {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn ordinal(position: usize) -> Self {
        Self::Ordinal(position)
    }

    /// Try `self`, then `fallback` if nothing matched.
    pub fn or(self, fallback: TableSelector) -> Self {
        Self::Either(Box::new(self), Box::new(fallback))
    }

    fn locate<'a>(&self, doc: &'a Html) -> Result<Option<ElementRef<'a>>, ParseError> {
        match self {
            Self::Id(id) => Ok(tables(doc)?.find(|t| t.value().id() == Some(id.as_str()))),
            Self::Css(css) => {
                let sel = parse_selector(css)?;
                Ok(doc.select(&sel).find(|el| el.value().name() == "table"))
            }
            Self::Ordinal(n) => Ok(tables(doc)?.nth(*n)),
            Self::Either(primary, fallback) => match primary.locate(doc)? {
                Some(table) => Ok(Some(table)),
                None => fallback.locate(doc),
            },
        }
    }
}

impl fmt::Display for TableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "table#{}", id),
            Self::Css(css) => write!(f, "{}", css),
            Self::Ordinal(n) => write!(f, "table[{}]", n),
            Self::Either(a, b) => write!(f, "{} or {}", a, b),
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

fn tables(doc: &Html) -> Result<impl Iterator<Item = ElementRef<'_>>, ParseError> {
    let sel = parse_selector("table")?;
    let found: Vec<ElementRef<'_>> = doc.select(&sel).collect();
    Ok(found.into_iter())
}

// ── Hidden state fields ───────────────────────────────────────────────────────

/// Every named `<input>` in the response, value defaulting to empty.
/// Fails when either view-state field is absent: a postback without them is
/// rejected or misrouted by the server.
pub fn extract_hidden_fields(doc: &Html) -> Result<StatePayload, ParseError> {
    let input_sel = parse_selector("input[name]")?;
    let mut payload = StatePayload::new();

    for input in doc.select(&input_sel) {
        let Some(name) = input.value().attr("name") else { continue };
        let value = input.value().attr("value").unwrap_or_default();
        payload.set(name, value);
    }

    for required in [VIEWSTATE, VIEWSTATE_GENERATOR] {
        if !payload.contains(required) {
            warn!(
                "Response has no {} ({} inputs, title {:?})",
                required,
                payload.len(),
                page_title(doc)
            );
            return Err(ParseError::MissingStateField(required));
        }
    }

    Ok(payload)
}

pub fn page_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel).next().map(cell_text)
}

// ── Grids ─────────────────────────────────────────────────────────────────────

pub fn has_table(doc: &Html, selector: &TableSelector) -> Result<bool, ParseError> {
    Ok(selector.locate(doc)?.is_some())
}

/// Convert the matched table into a [`Grid`], taking column names from a
/// leading `<thead>` row or row of `<th>` cells. Tables without one get positional names
/// ("0", "1", …).
pub fn extract_grid(doc: &Html, selector: &TableSelector) -> Result<Grid, ParseError> {
    let table = selector
        .locate(doc)?
        .ok_or_else(|| ParseError::TableNotFound(selector.to_string()))?;

    let mut rows = direct_rows(table).into_iter().peekable();

    let has_header = rows.peek().is_some_and(|first| is_header_row(*first));
    let header = if has_header { rows.next().map(|(row, _)| row_cells(row)) } else { None };

    let body: Vec<Vec<String>> = rows
        .map(|(row, _)| row_cells(row))
        .filter(|cells| !cells.is_empty())
        .collect();

    let columns = match header {
        Some(names) => unique_names(names),
        None => {
            let width = body.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|i| i.to_string()).collect()
        }
    };

    Ok(Grid { columns, rows: body })
}

/// Read a two-column (field, value) table as a single record keyed by the
/// first column. Rows with an empty field name are layout spacers and skipped.
pub fn extract_transposed_record(doc: &Html, selector: &TableSelector) -> Result<Fields, ParseError> {
    let table = selector
        .locate(doc)?
        .ok_or_else(|| ParseError::TableNotFound(selector.to_string()))?;

    let mut names = Vec::new();
    let mut values = Vec::new();
    for (row, _) in direct_rows(table) {
        let mut cells = row_cells(row).into_iter();
        let Some(name) = cells.next() else { continue };
        if name.is_empty() {
            continue;
        }
        names.push(name);
        values.push(cells.next().unwrap_or_default());
    }

    Ok(Fields(unique_names(names).into_iter().zip(values).collect()))
}

/// `<tr>` elements belonging to this table, not to tables nested inside it,
/// each flagged with whether it sits in the `<thead>`.
fn direct_rows(table: ElementRef<'_>) -> Vec<(ElementRef<'_>, bool)> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push((child, false)),
            section @ ("thead" | "tbody" | "tfoot") => {
                let in_head = section == "thead";
                rows.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|el| el.value().name() == "tr")
                        .map(|tr| (tr, in_head)),
                )
            }
            _ => {}
        }
    }
    rows
}

/// A `<thead>` row is a header whatever its cells; elsewhere it takes a `<th>`.
fn is_header_row((row, in_head): (ElementRef<'_>, bool)) -> bool {
    in_head
        || row
            .children()
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().name() == "th")
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .map(cell_text)
        .collect()
}

/// Cell text with runs of whitespace (including `&nbsp;`) collapsed.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Blank headers become "Unnamed: i"; repeats get ".1", ".2", … suffixes.
fn unique_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if name.is_empty() { format!("Unnamed: {}", i) } else { name };
            let count = seen.entry(name.clone()).or_insert(0);
            let out = if *count == 0 { name } else { format!("{}.{}", name, count) };
            *count += 1;
            out
        })
        .collect()
}
