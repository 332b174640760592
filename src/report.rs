//! Wire shapes for QuickBooks report responses and the normalized row tree
//! the parsers walk.
//!
//! The upstream Report API returns a deeply nested, duck-typed structure:
//! any row may carry a `Header` banner, a list of nested rows, a `Summary`
//! banner, leaf `ColData` cells, or several of these at once, and any of
//! them may be absent. The wire structs below accept all of that via
//! `#[serde(default)]`; [`ReportRow`] is the cleaned-up tree built from it.

use serde::Deserialize;

/// Top-level report payload. Everything except the row tree is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Report {
    #[serde(rename = "Rows", default)]
    pub rows: Rows,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rows {
    #[serde(rename = "Row", default)]
    pub row: Vec<Row>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Row {
    #[serde(rename = "Header")]
    pub header: Option<Banner>,
    #[serde(rename = "Summary")]
    pub summary: Option<Banner>,
    #[serde(rename = "ColData", default)]
    pub col_data: Vec<ColData>,
    #[serde(rename = "Rows", default)]
    pub rows: Rows,
    #[serde(rename = "type")]
    pub row_type: Option<String>,
}

/// A labeled banner row (section header or section total).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Banner {
    #[serde(rename = "ColData", default)]
    pub col_data: Vec<ColData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColData {
    #[serde(default)]
    pub value: Option<String>,
}

/// Column values of one row, with absent cells as empty strings.
pub type Cells = Vec<String>;

/// Normalized report tree. A leaf line item becomes [`ReportRow::Data`];
/// everything that nests becomes a [`ReportRow::Group`] carrying its own
/// header and summary banners, because a header classifies both the group's
/// descendants and the rows that follow it at the same level.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRow {
    Data(Cells),
    Group {
        header: Option<Cells>,
        children: Vec<ReportRow>,
        summary: Option<Cells>,
    },
}

impl Report {
    /// Normalizes the wire payload into the typed tree.
    pub fn normalize(&self) -> Vec<ReportRow> {
        normalize_rows(&self.rows.row)
    }
}

fn normalize_rows(rows: &[Row]) -> Vec<ReportRow> {
    rows.iter().filter_map(normalize_row).collect()
}

fn normalize_row(row: &Row) -> Option<ReportRow> {
    let is_data = row.row_type.as_deref() == Some("Data") && !row.col_data.is_empty();
    let has_group_parts =
        row.header.is_some() || row.summary.is_some() || !row.rows.row.is_empty();

    if is_data && !has_group_parts {
        return Some(ReportRow::Data(cells(&row.col_data)));
    }

    if has_group_parts {
        let mut children = Vec::new();
        if is_data {
            children.push(ReportRow::Data(cells(&row.col_data)));
        }
        children.extend(normalize_rows(&row.rows.row));

        return Some(ReportRow::Group {
            header: row.header.as_ref().map(|b| cells(&b.col_data)),
            children,
            summary: row.summary.as_ref().map(|b| cells(&b.col_data)),
        });
    }

    // Rows with no recognizable shape (e.g. bare ColData without a Data
    // type) carry nothing either parse mode reads.
    None
}

fn cells(col_data: &[ColData]) -> Cells {
    col_data
        .iter()
        .map(|c| c.value.clone().unwrap_or_default())
        .collect()
}

/// Parses a report amount string: strips `$` and thousands separators and
/// treats a parenthesized value as negative. Unparseable input yields 0.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw.trim().replace(['$', ','], "");
    let (negated, body) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    let value: f64 = body.trim().parse().unwrap_or(0.0);
    if negated {
        -value
    } else {
        value
    }
}
