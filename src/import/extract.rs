//! Record extraction below a detected header row.
use crate::import::header::normalize;
use crate::spreadsheet::cell::is_blank;
use crate::spreadsheet::Row;
use crate::spreadsheet::Scalar;
use serde::Deserialize;
use serde::Serialize;

/// One column defined by the header row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderColumn {
    /// 1-based column index in the sheet
    pub column_index: usize,
    /// Normalized header text; not necessarily unique
    pub label: String,
}

/// One extracted data row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    /// 1-based position among the sheet's records
    pub display_order: usize,
    /// Cell values, one per header column in header column order
    pub values: Vec<Option<Scalar>>,
}

/// Reads the column definitions of a header row.
///
/// Blank header cells define no column.
pub fn header_columns(row: &Row) -> Vec<HeaderColumn> {
    row.iter()
        .filter_map(|(column_index, value)| match value {
            Some(value) if !value.is_blank() => Some(HeaderColumn {
                column_index: *column_index,
                label: normalize(value.text()),
            }),
            _ => None,
        })
        .collect()
}

/// The source cells of the header row, one per header column, as they were
/// typed in the sheet.
pub fn header_cells(row: &Row, columns: &[HeaderColumn]) -> Vec<Scalar> {
    columns
        .iter()
        .map(|column| {
            row.get(&column.column_index)
                .cloned()
                .flatten()
                .unwrap_or_else(|| Scalar::Text(column.label.to_owned()))
        })
        .collect()
}

/// Extracts the data rows following `header_row` (1-based).
///
/// Extraction stops before the first row whose header columns are all blank,
/// even when non-blank rows follow it. Cells outside the header columns are
/// ignored.
pub fn extract_records(rows: &[Row], header_row: usize, columns: &[HeaderColumn]) -> Vec<Record> {
    rows.iter()
        .skip(header_row)
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(&column.column_index).cloned().flatten())
                .collect::<Vec<_>>()
        })
        .take_while(|values| values.iter().any(|value| !is_blank(value.as_ref())))
        .enumerate()
        .map(|(index, values)| Record {
            display_order: index + 1,
            values,
        })
        .collect()
}
