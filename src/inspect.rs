//! Header inspection of template workbooks.
//!
//! Reports, for every sheet, the first row with at least
//! [`INSPECTION_MIN_POPULATED`] populated cells, and compares reports of
//! several templates.
use crate::error::LabsheetError;
use crate::import::header::detect_header;
use crate::import::HeaderPolicy;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;
use serde::Serialize;
use std::path::Path;

/// Populated cells a row needs to count as a header during inspection.
pub const INSPECTION_MIN_POPULATED: usize = 3;

/// Header report of one sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SheetInspection {
    pub name: String,
    /// 1-based header row, `None` when no row qualifies
    pub header_row: Option<usize>,
    /// Trimmed header texts for columns 1 through the last populated one,
    /// blanks as empty strings
    pub header_values: Vec<String>,
}

/// Inspects every sheet of a decoded workbook in manifest order.
pub fn inspect_workbook(workbook: &Workbook) -> Vec<SheetInspection> {
    workbook.sheets.iter().map(inspect_sheet).collect()
}

/// Reads and inspects a workbook file.
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<Vec<SheetInspection>, LabsheetError> {
    Ok(inspect_workbook(&Workbook::open(path)?))
}

fn inspect_sheet(sheet: &Sheet) -> SheetInspection {
    let header_row = detect_header(sheet, &HeaderPolicy::MinPopulated(INSPECTION_MIN_POPULATED)).ok();
    let header_values = header_row
        .and_then(|index| sheet.row(index))
        .map(|row| {
            let populated = row
                .iter()
                .filter_map(|(column, value)| value.as_ref().map(|value| (*column, value.text().trim())))
                .filter(|(_, text)| !text.is_empty())
                .collect::<Vec<_>>();
            let width = populated.iter().map(|(column, _)| *column).max().unwrap_or(0);
            let mut values = vec![String::new(); width];
            for (column, text) in populated {
                values[column - 1] = text.to_owned();
            }
            values
        })
        .unwrap_or_default();

    SheetInspection {
        name: sheet.name.to_owned(),
        header_row,
        header_values,
    }
}

/// True when every report lists the same sheets with the same header rows
/// and header values as the first one.
pub fn mapping_consistent(reports: &[Vec<SheetInspection>]) -> bool {
    match reports.split_first() {
        Some((first, rest)) => rest.iter().all(|report| report == first),
        None => true,
    }
}
