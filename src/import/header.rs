//! Header row detection.
use crate::import::ImportError;
use crate::spreadsheet::cell::is_blank;
use crate::spreadsheet::Scalar;
use crate::spreadsheet::Sheet;
use serde::Serialize;

/// How the header row of a sheet is located.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum HeaderPolicy {
    /// First row holding a cell whose normalized text starts with the marker
    /// (case-insensitive). Fails when no row matches.
    ExactMarker(String),
    /// First row holding any non-blank cell; row 1 for an empty sheet.
    FirstNonEmpty,
    /// First row holding at least this many non-blank cells. Fails when no
    /// row qualifies.
    MinPopulated(usize),
}

impl HeaderPolicy {
    pub fn marker(text: &str) -> Self {
        HeaderPolicy::ExactMarker(text.to_owned())
    }
}

/// Collapses runs of whitespace (line breaks included) to one space and trims.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_marker(text: &str) -> String {
    normalize(text).to_lowercase()
}

/// Returns the 1-based index of the header row of `sheet`.
///
/// Rows are scanned in sheet order and the first qualifying row wins, so the
/// result is stable for a given sheet and policy.
pub fn detect_header(sheet: &Sheet, policy: &HeaderPolicy) -> Result<usize, ImportError> {
    let mut rows = sheet.rows.iter().enumerate().map(|(index, row)| (index + 1, row));
    match policy {
        HeaderPolicy::ExactMarker(marker) => {
            let expected = normalize_marker(marker);
            rows.find(|(_, row)| {
                row.values()
                    .flatten()
                    .filter(|value| !value.is_blank())
                    .any(|value| normalize_marker(value.text()).starts_with(&expected))
            })
            .map(|(index, _)| index)
            .ok_or_else(|| ImportError::HeaderNotFound {
                sheet: sheet.name.to_owned(),
                marker: marker.to_owned(),
            })
        }
        HeaderPolicy::FirstNonEmpty => Ok(rows
            .find(|(_, row)| row.values().any(|value| !is_blank(value.as_ref())))
            .map(|(index, _)| index)
            .unwrap_or(1)),
        HeaderPolicy::MinPopulated(minimum) => rows
            .find(|(_, row)| populated(row.values().map(Option::as_ref)) >= *minimum)
            .map(|(index, _)| index)
            .ok_or_else(|| ImportError::NoPopulatedRow {
                sheet: sheet.name.to_owned(),
                minimum: *minimum,
            }),
    }
}

fn populated<'a>(values: impl Iterator<Item = Option<&'a Scalar>>) -> usize {
    values.filter(|value| !is_blank(*value)).count()
}
