use crate::error::LabsheetError;
use crate::spreadsheet::reference::split_reference;
use crate::spreadsheet::SpreadsheetError;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// Types of cell data as flagged by the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    /// Numeric values, the default when `t` is absent
    #[default]
    Number,
    /// Boolean values stored as `0` / `1`
    Boolean,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values (`<is>`)
    InlineString,
    /// Cached string result of a formula
    FormulaString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#N/A`
    Error,
}

impl CellType {
    /// Maps the `t` attribute of a cell to its type.
    pub(crate) fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("s") => Self::SharedString,
            Some("inlineStr") => Self::InlineString,
            Some("str") => Self::FormulaString,
            Some("b") => Self::Boolean,
            Some("d") => Self::IsoDateTime,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }
}

/// A decoded cell value.
///
/// Numbers, dates and booleans keep their literal text from the sheet;
/// nothing is coerced at this layer. The variant records how the value was
/// stored so it can be written back with the same type flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    /// Shared, inline or formula string
    Text(String),
    /// Numeric literal, also used for serial dates
    Number(String),
    /// `0` or `1`
    Boolean(String),
    /// ISO 8601 date/time literal
    Date(String),
    /// Error literal such as `#DIV/0!`
    Error(String),
}

impl Scalar {
    /// The literal text of the value.
    pub fn text(&self) -> &str {
        match self {
            Scalar::Text(text)
            | Scalar::Number(text)
            | Scalar::Boolean(text)
            | Scalar::Date(text)
            | Scalar::Error(text) => text,
        }
    }

    /// True when the text is empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// True for an absent cell, an explicit null, or whitespace-only text.
pub fn is_blank(value: Option<&Scalar>) -> bool {
    value.map(Scalar::is_blank).unwrap_or(true)
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Decodes one `<c>` element.
///
/// Returns the 1-based column index, taken from `reference` when present and
/// `fallback_column` otherwise, together with the decoded value. A cell with
/// no value node decodes to `None`.
pub(crate) fn decode_cell(
    reference: Option<&str>,
    fallback_column: usize,
    kind: CellType,
    raw: Option<String>,
    shared_strings: &[String],
) -> Result<(usize, Option<Scalar>), LabsheetError> {
    let column = match reference {
        Some(reference) => split_reference(reference)
            .map(|(column, _)| column)
            .ok_or_else(|| SpreadsheetError::CellReferenceError(reference.to_owned()))?,
        None => fallback_column,
    };

    let Some(raw) = raw else {
        return Ok((column, None));
    };

    let value = match kind {
        CellType::SharedString => {
            let index = raw.trim().parse::<usize>()?;
            let text = shared_strings.get(index).ok_or(SpreadsheetError::SharedStringIndex {
                index,
                size: shared_strings.len(),
            })?;
            Scalar::Text(text.to_owned())
        }
        CellType::InlineString | CellType::FormulaString => Scalar::Text(raw),
        CellType::Number => Scalar::Number(raw),
        CellType::Boolean => Scalar::Boolean(raw),
        CellType::IsoDateTime => Scalar::Date(raw),
        CellType::Error => Scalar::Error(raw),
    };
    Ok((column, Some(value)))
}
