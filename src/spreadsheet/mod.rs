//! # Workbook Container Reading
//!
//! Decodes a zipped SpreadsheetML package into ordered sheets of sparse rows.
//! Only the parts needed for data extraction are read: the workbook manifest,
//! its relationship table, the shared string pool and each worksheet's
//! `sheetData`. Styles, formulas and drawings are ignored.
pub(crate) mod cell;
pub(crate) mod excel;
pub mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

pub use cell::Scalar;
pub use sheet::Row;
pub use sheet::Sheet;
pub use sheet::Workbook;

use thiserror::Error;

/// Errors raised while decoding the workbook package.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required part is missing from the archive
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    /// The manifest declares no sheets
    #[error("Workbook '{0}' declares no sheets")]
    SpreadsheetEmptyError(String),

    /// A manifest element lacks a required attribute
    #[error("Element <{element}> is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    /// A sheet refers to a relationship id the relationship table lacks
    #[error("Sheet '{sheet}' refers to unknown relationship '{id}'")]
    MissingRelationship { sheet: String, id: String },

    /// A shared string reference points past the end of the pool
    #[error("Shared string index {index} out of range (pool holds {size} strings)")]
    SharedStringIndex { index: usize, size: usize },

    /// A row number beyond the last row a worksheet can hold
    #[error("Row {0} exceeds the worksheet limit of 1048576 rows")]
    RowOutOfRange(usize),

    /// A cell reference that is not column letters followed by a row number
    #[error("Invalid cell reference '{0}'")]
    CellReferenceError(String),
}
