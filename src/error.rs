use thiserror::Error;

/// Main error type for the labsheet crate.
/// Aggregates errors from the standard library, dependencies and every internal module.
#[derive(Error, Debug)]
pub enum LabsheetError {
    #[error("{0}")]
    WithContextError(String, ErrorKind),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Import module errors
    #[error("{0}")]
    ImportError(#[from] crate::import::ImportError),

    // Database module errors
    #[error("{0}")]
    StoreError(#[from] crate::database::StoreError),
}

/// Failure categories callers dispatch on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable archive or malformed/missing workbook part.
    Format,
    /// A sheet's header row could not be located.
    HeaderNotFound,
    /// A configured sheet is absent from the workbook.
    MissingSheet,
    /// Uniqueness violation or write conflict; the transaction was rolled back.
    PersistenceConflict,
    /// The requested project is not stored.
    ProjectNotFound,
    /// Any other storage failure.
    Storage,
    /// Filesystem failure outside the archive.
    Io,
}

impl LabsheetError {
    /// Classifies this error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use crate::database::StoreError;
        use crate::import::ImportError;
        match self {
            LabsheetError::WithContextError(_, kind) => *kind,
            LabsheetError::IoError(_) => ErrorKind::Io,
            LabsheetError::ImportError(ImportError::MissingSheet { .. }) => ErrorKind::MissingSheet,
            LabsheetError::ImportError(_) => ErrorKind::HeaderNotFound,
            LabsheetError::StoreError(StoreError::Conflict { .. }) => ErrorKind::PersistenceConflict,
            LabsheetError::StoreError(StoreError::ProjectNotFound(_)) => ErrorKind::ProjectNotFound,
            LabsheetError::StoreError(_) => ErrorKind::Storage,
            _ => ErrorKind::Format,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, LabsheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| {
            let kind = e.kind();
            LabsheetError::WithContextError(format!("{}: {}", message, e), kind)
        })
    }
}
