//! # Labsheet
//!
//! Imports laboratory project workbooks (zipped SpreadsheetML packages) into
//! ordered relational storage and rebuilds workbooks from it.
//!
//! ## Pipeline
//!
//! 1. **Read**: [`Workbook`] decodes the package without a spreadsheet
//!    library: manifest, relationships, shared strings and `sheetData`.
//! 2. **Parse**: [`parse`] locates each sheet's header row under its
//!    [`HeaderPolicy`] and extracts the rows below it into ordered records,
//!    stopping at the first blank row.
//! 3. **Persist**: [`persist`] replaces a project's sheets and rows in one
//!    transaction, keeping sheet order, row order and column order.
//! 4. **Reconstruct**: [`reconstruct`] rewrites the data region of every
//!    sheet of a base template from storage.
//!
//! ## Example
//!
//! ```no_run
//! use labsheet::{DuckDbStore, ImportTemplate};
//!
//! # fn main() -> Result<(), labsheet::LabsheetError> {
//! let mut store = DuckDbStore::open("projects.duckdb")?;
//! labsheet::import_file(&mut store, 1, "SG866-project.xlsx", &ImportTemplate::sg866())?;
//! let template = std::fs::read("SG866-template.xlsx")?;
//! let bytes = labsheet::reconstruct(&mut store, 1, &template)?;
//! std::fs::write("export_1.xlsx", bytes)?;
//! # Ok(())
//! # }
//! ```
pub mod database;
pub mod error;
pub mod export;
pub(crate) mod helpers;
pub mod import;
pub mod inspect;
pub mod spreadsheet;

#[cfg(test)]
mod fixtures;

pub use database::DuckDbStore;
pub use database::ProjectId;
pub use database::ProjectRepository;
pub use error::ErrorKind;
pub use error::LabsheetError;
pub use export::reconstruct;
pub use import::parse;
pub use import::HeaderPolicy;
pub use import::ImportTemplate;
pub use import::ParsedWorkbook;
pub use spreadsheet::Workbook;

use std::path::Path;

/// Stores a parsed workbook as project `project_id`, replacing any previous
/// import of it.
pub fn persist<S: ProjectRepository>(
    store: &mut S,
    project_id: ProjectId,
    parsed: &ParsedWorkbook,
) -> Result<(), LabsheetError> {
    store.replace_project(project_id, &parsed.template_name, &parsed.sheets)?;
    Ok(())
}

/// Reads, parses and persists a workbook file in one call.
///
/// Nothing is written unless the whole workbook parses.
pub fn import_file<S: ProjectRepository, P: AsRef<Path>>(
    store: &mut S,
    project_id: ProjectId,
    path: P,
    template: &ImportTemplate,
) -> Result<ParsedWorkbook, LabsheetError> {
    let parsed = import::parse_file(path, template)?;
    persist(store, project_id, &parsed)?;
    Ok(parsed)
}
