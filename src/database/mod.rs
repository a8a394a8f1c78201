//! # Ordered Project Storage
//!
//! Persists parsed workbooks as projects made of ordered sheets and ordered
//! rows, and reads them back in the same order.
//!
//! Ordering is explicit in the data, never implied by insertion order:
//! - sheets carry a `display_order` unique within their project;
//! - rows carry a `display_order` unique across the whole project, in
//!   extraction order over all sheets, plus a 0-based `row_offset` within
//!   their own sheet;
//! - row values are stored as a list in header column order, so labels are
//!   stored once per sheet and never per row.
pub mod store;

pub use store::DuckDbStore;

use crate::import::HeaderColumn;
use crate::import::ParsedSheet;
use crate::spreadsheet::Scalar;
use serde::Serialize;
use thiserror::Error;

/// Project identifier, chosen by the caller.
pub type ProjectId = i64;

/// Errors raised by a [`ProjectRepository`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A write violated a uniqueness constraint or lost a write conflict.
    /// The transaction has been rolled back.
    #[error("Conflict while writing project {project_id}: {message}")]
    Conflict { project_id: ProjectId, message: String },

    #[error("Project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("Invalid store data: {0}")]
    InvalidData(String),
}

/// One stored row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredRow {
    /// 1-based, unique across all sheets of the project
    pub display_order: usize,
    /// 0-based position within the row's own sheet
    pub row_offset: usize,
    /// One value per header column, in header column order
    pub values: Vec<Option<Scalar>>,
}

/// One stored sheet with its rows in order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredSheet {
    pub id: i64,
    /// 1-based, unique within the project
    pub display_order: usize,
    pub name: String,
    /// 1-based header row index in the imported sheet
    pub header_row: usize,
    pub columns: Vec<HeaderColumn>,
    /// Source header cells, one per column
    pub header_cells: Vec<Scalar>,
    pub rows: Vec<StoredRow>,
}

/// A project read back from storage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredProject {
    pub id: ProjectId,
    pub template_name: String,
    /// RFC 3339 UTC timestamp of the last import
    pub imported_at: String,
    pub sheets: Vec<StoredSheet>,
}

impl StoredProject {
    pub fn sheet(&self, name: &str) -> Option<&StoredSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

/// Listing entry for a stored project.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub template_name: String,
    pub imported_at: String,
    pub sheet_count: usize,
    pub row_count: usize,
}

/// Storage of ordered projects.
///
/// Every write is a single transaction: it applies completely or not at all,
/// and concurrent readers see either the state before it or the state after.
pub trait ProjectRepository {
    /// Replaces every sheet and row of `project_id` with `sheets`, creating
    /// the project when it does not exist yet.
    fn replace_project(
        &mut self,
        project_id: ProjectId,
        template_name: &str,
        sheets: &[ParsedSheet],
    ) -> Result<(), StoreError>;

    /// Reads a project with its sheets and rows in display order.
    fn read_project(&mut self, project_id: ProjectId) -> Result<StoredProject, StoreError>;

    /// Deletes a project together with its sheets and rows.
    fn delete_project(&mut self, project_id: ProjectId) -> Result<(), StoreError>;

    /// Lists stored projects by id.
    fn list_projects(&self) -> Result<Vec<ProjectSummary>, StoreError>;
}
