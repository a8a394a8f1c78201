//! # Project Export
//!
//! Rebuilds a workbook from a stored project and a base template. The
//! template defines which sheets exist; for each of them the data region is
//! rewritten from storage, and every other package part is passed through
//! byte-identical.
pub(crate) mod calc_chain;
pub(crate) mod sheet_writer;
pub(crate) mod zip_patcher;

use crate::database::ProjectId;
use crate::database::ProjectRepository;
use crate::database::StoredProject;
use crate::error::LabsheetError;
use crate::error::ResultMessage;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::xlsx::load_workbook;
use crate::spreadsheet::SpreadsheetError;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;
use tracing::info;
use tracing::warn;
use zip::ZipArchive;

/// Reads `project_id` from `store` and exports it onto `template`.
///
/// Fails with a project-not-found error, producing nothing, when the project
/// is not stored.
pub fn reconstruct<S: ProjectRepository>(
    store: &mut S,
    project_id: ProjectId,
    template: &[u8],
) -> Result<Vec<u8>, LabsheetError> {
    let project = store.read_project(project_id)?;
    export_project(&project, template)
}

/// Exports a stored project onto the template bytes.
///
/// Template sheets the project lacks are cleared of all rows. Stored sheets
/// the template lacks are skipped. The calculation chain is dropped since it
/// would reference removed formula cells.
pub fn export_project(project: &StoredProject, template: &[u8]) -> Result<Vec<u8>, LabsheetError> {
    let mut zip = ZipArchive::new(Cursor::new(template))?;
    let entries = load_workbook(&mut zip)?;

    for sheet in &project.sheets {
        if !entries.iter().any(|(name, _)| name == &sheet.name) {
            warn!(project_id = project.id, sheet = %sheet.name, "Stored sheet absent from export template, skipped");
        }
    }

    let mut replacements = HashMap::with_capacity(entries.len());
    for (name, path) in &entries {
        let part = zip
            .resolve_name(path)
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
        let xml = zip
            .read_bytes(&part)?
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
        let stored = project.sheet(name);
        let rewritten = sheet_writer::rewrite_sheet(&xml, stored)
            .with_prefix(&format!("Sheet '{name}' ({path})"))?;
        debug!(sheet = %name, part = %part, rows = stored.map(|sheet| sheet.rows.len()).unwrap_or(0), "Rewrote sheet");
        replacements.insert(part, rewritten);
    }

    let removed = calc_chain::remove_calc_chain(&mut zip, &mut replacements)?
        .into_iter()
        .collect::<Vec<_>>();
    if !removed.is_empty() {
        debug!(project_id = project.id, "Dropped calculation chain");
    }

    let bytes = zip_patcher::patch_zip(template, &replacements, &removed)?;
    info!(project_id = project.id, sheets = entries.len(), bytes = bytes.len(), "Exported project");
    Ok(bytes)
}
