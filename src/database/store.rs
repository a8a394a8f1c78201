//! Embedded DuckDB implementation of [`ProjectRepository`].
use crate::database::ProjectId;
use crate::database::ProjectRepository;
use crate::database::ProjectSummary;
use crate::database::StoreError;
use crate::database::StoredProject;
use crate::database::StoredRow;
use crate::database::StoredSheet;
use crate::import::ParsedSheet;
use chrono::SecondsFormat;
use chrono::Utc;
use duckdb::params;
use duckdb::Connection;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Project store backed by one DuckDB connection.
///
/// DuckDB runs every transaction against a snapshot, so a reader on another
/// connection never observes a half-applied replace.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens a second connection to the same database.
    pub fn try_clone(&self) -> Result<Self, StoreError> {
        Ok(Self { conn: self.conn.try_clone()? })
    }

    fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }
}

impl ProjectRepository for DuckDbStore {
    fn replace_project(
        &mut self,
        project_id: ProjectId,
        template_name: &str,
        sheets: &[ParsedSheet],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        write_project(&tx, project_id, template_name, sheets)
            .and_then(|()| Ok(tx.commit()?))
            .map_err(|error| classify(project_id, error))?;

        let rows = sheets
            .iter()
            .map(|sheet| format!("{}={}", sheet.name, sheet.records.len()))
            .collect::<Vec<_>>();
        info!(project_id, template = template_name, sheets = sheets.len(), rows = ?rows, "Persisted project");
        Ok(())
    }

    fn read_project(&mut self, project_id: ProjectId) -> Result<StoredProject, StoreError> {
        let tx = self.conn.transaction()?;
        let project = load_project(&tx, project_id)?;
        tx.commit()?;
        Ok(project)
    }

    fn delete_project(&mut self, project_id: ProjectId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM project_rows WHERE project_id = ?", params![project_id])?;
        tx.execute("DELETE FROM project_sheets WHERE project_id = ?", params![project_id])?;
        let deleted = tx.execute("DELETE FROM projects WHERE id = ?", params![project_id])?;
        if deleted == 0 {
            return Err(StoreError::ProjectNotFound(project_id));
        }
        tx.commit().map_err(|error| classify(project_id, error.into()))?;
        info!(project_id, "Deleted project");
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut statement = self.conn.prepare(
            "SELECT p.id, p.template_name, p.imported_at,
                    (SELECT count(*) FROM project_sheets s WHERE s.project_id = p.id),
                    (SELECT count(*) FROM project_rows r WHERE r.project_id = p.id)
             FROM projects p
             ORDER BY p.id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut projects = Vec::new();
        for row in rows {
            let (id, template_name, imported_at, sheet_count, row_count) = row?;
            projects.push(ProjectSummary {
                id,
                template_name,
                imported_at,
                sheet_count: to_index(sheet_count)?,
                row_count: to_index(row_count)?,
            });
        }
        Ok(projects)
    }
}

/// Deletes the project's children, upserts the project, then writes sheets
/// and rows. Row display order runs across all sheets.
fn write_project(
    conn: &Connection,
    project_id: ProjectId,
    template_name: &str,
    sheets: &[ParsedSheet],
) -> Result<(), StoreError> {
    let imported_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    conn.execute("DELETE FROM project_rows WHERE project_id = ?", params![project_id])?;
    conn.execute("DELETE FROM project_sheets WHERE project_id = ?", params![project_id])?;
    conn.execute(
        "INSERT INTO projects (id, template_name, imported_at) VALUES (?, ?, ?)
         ON CONFLICT (id) DO UPDATE SET template_name = excluded.template_name, imported_at = excluded.imported_at",
        params![project_id, template_name, imported_at],
    )?;

    let mut display_order = 0i64;
    for (index, sheet) in sheets.iter().enumerate() {
        let sheet_id: i64 = conn.query_row("SELECT nextval('project_sheets_id_seq')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO project_sheets (id, project_id, display_order, name, header_row, header_columns, header_cells)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                sheet_id,
                project_id,
                index as i64 + 1,
                sheet.name,
                sheet.header_row as i64,
                serde_json::to_string(&sheet.columns)?,
                serde_json::to_string(&sheet.header_cells)?,
            ],
        )?;

        let mut statement = conn.prepare(
            "INSERT INTO project_rows (id, project_id, sheet_id, display_order, row_offset, cell_values)
             VALUES (nextval('project_rows_id_seq'), ?, ?, ?, ?, ?)",
        )?;
        for (row_offset, record) in sheet.records.iter().enumerate() {
            display_order += 1;
            statement.execute(params![
                project_id,
                sheet_id,
                display_order,
                row_offset as i64,
                serde_json::to_string(&record.values)?,
            ])?;
        }
    }
    Ok(())
}

fn load_project(conn: &Connection, project_id: ProjectId) -> Result<StoredProject, StoreError> {
    let project = conn.query_row(
        "SELECT template_name, imported_at FROM projects WHERE id = ?",
        params![project_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    );
    let (template_name, imported_at) = match project {
        Ok(project) => project,
        Err(duckdb::Error::QueryReturnedNoRows) => return Err(StoreError::ProjectNotFound(project_id)),
        Err(error) => return Err(error.into()),
    };

    let mut sheets = load_sheets(conn, project_id)?;
    load_rows(conn, project_id, &mut sheets)?;
    Ok(StoredProject {
        id: project_id,
        template_name,
        imported_at,
        sheets,
    })
}

fn load_sheets(conn: &Connection, project_id: ProjectId) -> Result<Vec<StoredSheet>, StoreError> {
    let mut statement = conn.prepare(
        "SELECT id, display_order, name, header_row, header_columns, header_cells
         FROM project_sheets
         WHERE project_id = ?
         ORDER BY display_order",
    )?;
    let rows = statement.query_map(params![project_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut sheets = Vec::new();
    for row in rows {
        let (id, display_order, name, header_row, columns, header_cells) = row?;
        sheets.push(StoredSheet {
            id,
            display_order: to_index(display_order)?,
            name,
            header_row: to_index(header_row)?,
            columns: serde_json::from_str(&columns)?,
            header_cells: serde_json::from_str(&header_cells)?,
            rows: Vec::new(),
        });
    }
    Ok(sheets)
}

fn load_rows(conn: &Connection, project_id: ProjectId, sheets: &mut [StoredSheet]) -> Result<(), StoreError> {
    let positions = sheets
        .iter()
        .enumerate()
        .map(|(position, sheet)| (sheet.id, position))
        .collect::<HashMap<_, _>>();
    let mut statement = conn.prepare(
        "SELECT sheet_id, display_order, row_offset, cell_values
         FROM project_rows
         WHERE project_id = ?
         ORDER BY display_order",
    )?;
    let rows = statement.query_map(params![project_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    for row in rows {
        let (sheet_id, display_order, row_offset, values) = row?;
        let position = positions.get(&sheet_id).ok_or_else(|| {
            StoreError::InvalidData(format!("Row {display_order} refers to unknown sheet {sheet_id}"))
        })?;
        sheets[*position].rows.push(StoredRow {
            display_order: to_index(display_order)?,
            row_offset: to_index(row_offset)?,
            values: serde_json::from_str(&values)?,
        });
    }
    Ok(())
}

fn to_index(value: i64) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::InvalidData(format!("Negative position {value}")))
}

/// Reports constraint violations and write-write conflicts as [`StoreError::Conflict`].
fn classify(project_id: ProjectId, error: StoreError) -> StoreError {
    match error {
        StoreError::DuckDb(error) => {
            let message = error.to_string();
            let lowercase = message.to_lowercase();
            if lowercase.contains("constraint") || lowercase.contains("conflict") {
                StoreError::Conflict { project_id, message }
            } else {
                StoreError::DuckDb(error)
            }
        }
        error => error,
    }
}
