use crate::error::LabsheetError;
use crate::spreadsheet::cell::Scalar;
use crate::spreadsheet::xlsx;
use crate::spreadsheet::SpreadsheetError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use zip::ZipArchive;

/// One sheet row: 1-based column index to value.
///
/// Columns absent from the map are blank; a present `None` is a cell element
/// with no value.
pub type Row = BTreeMap<usize, Option<Scalar>>;

/// Highest row number a SpreadsheetML worksheet can hold.
pub(crate) const MAX_ROWS: usize = 1_048_576;

/// Sheet row number of a `<row>` element given its `r` attribute and the
/// next free position; advances `next_row` past it.
///
/// A row without a number, or whose number does not advance, takes the next
/// physical position. Positions past [`MAX_ROWS`] are rejected.
pub(crate) fn row_position(next_row: &mut usize, number: Option<usize>) -> Result<usize, SpreadsheetError> {
    let position = number.filter(|number| *number >= *next_row).unwrap_or(*next_row);
    if position > MAX_ROWS {
        return Err(SpreadsheetError::RowOutOfRange(position));
    }
    *next_row = position + 1;
    Ok(position)
}

/// A sheet as read from the package.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    /// Sheet name, unique within its workbook
    pub name: String,
    /// Rows in sheet order; `rows[i]` is sheet row `i + 1`
    pub rows: Vec<Row>,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            rows: Vec::new(),
        }
    }

    /// Returns the row at a 1-based index.
    pub fn row(&self, index: usize) -> Option<&Row> {
        index.checked_sub(1).and_then(|index| self.rows.get(index))
    }

    /// Opens a new row.
    ///
    /// `number` is the row's `r` attribute, positioned by [`row_position`].
    /// Skipped row numbers are filled with empty rows so positions stay
    /// aligned with sheet row numbers.
    pub(crate) fn start_row(&mut self, number: Option<usize>) -> Result<(), SpreadsheetError> {
        let mut next = self.rows.len() + 1;
        let position = row_position(&mut next, number)?;
        self.rows.resize_with(position - 1, Row::new);
        self.rows.push(Row::new());
        Ok(())
    }

    /// Stores a cell in the current row.
    pub(crate) fn insert(&mut self, column: usize, value: Option<Scalar>) {
        if self.rows.is_empty() {
            self.rows.push(Row::new());
        }
        if let Some(row) = self.rows.last_mut() {
            row.insert(column, value);
        }
    }
}

/// An immutable, fully decoded workbook.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    /// Sheets in manifest declaration order
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Reads a workbook from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Workbook, LabsheetError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Reads a workbook from in-memory bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Workbook, LabsheetError> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Reads a workbook from any seekable byte source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Workbook, LabsheetError> {
        let mut zip = ZipArchive::new(reader)?;
        let sheets = xlsx::read_sheets(&mut zip)?;
        Ok(Workbook { sheets })
    }

    /// Sheet names in manifest order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    /// Looks a sheet up by exact name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}
