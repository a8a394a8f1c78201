use crate::error::LabsheetError;
use crate::error::ResultMessage;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::decode_cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use std::io::Seek;
use tracing::debug;
use zip::ZipArchive;

/// Workbook manifest part
pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
/// Relationship table of the workbook manifest
pub(crate) const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
/// Shared string pool, optional
pub(crate) const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

// XML tag names for parsing SpreadsheetML parts
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_SHEET: QName = QName(b"sheet");           // Worksheet declaration in the manifest
const TAG_ROW: QName = QName(b"row");               // Row in worksheet
const TAG_CELL: QName = QName(b"c");                // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");      // Inline string value
const TAG_VALUE: QName = QName(b"v");               // Cell value content

/// Reads every worksheet declared in the manifest, in declaration order.
pub(crate) fn read_sheets<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<Sheet>, LabsheetError> {
    let entries = load_workbook(zip)?;
    let shared_strings = load_shared_strings(zip)?;
    let mut sheets = Vec::with_capacity(entries.len());
    for (sheet_name, zip_path) in entries {
        let sheet = load_sheet(zip, &sheet_name, &zip_path, &shared_strings)
            .with_prefix(&format!("Sheet '{sheet_name}' ({zip_path})"))?;
        sheets.push(sheet);
    }
    Ok(sheets)
}

/// Loads the sheet declarations of the workbook manifest.
///
/// Each declaration's relationship id is resolved through the workbook's
/// relationship table to the archive path of its part. Declarations that
/// point at non-worksheet parts (chart sheets, dialog sheets) are skipped.
///
/// # Returns
/// `(sheet_name, zip_path)` pairs in declaration order
pub(crate) fn load_workbook<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<(String, String)>, LabsheetError> {
    let relationships = load_relationships(zip, WORKBOOK_RELATIONSHIPS_PART)?;
    let mut reader = zip.xml_reader(WORKBOOK_PART)?
        .ok_or_else(|| SpreadsheetError::FileError(WORKBOOK_PART.to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?
                .ok_or_else(|| missing_attribute("sheet", "name"))?;
            let id = event.get_local_attribute_value(b"id")?
                .ok_or_else(|| missing_attribute("sheet", "r:id"))?;
            let relationship = relationships.get(id.as_ref()).ok_or_else(|| SpreadsheetError::MissingRelationship {
                sheet: name.to_string(),
                id: id.to_string(),
            })?;
            if relationship.is_worksheet() {
                debug!(sheet = %name, part = %relationship.target, "resolved sheet part");
                sheets.push((name.to_string(), relationship.target.to_owned()));
            } else {
                debug!(sheet = %name, kind = %relationship.kind, "skipping non-worksheet sheet");
            }
        }
    });
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(WORKBOOK_PART.to_owned()))?
    }
    Ok(sheets)
}

/// Loads the shared string pool.
///
/// Every `<si>` item contributes one entry, the concatenation of all its
/// text runs. A workbook without a pool yields an empty one; any shared
/// string reference into it then fails at decode time.
pub(crate) fn load_shared_strings<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<String>, LabsheetError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PART)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = reader.read_text(TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Reads the `sheetData` of one worksheet part into sparse rows.
fn load_sheet<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    sheet_name: &str,
    zip_path: &str,
    shared_strings: &[String],
) -> Result<Sheet, LabsheetError> {
    let mut reader = zip.xml_reader(zip_path)?
        .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_string()))?;
    let mut sheet = Sheet::new(sheet_name);
    let mut col = 0usize;
    let mut reference = None::<String>;
    let mut kind = CellType::default();
    let mut value = None::<String>;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            sheet.start_row(event.parse_attribute_value::<usize>("r")?)?;
            col = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            reference = event.get_attribute_value("r")?.map(|reference| reference.into_owned());
            kind = CellType::from_attribute(event.get_attribute_value("t")?.as_deref());
            value = None;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = Some(reader.read_text(TAG_VALUE, true)?);
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = Some(reader.read_text(TAG_INLINE_STRING, false)?);
        }
        Event::End(event) if event.name() == TAG_CELL => {
            let (column, scalar) = decode_cell(reference.take().as_deref(), col + 1, kind, value.take(), shared_strings)?;
            col = column;
            sheet.insert(column, scalar);
        }
    });
    Ok(sheet)
}

fn missing_attribute(element: &str, attribute: &str) -> SpreadsheetError {
    SpreadsheetError::MissingAttribute {
        element: element.to_owned(),
        attribute: attribute.to_owned(),
    }
}
