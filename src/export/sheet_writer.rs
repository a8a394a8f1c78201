//! Rewrites the `sheetData` of one template worksheet.
//!
//! Written cells use inline strings (`t="inlineStr"`) for text so the shared
//! string table of the template never needs rebuilding.
use crate::database::StoredSheet;
use crate::error::LabsheetError;
use crate::helpers::xml::escape;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::import::HeaderColumn;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::row_position;
use crate::spreadsheet::Scalar;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Writer;

const TAG_DIMENSION: QName = QName(b"dimension"); // Used range, stale once rows change
const TAG_SHEET_DATA: QName = QName(b"sheetData");
const TAG_ROW: QName = QName(b"row");

/// Rewrites a worksheet part.
///
/// Rows from the stored header row on are removed and replaced by the
/// stored header and rows. Without a stored sheet every row is removed.
/// Everything outside `sheetData` is copied unchanged except `<dimension>`,
/// which is dropped.
pub(crate) fn rewrite_sheet(xml: &[u8], stored: Option<&StoredSheet>) -> Result<Vec<u8>, LabsheetError> {
    let cutoff = stored.map(|sheet| sheet.header_row).unwrap_or(1);
    let rows = stored.map(stored_rows_xml).unwrap_or_default();

    let mut reader = XmlReader::verbatim(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + rows.len()));
    let mut in_sheet_data = false;
    let mut skipped_depth = 0usize;
    let mut next_row = 1usize;
    while let Some(event) = reader.next()? {
        if skipped_depth > 0 {
            match event {
                Event::Start(_) => skipped_depth += 1,
                Event::End(_) => skipped_depth -= 1,
                _ => (),
            }
            continue;
        }

        match event {
            Event::Start(event) if event.name() == TAG_DIMENSION => skipped_depth = 1,
            Event::Empty(event) if event.name() == TAG_DIMENSION => (),
            Event::Start(event) if event.name() == TAG_SHEET_DATA => {
                in_sheet_data = true;
                writer.write_event(Event::Start(event))?;
            }
            Event::Empty(event) if event.name() == TAG_SHEET_DATA => {
                let end = event.to_end().into_owned();
                writer.write_event(Event::Start(event))?;
                writer.get_mut().extend_from_slice(rows.as_bytes());
                writer.write_event(Event::End(end))?;
            }
            Event::End(event) if event.name() == TAG_SHEET_DATA => {
                in_sheet_data = false;
                writer.get_mut().extend_from_slice(rows.as_bytes());
                writer.write_event(Event::End(event))?;
            }
            Event::Start(event) if in_sheet_data && event.name() == TAG_ROW => {
                if row_position(&mut next_row, event.parse_attribute_value("r")?)? >= cutoff {
                    skipped_depth = 1;
                } else {
                    writer.write_event(Event::Start(event))?;
                }
            }
            Event::Empty(event) if in_sheet_data && event.name() == TAG_ROW => {
                if row_position(&mut next_row, event.parse_attribute_value("r")?)? < cutoff {
                    writer.write_event(Event::Empty(event))?;
                }
            }
            event => writer.write_event(event)?,
        }
    }
    Ok(writer.into_inner())
}

/// The header row followed by one physical row per stored row.
///
/// Header cells are written as they were imported; a column without a stored
/// cell falls back to its label.
fn stored_rows_xml(sheet: &StoredSheet) -> String {
    let mut out = String::with_capacity(4096);
    let header = sheet
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            sheet.header_cells.get(index).cloned().unwrap_or_else(|| Scalar::Text(column.label.to_owned()))
        })
        .collect::<Vec<_>>();
    write_row(&mut out, sheet.header_row, sheet.columns.iter().zip(header.iter().map(Some)));
    for (offset, row) in sheet.rows.iter().enumerate() {
        let values = row.values.iter().map(Option::as_ref);
        write_row(&mut out, sheet.header_row + 1 + offset, sheet.columns.iter().zip(values));
    }
    out
}

fn write_row<'a>(out: &mut String, row: usize, cells: impl Iterator<Item = (&'a HeaderColumn, Option<&'a Scalar>)>) {
    out.push_str(&format!(r#"<row r="{row}">"#));
    for (column, value) in cells {
        if let Some(value) = value {
            write_cell(out, column.column_index, row, value);
        }
    }
    out.push_str("</row>");
}

/// Writes a single `<c>` element typed after the stored scalar.
fn write_cell(out: &mut String, column: usize, row: usize, value: &Scalar) {
    let reference = index_to_reference(column, row);
    match value {
        Scalar::Text(text) => out.push_str(&format!(
            r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            escape(text)
        )),
        Scalar::Number(number) => out.push_str(&format!(r#"<c r="{reference}"><v>{}</v></c>"#, escape(number))),
        Scalar::Boolean(flag) => out.push_str(&format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, escape(flag))),
        Scalar::Date(date) => out.push_str(&format!(r#"<c r="{reference}" t="d"><v>{}</v></c>"#, escape(date))),
        Scalar::Error(error) => out.push_str(&format!(r#"<c r="{reference}" t="e"><v>{}</v></c>"#, escape(error))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::StoredRow;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        r#"<dimension ref="A1:C4"/>"#,
        r#"<sheetData>"#,
        r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#,
        r#"<row r="2"><c r="A2" t="s"><v>1</v></c></row>"#,
        r#"<row r="3"><c r="A3"><v>1</v></c></row>"#,
        r#"<row r="4"/>"#,
        r#"</sheetData>"#,
        r#"<mergeCells count="1"><mergeCell ref="A1:C1"/></mergeCells>"#,
        r#"</worksheet>"#,
    );

    fn stored(header_row: usize, rows: Vec<Vec<Option<Scalar>>>) -> StoredSheet {
        StoredSheet {
            id: 1,
            display_order: 1,
            name: "Data".into(),
            header_row,
            columns: vec![
                HeaderColumn { column_index: 1, label: "ID".into() },
                HeaderColumn { column_index: 3, label: "R&D".into() },
            ],
            header_cells: vec![Scalar::Text("ID".into()), Scalar::Text("R&D".into())],
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(offset, values)| StoredRow { display_order: offset + 1, row_offset: offset, values })
                .collect(),
        }
    }

    fn rewrite(template: &str, sheet: Option<&StoredSheet>) -> String {
        String::from_utf8(rewrite_sheet(template.as_bytes(), sheet).unwrap()).unwrap()
    }

    #[test]
    fn stored_rows_replace_template_body() {
        let sheet = stored(2, vec![
            vec![Some(Scalar::Text("P-1".into())), Some(Scalar::Number("2.5".into()))],
            vec![Some(Scalar::Text(" a<b ".into())), None],
        ]);
        let expected = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            r#"<sheetData>"#,
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t xml:space="preserve">ID</t></is></c>"#,
            r#"<c r="C2" t="inlineStr"><is><t xml:space="preserve">R&amp;D</t></is></c></row>"#,
            r#"<row r="3"><c r="A3" t="inlineStr"><is><t xml:space="preserve">P-1</t></is></c>"#,
            r#"<c r="C3"><v>2.5</v></c></row>"#,
            r#"<row r="4"><c r="A4" t="inlineStr"><is><t xml:space="preserve"> a&lt;b </t></is></c></row>"#,
            r#"</sheetData>"#,
            r#"<mergeCells count="1"><mergeCell ref="A1:C1"/></mergeCells>"#,
            r#"</worksheet>"#,
        );
        assert_eq!(rewrite(TEMPLATE, Some(&sheet)), expected);
    }

    #[test]
    fn absent_sheet_is_cleared() {
        let output = rewrite(TEMPLATE, None);
        assert!(output.contains("<sheetData></sheetData>"), "{output}");
        assert!(output.contains("<mergeCells"), "{output}");
    }

    #[test]
    fn empty_sheet_data_is_expanded() {
        let template = r#"<worksheet><sheetData/><pageMargins left="0.7"/></worksheet>"#;
        let sheet = stored(1, vec![vec![None, Some(Scalar::Boolean("1".into()))]]);
        let output = rewrite(template, Some(&sheet));
        assert_eq!(output, concat!(
            r#"<worksheet><sheetData>"#,
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t xml:space="preserve">ID</t></is></c>"#,
            r#"<c r="C1" t="inlineStr"><is><t xml:space="preserve">R&amp;D</t></is></c></row>"#,
            r#"<row r="2"><c r="C2" t="b"><v>1</v></c></row>"#,
            r#"</sheetData><pageMargins left="0.7"/></worksheet>"#,
        ));
    }

    #[test]
    fn unnumbered_rows_are_positioned_physically() {
        let template = r#"<worksheet><sheetData><row><c><v>1</v></c></row><row><c><v>2</v></c></row><row r="9"/></sheetData></worksheet>"#;
        let output = rewrite(template, Some(&stored(2, Vec::new())));
        assert!(output.contains("<row><c><v>1</v></c></row>"), "{output}");
        assert!(!output.contains("<v>2</v>"), "{output}");
        assert!(!output.contains(r#"<row r="9"/>"#), "{output}");
    }

    #[test]
    fn header_is_written_from_source_cells() {
        let mut sheet = stored(1, Vec::new());
        sheet.header_cells = vec![Scalar::Text("Sample\nName".into()), Scalar::Number("2024".into())];
        let output = rewrite(r#"<worksheet><sheetData/></worksheet>"#, Some(&sheet));
        assert_eq!(output, concat!(
            r#"<worksheet><sheetData>"#,
            "<row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">Sample\nName</t></is></c>",
            r#"<c r="C1"><v>2024</v></c></row>"#,
            r#"</sheetData></worksheet>"#,
        ));

        sheet.header_cells.clear();
        let fallback = rewrite(r#"<worksheet><sheetData/></worksheet>"#, Some(&sheet));
        assert!(fallback.contains(r#"<c r="C1" t="inlineStr"><is><t xml:space="preserve">R&amp;D</t></is></c>"#), "{fallback}");
    }

    #[test]
    fn template_row_past_sheet_limit_fails() {
        let template = r#"<worksheet><sheetData><row r="2000000"/></sheetData></worksheet>"#;
        let error = rewrite_sheet(template.as_bytes(), None).unwrap_err();
        assert!(error.to_string().contains("Row 2000000 exceeds"), "{error}");
    }

    #[test]
    fn typed_cells_keep_their_flags() {
        let mut out = String::new();
        write_cell(&mut out, 2, 5, &Scalar::Date("2024-03-01T00:00:00".into()));
        write_cell(&mut out, 28, 5, &Scalar::Error("#N/A".into()));
        assert_eq!(out, r#"<c r="B5" t="d"><v>2024-03-01T00:00:00</v></c><c r="AB5" t="e"><v>#N/A</v></c>"#);
    }
}
