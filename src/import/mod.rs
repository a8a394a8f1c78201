//! # Sheet Import
//!
//! Turns decoded sheets into ordered records: locate the header row under a
//! per-sheet [`HeaderPolicy`], read the column definitions from it, then take
//! every following row up to the first blank one.
//!
//! Records store their values column by column in header order, so duplicate
//! header labels never collide. [`ParsedSheet::labeled`] gives the label view.
pub mod extract;
pub mod header;
pub mod template;

pub use extract::HeaderColumn;
pub use extract::Record;
pub use header::HeaderPolicy;
pub use template::ImportTemplate;
pub use template::SheetParser;
pub use template::SheetSelection;
pub use template::SheetSpec;

use crate::error::LabsheetError;
use crate::spreadsheet::Scalar;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors raised while locating headers or selecting sheets.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unable to detect header row of sheet '{sheet}' for expected marker '{marker}'")]
    HeaderNotFound { sheet: String, marker: String },

    #[error("Sheet '{sheet}' has no row with at least {minimum} populated cells")]
    NoPopulatedRow { sheet: String, minimum: usize },

    #[error("Missing expected sheet '{sheet}'")]
    MissingSheet { sheet: String },
}

/// A header cell paired with a record's value in that column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabeledColumn<'a> {
    pub column_index: usize,
    pub label: &'a str,
    pub value: Option<&'a Scalar>,
}

/// One sheet after header detection and extraction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedSheet {
    pub name: String,
    /// 1-based header row index in the source sheet
    pub header_row: usize,
    pub columns: Vec<HeaderColumn>,
    /// Header cells as typed in the source, one per column
    pub header_cells: Vec<Scalar>,
    pub records: Vec<Record>,
}

impl ParsedSheet {
    /// Pairs each of the record's values with its header column.
    pub fn labeled<'a>(&'a self, record: &'a Record) -> Vec<LabeledColumn<'a>> {
        self.columns
            .iter()
            .zip(record.values.iter())
            .map(|(column, value)| LabeledColumn {
                column_index: column.column_index,
                label: &column.label,
                value: value.as_ref(),
            })
            .collect()
    }

    /// Every value of the record under `label`, in column order.
    pub fn values_for<'a>(&'a self, record: &'a Record, label: &str) -> Vec<Option<&'a Scalar>> {
        self.labeled(record)
            .into_iter()
            .filter(|column| column.label == label)
            .map(|column| column.value)
            .collect()
    }
}

/// The sheets selected by an import template, in template order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParsedWorkbook {
    /// Name of the [`ImportTemplate`] that selected the sheets
    pub template_name: String,
    pub sheets: Vec<ParsedSheet>,
}

impl ParsedWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&ParsedSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

/// Default [`SheetParser`]: detect the header, then extract the records below it.
pub fn parse_sheet(sheet: &Sheet, policy: &HeaderPolicy) -> Result<ParsedSheet, ImportError> {
    let header_row = header::detect_header(sheet, policy)?;
    let (columns, header_cells) = match sheet.row(header_row) {
        Some(row) => {
            let columns = extract::header_columns(row);
            let cells = extract::header_cells(row, &columns);
            (columns, cells)
        }
        None => (Vec::new(), Vec::new()),
    };
    let records = extract::extract_records(&sheet.rows, header_row, &columns);
    Ok(ParsedSheet {
        name: sheet.name.to_owned(),
        header_row,
        columns,
        header_cells,
        records,
    })
}

/// Parses the sheets `template` selects.
///
/// All configured sheets must be present before any is parsed; the first
/// failure aborts the whole workbook.
pub fn parse(workbook: &Workbook, template: &ImportTemplate) -> Result<ParsedWorkbook, LabsheetError> {
    let jobs = match &template.sheets {
        SheetSelection::Configured(specs) => specs
            .iter()
            .map(|spec| {
                workbook
                    .sheet(&spec.name)
                    .map(|sheet| (sheet, &spec.policy, spec.parser))
                    .ok_or_else(|| ImportError::MissingSheet { sheet: spec.name.to_owned() })
            })
            .collect::<Result<Vec<_>, _>>()?,
        SheetSelection::Every(policy) => workbook
            .sheets
            .iter()
            .map(|sheet| (sheet, policy, parse_sheet as SheetParser))
            .collect::<Vec<_>>(),
    };

    let mut sheets = Vec::with_capacity(jobs.len());
    for (sheet, policy, parser) in jobs {
        let parsed = parser(sheet, policy)?;
        info!(
            sheet = %parsed.name,
            header_row = parsed.header_row,
            rows = parsed.records.len(),
            "Parsed sheet"
        );
        sheets.push(parsed);
    }
    Ok(ParsedWorkbook {
        template_name: template.name.to_owned(),
        sheets,
    })
}

/// Reads and parses a workbook file.
pub fn parse_file<P: AsRef<Path>>(path: P, template: &ImportTemplate) -> Result<ParsedWorkbook, LabsheetError> {
    let workbook = Workbook::open(path)?;
    parse(&workbook, template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::FixtureBook;
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> Scalar {
        Scalar::Text(value.to_owned())
    }

    fn inline(reference: &str, value: &str) -> String {
        format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)
    }

    fn sg866_book() -> Vec<u8> {
        let sheet = |marker: &str, rows: usize| {
            let mut xml = format!(r#"<row r="1">{}</row>"#, inline("A1", "SG866 template"));
            xml.push_str(&format!(r#"<row r="2">{}{}</row>"#, inline("A2", marker), inline("B2", "Owner")));
            for index in 0..rows {
                let row = index + 3;
                xml.push_str(&format!(
                    r#"<row r="{row}">{}<c r="B{row}"><v>{index}</v></c></row>"#,
                    inline(&format!("A{row}"), &format!("item {index}")),
                ));
            }
            xml
        };
        FixtureBook::new()
            .sheet("Lead Summary", &sheet("Final Candidate ID", 1))
            .sheet("Project Master Data", &sheet("分类 (Category)", 2))
            .sheet("Milestone Tracker", &sheet("里程碑编号", 3))
            .sheet("Sample Tracking", &sheet("物料/样品名称", 0))
            .sheet("Execution Details", &sheet("Project Stage", 4))
            .sheet("Notes", "")
            .build()
    }

    #[test]
    fn sg866_parses_configured_sheets_in_template_order() {
        let workbook = Workbook::from_bytes(&sg866_book()).unwrap();
        let parsed = parse(&workbook, &ImportTemplate::sg866()).unwrap();
        let summary = parsed
            .sheets
            .iter()
            .map(|sheet| (sheet.name.as_str(), sheet.header_row, sheet.records.len()))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![
            ("Project Master Data", 2, 2),
            ("Milestone Tracker", 2, 3),
            ("Sample Tracking", 2, 0),
            ("Execution Details", 2, 4),
            ("Lead Summary", 2, 1),
        ]);
    }

    #[test]
    fn missing_configured_sheet_fails_whole_parse() {
        let bytes = FixtureBook::new()
            .sheet("Project Master Data", &format!(r#"<row r="1">{}</row>"#, inline("A1", "分类 (Category)")))
            .build();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let error = parse(&workbook, &ImportTemplate::sg866()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingSheet);
        assert!(error.to_string().contains("Milestone Tracker"), "{error}");
    }

    #[test]
    fn header_not_found_fails_whole_parse() {
        let template = ImportTemplate::new("custom", SheetSelection::Configured(vec![
            SheetSpec::marker("Data", "ID"),
            SheetSpec::marker("Other", "Missing marker"),
        ]));
        let bytes = FixtureBook::new()
            .sheet("Data", &format!(r#"<row r="1">{}</row>"#, inline("A1", "ID")))
            .sheet("Other", &format!(r#"<row r="1">{}</row>"#, inline("A1", "ID")))
            .build();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let error = parse(&workbook, &template).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::HeaderNotFound);
    }

    #[test]
    fn title_banner_marker_scenario() {
        let bytes = FixtureBook::new()
            .shared_strings(&["Project banner", "ID", "Value"])
            .sheet("Data", concat!(
                r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#,
                r#"<row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="s"><v>2</v></c></row>"#,
                r#"<row r="3"><c r="A3" t="inlineStr"><is><t>P-1</t></is></c><c r="B3"><v>10</v></c></row>"#,
                r#"<row r="4"><c r="A4" t="inlineStr"><is><t>P-2</t></is></c></row>"#,
                r#"<row r="5"><c r="A5" t="inlineStr"><is><t> </t></is></c></row>"#,
            ))
            .build();
        let template = ImportTemplate::new("custom", SheetSelection::Configured(vec![SheetSpec::marker("Data", "ID")]));
        let parsed = parse(&Workbook::from_bytes(&bytes).unwrap(), &template).unwrap();
        let sheet = &parsed.sheets[0];
        assert_eq!(sheet.header_row, 2);
        assert_eq!(sheet.records.iter().map(|record| record.display_order).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(sheet.records[1].values, vec![Some(text("P-2")), None]);
    }

    #[test]
    fn row_gap_terminates_extraction() {
        let bytes = FixtureBook::new()
            .sheet("Data", &[
                format!(r#"<row r="1">{}</row>"#, inline("A1", "ID")),
                format!(r#"<row r="2">{}</row>"#, inline("A2", "a")),
                format!(r#"<row r="4">{}</row>"#, inline("A4", "c")),
            ].concat())
            .build();
        let parsed = parse(&Workbook::from_bytes(&bytes).unwrap(), &ImportTemplate::generic()).unwrap();
        assert_eq!(parsed.sheets[0].records.len(), 1);
    }

    #[test]
    fn generic_template_takes_every_sheet() {
        let bytes = FixtureBook::new()
            .sheet("First", &format!(r#"<row r="3">{}</row>"#, inline("B3", "Name")))
            .sheet("Empty", "")
            .build();
        let parsed = parse(&Workbook::from_bytes(&bytes).unwrap(), &ImportTemplate::generic()).unwrap();
        assert_eq!(parsed.sheets.len(), 2);
        assert_eq!(parsed.sheets[0].header_row, 3);
        assert_eq!(parsed.sheets[0].columns, vec![HeaderColumn { column_index: 2, label: "Name".into() }]);
        assert_eq!(parsed.sheets[1].header_row, 1);
        assert!(parsed.sheets[1].columns.is_empty());
    }

    #[test]
    fn labeled_view_keeps_duplicate_labels() {
        let sheet = ParsedSheet {
            name: "Data".into(),
            header_row: 1,
            columns: vec![
                HeaderColumn { column_index: 1, label: "Result".into() },
                HeaderColumn { column_index: 2, label: "Batch".into() },
                HeaderColumn { column_index: 4, label: "Result".into() },
            ],
            header_cells: vec![text("Result"), text("Batch"), text("Result")],
            records: vec![Record {
                display_order: 1,
                values: vec![Some(text("pass")), None, Some(text("fail"))],
            }],
        };
        let record = &sheet.records[0];
        let labeled = sheet.labeled(record);
        assert_eq!(labeled[2], LabeledColumn { column_index: 4, label: "Result", value: Some(&text("fail")) });
        assert_eq!(sheet.values_for(record, "Result"), vec![Some(&text("pass")), Some(&text("fail"))]);
        assert_eq!(sheet.values_for(record, "Batch"), vec![None]);
        assert!(sheet.values_for(record, "Missing").is_empty());
    }

    #[test]
    fn custom_parser_is_dispatched() {
        fn header_only(sheet: &Sheet, policy: &HeaderPolicy) -> Result<ParsedSheet, ImportError> {
            let mut parsed = parse_sheet(sheet, policy)?;
            parsed.records.clear();
            Ok(parsed)
        }
        let bytes = FixtureBook::new()
            .sheet("Data", &[
                format!(r#"<row r="1">{}</row>"#, inline("A1", "ID")),
                format!(r#"<row r="2">{}</row>"#, inline("A2", "a")),
            ].concat())
            .build();
        let template = ImportTemplate::new("custom", SheetSelection::Configured(vec![SheetSpec {
            name: "Data".into(),
            policy: HeaderPolicy::FirstNonEmpty,
            parser: header_only,
        }]));
        let parsed = parse(&Workbook::from_bytes(&bytes).unwrap(), &template).unwrap();
        assert!(parsed.sheets[0].records.is_empty());
        assert_eq!(parsed.sheets[0].columns.len(), 1);
    }
}
