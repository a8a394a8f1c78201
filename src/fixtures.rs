//! In-memory workbook packages for tests.
use crate::helpers::xml::escape;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

const WORKSHEET_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const CALC_CHAIN_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
const CHARTSHEET_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet";

struct FixtureSheet {
    name: String,
    target: String,
    kind: &'static str,
    sheet_data: String,
}

/// Builds a minimal SpreadsheetML package.
///
/// Sheet bodies are raw `<row>` markup placed inside `<sheetData>`. Shared
/// string entries starting with `<` are taken as raw `<si>` content, anything
/// else becomes a single `<t>` run.
#[derive(Default)]
pub(crate) struct FixtureBook {
    sheets: Vec<FixtureSheet>,
    shared_strings: Option<Vec<String>>,
    calc_chain: bool,
    skipped_parts: Vec<String>,
}

impl FixtureBook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sheet(self, name: &str, sheet_data: &str) -> Self {
        let target = format!("worksheets/sheet{}.xml", self.sheets.len() + 1);
        self.sheet_with_target(name, &target, sheet_data)
    }

    pub(crate) fn sheet_with_target(mut self, name: &str, target: &str, sheet_data: &str) -> Self {
        self.sheets.push(FixtureSheet {
            name: name.to_owned(),
            target: target.to_owned(),
            kind: WORKSHEET_TYPE,
            sheet_data: sheet_data.to_owned(),
        });
        self
    }

    pub(crate) fn chart_sheet(mut self, name: &str) -> Self {
        self.sheets.push(FixtureSheet {
            name: name.to_owned(),
            target: format!("chartsheets/sheet{}.xml", self.sheets.len() + 1),
            kind: CHARTSHEET_TYPE,
            sheet_data: String::new(),
        });
        self
    }

    pub(crate) fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = Some(strings.iter().map(|string| string.to_string()).collect());
        self
    }

    /// Adds `xl/calcChain.xml` with its relationship and content type override.
    pub(crate) fn calc_chain(mut self) -> Self {
        self.calc_chain = true;
        self
    }

    pub(crate) fn without_part(mut self, part: &str) -> Self {
        self.skipped_parts.push(part.to_owned());
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in self.parts() {
            if self.skipped_parts.iter().any(|part| part == &name) {
                continue;
            }
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(name.as_str(), options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn parts(&self) -> Vec<(String, String)> {
        let mut parts = vec![
            ("[Content_Types].xml".to_owned(), self.content_types()),
            ("_rels/.rels".to_owned(), ROOT_RELATIONSHIPS.to_owned()),
            ("xl/workbook.xml".to_owned(), self.workbook()),
            ("xl/_rels/workbook.xml.rels".to_owned(), self.relationships()),
        ];
        if let Some(strings) = &self.shared_strings {
            parts.push(("xl/sharedStrings.xml".to_owned(), shared_strings_xml(strings)));
        }
        if self.calc_chain {
            parts.push(("xl/calcChain.xml".to_owned(), CALC_CHAIN.to_owned()));
        }
        for sheet in &self.sheets {
            let path = sheet.target.trim_start_matches('/');
            let path = if path.starts_with("xl/") { path.to_owned() } else { format!("xl/{path}") };
            let content = if sheet.kind == WORKSHEET_TYPE {
                worksheet_xml(&sheet.sheet_data)
            } else {
                CHARTSHEET.to_owned()
            };
            parts.push((path, content));
        }
        parts
    }

    fn content_types(&self) -> String {
        if self.calc_chain {
            CONTENT_TYPES.replace("</Types>", &format!("{CALC_CHAIN_OVERRIDE}</Types>"))
        } else {
            CONTENT_TYPES.to_owned()
        }
    }

    fn workbook(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        ));
        for (index, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(&sheet.name),
                index + 1,
                index + 1,
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn relationships(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        ));
        for (index, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="{}"/>"#,
                index + 1,
                sheet.kind,
                sheet.target,
            ));
        }
        if self.calc_chain {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{CALC_CHAIN_TYPE}" Target="calcChain.xml"/>"#,
                self.sheets.len() + 1,
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"</Types>"#,
);

const CALC_CHAIN_OVERRIDE: &str = concat!(
    r#"<Override PartName="/xl/calcChain.xml" "#,
    r#"ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#,
);

const CALC_CHAIN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="B2" i="1"/></calcChain>"#,
);

const ROOT_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const CHARTSHEET: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<chartsheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"/>"#,
);

fn shared_strings_xml(strings: &[String]) -> String {
    let mut xml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        ),
        strings.len()
    );
    for string in strings {
        if string.starts_with('<') {
            xml.push_str(&format!("<si>{string}</si>"));
        } else {
            xml.push_str(&format!("<si><t>{}</t></si>", escape(string)));
        }
    }
    xml.push_str("</sst>");
    xml
}

fn worksheet_xml(sheet_data: &str) -> String {
    let sheet_data = if sheet_data.is_empty() {
        "<sheetData/>".to_owned()
    } else {
        format!("<sheetData>{sheet_data}</sheetData>")
    };
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<dimension ref="A1"/>"#,
            r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#,
            r#"{}"#,
            r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
            r#"</worksheet>"#,
        ),
        sheet_data
    )
}
