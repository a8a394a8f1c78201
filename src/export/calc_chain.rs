//! Removal of the calculation chain.
//!
//! `xl/calcChain.xml` lists every formula cell of the workbook. Once sheet
//! rows are rewritten the list points at cells that no longer exist, so the
//! part is dropped together with its relationship and content type entry.
//! Spreadsheet applications rebuild it on the next recalculation.
use crate::error::LabsheetError;
use crate::error::ResultMessage;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::xlsx::WORKBOOK_RELATIONSHIPS_PART;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

pub(crate) const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const TAG_RELATIONSHIP: QName = QName(b"Relationship");
const TAG_OVERRIDE: QName = QName(b"Override");

type ElementFilter = fn(&BytesStart<'_>) -> Result<bool, LabsheetError>;

/// Schedules the calculation chain for removal.
///
/// Rewritten relationship and content type parts are added to
/// `replacements`. Returns the stored name of the chain part, `None` when the
/// package has none.
pub(crate) fn remove_calc_chain<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    replacements: &mut HashMap<String, Vec<u8>>,
) -> Result<Option<String>, LabsheetError> {
    let Some(part) = zip.resolve_name(CALC_CHAIN_PART) else {
        return Ok(None);
    };

    let filters: [(&str, QName, ElementFilter); 2] = [
        (WORKBOOK_RELATIONSHIPS_PART, TAG_RELATIONSHIP, is_calc_chain_relationship),
        (CONTENT_TYPES_PART, TAG_OVERRIDE, is_calc_chain_override),
    ];
    for (path, tag, filter) in filters {
        let Some(name) = zip.resolve_name(path) else {
            continue;
        };
        if let Some(xml) = zip.read_bytes(&name)? {
            let rewritten = drop_elements(&xml, tag, filter).with_prefix(path)?;
            replacements.insert(name, rewritten);
        }
    }
    Ok(Some(part))
}

fn is_calc_chain_relationship(event: &BytesStart<'_>) -> Result<bool, LabsheetError> {
    let kind = event.get_attribute_value("Type")?;
    let target = event.get_attribute_value("Target")?;
    Ok(kind.is_some_and(|kind| kind.ends_with("/calcChain"))
        || target.is_some_and(|target| target.ends_with("calcChain.xml")))
}

fn is_calc_chain_override(event: &BytesStart<'_>) -> Result<bool, LabsheetError> {
    let part_name = event.get_attribute_value("PartName")?;
    Ok(part_name.is_some_and(|part_name| part_name.ends_with("calcChain.xml")))
}

/// Copies `xml`, leaving out every `tag` element the filter selects.
fn drop_elements(xml: &[u8], tag: QName, filter: ElementFilter) -> Result<Vec<u8>, LabsheetError> {
    let mut reader = XmlReader::verbatim(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skipped_depth = 0usize;
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
            Event::Start(event) if event.name() == tag && filter(&event)? => skipped_depth = 1,
            Event::Empty(event) if event.name() == tag && filter(&event)? => (),
            event => writer.write_event(event)?,
        }
    }
    Ok(writer.into_inner())
}
