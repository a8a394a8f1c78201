//! Package relationship helpers
use crate::error::LabsheetError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// One entry of a relationship table.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Relationship {
    /// Archive path of the target part, normalized by [`to_zip_path`]
    pub(crate) target: String,
    /// Relationship type URI, empty when the attribute is absent
    pub(crate) kind: String,
}

impl Relationship {
    /// True when the target is a worksheet part (or the type is unspecified).
    pub(crate) fn is_worksheet(&self) -> bool {
        self.kind.is_empty() || self.kind.ends_with("/worksheet")
    }
}

/// Loads a relationship table, keyed by relationship id.
///
/// The part is required: a missing table is a format error.
pub(crate) fn load_relationships<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    path: &str,
) -> Result<HashMap<String, Relationship>, LabsheetError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, Relationship> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let target = event.get_attribute_value("Target")?;
            if let Some((id, target)) = id.zip(target) {
                let kind = event.get_attribute_value("Type")?.unwrap_or_default();
                relationships.insert(id.to_string(), Relationship {
                    target: to_zip_path(target),
                    kind: kind.into_owned(),
                });
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a root-relative archive path
///
/// Targets are relative to `xl/` unless they already start there or are
/// absolute (`/xl/...`).
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}
