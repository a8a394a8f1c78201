//! Patches a workbook package with replaced parts.
//!
//! Unmodified entries are copied via `raw_copy_file`, without recompression.
use crate::error::LabsheetError;
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// Copies `template`, substituting every entry named in `replacements` and
/// leaving out every entry named in `removed`.
///
/// Entry order and names are preserved.
pub(crate) fn patch_zip(
    template: &[u8],
    replacements: &HashMap<String, Vec<u8>>,
    removed: &[String],
) -> Result<Vec<u8>, LabsheetError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(template.len())));

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if removed.iter().any(|name| name == entry.name()) {
            continue;
        }
        if let Some(content) = replacements.get(entry.name()) {
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(entry.name(), options)?;
            writer.write_all(content)?;
        } else {
            writer.raw_copy_file(entry)?;
        }
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
