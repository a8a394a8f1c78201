//! ZIP archive helper utilities for workbook packages
//! Provides convenient methods for accessing parts within the archive

use crate::error::LabsheetError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a part from the archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, LabsheetError>;

    /// Creates an XML reader for a part within the archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, LabsheetError>;

    /// Reads a whole part into memory
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, LabsheetError>;

    /// Returns the stored name of a part, matched the same way as [`ZipHelper::file`]
    fn resolve_name(&self, name: &str) -> Option<String>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, LabsheetError> {
        match self.resolve_name(name).map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, LabsheetError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, LabsheetError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    fn resolve_name(&self, name: &str) -> Option<String> {
        let pattern = name.replace('\\', "/");
        self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
            .map(|file_name| file_name.to_owned())
    }
}
