//! XML parsing utilities for the SpreadsheetML parts of a workbook package
//! Provides an event reader wrapper and helper traits for attribute and text processing

use crate::error::LabsheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for spreadsheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a reader that reports `<a/>` as a start/end pair, so an empty
    /// cell looks the same as `<c></c>`
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        Self::configure(buf_reader, true)
    }

    /// Creates a reader that keeps empty elements as `Event::Empty`,
    /// used when events are written back out unchanged
    pub(crate) fn verbatim(buf_reader: R) -> XmlReader<R> {
        Self::configure(buf_reader, false)
    }

    fn configure(buf_reader: R, expand_empty_elements: bool) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = expand_empty_elements;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, LabsheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(LabsheetError::XmlError(error)),
        }
    }

    /// Collects the text of every `<t>` run until `end_tag` closes.
    ///
    /// Runs under phonetic annotations (`<rPh>`) are skipped. With
    /// `is_text_content` set, bare text directly under the element counts too
    /// (the `<v>` element carries its value without a `<t>` wrapper).
    pub(crate) fn read_text(&mut self, end_tag: QName, is_text_content: bool) -> Result<String, LabsheetError> {
        let mut is_phonetic_text = false;
        let mut is_text = is_text_content;
        let mut text = String::new();
        crate::match_xml_events!(self => {
            Event::End(event) if event.name() == end_tag => break,
            Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
            Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
            Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
            Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
            Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
        });
        Ok(text)
    }
}

/// Text run inside a string item
pub(crate) const TAG_TEXT: QName = QName(b"t");
/// Phonetic run for East Asian readings
pub(crate) const TAG_PHONETIC_TEXT: QName = QName(b"rPh");

/// Helper trait for XML attributes providing convenient value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, LabsheetError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, LabsheetError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, LabsheetError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, LabsheetError> {
        let value = self.get_value()?;
        value
            .parse()
            .map_err(|_| XmlError::ParseAttributeValueError(value.to_string()).into())
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, LabsheetError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, LabsheetError>;

    /// Gets an attribute value by its local name, ignoring any namespace prefix
    fn get_local_attribute_value(&'a self, local_name: &[u8]) -> Result<Option<Cow<'a, str>>, LabsheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, LabsheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, LabsheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }

    fn get_local_attribute_value(&'a self, local_name: &[u8]) -> Result<Option<Cow<'a, str>>, LabsheetError> {
        for result in self.attributes() {
            let attribute = result?;
            if attribute.key.local_name().as_ref() == local_name {
                return Ok(Some(attribute.get_value()?));
            }
        }
        Ok(None)
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), LabsheetError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), LabsheetError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Minimal XML escaping for text and attribute content we generate.
pub(crate) fn escape(value: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(value)
}

#[macro_export]
#[doc(hidden)]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
