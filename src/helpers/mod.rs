//! Low-level helpers shared by the workbook reader and the exporter.
pub(crate) mod xml;
pub(crate) mod zip;
