//! Convenience entry points for types implementing [`TabularRecord`].
//!
//! Each call builds a default-configured [`XlsxExporter`] and uses the type's
//! declared schema. Use the exporter directly for custom options or reports.

use std::io::Cursor;
use std::path::Path;

use crate::schema::TabularRecord;
use crate::spec::{ExportError, SpecExportOptions, SpecXlsxReport};
use crate::writer::XlsxExporter;

fn derive_default_exporter() -> Result<XlsxExporter, ExportError> {
    XlsxExporter::new(SpecExportOptions::default())
}

/// Export records with field names as headers and default sheet names.
pub fn export<T: TabularRecord>(records: &[T]) -> Result<Cursor<Vec<u8>>, ExportError> {
    export_named(None, records, None)
}

/// Export records with caller-supplied header names.
pub fn export_with_headers<T: TabularRecord>(
    records: &[T],
    header_names: &[String],
) -> Result<Cursor<Vec<u8>>, ExportError> {
    export_named(None, records, Some(header_names))
}

/// Export records into sheets named `<sheet_prefix>_<page>`.
pub fn export_named<T: TabularRecord>(
    sheet_prefix: Option<&str>,
    records: &[T],
    header_names: Option<&[String]>,
) -> Result<Cursor<Vec<u8>>, ExportError> {
    let buffer = derive_default_exporter()?.export_to_buffer(
        sheet_prefix,
        records,
        &T::schema(),
        header_names,
    )?;
    Ok(buffer.into_reader())
}

/// Write records to `path` with field names as headers.
pub fn export_to_path<T: TabularRecord>(
    records: &[T],
    path: impl AsRef<Path>,
) -> Result<SpecXlsxReport, ExportError> {
    export_named_to_path(None, records, None, path)
}

/// Write records to `path` with caller-supplied header names.
pub fn export_to_path_with_headers<T: TabularRecord>(
    records: &[T],
    header_names: &[String],
    path: impl AsRef<Path>,
) -> Result<SpecXlsxReport, ExportError> {
    export_named_to_path(None, records, Some(header_names), path)
}

/// Write records to `path` into sheets named `<sheet_prefix>_<page>`.
pub fn export_named_to_path<T: TabularRecord>(
    sheet_prefix: Option<&str>,
    records: &[T],
    header_names: Option<&[String]>,
    path: impl AsRef<Path>,
) -> Result<SpecXlsxReport, ExportError> {
    derive_default_exporter()?.export_to_path(
        sheet_prefix,
        records,
        &T::schema(),
        header_names,
        path,
    )
}
