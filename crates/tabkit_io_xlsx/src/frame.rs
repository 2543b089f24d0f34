//! Polars DataFrame and IPC sources for the exporter.
//!
//! A frame is exported by treating each row index as a record and deriving one
//! field accessor per column from its dtype.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::{AnyValue, DataFrame, DataType, IpcReader, SerReader};

use crate::schema::{EnumFieldKind, EnumFieldValue, SpecRecordSchema};
use crate::spec::{ExportError, SpecXlsxBuffer, SpecXlsxReport};
use crate::util::validate_unique_columns;
use crate::writer::XlsxExporter;

/// Decode a Polars IPC payload.
pub fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, ExportError> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| ExportError::InvalidFrame(format!("Failed to read IPC DataFrame bytes: {err}")))
}

/// Map a dtype to the field kind that drives rendering.
pub fn derive_field_kind_from_dtype(dtype: &DataType) -> EnumFieldKind {
    match dtype {
        DataType::Boolean => EnumFieldKind::Boolean,
        DataType::Binary => EnumFieldKind::Binary,
        _ => EnumFieldKind::Other,
    }
}

/// Convert one polars cell into an exporter field value.
pub fn derive_field_value_from_any_value(value: AnyValue<'_>) -> EnumFieldValue {
    match value {
        AnyValue::Null => EnumFieldValue::None,
        AnyValue::Boolean(val) => EnumFieldValue::Boolean(val),
        AnyValue::Binary(val) => EnumFieldValue::Binary(val.to_vec()),
        AnyValue::BinaryOwned(val) => EnumFieldValue::Binary(val),
        AnyValue::String(val) => EnumFieldValue::text(val),
        AnyValue::StringOwned(val) => EnumFieldValue::text(val),
        AnyValue::UInt8(val) => EnumFieldValue::text(val),
        AnyValue::UInt16(val) => EnumFieldValue::text(val),
        AnyValue::UInt32(val) => EnumFieldValue::text(val),
        AnyValue::UInt64(val) => EnumFieldValue::text(val),
        AnyValue::Int8(val) => EnumFieldValue::text(val),
        AnyValue::Int16(val) => EnumFieldValue::text(val),
        AnyValue::Int32(val) => EnumFieldValue::text(val),
        AnyValue::Int64(val) => EnumFieldValue::text(val),
        AnyValue::Int128(val) => EnumFieldValue::text(val),
        AnyValue::Float32(val) => EnumFieldValue::text(val),
        AnyValue::Float64(val) => EnumFieldValue::text(val),
        _ => EnumFieldValue::text(value),
    }
}

/// Build a row-index schema over `df`: one field per column, in column order.
pub fn derive_schema_from_dataframe(df: &DataFrame) -> Result<SpecRecordSchema<usize>, ExportError> {
    let l_names: Vec<String> = df
        .get_columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    validate_unique_columns(&l_names).map_err(ExportError::InvalidFrame)?;

    let mut schema = SpecRecordSchema::new();
    for col in df.get_columns() {
        let kind = derive_field_kind_from_dtype(col.dtype());
        let col = col.clone();
        schema = schema.with_field(col.name().to_string(), kind, move |n_idx_row: &usize| {
            col.get(*n_idx_row)
                .map(derive_field_value_from_any_value)
                .map_err(|err| err.to_string())
        });
    }
    Ok(schema)
}

impl XlsxExporter {
    /// Export a DataFrame; column names are the default headers.
    pub fn export_dataframe_to_buffer(
        &self,
        sheet_prefix: Option<&str>,
        df: &DataFrame,
        header_names: Option<&[String]>,
    ) -> Result<SpecXlsxBuffer, ExportError> {
        let schema = derive_schema_from_dataframe(df)?;
        let l_rows: Vec<usize> = (0..df.height()).collect();
        self.export_to_buffer(sheet_prefix, &l_rows, &schema, header_names)
    }

    /// Write a DataFrame to `path_file_out`.
    pub fn export_dataframe_to_path(
        &self,
        sheet_prefix: Option<&str>,
        df: &DataFrame,
        header_names: Option<&[String]>,
        path_file_out: impl AsRef<Path>,
    ) -> Result<SpecXlsxReport, ExportError> {
        let schema = derive_schema_from_dataframe(df)?;
        let l_rows: Vec<usize> = (0..df.height()).collect();
        self.export_to_path(sheet_prefix, &l_rows, &schema, header_names, path_file_out)
    }

    /// Export a DataFrame serialized as Polars IPC bytes.
    pub fn export_ipc_bytes_to_buffer(
        &self,
        sheet_prefix: Option<&str>,
        v_ipc_df: &[u8],
        header_names: Option<&[String]>,
    ) -> Result<SpecXlsxBuffer, ExportError> {
        let df = derive_dataframe_from_ipc_bytes(v_ipc_df)?;
        self.export_dataframe_to_buffer(sheet_prefix, &df, header_names)
    }
}
