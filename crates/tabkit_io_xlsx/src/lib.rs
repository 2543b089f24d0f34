//! `tabkit_io_xlsx`:
//! paged XLSX export of uniformly-shaped records.
//!
//! Modules:
//! - `conf`   : constants and default style presets
//! - `spec`   : options, reports, errors
//! - `schema` : record schemas and field accessors
//! - `util`   : pure width/number/paging helpers
//! - `writer` : exporter kernel
//! - `export` : convenience entry points for `TabularRecord` types
//! - `frame`  : polars DataFrame / IPC sources
pub mod conf;
pub mod export;
pub mod frame;
pub mod schema;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_SIZE_PAGE_DEFAULT,
    TUP_EXCEL_ILLEGAL, derive_header_format, derive_text_format,
};
pub use export::{
    export, export_named, export_named_to_path, export_to_path, export_to_path_with_headers,
    export_with_headers,
};
pub use frame::{derive_dataframe_from_ipc_bytes, derive_schema_from_dataframe};
pub use schema::{EnumFieldKind, EnumFieldValue, SpecFieldAccessor, SpecRecordSchema, TabularRecord};
pub use spec::{
    EnumCellValue, ExportError, SpecBooleanTokens, SpecCellError, SpecCellFormat,
    SpecExportOptions, SpecHeaderNotes, SpecImageCellPolicy, SpecPalette, SpecSheetPage,
    SpecSummaryRowPolicy, SpecXlsxBuffer, SpecXlsxReport,
};
pub use util::{display_width, is_numeric_text, plan_sheet_pages, sanitize_sheet_name};
pub use writer::{FnExportNotify, XlsxExporter};
