//! Shared XLSX export specification models.

use std::collections::BTreeMap;
use std::io::Cursor;

use rust_xlsxwriter::XlsxError;
use thiserror::Error;

use crate::conf::{
    C_COLOR_BODY_BG, C_COLOR_HEADER_BG, C_COLOR_HEADER_FONT, C_COLOR_NUMBER_FONT,
    C_PATTERN_NUMERIC_DEFAULT, C_SHEET_NAME_TEMPLATE_DEFAULT, N_FONT_SIZE_HEADER,
    N_SIZE_PAGE_DEFAULT,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format descriptor, converted to a `rust_xlsxwriter::Format` once per export call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment: `center` or `right`.
    pub align: Option<String>,
    /// Vertical alignment: `vcenter`.
    pub valign: Option<String>,
    /// Thin border on all sides.
    pub border: Option<bool>,

    /// Background fill color (solid pattern).
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Header/body color palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPalette {
    /// Header fill color.
    pub header_bg_color: String,
    /// Header font color.
    pub header_font_color: String,
    /// Header font size in points.
    pub header_font_size: i64,
    /// Body fill color (text and numeric cells).
    pub body_bg_color: String,
    /// Font color for numeric body cells.
    pub number_font_color: String,
}

impl Default for SpecPalette {
    fn default() -> Self {
        Self {
            header_bg_color: C_COLOR_HEADER_BG.to_string(),
            header_font_color: C_COLOR_HEADER_FONT.to_string(),
            header_font_size: N_FONT_SIZE_HEADER,
            body_bg_color: C_COLOR_BODY_BG.to_string(),
            number_font_color: C_COLOR_NUMBER_FONT.to_string(),
        }
    }
}

/// Normalized cell value during the write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Display tokens written for boolean fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBooleanTokens {
    /// Token for `true`.
    pub yes: String,
    /// Token for `false`.
    pub no: String,
}

impl SpecBooleanTokens {
    /// Build a token pair.
    pub fn new(yes: impl Into<String>, no: impl Into<String>) -> Self {
        Self {
            yes: yes.into(),
            no: no.into(),
        }
    }

    /// Chinese `是` / `否` tokens.
    pub fn zh() -> Self {
        Self::new("是", "否")
    }

    /// Token for one boolean value.
    pub fn render(&self, value: bool) -> &str {
        if value { &self.yes } else { &self.no }
    }
}

impl Default for SpecBooleanTokens {
    fn default() -> Self {
        Self::new("Yes", "No")
    }
}

/// Geometry applied to cells holding an embedded image.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecImageCellPolicy {
    /// Row height in points for rows containing an image.
    pub height_row: f64,
    /// Minimum column width in characters for columns containing an image.
    pub width_col: f64,
    /// Keep the image aspect ratio when fitting it into the cell.
    pub if_keep_aspect_ratio: bool,
}

impl Default for SpecImageCellPolicy {
    fn default() -> Self {
        Self {
            height_row: 60.0,
            width_col: 11.0,
            if_keep_aspect_ratio: false,
        }
    }
}

/// Trailing "total count" row written after each page's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSummaryRowPolicy {
    /// Text written before the record count.
    pub label: String,
}

impl Default for SpecSummaryRowPolicy {
    fn default() -> Self {
        Self {
            label: "Total: ".to_string(),
        }
    }
}

/// Notes attached to header cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecHeaderNotes {
    /// Note author shown by spreadsheet applications.
    pub author: Option<String>,
    /// Note text by zero-based column index.
    pub notes_by_col: BTreeMap<usize, String>,
}

/// Exporter-wide options. `Default` gives the documented behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecExportOptions {
    /// Maximum data rows per sheet.
    pub size_page: usize,
    /// Sheet name used when no prefix is given; `{n}` is the 1-based page number.
    pub sheet_name_template: String,
    /// Boolean display tokens.
    pub boolean_tokens: SpecBooleanTokens,
    /// Regex deciding which text values are written as numbers. Should be anchored.
    pub pattern_numeric: String,
    /// Header/body colors.
    pub palette: SpecPalette,
    /// Image cell geometry.
    pub policy_image: SpecImageCellPolicy,
    /// Optional trailing count row.
    pub summary_row: Option<SpecSummaryRowPolicy>,
    /// Optional notes on header cells.
    pub header_notes: Option<SpecHeaderNotes>,
    /// Freeze panes below the header row.
    pub if_freeze_header: bool,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        Self {
            size_page: N_SIZE_PAGE_DEFAULT,
            sheet_name_template: C_SHEET_NAME_TEMPLATE_DEFAULT.to_string(),
            boolean_tokens: SpecBooleanTokens::default(),
            pattern_numeric: C_PATTERN_NUMERIC_DEFAULT.to_string(),
            palette: SpecPalette::default(),
            policy_image: SpecImageCellPolicy::default(),
            summary_row: None,
            header_notes: None,
            if_freeze_header: false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// One data page emitted to the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetPage {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Zero-based page index.
    pub idx_page: usize,
    /// Inclusive source record start.
    pub row_start_inclusive: usize,
    /// Exclusive source record end.
    pub row_end_exclusive: usize,
    /// Final column widths (characters), filled after the page is written.
    pub widths_by_col: Vec<usize>,
}

impl SpecSheetPage {
    /// Number of records on this page.
    pub fn n_records(&self) -> usize {
        self.row_end_exclusive - self.row_start_inclusive
    }
}

/// One cell left blank because its value could not be extracted or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCellError {
    /// Sheet holding the cell.
    pub sheet_name: String,
    /// Zero-based worksheet row (header is row 0).
    pub row_idx: usize,
    /// Zero-based worksheet column.
    pub col_idx: usize,
    /// Schema field name.
    pub field_name: String,
    /// User-facing error text.
    pub exception: String,
}

/// Per-export call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Data pages produced by the call, in order.
    pub sheets: Vec<SpecSheetPage>,
    /// Cells left blank because extraction failed.
    pub cell_errors: Vec<SpecCellError>,
    /// Cells left blank because the value was empty.
    pub cnt_cells_blank: u64,
    /// Number of embedded images.
    pub cnt_images: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Number of data records written across all pages.
    pub fn n_records(&self) -> usize {
        self.sheets.iter().map(SpecSheetPage::n_records).sum()
    }

    /// Number of collected per-cell errors.
    pub fn error_count(&self) -> usize {
        self.cell_errors.len()
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} sheets={} records={} images={} blank={} errors={} warnings={}",
            self.sheets.len(),
            self.n_records(),
            self.cnt_images,
            self.cnt_cells_blank,
            self.error_count(),
            self.warnings.len()
        )
    }
}

/// Serialized workbook plus the report of the call that produced it.
#[derive(Debug, Clone)]
pub struct SpecXlsxBuffer {
    /// XLSX package bytes.
    pub bytes: Vec<u8>,
    /// Export report.
    pub report: SpecXlsxReport,
}

impl SpecXlsxBuffer {
    /// Readable stream over the workbook bytes.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Fatal export errors. Per-cell failures are reported in [`SpecXlsxReport`] instead.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Caller-supplied header names do not match the schema.
    #[error("Header count mismatch: schema has {expected} fields, got {actual} header names")]
    HeaderCountMismatch {
        /// Number of schema fields.
        expected: usize,
        /// Number of header names supplied.
        actual: usize,
    },
    /// Invalid exporter options.
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),
    /// Unusable record schema.
    #[error("Invalid record schema: {0}")]
    InvalidSchema(String),
    /// Unusable DataFrame/IPC input.
    #[error("Invalid data frame input: {0}")]
    InvalidFrame(String),
    /// Worksheet construction failed.
    #[error("xlsx worksheet error: {0}")]
    Worksheet(#[from] XlsxError),
    /// Workbook serialization to memory or disk failed.
    #[error("Failed to write workbook to {target}: {source}")]
    WriteFailed {
        /// `<memory>` or the output path.
        target: String,
        /// Underlying writer error.
        #[source]
        source: XlsxError,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
