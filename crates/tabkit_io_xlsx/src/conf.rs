//! XLSX constants and default style factories.

use crate::spec::{SpecCellFormat, SpecPalette};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel column maximum width in characters.
pub const N_WIDTH_EXCEL_COL_MAX: usize = 255;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Default number of data rows per sheet.
pub const N_SIZE_PAGE_DEFAULT: usize = 50_000;
/// Width padding added on both sides of a column's widest text.
pub const N_WIDTH_CELL_PADDING: usize = 2;
/// Default numeric text pattern.
pub const C_PATTERN_NUMERIC_DEFAULT: &str = r"^[-+]?\d+(\.\d+)?$";
/// Default sheet name when no prefix is supplied.
pub const C_SHEET_NAME_TEMPLATE_DEFAULT: &str = "Page {n}";

/// Sky blue.
pub const C_COLOR_HEADER_BG: &str = "#00CCFF";
/// Violet.
pub const C_COLOR_HEADER_FONT: &str = "#800080";
/// Light yellow.
pub const C_COLOR_BODY_BG: &str = "#FFFF99";
/// Blue.
pub const C_COLOR_NUMBER_FONT: &str = "#0000FF";
/// Header font size in points.
pub const N_FONT_SIZE_HEADER: i64 = 12;

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Header row cell.
    Header,
    /// Generic text body cell.
    Text,
    /// Numeric body cell.
    Number,
}

fn derive_bordered_format(palette: &SpecPalette) -> SpecCellFormat {
    SpecCellFormat {
        border: Some(true),
        bg_color: Some(palette.body_bg_color.clone()),
        ..Default::default()
    }
}

/// Header style: bold, colored fill, centered, bordered.
pub fn derive_header_format(palette: &SpecPalette) -> SpecCellFormat {
    derive_bordered_format(palette).with_(SpecCellFormat {
        font_size: Some(palette.header_font_size),
        bold: Some(true),
        align: Some("center".to_string()),
        bg_color: Some(palette.header_bg_color.clone()),
        font_color: Some(palette.header_font_color.clone()),
        ..Default::default()
    })
}

/// Body style: centered text, or right-aligned blue numbers.
pub fn derive_text_format(palette: &SpecPalette, if_is_numeric: bool) -> SpecCellFormat {
    let fmt_base = derive_bordered_format(palette).with_(SpecCellFormat {
        valign: Some("vcenter".to_string()),
        ..Default::default()
    });
    if if_is_numeric {
        fmt_base.with_(SpecCellFormat {
            align: Some("right".to_string()),
            font_color: Some(palette.number_font_color.clone()),
            ..Default::default()
        })
    } else {
        fmt_base.with_(SpecCellFormat {
            align: Some("center".to_string()),
            ..Default::default()
        })
    }
}

/// Build the named format preset for `key`.
pub fn derive_default_xlsx_format(key: EnumFmtKey, palette: &SpecPalette) -> SpecCellFormat {
    match key {
        EnumFmtKey::Header => derive_header_format(palette),
        EnumFmtKey::Text => derive_text_format(palette, false),
        EnumFmtKey::Number => derive_text_format(palette, true),
    }
}
