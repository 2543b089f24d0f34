//! Stateless helper utilities used by the XLSX exporter.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_WIDTH_CELL_PADDING,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, ExportError, SpecExportOptions, SpecSheetPage};

////////////////////////////////////////////////////////////////////////////////
// #region DisplayWidth

/// Whether `chr` belongs to the Han script.
pub fn is_han_char(chr: char) -> bool {
    matches!(
        chr as u32,
        0x2E80..=0x2E99
            | 0x2E9B..=0x2EF3
            | 0x2F00..=0x2FD5
            | 0x3005
            | 0x3007
            | 0x3021..=0x3029
            | 0x3038..=0x303B
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xF900..=0xFA6D
            | 0xFA70..=0xFAD9
            | 0x20000..=0x2A6DF
            | 0x2A700..=0x2EBEF
            | 0x2F800..=0x2FA1F
            | 0x30000..=0x323AF
    )
}

/// Column width units for `text`: Han characters count 2, others 1, plus padding.
pub fn display_width(text: &str) -> usize {
    text.chars()
        .map(|chr| if is_han_char(chr) { 2 } else { 1 })
        .sum::<usize>()
        + N_WIDTH_CELL_PADDING
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Compile the numeric text pattern.
pub fn compile_numeric_pattern(pattern: &str) -> Result<Regex, ExportError> {
    Regex::new(pattern)
        .map_err(|e| ExportError::InvalidOptions(format!("Invalid pattern_numeric: {e}")))
}

/// Whether `text` should be written as a number.
pub fn is_numeric_text(regex_numeric: &Regex, text: &str) -> bool {
    regex_numeric.is_match(text)
}

/// Classify stringified text as a numeric or text cell value.
///
/// Text matching the numeric pattern is stored as its parsed `f64`; values that
/// match but do not parse to a finite number stay text.
pub fn convert_text_to_cell_value(text: &str, regex_numeric: &Regex) -> EnumCellValue {
    if is_numeric_text(regex_numeric, text)
        && let Ok(val) = text.parse::<f64>()
        && val.is_finite()
    {
        return EnumCellValue::Number(val);
    }
    EnumCellValue::String(text.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Validation

/// Validate exporter options before any workbook is built.
pub fn validate_export_options(options: &SpecExportOptions) -> Result<(), ExportError> {
    if options.size_page == 0 {
        return Err(ExportError::InvalidOptions(
            "size_page must be >= 1.".to_string(),
        ));
    }
    if options.size_page >= N_NROWS_EXCEL_MAX {
        return Err(ExportError::InvalidOptions(format!(
            "size_page must be < {N_NROWS_EXCEL_MAX} (one row is reserved for the header)."
        )));
    }
    if options.summary_row.is_some() && options.size_page + 2 >= N_NROWS_EXCEL_MAX {
        return Err(ExportError::InvalidOptions(format!(
            "size_page must be < {} when summary_row is enabled.",
            N_NROWS_EXCEL_MAX - 2
        )));
    }
    if options.sheet_name_template.trim().is_empty() {
        return Err(ExportError::InvalidOptions(
            "sheet_name_template must not be empty.".to_string(),
        ));
    }
    if !(options.policy_image.height_row > 0.0 && options.policy_image.width_col > 0.0) {
        return Err(ExportError::InvalidOptions(
            "policy_image height_row/width_col must be > 0.".to_string(),
        ));
    }
    Ok(())
}

/// Resolve header names against the schema field names.
///
/// Supplied names must match the field count exactly.
pub fn resolve_header_names(
    field_names: &[String],
    header_names: Option<&[String]>,
) -> Result<Vec<String>, ExportError> {
    if field_names.is_empty() {
        return Err(ExportError::InvalidSchema(
            "schema must declare at least one field.".to_string(),
        ));
    }
    if field_names.len() > N_NCOLS_EXCEL_MAX {
        return Err(ExportError::InvalidSchema(format!(
            "schema declares {} fields; Excel allows at most {N_NCOLS_EXCEL_MAX}.",
            field_names.len()
        )));
    }

    match header_names {
        None => Ok(field_names.to_vec()),
        Some(names) if names.len() == field_names.len() => Ok(names.to_vec()),
        Some(names) => Err(ExportError::HeaderCountMismatch {
            expected: field_names.len(),
            actual: names.len(),
        }),
    }
}

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetPaging

/// Number of pages needed for `n_records` at `size_page` records per page.
pub fn calculate_page_count(n_records: usize, size_page: usize) -> usize {
    if size_page == 0 {
        return 0;
    }
    n_records.div_ceil(size_page)
}

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }
    if c_name.eq_ignore_ascii_case("history") {
        c_name.push_str(replace_to);
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Create suffixed sheet name (`base_0`, `base_1`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, idx_part: usize) -> String {
    let c_sheet_name_suffix = format!("_{idx_part}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Sheet name for page `idx_page` (0-based).
///
/// With a prefix: `<prefix>_<idx_page>`. Without: the template with `{n}`
/// replaced by the 1-based page number.
pub fn derive_page_sheet_name(
    sheet_prefix: Option<&str>,
    sheet_name_template: &str,
    idx_page: usize,
) -> String {
    match sheet_prefix {
        Some(prefix) => create_sheet_identifier(&sanitize_sheet_name(prefix, "_"), idx_page),
        None => sanitize_sheet_name(
            &sheet_name_template.replace("{n}", &(idx_page + 1).to_string()),
            "_",
        ),
    }
}

/// Return `name` or a `name__k` variant not yet in `set_sheet_names_existing`.
///
/// Excel compares sheet names case-insensitively.
pub fn derive_unique_sheet_name(name: &str, set_sheet_names_existing: &mut BTreeSet<String>) -> String {
    if set_sheet_names_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if set_sheet_names_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

/// Split `n_records` into consecutive pages with unique sheet names.
pub fn plan_sheet_pages(
    n_records: usize,
    size_page: usize,
    sheet_prefix: Option<&str>,
    sheet_name_template: &str,
) -> Vec<SpecSheetPage> {
    let n_pages = calculate_page_count(n_records, size_page);
    let mut set_sheet_names_existing = BTreeSet::new();

    (0..n_pages)
        .map(|idx_page| {
            let n_row_start = idx_page * size_page;
            let n_row_end = usize::min(n_records, n_row_start + size_page);
            let c_sheet_name = derive_page_sheet_name(sheet_prefix, sheet_name_template, idx_page);
            SpecSheetPage {
                sheet_name: derive_unique_sheet_name(&c_sheet_name, &mut set_sheet_names_existing),
                idx_page,
                row_start_inclusive: n_row_start,
                row_end_exclusive: n_row_end,
                widths_by_col: vec![],
            }
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
