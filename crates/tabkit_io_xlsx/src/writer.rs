//! XLSX exporter kernel that turns schema-described records into paged workbooks.

use std::path::Path;

use regex::Regex;
use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, Image, Note, Workbook, Worksheet, XlsxError,
};

use crate::conf::{EnumFmtKey, N_WIDTH_EXCEL_COL_MAX, derive_default_xlsx_format};
use crate::schema::{EnumFieldKind, EnumFieldValue, SpecRecordSchema};
use crate::spec::{
    EnumCellValue, ExportError, SpecCellError, SpecCellFormat, SpecExportOptions, SpecSheetPage,
    SpecXlsxBuffer, SpecXlsxReport,
};
use crate::util::{
    compile_numeric_pattern, convert_text_to_cell_value, display_width, plan_sheet_pages,
    resolve_header_names, validate_export_options,
};

/// Callback invoked after a workbook has been written to disk.
pub type FnExportNotify = Box<dyn Fn(&Path, &SpecXlsxReport) + Send + Sync>;

/// Formats resolved once per export call and shared read-only by every page.
struct SpecWorkbookFormats {
    header: Format,
    text: Format,
    number: Format,
}

/// Column bookkeeping for one page.
struct SpecPageColumnState {
    widths_by_col: Vec<usize>,
    if_image_by_col: Vec<bool>,
}

/// Stateless exporter bound to a validated option set.
///
/// Every call builds its own workbook; nothing is shared across calls.
pub struct XlsxExporter {
    options: SpecExportOptions,
    fmt_header: SpecCellFormat,
    fmt_text: SpecCellFormat,
    fmt_number: SpecCellFormat,
    regex_numeric: Regex,
    fn_notify: Option<FnExportNotify>,
}

impl XlsxExporter {
    /// Create an exporter; options are validated and the numeric pattern compiled here.
    pub fn new(options: SpecExportOptions) -> Result<Self, ExportError> {
        validate_export_options(&options)?;
        let regex_numeric = compile_numeric_pattern(&options.pattern_numeric)?;
        Ok(Self {
            fmt_header: derive_default_xlsx_format(EnumFmtKey::Header, &options.palette),
            fmt_text: derive_default_xlsx_format(EnumFmtKey::Text, &options.palette),
            fmt_number: derive_default_xlsx_format(EnumFmtKey::Number, &options.palette),
            options,
            regex_numeric,
            fn_notify: None,
        })
    }

    /// Register a callback fired after each successful [`Self::export_to_path`].
    pub fn with_notification<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Path, &SpecXlsxReport) + Send + Sync + 'static,
    {
        self.fn_notify = Some(Box::new(callback));
        self
    }

    /// Options this exporter was built with.
    pub fn options(&self) -> &SpecExportOptions {
        &self.options
    }

    /// Export `records` into an in-memory XLSX package.
    pub fn export_to_buffer<T>(
        &self,
        sheet_prefix: Option<&str>,
        records: &[T],
        schema: &SpecRecordSchema<T>,
        header_names: Option<&[String]>,
    ) -> Result<SpecXlsxBuffer, ExportError> {
        let (mut workbook, report) =
            self.build_workbook(sheet_prefix, records, schema, header_names)?;
        let bytes = workbook
            .save_to_buffer()
            .map_err(|source| ExportError::WriteFailed {
                target: "<memory>".to_string(),
                source,
            })?;
        log::info!("{} bytes={}", report.format("[XLSX]"), bytes.len());
        Ok(SpecXlsxBuffer { bytes, report })
    }

    /// Export `records` into an XLSX file at `path_file_out`.
    pub fn export_to_path<T>(
        &self,
        sheet_prefix: Option<&str>,
        records: &[T],
        schema: &SpecRecordSchema<T>,
        header_names: Option<&[String]>,
        path_file_out: impl AsRef<Path>,
    ) -> Result<SpecXlsxReport, ExportError> {
        let path_file_out = path_file_out.as_ref();
        let (mut workbook, report) =
            self.build_workbook(sheet_prefix, records, schema, header_names)?;
        workbook
            .save(path_file_out)
            .map_err(|source| ExportError::WriteFailed {
                target: path_file_out.display().to_string(),
                source,
            })?;
        log::info!("{} path={}", report.format("[XLSX]"), path_file_out.display());

        if let Some(fn_notify) = &self.fn_notify {
            fn_notify(path_file_out, &report);
        }
        Ok(report)
    }

    fn build_workbook<T>(
        &self,
        sheet_prefix: Option<&str>,
        records: &[T],
        schema: &SpecRecordSchema<T>,
        header_names: Option<&[String]>,
    ) -> Result<(Workbook, SpecXlsxReport), ExportError> {
        let l_header_names = resolve_header_names(&schema.field_names(), header_names)?;
        if let Some(notes) = &self.options.header_notes
            && let Some(n_idx_col) = notes.notes_by_col.keys().find(|c| **c >= schema.len())
        {
            return Err(ExportError::InvalidOptions(format!(
                "header note column {n_idx_col} is out of range (schema has {} fields).",
                schema.len()
            )));
        }

        let formats = SpecWorkbookFormats {
            header: derive_rust_xlsx_format(&self.fmt_header),
            text: derive_rust_xlsx_format(&self.fmt_text),
            number: derive_rust_xlsx_format(&self.fmt_number),
        };

        let mut workbook = Workbook::new();
        let mut report = SpecXlsxReport::default();
        let l_pages = plan_sheet_pages(
            records.len(),
            self.options.size_page,
            sheet_prefix,
            &self.options.sheet_name_template,
        );

        for mut page in l_pages {
            log::debug!(
                "writing sheet {:?}: records {}..{}",
                page.sheet_name,
                page.row_start_inclusive,
                page.row_end_exclusive
            );
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&page.sheet_name)?;
            page.widths_by_col = self.write_page(
                worksheet,
                &page,
                &records[page.row_start_inclusive..page.row_end_exclusive],
                schema,
                &l_header_names,
                &formats,
                &mut report,
            )?;
            report.sheets.push(page);
        }

        Ok((workbook, report))
    }

    #[allow(clippy::too_many_arguments)]
    fn write_page<T>(
        &self,
        worksheet: &mut Worksheet,
        page: &SpecSheetPage,
        records_page: &[T],
        schema: &SpecRecordSchema<T>,
        header_names: &[String],
        formats: &SpecWorkbookFormats,
        report: &mut SpecXlsxReport,
    ) -> Result<Vec<usize>, ExportError> {
        let mut state_cols = SpecPageColumnState {
            widths_by_col: header_names.iter().map(|c| display_width(c)).collect(),
            if_image_by_col: schema
                .fields()
                .iter()
                .map(|f| f.kind() == EnumFieldKind::Binary)
                .collect(),
        };

        self.write_header(worksheet, header_names, &formats.header)?;

        for (n_offset, record) in records_page.iter().enumerate() {
            let n_row = n_offset + 1;
            for (n_idx_col, field) in schema.fields().iter().enumerate() {
                match field.extract(record) {
                    Ok(value) => self.write_field_value(
                        worksheet,
                        page,
                        n_row,
                        n_idx_col,
                        field.name(),
                        value,
                        formats,
                        &mut state_cols,
                        report,
                    )?,
                    Err(exception) => record_cell_error(
                        report,
                        page,
                        n_row,
                        n_idx_col,
                        field.name(),
                        exception,
                    ),
                }
            }
        }

        if let Some(policy_summary) = &self.options.summary_row
            && !records_page.is_empty()
        {
            let n_row_summary = records_page.len() + 2;
            let c_text = format!("{}{}", policy_summary.label, records_page.len());
            if header_names.len() >= 2 {
                worksheet.merge_range(
                    cast_row_num(n_row_summary)?,
                    0,
                    cast_row_num(n_row_summary)?,
                    1,
                    &c_text,
                    &formats.text,
                )?;
            } else {
                worksheet.write_string_with_format(
                    cast_row_num(n_row_summary)?,
                    0,
                    &c_text,
                    &formats.text,
                )?;
            }
        }

        let n_width_image = self.options.policy_image.width_col.ceil() as usize;
        let mut l_widths_final = Vec::with_capacity(state_cols.widths_by_col.len());
        for (n_idx_col, n_width_recorded) in state_cols.widths_by_col.iter().enumerate() {
            let n_width = if state_cols.if_image_by_col[n_idx_col] {
                usize::max(*n_width_recorded, n_width_image)
            } else {
                *n_width_recorded
            };
            let n_width_final = usize::min(N_WIDTH_EXCEL_COL_MAX, n_width);
            if n_width_final < n_width {
                report.warn(format!(
                    "sheet {:?} column {n_idx_col}: width {n_width} capped at {N_WIDTH_EXCEL_COL_MAX}.",
                    page.sheet_name
                ));
            }
            worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
            l_widths_final.push(n_width_final);
        }

        Ok(l_widths_final)
    }

    fn write_header(
        &self,
        worksheet: &mut Worksheet,
        header_names: &[String],
        fmt_header: &Format,
    ) -> Result<(), ExportError> {
        for (n_idx_col, c_header) in header_names.iter().enumerate() {
            worksheet.write_string_with_format(0, cast_col_num(n_idx_col)?, c_header, fmt_header)?;
        }

        if let Some(notes) = &self.options.header_notes {
            for (n_idx_col, c_note) in &notes.notes_by_col {
                let mut note = Note::new(c_note);
                if let Some(author) = &notes.author {
                    note = note.set_author(author);
                }
                worksheet.insert_note(0, cast_col_num(*n_idx_col)?, &note)?;
            }
        }

        if self.options.if_freeze_header {
            worksheet.set_freeze_panes(1, 0)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_field_value(
        &self,
        worksheet: &mut Worksheet,
        page: &SpecSheetPage,
        n_row: usize,
        n_idx_col: usize,
        field_name: &str,
        value: EnumFieldValue,
        formats: &SpecWorkbookFormats,
        state_cols: &mut SpecPageColumnState,
        report: &mut SpecXlsxReport,
    ) -> Result<(), ExportError> {
        let row = cast_row_num(n_row)?;
        let col = cast_col_num(n_idx_col)?;

        match value {
            EnumFieldValue::None => {
                worksheet.write_blank(row, col, &formats.text)?;
                report.cnt_cells_blank += 1;
            }
            EnumFieldValue::Boolean(val) => {
                let c_token = self.options.boolean_tokens.render(val);
                track_width(state_cols, n_idx_col, c_token);
                worksheet.write_string_with_format(row, col, c_token, &formats.text)?;
            }
            EnumFieldValue::Binary(v_bytes) => match Image::new_from_buffer(&v_bytes) {
                Ok(image) => {
                    let policy_image = &self.options.policy_image;
                    worksheet.set_row_height(row, policy_image.height_row)?;
                    worksheet.insert_image_fit_to_cell(
                        row,
                        col,
                        &image,
                        policy_image.if_keep_aspect_ratio,
                    )?;
                    report.cnt_images += 1;
                }
                Err(err) => record_cell_error(
                    report,
                    page,
                    n_row,
                    n_idx_col,
                    field_name,
                    format!("unsupported image payload ({} bytes): {err}", v_bytes.len()),
                ),
            },
            EnumFieldValue::Text(c_text) => {
                track_width(state_cols, n_idx_col, &c_text);
                let value_cell = convert_text_to_cell_value(&c_text, &self.regex_numeric);
                match write_cell_with_format(worksheet, row, col, &value_cell, formats) {
                    Ok(()) => {}
                    Err(XlsxError::MaxStringLengthExceeded) => record_cell_error(
                        report,
                        page,
                        n_row,
                        n_idx_col,
                        field_name,
                        format!(
                            "text of {} characters exceeds the Excel cell limit",
                            c_text.chars().count()
                        ),
                    ),
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }
}

fn track_width(state_cols: &mut SpecPageColumnState, n_idx_col: usize, text: &str) {
    let n_width = display_width(text);
    if state_cols.widths_by_col[n_idx_col] < n_width {
        state_cols.widths_by_col[n_idx_col] = n_width;
    }
}

fn record_cell_error(
    report: &mut SpecXlsxReport,
    page: &SpecSheetPage,
    n_row: usize,
    n_idx_col: usize,
    field_name: &str,
    exception: String,
) {
    log::warn!(
        "sheet {:?} row {n_row} col {n_idx_col} ({field_name}): {exception}; cell left blank",
        page.sheet_name
    );
    report.cell_errors.push(SpecCellError {
        sheet_name: page.sheet_name.clone(),
        row_idx: n_row,
        col_idx: n_idx_col,
        field_name: field_name.to_string(),
        exception,
    });
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    formats: &SpecWorkbookFormats,
) -> Result<(), XlsxError> {
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(row, col, &formats.text)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(row, col, val, &formats.text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(row, col, *val, &formats.number)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if spec.border.unwrap_or(false) {
        format = format.set_border(FormatBorder::Thin);
    }

    format
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align {
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "vcenter" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, ExportError> {
    u32::try_from(value)
        .map_err(|_| ExportError::InvalidOptions(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, ExportError> {
    u16::try_from(value)
        .map_err(|_| ExportError::InvalidOptions(format!("column index overflow: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{SpecBooleanTokens, SpecSummaryRowPolicy};

    struct Row {
        name: &'static str,
        qty: i64,
        ok: bool,
    }

    fn row_schema() -> SpecRecordSchema<Row> {
        SpecRecordSchema::new()
            .with_text("name", |r: &Row| r.name)
            .with_text("qty", |r: &Row| r.qty)
            .with_bool("ok", |r: &Row| r.ok)
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row {
                name: if i % 2 == 0 { "alpha" } else { "一二三四五六" },
                qty: i as i64,
                ok: i % 3 == 0,
            })
            .collect()
    }

    #[test]
    fn test_export_to_buffer_pages_and_widths() {
        let exporter = XlsxExporter::new(SpecExportOptions {
            size_page: 4,
            ..Default::default()
        })
        .unwrap();
        let buffer = exporter
            .export_to_buffer(Some("Rows"), &rows(10), &row_schema(), None)
            .unwrap();

        assert!(!buffer.bytes.is_empty());
        let report = buffer.report;
        assert_eq!(report.sheets.len(), 3);
        assert_eq!(report.n_records(), 10);
        assert_eq!(report.sheets[2].n_records(), 2);
        assert_eq!(report.sheets[0].sheet_name, "Rows_0");

        // "一二三四五六" = 12 + 2; header "name" = 6.
        assert_eq!(report.sheets[0].widths_by_col[0], 14);
        // header "qty" (5) dominates single-digit quantities (3).
        assert_eq!(report.sheets[0].widths_by_col[1], 5);
        // "Yes" = 5, header "ok" = 4.
        assert_eq!(report.sheets[0].widths_by_col[2], 5);
        assert!(report.cell_errors.is_empty());
    }

    #[test]
    fn test_export_rejects_header_count_mismatch_before_writing() {
        let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
        let l_headers = vec!["Name".to_string()];
        let err = exporter
            .export_to_buffer(None, &rows(0), &row_schema(), Some(l_headers.as_slice()))
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::HeaderCountMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_export_records_extraction_failures_and_continues() {
        let schema: SpecRecordSchema<i64> = SpecRecordSchema::new()
            .with_text("value", |v: &i64| *v)
            .with_field("checked", EnumFieldKind::Other, |v: &i64| {
                if *v < 0 {
                    Err("negative value".to_string())
                } else {
                    Ok(EnumFieldValue::text(v))
                }
            })
            .with_optional_text("maybe", |v: &i64| (*v > 1).then_some(*v));

        let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
        let report = exporter
            .export_to_buffer(None, &[1, -2, 3], &schema, None)
            .unwrap()
            .report;

        assert_eq!(report.error_count(), 1);
        let err = &report.cell_errors[0];
        assert_eq!((err.row_idx, err.col_idx), (2, 1));
        assert_eq!(err.field_name, "checked");
        assert_eq!(err.sheet_name, "Page 1");
        // "maybe" is empty for 1 and -2.
        assert_eq!(report.cnt_cells_blank, 2);
    }

    #[test]
    fn test_export_invalid_image_is_a_cell_error() {
        let schema: SpecRecordSchema<Vec<u8>> =
            SpecRecordSchema::new().with_binary("photo", |v: &Vec<u8>| Some(v.as_slice()));
        let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
        let report = exporter
            .export_to_buffer(None, &[vec![0u8, 1, 2, 3]], &schema, None)
            .unwrap()
            .report;
        assert_eq!(report.cnt_images, 0);
        assert_eq!(report.error_count(), 1);
        assert!(report.cell_errors[0].exception.contains("unsupported image"));
        // image columns are widened even when no picture made it in.
        assert_eq!(report.sheets[0].widths_by_col, vec![11]);
    }

    #[test]
    fn test_export_rejects_out_of_range_header_note() {
        let mut options = SpecExportOptions::default();
        options.header_notes = Some(crate::spec::SpecHeaderNotes {
            author: None,
            notes_by_col: [(5usize, "nope".to_string())].into_iter().collect(),
        });
        let exporter = XlsxExporter::new(options).unwrap();
        assert!(matches!(
            exporter.export_to_buffer(None, &rows(1), &row_schema(), None),
            Err(ExportError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_export_with_summary_row_and_custom_tokens() {
        let exporter = XlsxExporter::new(SpecExportOptions {
            boolean_tokens: SpecBooleanTokens::zh(),
            summary_row: Some(SpecSummaryRowPolicy::default()),
            ..Default::default()
        })
        .unwrap();
        let buffer = exporter
            .export_to_buffer(None, &rows(3), &row_schema(), None)
            .unwrap();
        // "是" = 2 + 2, header "ok" = 4.
        assert_eq!(buffer.report.sheets[0].widths_by_col[2], 4);
    }

    #[test]
    fn test_new_rejects_invalid_numeric_pattern() {
        let options = SpecExportOptions {
            pattern_numeric: "([".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            XlsxExporter::new(options),
            Err(ExportError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_derive_format_align_covers_preset_values() {
        assert_eq!(derive_format_align("center"), Some(FormatAlign::Center));
        assert_eq!(derive_format_align("right"), Some(FormatAlign::Right));
        assert_eq!(
            derive_format_align("vcenter"),
            Some(FormatAlign::VerticalCenter)
        );
        assert_eq!(derive_format_align("diagonal"), None);
    }
}
