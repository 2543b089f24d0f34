use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use calamine::{Data, Range, Reader, Xlsx, open_workbook, open_workbook_from_rs};
use regex::Regex;
use tabkit_io_xlsx::{
    EnumFieldKind, EnumFieldValue, ExportError, SpecBooleanTokens, SpecExportOptions,
    SpecHeaderNotes, SpecRecordSchema, SpecSummaryRowPolicy, TabularRecord, XlsxExporter, export,
    export_named, export_to_path_with_headers, export_with_headers,
};

// 1x1 transparent PNG.
const V_PNG_1X1: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[derive(Clone)]
struct Order {
    id: u32,
    customer: String,
    amount: String,
    paid: bool,
    note: Option<String>,
}

impl TabularRecord for Order {
    fn schema() -> SpecRecordSchema<Self> {
        SpecRecordSchema::new()
            .with_text("id", |o: &Order| o.id)
            .with_text("customer", |o: &Order| o.customer.clone())
            .with_text("amount", |o: &Order| o.amount.clone())
            .with_bool("paid", |o: &Order| o.paid)
            .with_optional_text("note", |o: &Order| o.note.clone())
    }
}

fn orders(n: usize) -> Vec<Order> {
    (0..n)
        .map(|i| Order {
            id: i as u32 + 1,
            customer: format!("客户{i}"),
            amount: if i % 2 == 0 {
                format!("{}.50", i * 10)
            } else {
                "n/a".to_string()
            },
            paid: i % 2 == 0,
            note: (i == 0).then(|| "first".to_string()),
        })
        .collect()
}

fn read_sheets(v_bytes: Vec<u8>) -> Vec<(String, Range<Data>)> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(v_bytes)).unwrap();
    let l_names = workbook.sheet_names().to_vec();
    l_names
        .into_iter()
        .map(|c_name| {
            let range = workbook.worksheet_range(&c_name).unwrap();
            (c_name, range)
        })
        .collect()
}

fn cell(range: &Range<Data>, row: u32, col: u32) -> Data {
    range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
}

fn read_package_part(v_bytes: &[u8], c_part: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(v_bytes)).unwrap();
    let mut c_xml = String::new();
    archive
        .by_name(c_part)
        .unwrap()
        .read_to_string(&mut c_xml)
        .unwrap();
    c_xml
}

/// Cell reference -> `s` style index (0 when absent).
fn read_cell_styles(c_sheet_xml: &str) -> BTreeMap<String, u32> {
    let regex_cell = Regex::new(r#"<c r="([A-Z]+[0-9]+)"(?: s="([0-9]+)")?"#).unwrap();
    regex_cell
        .captures_iter(c_sheet_xml)
        .map(|caps| {
            let n_style = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap());
            (caps[1].to_string(), n_style)
        })
        .collect()
}

#[test]
fn test_export_writes_header_and_typed_cells() {
    let cursor = export(&orders(3)).unwrap();
    let l_sheets = read_sheets(cursor.into_inner());
    assert_eq!(l_sheets.len(), 1);
    let (c_name, range) = &l_sheets[0];
    assert_eq!(c_name, "Page 1");

    let l_header: Vec<Data> = (0..5).map(|c| cell(range, 0, c)).collect();
    assert_eq!(
        l_header,
        ["id", "customer", "amount", "paid", "note"]
            .iter()
            .map(|c| Data::String(c.to_string()))
            .collect::<Vec<_>>()
    );

    assert_eq!(cell(range, 1, 0), Data::Float(1.0));
    assert_eq!(cell(range, 1, 1), Data::String("客户0".to_string()));
    assert_eq!(cell(range, 1, 2), Data::Float(0.5));
    assert_eq!(cell(range, 2, 2), Data::String("n/a".to_string()));
    assert_eq!(cell(range, 3, 2), Data::Float(20.5));
    assert_eq!(cell(range, 1, 3), Data::String("Yes".to_string()));
    assert_eq!(cell(range, 2, 3), Data::String("No".to_string()));
    assert_eq!(cell(range, 1, 4), Data::String("first".to_string()));
    assert_eq!(cell(range, 2, 4), Data::Empty);
}

#[test]
fn test_export_named_pages_records_in_order() {
    let exporter = XlsxExporter::new(SpecExportOptions {
        size_page: 2,
        ..Default::default()
    })
    .unwrap();
    let buffer = exporter
        .export_to_buffer(Some("Orders"), &orders(5), &Order::schema(), None)
        .unwrap();
    assert_eq!(buffer.report.sheets.len(), 3);

    let l_sheets = read_sheets(buffer.bytes);
    let l_names: Vec<&str> = l_sheets.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(l_names, vec!["Orders_0", "Orders_1", "Orders_2"]);

    // Every page repeats the header; ids continue across pages.
    for (n_idx_page, (_, range)) in l_sheets.iter().enumerate() {
        assert_eq!(cell(range, 0, 0), Data::String("id".to_string()));
        assert_eq!(cell(range, 1, 0), Data::Float((n_idx_page * 2 + 1) as f64));
    }
    assert_eq!(cell(&l_sheets[2].1, 2, 0), Data::Empty);
}

#[test]
fn test_export_default_page_size_splits_at_fifty_thousand() {
    struct Tick(usize);
    let schema: SpecRecordSchema<Tick> = SpecRecordSchema::new().with_text("n", |t: &Tick| t.0);
    let l_ticks: Vec<Tick> = (0..50_001).map(Tick).collect();

    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let buffer = exporter
        .export_to_buffer(Some("Ticks"), &l_ticks, &schema, None)
        .unwrap();

    let report = &buffer.report;
    assert_eq!(report.sheets.len(), 2);
    assert_eq!(report.sheets[0].n_records(), 50_000);
    assert_eq!(report.sheets[1].n_records(), 1);

    let l_sheets = read_sheets(buffer.bytes);
    assert_eq!(l_sheets.len(), 2);
    assert_eq!(cell(&l_sheets[1].1, 1, 0), Data::Float(50_000.0));
}

#[test]
fn test_export_empty_records_has_no_data_pages() {
    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let buffer = exporter
        .export_to_buffer(None, &Vec::<Order>::new(), &Order::schema(), None)
        .unwrap();
    assert!(buffer.report.sheets.is_empty());
    assert_eq!(buffer.report.n_records(), 0);

    // The package stays readable.
    let l_sheets = read_sheets(buffer.bytes);
    assert!(l_sheets.iter().all(|(_, range)| range.is_empty()));
}

#[test]
fn test_export_with_headers_overrides_field_names() {
    let l_headers: Vec<String> = ["编号", "客户", "金额", "已付", "备注"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let cursor = export_with_headers(&orders(1), &l_headers).unwrap();
    let l_sheets = read_sheets(cursor.into_inner());
    let range = &l_sheets[0].1;
    assert_eq!(cell(range, 0, 0), Data::String("编号".to_string()));
    assert_eq!(cell(range, 0, 4), Data::String("备注".to_string()));
}

#[test]
fn test_header_count_mismatch_is_rejected_even_without_records() {
    let l_headers = vec!["only".to_string(), "two".to_string()];
    let err = export_named::<Order>(Some("x"), &[], Some(l_headers.as_slice())).unwrap_err();
    assert!(matches!(
        err,
        ExportError::HeaderCountMismatch {
            expected: 5,
            actual: 2
        }
    ));
}

#[test]
fn test_column_widths_cover_header_and_values() {
    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let report = exporter
        .export_to_buffer(None, &orders(12), &Order::schema(), None)
        .unwrap()
        .report;
    let l_widths = &report.sheets[0].widths_by_col;
    // "id"=4, "12"=4.
    assert_eq!(l_widths[0], 4);
    // header "customer"=10 beats "客户10"=8.
    assert_eq!(l_widths[1], 10);
    // "100.50"=8, "amount"=8.
    assert_eq!(l_widths[2], 8);
}

#[test]
fn test_wide_text_width_is_capped() {
    struct Blob(String);
    let schema: SpecRecordSchema<Blob> =
        SpecRecordSchema::new().with_text("blob", |b: &Blob| b.0.clone());
    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let report = exporter
        .export_to_buffer(None, &[Blob("中".repeat(400))], &schema, None)
        .unwrap()
        .report;
    assert_eq!(report.sheets[0].widths_by_col, vec![255]);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_failed_extraction_leaves_blank_and_is_reported() {
    struct Reading(f64);
    let schema: SpecRecordSchema<Reading> = SpecRecordSchema::new()
        .with_text("raw", |r: &Reading| r.0)
        .with_field("sqrt", EnumFieldKind::Other, |r: &Reading| {
            if r.0 < 0.0 {
                Err(format!("cannot take sqrt of {}", r.0))
            } else {
                Ok(EnumFieldValue::text(r.0.sqrt()))
            }
        });

    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let buffer = exporter
        .export_to_buffer(None, &[Reading(4.0), Reading(-1.0)], &schema, None)
        .unwrap();
    assert_eq!(buffer.report.error_count(), 1);
    assert_eq!(buffer.report.cell_errors[0].row_idx, 2);
    assert_eq!(buffer.report.cnt_cells_blank, 0);

    let l_sheets = read_sheets(buffer.bytes);
    let range = &l_sheets[0].1;
    assert_eq!(cell(range, 1, 1), Data::Float(2.0));
    assert_eq!(cell(range, 2, 0), Data::Float(-1.0));
    assert_eq!(cell(range, 2, 1), Data::Empty);
}

#[test]
fn test_chinese_boolean_tokens_and_summary_row() {
    let exporter = XlsxExporter::new(SpecExportOptions {
        boolean_tokens: SpecBooleanTokens::zh(),
        summary_row: Some(SpecSummaryRowPolicy {
            label: "总件数：".to_string(),
        }),
        header_notes: Some(SpecHeaderNotes {
            author: Some("tabkit".to_string()),
            notes_by_col: [(3usize, "payment received".to_string())]
                .into_iter()
                .collect(),
        }),
        if_freeze_header: true,
        ..Default::default()
    })
    .unwrap();
    let buffer = exporter
        .export_to_buffer(None, &orders(3), &Order::schema(), None)
        .unwrap();

    let l_sheets = read_sheets(buffer.bytes);
    let range = &l_sheets[0].1;
    assert_eq!(cell(range, 1, 3), Data::String("是".to_string()));
    assert_eq!(cell(range, 2, 3), Data::String("否".to_string()));
    assert_eq!(cell(range, 4, 0), Data::Empty);
    assert_eq!(cell(range, 5, 0), Data::String("总件数：3".to_string()));
}

#[test]
fn test_binary_fields_become_images() {
    struct Badge(Option<Vec<u8>>);
    let schema: SpecRecordSchema<Badge> = SpecRecordSchema::new()
        .with_text("label", |_: &Badge| "badge")
        .with_binary("icon", |b: &Badge| b.0.as_deref());

    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let report = exporter
        .export_to_buffer(
            None,
            &[Badge(Some(V_PNG_1X1.to_vec())), Badge(None)],
            &schema,
            None,
        )
        .unwrap()
        .report;
    assert_eq!(report.cnt_images, 1);
    assert_eq!(report.cnt_cells_blank, 1);
    assert_eq!(report.sheets[0].widths_by_col[1], 11);
    assert!(report.cell_errors.is_empty());
}

#[test]
fn test_image_row_takes_policy_height() {
    struct Badge(Option<Vec<u8>>);
    let schema: SpecRecordSchema<Badge> = SpecRecordSchema::new()
        .with_text("label", |_: &Badge| "badge")
        .with_binary("icon", |b: &Badge| b.0.as_deref());

    let exporter = XlsxExporter::new(SpecExportOptions::default()).unwrap();
    let buffer = exporter
        .export_to_buffer(
            None,
            &[Badge(Some(V_PNG_1X1.to_vec())), Badge(None)],
            &schema,
            None,
        )
        .unwrap();

    let c_sheet_xml = read_package_part(&buffer.bytes, "xl/worksheets/sheet1.xml");
    let regex_row = Regex::new(r#"<row r="([0-9]+)"([^>]*)>"#).unwrap();
    let regex_height = Regex::new(r#" ht="([0-9.]+)""#).unwrap();
    let dict_heights: BTreeMap<u32, Option<f64>> = regex_row
        .captures_iter(&c_sheet_xml)
        .map(|caps| {
            let n_height = regex_height
                .captures(&caps[2])
                .map(|caps_ht| caps_ht[1].parse().unwrap());
            (caps[1].parse().unwrap(), n_height)
        })
        .collect();

    // Row 2 holds the image; row 3 has none.
    assert_eq!(dict_heights.get(&2), Some(&Some(60.0)));
    assert_eq!(dict_heights.get(&3).copied().flatten(), None);
}

#[test]
fn test_cells_are_styled_by_role_and_kind() {
    let cursor = export(&orders(2)).unwrap();
    let v_bytes = cursor.into_inner();

    let dict_styles = read_cell_styles(&read_package_part(&v_bytes, "xl/worksheets/sheet1.xml"));
    let style = |c_ref: &str| *dict_styles.get(c_ref).unwrap();

    // Row 2: id=1 (number), 客户0 (text), 0.50 (number), Yes (text), note (text).
    // Row 3: id=2 (number), 客户1 (text), n/a (text), No (text), blank (text).
    let n_header = style("A1");
    let n_number = style("A2");
    let n_text = style("B2");

    assert_ne!(n_header, 0);
    assert_ne!(n_number, 0);
    assert_ne!(n_text, 0);
    assert_ne!(n_header, n_number);
    assert_ne!(n_header, n_text);
    assert_ne!(n_number, n_text);

    for c_ref in ["B1", "C1", "D1", "E1"] {
        assert_eq!(style(c_ref), n_header, "{c_ref}");
    }
    for c_ref in ["C2", "A3"] {
        assert_eq!(style(c_ref), n_number, "{c_ref}");
    }
    for c_ref in ["D2", "E2", "B3", "C3", "D3", "E3"] {
        assert_eq!(style(c_ref), n_text, "{c_ref}");
    }

    let c_styles_xml = read_package_part(&v_bytes, "xl/styles.xml");
    assert!(c_styles_xml.contains("<b/>"));
    assert!(c_styles_xml.contains("FF00CCFF"));
    assert!(c_styles_xml.contains("FF800080"));
    assert!(c_styles_xml.contains("FFFFFF99"));
    assert!(c_styles_xml.contains("FF0000FF"));
}

#[test]
fn test_export_to_path_notifies_after_write() {
    let dir = tempfile::tempdir().unwrap();
    let path_out = dir.path().join("orders.xlsx");

    let l_seen: Arc<Mutex<Vec<(PathBuf, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let l_seen_cb = Arc::clone(&l_seen);
    let exporter = XlsxExporter::new(SpecExportOptions::default())
        .unwrap()
        .with_notification(move |path, report| {
            l_seen_cb
                .lock()
                .unwrap()
                .push((path.to_path_buf(), report.n_records()));
        });

    let report = exporter
        .export_to_path(Some("Orders"), &orders(4), &Order::schema(), None, &path_out)
        .unwrap();
    assert_eq!(report.n_records(), 4);
    assert_eq!(*l_seen.lock().unwrap(), vec![(path_out.clone(), 4)]);

    let mut workbook: Xlsx<_> = open_workbook(&path_out).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Orders_0".to_string()]);
    let range = workbook.worksheet_range("Orders_0").unwrap();
    assert_eq!(range.height(), 5);
}

#[test]
fn test_export_to_missing_directory_is_write_failed() {
    let dir = tempfile::tempdir().unwrap();
    let path_out = dir.path().join("missing").join("orders.xlsx");
    let l_headers: Vec<String> = Order::schema().field_names();
    let err = export_to_path_with_headers(&orders(1), &l_headers, &path_out).unwrap_err();
    assert!(matches!(err, ExportError::WriteFailed { .. }));
}
