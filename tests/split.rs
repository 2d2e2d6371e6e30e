use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_splitter::reader::XlsxReader;
use sheet_splitter::workbook::builder::WorkbookBuilder;
use sheet_splitter::workbook::cell::{Cell, CellValue, Row};
use sheet_splitter::workbook::sheet::Column;
use sheet_splitter::workbook::style::{Style, border::BorderStyle, number::NumberFormat};
use sheet_splitter::{SplitConfig, SplitterError, Splitter};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Writes a one-sheet workbook: a styled header followed by `rows - 1` data rows
/// mixing every value type.
fn write_report(path: &Path, rows: usize) {
    let mut wb = WorkbookBuilder::new(path)
        .set_sheets(["Report"])
        .build()
        .unwrap();
    let header = wb.register_style(
        &Style::new()
            .bold()
            .bg("2784F5")
            .border_bottom(BorderStyle::Medium)
            .align("center"),
    );
    let date = wb.register_style(&Style::new().format(NumberFormat::Date));
    let money = wb.register_style(&Style::new().custom_format("#,##0.00 \"EUR\"").italic());

    let sheet = wb.get_sheet("Report").unwrap();
    sheet.set_columns(vec![Column {
        min: 2,
        max: 2,
        width: Some(24.0),
        hidden: false,
    }]);
    sheet
        .write_values(
            &[
                CellValue::text("id"),
                CellValue::text("name"),
                CellValue::text("due"),
                CellValue::text("paid"),
                CellValue::text("amount"),
                CellValue::text("double"),
            ],
            header,
        )
        .unwrap();

    for i in 1..rows {
        let r = i as u32;
        sheet
            .write_row(&Row {
                index: r,
                height: None,
                cells: vec![
                    Cell::new(0, CellValue::num(i as f64)),
                    Cell::new(1, CellValue::text(format!("item {i}"))),
                    Cell::new(2, CellValue::date(45000.0 + i as f64)).with_style(date),
                    Cell::new(3, CellValue::bool(i % 2 == 0)),
                    Cell::new(4, CellValue::num(i as f64 * 1.5)).with_style(money),
                    Cell::new(5, CellValue::formula(format!("A{}*2", r + 1))),
                ],
            })
            .unwrap();
    }
    wb.finish().unwrap();
}

fn read_rows(path: &Path) -> Vec<Row> {
    let reader = XlsxReader::open(path).unwrap();
    let sheet = reader.first_sheet().unwrap();
    sheet.rows().collect::<Result<Vec<_>, _>>().unwrap()
}

fn values(row: &Row) -> Vec<CellValue> {
    row.cells.iter().map(|c| c.value.clone()).collect()
}

fn expected_files(rows: usize, max: usize) -> usize {
    if rows < max {
        0
    } else {
        1 + (rows - max).div_ceil(max - 1)
    }
}

fn source_in(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("report.xlsx");
    write_report(&path, rows);
    path
}

#[test]
fn below_threshold_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(dir.path(), 10);
    let before = fs::read(&source).unwrap();

    let report = Splitter::with_config(&source, SplitConfig::new(11)).split().unwrap();

    assert_eq!(report.source_rows, 10);
    assert!(!report.is_split());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(fs::read(&source).unwrap(), before);
}

#[test]
fn splits_2500_rows_into_three_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(dir.path(), 2500);

    let report = Splitter::with_config(&source, SplitConfig::new(1000)).split().unwrap();

    assert_eq!(report.source_rows, 2500);
    assert_eq!(
        report.files.iter().map(|f| f.rows).collect::<Vec<_>>(),
        vec![1000, 1000, 502]
    );
    assert_eq!(
        report.files.iter().map(|f| f.path.clone()).collect::<Vec<_>>(),
        vec![
            dir.path().join("report_1.xlsx"),
            dir.path().join("report_2.xlsx"),
            dir.path().join("report_3.xlsx"),
        ]
    );

    let whole = read_rows(&source);
    let chunks: Vec<Vec<Row>> = report.files.iter().map(|f| read_rows(&f.path)).collect();
    assert_eq!(
        chunks.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![1000, 1000, 502]
    );

    for chunk in &chunks[1..] {
        assert_eq!(values(&chunk[0]), values(&whole[0]));
    }

    let rejoined: Vec<Vec<CellValue>> = chunks
        .iter()
        .enumerate()
        .flat_map(|(i, chunk)| chunk.iter().skip(usize::from(i > 0)).map(values))
        .collect();
    let expected: Vec<Vec<CellValue>> = whole.iter().map(values).collect();
    assert_eq!(rejoined, expected);
}

#[test]
fn file_count_matches_chunking_policy() {
    for (rows, max) in [(2, 2), (7, 7), (8, 7), (10, 3), (13, 4), (30, 10)] {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path(), rows);

        let report = Splitter::with_config(&source, SplitConfig::new(max)).split().unwrap();

        assert_eq!(report.files.len(), expected_files(rows, max), "{rows} rows, max {max}");
        assert!(report.files.iter().all(|f| f.rows <= max));
        assert_eq!(report.files.iter().map(|f| f.source_rows).sum::<usize>(), rows);
        assert!(report.files.iter().skip(1).all(|f| f.rows == f.source_rows + 1));
    }
}

#[test]
fn types_formulas_and_styles_survive() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(dir.path(), 9);

    let report = Splitter::with_config(&source, SplitConfig::new(4)).split().unwrap();
    assert_eq!(report.files.len(), 3);

    let src = XlsxReader::open(&source).unwrap();
    let src_rows = read_rows(&source);

    let second = XlsxReader::open(&report.files[1].path).unwrap();
    assert_eq!(second.sheet_names(), ["Report"]);
    let out_rows = read_rows(&report.files[1].path);

    // header + source rows 4..=6
    assert_eq!(out_rows.len(), 4);
    let pairs = std::iter::once((&src_rows[0], &out_rows[0]))
        .chain(src_rows[4..7].iter().zip(&out_rows[1..]));
    for (src_row, out_row) in pairs {
        assert_eq!(src_row.cells.len(), out_row.cells.len());
        for (a, b) in src_row.cells.iter().zip(&out_row.cells) {
            assert_eq!(a.col, b.col);
            assert_eq!(a.value, b.value);
            assert_eq!(src.styles()[a.style], second.styles()[b.style]);
        }
    }

    let header_style = &second.styles()[out_rows[0].cells[0].style];
    assert!(header_style.font.bold);
    assert_eq!(header_style.border.bottom.style, BorderStyle::Medium);
    assert_eq!(header_style.alignment.horizontal.as_deref(), Some("center"));

    let row = &out_rows[1];
    assert_eq!(row.cells[2].value, CellValue::date(45004.0));
    assert!(second.styles()[row.cells[2].style].number_format.is_date());
    assert_eq!(row.cells[5].value, CellValue::formula("A5*2"));
    assert_eq!(
        second.styles()[row.cells[4].style].number_format,
        NumberFormat::Custom("#,##0.00 \"EUR\"".into())
    );

    let columns = second.first_sheet().unwrap().columns().unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].width, Some(24.0));
}

#[test]
fn exact_threshold_gives_a_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(dir.path(), 5);

    let report = Splitter::with_config(&source, SplitConfig::new(5)).split().unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(read_rows(&report.files[0].path).len(), 5);
    assert!(!dir.path().join("report_2.xlsx").exists());
}

#[test]
fn encrypted_workbooks_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.xlsx");
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.resize(512, 0);
    fs::write(&path, bytes).unwrap();

    let err = Splitter::new(&path).split().unwrap_err();
    assert!(matches!(err, SplitterError::Encrypted(_)), "{err}");
}

#[test]
fn corrupt_files_are_invalid_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    fs::write(&path, "this is not a zip archive\n".repeat(64)).unwrap();

    let err = Splitter::new(&path).split().unwrap_err();
    assert!(matches!(err, SplitterError::InvalidFormat(_)), "{err}");
}

#[test]
fn package_without_workbook_part_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.xlsx");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    zip.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"hi").unwrap();
    zip.finish().unwrap();

    let err = Splitter::new(&path).split().unwrap_err();
    assert!(matches!(err, SplitterError::InvalidFormat(ref m) if m.contains("xl/workbook.xml")));
}

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Q1 &amp; Q2" sheetId="1" r:id="rId1"/><sheet name="Ignored" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
</Relationships>"#;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Harbor">
<a:themeElements><a:clrScheme name="Harbor"><a:dk1><a:srgbClr val="1B1B1B"/></a:dk1><a:lt1><a:srgbClr val="FAFAF5"/></a:lt1>
<a:accent1><a:srgbClr val="0F6E75"/></a:accent1></a:clrScheme>
<a:fontScheme name="Harbor"><a:majorFont><a:latin typeface="Georgia"/></a:majorFont><a:minorFont><a:latin typeface="Verdana"/></a:minorFont></a:fontScheme>
</a:themeElements>
</a:theme>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
<si><t>Region</t></si><si><t>Total</t></si><si><r><rPr><b/></rPr><t>No</t></r><r><t>rth</t></r></si><si><t xml:space="preserve">South </t></si>
</sst>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="170" formatCode="0.0%"/></numFmts>
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="12"/><color theme="0"/><name val="Calibri"/></font></fonts>
<fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor theme="4" tint="-0.249977111117893"/><bgColor indexed="64"/></patternFill></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/><xf numFmtId="170" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:C5"/>
<cols><col min="1" max="1" width="30.7109375" customWidth="1"/><col min="2" max="3" width="9.140625"/></cols>
<sheetData>
<row r="1" spans="1:3"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="1" t="s"><v>1</v></c></row>
<row r="2" spans="1:4"><c r="A2" t="s"><v>2</v></c><c r="B2" s="2"><v>0.25</v></c><c r="D2"><f t="shared" ref="D2:D4" si="0">B2*$B$2</f><v>0.0625</v></c></row>
<row r="3" spans="1:4"><c r="A3" t="s"><v>3</v></c><c r="B3" s="2"><v>0.5</v></c><c r="C3" t="e" s="2"><v>#N/A</v></c><c r="D3"><f t="shared" si="0"/></c></row>
<row r="4" spans="1:4"><c r="A4" t="inlineStr"><is><t>East</t></is></c><c r="B4"><f>B2+B3</f><v>0.75</v></c><c r="D4"><f t="shared" si="0"/><v>0.1875</v></c></row>
<row r="6" spans="1:3" ht="30" customHeight="1"><c r="C6" t="b"><v>0</v></c></row>
</sheetData>
</worksheet>"#;

fn write_package(path: &Path) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/sharedStrings.xml", SHARED_STRINGS),
        ("xl/styles.xml", STYLES),
        ("xl/theme/theme1.xml", THEME),
        ("xl/worksheets/sheet1.xml", SHEET1),
        ("xl/worksheets/sheet2.xml", "<worksheet><sheetData/></worksheet>"),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn splits_a_package_written_by_another_producer() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("regions.xlsx");
    write_package(&source);

    let report = Splitter::with_config(&source, SplitConfig::new(3)).split().unwrap();
    assert_eq!(report.source_rows, 5);
    assert_eq!(
        report.files.iter().map(|f| f.rows).collect::<Vec<_>>(),
        vec![3, 3]
    );

    let first = read_rows(&report.files[0].path);
    assert_eq!(
        values(&first[0]),
        vec![CellValue::text("Region"), CellValue::text("Total")]
    );
    assert_eq!(
        values(&first[1]),
        vec![
            CellValue::text("North"),
            CellValue::num(0.25),
            CellValue::formula("B2*$B$2")
        ]
    );
    assert_eq!(
        values(&first[2]),
        vec![
            CellValue::text("South "),
            CellValue::num(0.5),
            CellValue::Blank,
            CellValue::formula("B3*$B$2")
        ]
    );

    let out = XlsxReader::open(&report.files[1].path).unwrap();
    assert_eq!(out.sheet_names(), ["Q1 & Q2"]);
    let second = read_rows(&report.files[1].path);
    assert_eq!(second.len(), 3);
    assert_eq!(
        values(&second[0]),
        vec![CellValue::text("Region"), CellValue::text("Total")]
    );
    assert_eq!(
        values(&second[1]),
        vec![
            CellValue::text("East"),
            CellValue::formula("B2+B3"),
            CellValue::formula("B4*$B$2")
        ]
    );
    assert_eq!(second[2].cells[0].col, 2);
    assert_eq!(second[2].cells[0].value, CellValue::bool(false));
    assert_eq!(second[2].height, Some(30.0));

    let src = XlsxReader::open(&source).unwrap();
    let header_style = &out.styles()[second[0].cells[0].style];
    assert_eq!(header_style, &src.styles()[1]);
    assert!(header_style.font.bold);

    let first_out = XlsxReader::open(&report.files[0].path).unwrap();
    let blank_error = &first[2].cells[2];
    assert_eq!(first_out.styles()[blank_error.style].number_format, NumberFormat::Custom("0.0%".into()));

    let columns = out.first_sheet().unwrap().columns().unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!((columns[0].min, columns[0].max), (1, 1));
    assert_eq!(columns[0].width, Some(30.7109375));

    // theme="0" and theme="4" colors above resolve against the copied theme
    let theme = src.theme().unwrap();
    assert_eq!(&theme[..], THEME.as_bytes());
    for file in &report.files {
        let chunk = XlsxReader::open(&file.path).unwrap();
        assert_eq!(chunk.theme().as_deref(), Some(&theme[..]));
    }
}

#[test]
fn workbooks_without_a_theme_stay_without_one() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(dir.path(), 6);

    let report = Splitter::with_config(&source, SplitConfig::new(4)).split().unwrap();

    assert_eq!(report.files.len(), 2);
    assert!(XlsxReader::open(&source).unwrap().theme().is_none());
    for file in &report.files {
        assert!(XlsxReader::open(&file.path).unwrap().theme().is_none());
    }
}

/// Rewrites the uncompressed size recorded for `name` in the central directory.
fn forge_declared_size(bytes: &mut [u8], name: &str, size: u32) {
    const CENTRAL_HEADER: &[u8] = b"PK\x01\x02";
    let mut patched = false;
    for at in 0..bytes.len().saturating_sub(46) {
        if &bytes[at..at + 4] != CENTRAL_HEADER {
            continue;
        }
        let name_len = u16::from_le_bytes([bytes[at + 28], bytes[at + 29]]) as usize;
        if bytes.get(at + 46..at + 46 + name_len) == Some(name.as_bytes()) {
            bytes[at + 24..at + 28].copy_from_slice(&size.to_le_bytes());
            patched = true;
        }
    }
    assert!(patched, "no central directory entry for {name}");
}

#[test]
fn oversized_declared_part_size_is_not_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("liar.xlsx");
    write_package(&path);

    let mut bytes = fs::read(&path).unwrap();
    forge_declared_size(&mut bytes, "xl/theme/theme1.xml", 0xFFFF_FFFE);
    forge_declared_size(&mut bytes, "xl/styles.xml", 0xFFFF_FFFE);
    fs::write(&path, bytes).unwrap();

    match XlsxReader::open(&path) {
        Ok(reader) => assert_eq!(reader.sheet_names(), ["Q1 & Q2", "Ignored"]),
        Err(err) => assert!(
            matches!(
                err,
                SplitterError::InvalidFormat(_) | SplitterError::Zip(_) | SplitterError::Io(_)
            ),
            "{err}"
        ),
    }
}
