use std::{
    collections::HashMap,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::NamedTempFile;
use zip::{ZipWriter, write::SimpleFileOptions};

use crate::{
    Result,
    error::SplitterError,
    workbook::{
        cell::CellValue,
        sheet::SheetWriter,
        style::{Style, StyleRegistry},
    },
};
pub mod builder;
pub mod cell;
pub mod sheet;
pub mod style;

const RELS_DOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

fn workbook_xml(order: &[String]) -> String {
    let mut sheets = String::new();
    for (i, name) in order.iter().enumerate() {
        let sheet_id = i + 1;
        let r_id = format!("rId{}", i + 1);
        let escaped_name = xml_escape(name);
        sheets.push_str(&format!(
            r#"<sheet name="{escaped_name}" sheetId="{sheet_id}" r:id="{r_id}"/>"#
        ));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<bookViews><workbookView activeTab="0"/></bookViews>"#,
            r#"<sheets>{}</sheets>"#,
            r#"<calcPr fullCalcOnLoad="1"/>"#,
            r#"</workbook>"#,
        ),
        sheets
    )
}

const THEME_PART: &str = "xl/theme/theme1.xml";

fn workbook_rels_xml(sheet_count: usize, with_theme: bool) -> String {
    let mut rels = String::new();

    for i in 1..=sheet_count {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }

    let styles_id = sheet_count + 1;
    rels.push_str(&format!(
        r#"<Relationship Id="rId{styles_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));
    if with_theme {
        let theme_id = sheet_count + 2;
        rels.push_str(&format!(
            r#"<Relationship Id="rId{theme_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>"#
        ));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"{}"#,
            r#"</Relationships>"#,
        ),
        rels
    )
}

fn content_types_xml(sheet_count: usize, with_theme: bool) -> String {
    let mut overrides = String::new();

    if with_theme {
        overrides.push_str(&format!(
            r#"<Override PartName="/{THEME_PART}" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#
        ));
    }

    for i in 1..=sheet_count {
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            r#"{}"#,
            r#"</Types>"#,
        ),
        overrides
    )
}

/// A streaming xlsx writer. Sheet rows are spooled to temp files and the zip
/// package is only assembled by [`Workbook::finish`].
pub struct Workbook {
    output_path: PathBuf,
    sheets: HashMap<String, SheetWriter>,
    insertion_order: Vec<String>,
    style_reg: StyleRegistry,
    theme: Option<Arc<[u8]>>,
}

impl Workbook {
    pub(crate) fn new_with_builder(path: PathBuf, sheets: Vec<String>) -> Result<Self> {
        let mut wb = Self {
            output_path: path,
            sheets: HashMap::new(),
            insertion_order: Vec::new(),
            style_reg: StyleRegistry::new(),
            theme: None,
        };
        for name in sheets {
            wb.add_sheet(&name)?;
        }
        Ok(wb)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn get_sheet(&mut self, name: &str) -> Option<&mut SheetWriter> {
        self.sheets.get_mut(name)
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<&mut SheetWriter> {
        if self.sheets.contains_key(name) {
            return Err(SplitterError::AlreadyExists(format!(
                "Sheet '{name}' already exists"
            )));
        }
        let writer = SheetWriter::new(name)?;
        self.insertion_order.push(name.to_string());
        Ok(self.sheets.entry(name.to_string()).or_insert(writer))
    }

    /// Registers `style` in this workbook and returns the index cells should carry.
    pub fn register_style(&mut self, style: &Style) -> usize {
        self.style_reg.register(style)
    }

    /// Embeds a theme part, copied as-is, so theme colors and fonts resolve
    /// against it instead of the reader application's default theme.
    pub fn set_theme(&mut self, theme: Arc<[u8]>) {
        self.theme = Some(theme);
    }

    /// Assembles the package next to the output path and moves it into place
    /// once complete, so a failure never leaves a truncated workbook behind.
    pub fn finish(mut self) -> Result<()> {
        let dir = match self.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let staged = NamedTempFile::new_in(&dir).map_err(|source| SplitterError::Write {
            path: self.output_path.clone(),
            source,
        })?;

        let mut zip = ZipWriter::new(BufWriter::new(staged));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip_write_str(
            &mut zip,
            "[Content_Types].xml",
            &content_types_xml(self.insertion_order.len(), self.theme.is_some()),
            options,
        )?;
        zip_write_str(&mut zip, "_rels/.rels", RELS_DOT_RELS, options)?;
        zip_write_str(
            &mut zip,
            "xl/workbook.xml",
            &workbook_xml(&self.insertion_order),
            options,
        )?;
        zip_write_str(
            &mut zip,
            "xl/_rels/workbook.xml.rels",
            &workbook_rels_xml(self.insertion_order.len(), self.theme.is_some()),
            options,
        )?;

        let styles_xml = self.style_reg.to_xml();
        zip_write_str(&mut zip, "xl/styles.xml", &styles_xml, options)?;

        if let Some(theme) = &self.theme {
            zip.start_file(THEME_PART, options)?;
            zip.write_all(theme)?;
        }

        for (i, name) in self.insertion_order.iter().enumerate() {
            let sheet = self
                .sheets
                .get_mut(name)
                .ok_or_else(|| SplitterError::NotFound(format!("Sheet name : {name}!!")))?;
            let zip_path = format!("xl/worksheets/sheet{}.xml", i + 1);

            zip.start_file(zip_path, options)?;
            zip.write_all(sheet.head_xml().as_bytes())?;

            sheet.temp.flush()?;
            let temp_file = sheet.temp.get_mut();
            temp_file.seek(SeekFrom::Start(0))?;
            std::io::copy(temp_file, &mut zip)?;

            zip.write_all(sheet.tail_xml().as_bytes())?;
        }

        let mut out = zip.finish()?;
        out.flush()?;
        let staged = out.into_inner().map_err(|e| e.into_error())?;
        staged
            .persist(&self.output_path)
            .map_err(|e| SplitterError::Write {
                path: self.output_path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

pub(crate) fn make_cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letters(col), row)
}

pub(crate) fn col_to_letters(mut col: u32) -> String {
    let mut result = Vec::new();
    loop {
        result.push(char::from(b'A' + (col % 26) as u8));
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result.iter().rev().collect()
}

pub(crate) fn xml_escape(s: &str) -> String {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn write_cell<W: Write>(
    w: &mut W,
    cell_ref: &str,
    value: &CellValue,
    style_idx: usize,
) -> Result<()> {
    let s = match style_idx {
        0 => String::new(),
        n => format!(" s=\"{n}\""),
    };

    match value {
        CellValue::Blank => {
            write!(w, "<c r=\"{cell_ref}\"{s}/>")?;
        }
        CellValue::Number(n) | CellValue::Date(n) => {
            write!(w, "<c r=\"{cell_ref}\"{s}><v>{n}</v></c>")?;
        }
        CellValue::Text(text) => {
            let escaped = xml_escape(text);
            let space = if text.trim() != text {
                " xml:space=\"preserve\""
            } else {
                ""
            };
            write!(
                w,
                "<c r=\"{cell_ref}\"{s} t=\"inlineStr\"><is><t{space}>{escaped}</t></is></c>"
            )?;
        }
        CellValue::Bool(b) => {
            let val = if *b { 1 } else { 0 };
            write!(w, "<c r=\"{cell_ref}\"{s} t=\"b\"><v>{val}</v></c>")?;
        }
        CellValue::Formula(f) => {
            let escaped = xml_escape(f);
            write!(w, "<c r=\"{cell_ref}\"{s}><f>{escaped}</f><v/></c>")?;
        }
    }
    Ok(())
}

pub(crate) fn zip_write_str<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &str,
    content: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(path, options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}
