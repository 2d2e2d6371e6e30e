//! Pull-based xlsx reading: package layout, shared strings, styles and rows
//! of a single worksheet.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::SplitterError;
use crate::workbook::sheet::Column;
use crate::workbook::style::Style;
use crate::Result;

mod formula;
pub mod rows;
pub mod styles;

pub use rows::RowIter;

/// First bytes of an OLE2 compound file. Password-protected xlsx files are
/// wrapped in one instead of being a plain zip.
const OLE2_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Upper bound on the buffer reserved up front for a package part.
const MAX_PREALLOC: usize = 1 << 20;

#[inline]
pub(crate) fn attr_val(attr: &quick_xml::events::attributes::Attribute) -> String {
    let raw = std::str::from_utf8(attr.value.as_ref()).unwrap_or("");
    quick_xml::escape::unescape(raw)
        .unwrap_or_default()
        .into_owned()
}

#[inline]
pub(crate) fn text_val(e: &quick_xml::events::BytesText) -> String {
    let raw = std::str::from_utf8(e.as_ref()).unwrap_or("");
    quick_xml::escape::unescape(raw)
        .unwrap_or_default()
        .into_owned()
}

pub struct XlsxReader {
    path: PathBuf,
    sheet_paths: HashMap<String, String>,
    sheet_order: Vec<String>,
    shared_strings: Arc<Vec<String>>,
    styles: Arc<Vec<Style>>,
    theme: Option<Arc<[u8]>>,
}

impl XlsxReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut archive = open_archive(path)?;

        let (sheet_order, rid_to_name) = parse_workbook(&mut archive)?;
        let WorkbookRels {
            sheets: rid_to_path,
            theme: theme_path,
        } = parse_workbook_rels(&mut archive)?;

        let sheet_paths: HashMap<String, String> = rid_to_name
            .into_iter()
            .filter_map(|(rid, name)| rid_to_path.get(&rid).map(|p| (name, p.clone())))
            .collect();

        let shared_strings = Arc::new(parse_shared_strings(&mut archive)?);
        let styles = Arc::new(match slurp_optional(&mut archive, "xl/styles.xml")? {
            Some(bytes) => styles::parse_styles(&bytes)?,
            None => Vec::new(),
        });
        let theme = match theme_path {
            Some(theme_path) => slurp_optional(&mut archive, &theme_path)?.map(Arc::from),
            None => None,
        };

        Ok(XlsxReader {
            path: path.to_path_buf(),
            sheet_paths,
            sheet_order,
            shared_strings,
            styles,
            theme,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_order
    }

    /// Resolved `cellXfs` table; a cell's `style` indexes into it.
    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    /// Raw bytes of the workbook's theme part, if it has one.
    pub fn theme(&self) -> Option<Arc<[u8]>> {
        self.theme.clone()
    }

    pub fn first_sheet(&self) -> Result<SheetStream> {
        let name = self
            .sheet_order
            .first()
            .ok_or_else(|| SplitterError::InvalidFormat("workbook has no sheets".into()))?
            .clone();
        self.sheet(&name)
    }

    /// Decompresses the named worksheet. The archive is reopened so the reader
    /// holds no file handle between calls.
    pub fn sheet(&self, sheet_name: &str) -> Result<SheetStream> {
        let zip_path = self
            .sheet_paths
            .get(sheet_name)
            .ok_or_else(|| SplitterError::NotFound(format!("sheet '{sheet_name}'")))?;

        let mut archive = open_archive(&self.path)?;
        let xml = slurp_entry(&mut archive, zip_path)?.into_boxed_slice();

        let date_styles = self
            .styles
            .iter()
            .map(|s| s.number_format.is_date())
            .collect::<Vec<_>>();

        Ok(SheetStream {
            name: sheet_name.to_string(),
            xml,
            shared_strings: Arc::clone(&self.shared_strings),
            date_styles: Arc::from(date_styles),
        })
    }
}

/// The raw XML of one worksheet, ready to be scanned.
pub struct SheetStream {
    name: String,
    xml: Box<[u8]>,
    shared_strings: Arc<Vec<String>>,
    date_styles: Arc<[bool]>,
}

impl SheetStream {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column width definitions declared before `<sheetData>`.
    pub fn columns(&self) -> Result<Vec<Column>> {
        let mut xml = XmlReader::from_reader(&self.xml[..]);
        xml.config_mut().trim_text(true);

        let mut columns = Vec::new();
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e) => match e.local_name().as_ref() {
                    b"col" => {
                        let mut col = Column {
                            min: 0,
                            max: 0,
                            width: None,
                            hidden: false,
                        };
                        let mut custom = false;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"min" => col.min = attr_val(&attr).parse().unwrap_or(0),
                                b"max" => col.max = attr_val(&attr).parse().unwrap_or(0),
                                b"width" => col.width = attr_val(&attr).parse().ok(),
                                b"customWidth" => custom = is_true(&attr_val(&attr)),
                                b"hidden" => col.hidden = is_true(&attr_val(&attr)),
                                _ => {}
                            }
                        }
                        if (custom || col.hidden) && col.min > 0 && col.max >= col.min {
                            columns.push(col);
                        }
                    }
                    b"sheetData" => break,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(columns)
    }

    /// Number of physical `<row>` elements, whether or not they hold cells.
    pub fn row_count(&self) -> Result<usize> {
        let mut xml = XmlReader::from_reader(&self.xml[..]);
        xml.config_mut().trim_text(true);

        let mut count = 0;
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                    count += 1;
                }
                Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => break,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(count)
    }

    pub fn rows(&self) -> RowIter<'_> {
        RowIter::new(
            &self.xml[..],
            Arc::clone(&self.shared_strings),
            Arc::clone(&self.date_styles),
        )
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let open_err = |source: std::io::Error| SplitterError::Open {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(open_err)?;

    let mut magic = Vec::with_capacity(OLE2_SIGNATURE.len());
    (&mut file)
        .take(OLE2_SIGNATURE.len() as u64)
        .read_to_end(&mut magic)
        .map_err(open_err)?;
    if magic == OLE2_SIGNATURE {
        return Err(SplitterError::Encrypted(path.to_path_buf()));
    }
    file.seek(SeekFrom::Start(0)).map_err(open_err)?;

    ZipArchive::new(file).map_err(|e| match e {
        ZipError::Io(source) if source.kind() != std::io::ErrorKind::UnexpectedEof => {
            open_err(source)
        }
        other => SplitterError::InvalidFormat(format!("{}: {other}", path.display())),
    })
}

pub(crate) fn is_true(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

fn parse_workbook<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<(Vec<String>, HashMap<String, String>)> {
    let bytes = slurp_entry(archive, "xl/workbook.xml")?;
    let mut xml = XmlReader::from_reader(bytes.as_slice());
    xml.config_mut().trim_text(true);

    let mut order = Vec::new();
    let mut rid_map = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                let (mut name, mut rid) = (String::new(), String::new());
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr_val(&attr),
                        b"r:id" | b"id" => rid = attr_val(&attr),
                        _ => {}
                    }
                }
                if !name.is_empty() && !rid.is_empty() {
                    order.push(name.clone());
                    rid_map.insert(rid, name);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok((order, rid_map))
}

struct WorkbookRels {
    sheets: HashMap<String, String>,
    theme: Option<String>,
}

fn parse_workbook_rels<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<WorkbookRels> {
    let bytes = slurp_entry(archive, "xl/_rels/workbook.xml.rels")?;
    let mut xml = XmlReader::from_reader(bytes.as_slice());
    xml.config_mut().trim_text(true);

    let mut rels = WorkbookRels {
        sheets: HashMap::new(),
        theme: None,
    };
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let (mut id, mut target, mut kind) = (String::new(), String::new(), String::new());
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr_val(&attr),
                        b"Target" => target = attr_val(&attr),
                        b"Type" => kind = attr_val(&attr),
                        _ => {}
                    }
                }
                if kind.ends_with("/worksheet") && !id.is_empty() {
                    rels.sheets.insert(id, normalize_path(&target));
                } else if kind.ends_with("/theme") && rels.theme.is_none() {
                    rels.theme = Some(normalize_path(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

fn parse_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let Some(bytes) = slurp_optional(archive, "xl/sharedStrings.xml")? else {
        return Ok(Vec::new());
    };
    let mut xml = XmlReader::from_reader(bytes.as_slice());
    xml.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    let mut in_phonetic = false;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Text(ref e) if in_t => current.push_str(&text_val(e)),
            Event::CData(ref e) if in_t => current.push_str(&String::from_utf8_lossy(e)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn slurp_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    slurp_optional(archive, path)?
        .ok_or_else(|| SplitterError::InvalidFormat(format!("missing part '{path}'")))
}

fn slurp_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(path) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    // The declared size is only a hint; a corrupt header may claim gigabytes.
    let hint = usize::try_from(entry.size()).unwrap_or(usize::MAX);
    let mut buf = Vec::with_capacity(hint.min(MAX_PREALLOC));
    std::io::copy(&mut entry, &mut buf)?;
    Ok(Some(buf))
}

fn normalize_path(target: &str) -> String {
    let t = target.trim_start_matches('/');
    if t.starts_with("xl/") {
        t.to_string()
    } else {
        format!("xl/{t}")
    }
}

/// Last column of a sheet, XFD.
const MAX_COL_INDEX: u32 = 16_383;

/// Column index of a reference such as "AB12", 0-based. `None` for anything
/// that is not a column on the sheet grid.
pub(crate) fn col_ref_to_index(cell_ref: &str) -> Option<u32> {
    let letters = cell_ref.trim_end_matches(|c: char| c.is_ascii_digit());
    if letters.is_empty() || letters.len() > 3 || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let col = letters
        .bytes()
        .try_fold(0u32, |acc, b| acc.checked_mul(26)?.checked_add(u32::from(b - b'A') + 1))?
        - 1;
    (col <= MAX_COL_INDEX).then_some(col)
}
