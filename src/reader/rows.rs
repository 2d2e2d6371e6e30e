use std::collections::HashMap;
use std::sync::Arc;

use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::Result;
use crate::reader::formula::shift_formula;
use crate::reader::{attr_val, col_ref_to_index, is_true, text_val};
use crate::workbook::cell::{Cell, CellValue, Row};

/// Iterates the `<row>` elements of a worksheet in document order.
pub struct RowIter<'a> {
    xml: XmlReader<&'a [u8]>,
    shared_strings: Arc<Vec<String>>,
    date_styles: Arc<[bool]>,
    state: ParseState,
    buf: Vec<u8>,
    done: bool,
}

struct ParseState {
    row: Row,
    next_row: u32,
    next_col: u32,
    cell_ref: String,
    col: u32,
    style: usize,
    cell_type: CellType,
    in_v: bool,
    in_t: bool,
    in_f: bool,
    in_phonetic: bool,
    value_buf: String,
    formula_buf: String,
    has_formula: bool,
    shared_index: Option<u32>,
    /// Master formula of each shared group by `si`, with its anchor cell.
    shared_formulas: HashMap<u32, SharedFormula>,
}

struct SharedFormula {
    text: String,
    row: u32,
    col: u32,
}

#[derive(Clone, Copy, Debug)]
enum CellType {
    Number,
    SharedStr,
    Inline,
    Bool,
    Str,
    Error,
    IsoDate,
}

impl ParseState {
    fn new() -> Self {
        ParseState {
            row: Row::default(),
            next_row: 0,
            next_col: 0,
            cell_ref: String::new(),
            col: 0,
            style: 0,
            cell_type: CellType::Number,
            in_v: false,
            in_t: false,
            in_f: false,
            in_phonetic: false,
            value_buf: String::new(),
            formula_buf: String::new(),
            has_formula: false,
            shared_index: None,
            shared_formulas: HashMap::new(),
        }
    }

    fn start_row(&mut self, e: &BytesStart) {
        let mut index = self.next_row;
        let mut height = None;
        let mut custom_height = false;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"r" => {
                    if let Ok(r) = attr_val(&attr).parse::<u32>() {
                        index = r.saturating_sub(1);
                    }
                }
                b"ht" => height = attr_val(&attr).parse::<f64>().ok(),
                b"customHeight" => custom_height = is_true(&attr_val(&attr)),
                _ => {}
            }
        }
        self.row = Row {
            index,
            height: height.filter(|_| custom_height),
            cells: Vec::new(),
        };
        self.next_row = index + 1;
        self.next_col = 0;
    }

    fn start_cell(&mut self, e: &BytesStart) {
        self.cell_ref.clear();
        self.col = self.next_col;
        self.style = 0;
        self.cell_type = CellType::Number;

        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"r" => {
                    self.cell_ref = attr_val(&attr);
                    if let Some(col) = col_ref_to_index(&self.cell_ref) {
                        self.col = col;
                    }
                }
                b"s" => self.style = attr_val(&attr).parse().unwrap_or(0),
                b"t" => {
                    self.cell_type = match attr_val(&attr).as_str() {
                        "s" => CellType::SharedStr,
                        "inlineStr" => CellType::Inline,
                        "b" => CellType::Bool,
                        "str" => CellType::Str,
                        "e" => CellType::Error,
                        "d" => CellType::IsoDate,
                        _ => CellType::Number,
                    }
                }
                _ => {}
            }
        }

        self.value_buf.clear();
        self.formula_buf.clear();
        self.has_formula = false;
        self.shared_index = None;
        self.in_v = false;
        self.in_t = false;
        self.in_f = false;
        self.in_phonetic = false;
    }

    fn start_formula(&mut self, e: &BytesStart, has_text: bool) {
        self.in_f = has_text;
        self.has_formula = true;

        let mut shared = false;
        let mut index = None;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"t" => shared = attr_val(&attr) == "shared",
                b"si" => index = attr_val(&attr).parse::<u32>().ok(),
                _ => {}
            }
        }
        self.shared_index = index.filter(|_| shared);
    }

    /// A textless member of a shared group gets the master's formula moved
    /// by its offset from the master's cell.
    fn shared_formula(&self) -> Option<String> {
        let master = self.shared_formulas.get(&self.shared_index?)?;
        Some(shift_formula(
            &master.text,
            i64::from(self.row.index) - i64::from(master.row),
            i64::from(self.col) - i64::from(master.col),
        ))
    }

    /// Turns the parsed `<c>` into a typed cell. Cells of a type that cannot
    /// be copied are logged and come back blank so their style survives.
    fn finish_cell(&mut self, shared_strings: &[String], date_styles: &[bool]) {
        let value = if self.has_formula && !self.formula_buf.is_empty() {
            let text = std::mem::take(&mut self.formula_buf);
            if let Some(si) = self.shared_index {
                self.shared_formulas.insert(
                    si,
                    SharedFormula {
                        text: text.clone(),
                        row: self.row.index,
                        col: self.col,
                    },
                );
            }
            CellValue::Formula(text)
        } else if let Some(text) = self.shared_formula() {
            CellValue::Formula(text)
        } else {
            if let Some(si) = self.shared_index {
                warn!(cell = %self.cell_ref, si, "shared formula has no master, cached value copied");
            }
            let raw = std::mem::take(&mut self.value_buf);
            match self.cell_type {
                CellType::SharedStr => match raw
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| shared_strings.get(idx))
                {
                    Some(s) => CellValue::Text(s.clone()),
                    None => {
                        warn!(cell = %self.cell_ref, index = %raw.trim(), "shared string out of range, cell left empty");
                        CellValue::Blank
                    }
                },
                CellType::Inline | CellType::Str => CellValue::Text(raw),
                CellType::Bool => CellValue::Bool(is_true(raw.trim())),
                CellType::Number if raw.trim().is_empty() => CellValue::Blank,
                CellType::Number => match raw.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => {
                        if date_styles.get(self.style).copied().unwrap_or(false) {
                            CellValue::Date(n)
                        } else {
                            CellValue::Number(n)
                        }
                    }
                    _ => {
                        warn!(cell = %self.cell_ref, value = %raw, "unparseable number, cell left empty");
                        CellValue::Blank
                    }
                },
                CellType::Error | CellType::IsoDate => {
                    warn!(cell = %self.cell_ref, kind = ?self.cell_type, value = %raw, "could not determine cell type, cell left empty");
                    CellValue::Blank
                }
            }
        };

        self.row.cells.push(Cell {
            col: self.col,
            value,
            style: self.style,
        });
        self.next_col = self.col + 1;
    }
}

impl<'a> RowIter<'a> {
    pub(crate) fn new(
        xml: &'a [u8],
        shared_strings: Arc<Vec<String>>,
        date_styles: Arc<[bool]>,
    ) -> Self {
        let mut xml = XmlReader::from_reader(xml);
        xml.config_mut().trim_text(false);
        RowIter {
            xml,
            shared_strings,
            date_styles,
            state: ParseState::new(),
            buf: Vec::with_capacity(256),
            done: false,
        }
    }
}

impl Iterator for RowIter<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();

            let event = match self.xml.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            match event {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"row" => self.state.start_row(e),
                    b"c" => self.state.start_cell(e),
                    b"v" => self.state.in_v = true,
                    b"t" => self.state.in_t = !self.state.in_phonetic,
                    b"rPh" => self.state.in_phonetic = true,
                    b"f" => self.state.start_formula(e, true),
                    _ => {}
                },

                Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"row" => {
                        self.state.start_row(e);
                        return Some(Ok(std::mem::take(&mut self.state.row)));
                    }
                    b"c" => {
                        self.state.start_cell(e);
                        self.state.finish_cell(&self.shared_strings, &self.date_styles);
                    }
                    b"f" => self.state.start_formula(e, false),
                    _ => {}
                },

                Event::Text(ref e) => {
                    let st = &mut self.state;
                    if st.in_f {
                        st.formula_buf.push_str(&text_val(e));
                    } else if st.in_v || st.in_t {
                        st.value_buf.push_str(&text_val(e));
                    }
                }

                Event::CData(ref e) => {
                    let st = &mut self.state;
                    if st.in_f {
                        st.formula_buf.push_str(&String::from_utf8_lossy(e));
                    } else if st.in_v || st.in_t {
                        st.value_buf.push_str(&String::from_utf8_lossy(e));
                    }
                }

                Event::End(ref e) => match e.local_name().as_ref() {
                    b"v" => self.state.in_v = false,
                    b"t" => self.state.in_t = false,
                    b"f" => self.state.in_f = false,
                    b"rPh" => self.state.in_phonetic = false,
                    b"c" => {
                        self.state
                            .finish_cell(&self.shared_strings, &self.date_styles)
                    }
                    b"row" => return Some(Ok(std::mem::take(&mut self.state.row))),
                    b"sheetData" => {
                        self.done = true;
                        return None;
                    }
                    _ => {}
                },

                Event::Eof => {
                    self.done = true;
                    return None;
                }

                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(sheet: &str, shared: &[&str], date_styles: &[bool]) -> Vec<Row> {
        let shared = Arc::new(shared.iter().map(|s| s.to_string()).collect());
        RowIter::new(sheet.as_bytes(), shared, Arc::from(date_styles))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn values(row: &Row) -> Vec<CellValue> {
        row.cells.iter().map(|c| c.value.clone()).collect()
    }

    #[test]
    fn typed_cells() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1" t="inlineStr"><is><t xml:space="preserve"> a &amp; b</t></is></c><c r="C1" t="b"><v>1</v></c></row>
<row r="2"><c r="A2"><v>3.25</v></c><c r="B2" s="1"><v>45321</v></c><c r="C2"><f>A2*2</f><v>6.5</v></c><c r="D2" t="str"><f>"x"&amp;"y"</f><v>xy</v></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &["zero", "one"], &[false, true]);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            values(&rows[0]),
            vec![
                CellValue::text("one"),
                CellValue::text(" a & b"),
                CellValue::bool(true)
            ]
        );
        assert_eq!(
            values(&rows[1]),
            vec![
                CellValue::num(3.25),
                CellValue::date(45321.0),
                CellValue::formula("A2*2"),
                CellValue::formula("\"x\"&\"y\""),
            ]
        );
        assert_eq!(rows[1].cells[1].style, 1);
    }

    #[test]
    fn sparse_rows_keep_positions() {
        let xml = r#"<worksheet><sheetData>
<row r="1" ht="24" customHeight="1"><c r="C1"><v>1</v></c><c r="F1" s="2"/></row>
<row r="4"/>
<row r="5" ht="15"><c><v>2</v></c><c><v>3</v></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &[], &[]);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[0].height, Some(24.0));
        assert_eq!(rows[0].cells.iter().map(|c| c.col).collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(rows[0].cells[1].value, CellValue::Blank);
        assert_eq!(rows[0].cells[1].style, 2);

        assert_eq!(rows[1].index, 3);
        assert!(rows[1].is_empty());

        assert_eq!(rows[2].index, 4);
        assert_eq!(rows[2].height, None);
        assert_eq!(rows[2].cells.iter().map(|c| c.col).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn unsupported_types_become_blank() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="e" s="3"><v>#DIV/0!</v></c><c r="B1" t="d"><v>2024-01-31T00:00:00</v></c><c r="C1" t="s"><v>9</v></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &[], &[]);
        assert_eq!(values(&rows[0]), vec![CellValue::Blank; 3]);
        assert_eq!(rows[0].cells[0].style, 3);
    }

    #[test]
    fn shared_formula_members_get_their_own_formula() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1"><f t="shared" ref="A1:B3" si="0">B1+$C$1</f><v>2</v></c><c r="B1"><f t="shared" si="0"/><v>4</v></c></row>
<row r="2"><c r="A2"><f t="shared" si="0"/><v>3</v></c></row>
<row r="3"><c r="A3"><f t="shared" si="0"/></c><c r="B3"><f t="shared" si="0"></f></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &[], &[]);
        assert_eq!(
            values(&rows[0]),
            vec![CellValue::formula("B1+$C$1"), CellValue::formula("C1+$C$1")]
        );
        assert_eq!(values(&rows[1]), vec![CellValue::formula("B2+$C$1")]);
        assert_eq!(
            values(&rows[2]),
            vec![CellValue::formula("B3+$C$1"), CellValue::formula("C3+$C$1")]
        );
    }

    #[test]
    fn shared_member_without_master_keeps_cached_value() {
        let xml = r#"<worksheet><sheetData>
<row r="2"><c r="A2"><f t="shared" si="7"/><v>3</v></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &[], &[]);
        assert_eq!(values(&rows[0]), vec![CellValue::num(3.0)]);
    }

    #[test]
    fn oversized_column_reference_falls_back_to_position() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="B1"><v>1</v></c><c r="ZZZZZZZZ1"><v>2</v></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &[], &[]);
        assert_eq!(rows[0].cells.iter().map(|c| c.col).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(values(&rows[0]), vec![CellValue::num(1.0), CellValue::num(2.0)]);
    }

    #[test]
    fn phonetic_runs_are_skipped() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><r><t>東</t></r><r><t>京</t></r><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></is></c></row>
</sheetData></worksheet>"#;
        let rows = rows(xml, &[], &[]);
        assert_eq!(values(&rows[0]), vec![CellValue::text("東京")]);
    }
}
