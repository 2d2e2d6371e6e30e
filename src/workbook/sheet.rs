use std::io::{BufWriter, Write};

use tempfile::NamedTempFile;

use crate::{
    Result,
    workbook::{
        cell::{Cell, CellValue, Row},
        make_cell_ref, write_cell,
    },
};

/// Width definition for a run of columns, `min..=max` being 1-based as in `<col>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub min: u32,
    pub max: u32,
    pub width: Option<f64>,
    pub hidden: bool,
}

impl Column {
    fn to_xml(&self) -> String {
        let mut xml = format!("<col min=\"{}\" max=\"{}\"", self.min, self.max);
        if let Some(w) = self.width {
            xml.push_str(&format!(" width=\"{w}\" customWidth=\"1\""));
        }
        if self.hidden {
            xml.push_str(" hidden=\"1\"");
        }
        xml.push_str("/>");
        xml
    }
}

/// Streams `<row>` elements of one worksheet into a temp file.
pub struct SheetWriter {
    name: String,
    pub(crate) temp: BufWriter<NamedTempFile>,
    columns: Vec<Column>,
    current_row: u32,
}

impl SheetWriter {
    pub(crate) fn new(name: &str) -> Result<Self> {
        let temp_file = NamedTempFile::new()?;

        Ok(SheetWriter {
            name: name.to_string(),
            temp: BufWriter::new(temp_file),
            columns: Vec::new(),
            current_row: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows written so far, empty rows included.
    pub fn rows_written(&self) -> u32 {
        self.current_row
    }

    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    /// Writes `row` as the next row of the sheet. The source row index is
    /// ignored; cells keep their column.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.current_row += 1;
        let r = self.current_row;

        let ht = row
            .height
            .map(|h| format!(" ht=\"{h}\" customHeight=\"1\""))
            .unwrap_or_default();

        if row.cells.is_empty() {
            if !ht.is_empty() {
                writeln!(self.temp, "<row r=\"{r}\"{ht}/>")?;
            }
            return Ok(());
        }

        write!(self.temp, "<row r=\"{r}\"{ht}>")?;
        for cell in &row.cells {
            let cell_ref = make_cell_ref(r, cell.col); // e.g "A1", "B2"
            write_cell(&mut self.temp, &cell_ref, &cell.value, cell.style)?;
        }
        writeln!(self.temp, "</row>")?;

        Ok(())
    }

    /// Writes consecutive values from column A, all with style `style`.
    pub fn write_values(&mut self, values: &[CellValue], style: usize) -> Result<()> {
        let row = Row {
            index: self.current_row,
            height: None,
            cells: values
                .iter()
                .enumerate()
                .map(|(col, v)| Cell::new(col as u32, v.clone()).with_style(style))
                .collect(),
        };
        self.write_row(&row)
    }

    pub(crate) fn head_xml(&self) -> String {
        let mut xml = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#,
            r#"<sheetFormatPr defaultRowHeight="15"/>"#,
        ));
        if !self.columns.is_empty() {
            xml.push_str("<cols>");
            for col in &self.columns {
                xml.push_str(&col.to_xml());
            }
            xml.push_str("</cols>");
        }
        xml.push_str("<sheetData>\n");
        xml
    }

    pub(crate) fn tail_xml(&self) -> &'static str {
        concat!(
            "</sheetData>",
            r#"<pageMargins left="0.75" right="0.75" top="1" bottom="1" header="0.5" footer="0.5"/>"#,
            "</worksheet>"
        )
    }
}
