//! Row-capped splitting of the first sheet of a workbook.
//!
//! The first chunk takes the first `max_rows` rows of the source. Every
//! following chunk starts with a copy of the source's first row and holds up
//! to `max_rows - 1` further rows, so no output file exceeds `max_rows` rows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::error::SplitterError;
use crate::reader::XlsxReader;
use crate::workbook::Workbook;
use crate::workbook::builder::WorkbookBuilder;
use crate::workbook::cell::{Cell, Row};
use crate::workbook::sheet::Column;
use crate::workbook::style::Style;

pub const DEFAULT_MAX_ROWS: usize = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    /// Upper bound on rows per output file, repeated header included.
    pub max_rows: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl SplitConfig {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// A chunk that repeats the header needs room for at least one data row.
    pub fn validate(&self) -> Result<()> {
        if self.max_rows < 2 {
            return Err(SplitterError::InvalidBatchSize(self.max_rows));
        }
        Ok(())
    }
}

/// One written output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub path: PathBuf,
    /// Rows in the file, repeated header included.
    pub rows: usize,
    /// Rows taken from the source, i.e. `rows` minus a repeated header.
    pub source_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub source_rows: usize,
    pub files: Vec<ChunkInfo>,
}

impl SplitReport {
    pub fn is_split(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Splits one source workbook. Output files land next to the source as
/// `<stem>_<n>.xlsx`, `n` counting from 1.
pub struct Splitter {
    source: PathBuf,
    config: SplitConfig,
}

impl Splitter {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self::with_config(source, SplitConfig::default())
    }

    pub fn with_config(source: impl Into<PathBuf>, config: SplitConfig) -> Self {
        Self {
            source: source.into(),
            config,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn output_path(&self, index: usize) -> PathBuf {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.source.with_file_name(format!("{stem}_{index}.xlsx"))
    }

    pub fn split(&self) -> Result<SplitReport> {
        self.config.validate()?;
        let max_rows = self.config.max_rows;

        let reader = XlsxReader::open(&self.source)?;
        let sheet = reader.first_sheet()?;
        let source_rows = sheet.row_count()?;

        let mut report = SplitReport {
            source_rows,
            files: Vec::new(),
        };

        if source_rows < max_rows {
            info!(
                file = %self.source.display(),
                rows = source_rows,
                max_rows,
                "no split needed"
            );
            return Ok(report);
        }

        let columns = sheet.columns()?;
        let styles = reader.styles();
        let theme = reader.theme();

        let mut header: Option<Row> = None;
        let mut chunk: Option<Chunk> = None;

        for row in sheet.rows() {
            let row = row?;

            if let Some(full) = chunk.take_if(|c| c.rows >= max_rows) {
                report.files.push(full.finish()?);
            }

            if chunk.is_none() {
                let path = self.output_path(report.files.len() + 1);
                debug!(path = %path.display(), "starting chunk");
                let mut fresh = Chunk::create(path, sheet.name(), &columns, theme.clone())?;
                if let Some(header) = &header {
                    fresh.write(header, styles)?;
                    fresh.repeated_header = true;
                }
                chunk = Some(fresh);
            }

            if let Some(current) = chunk.as_mut() {
                current.write(&row, styles)?;
            }

            if header.is_none() {
                header = Some(row);
            }
        }

        if let Some(last) = chunk {
            if last.rows > 0 {
                report.files.push(last.finish()?);
            }
        }

        info!(
            file = %self.source.display(),
            rows = source_rows,
            files = report.files.len(),
            "split complete"
        );
        Ok(report)
    }
}

/// An output workbook being filled.
struct Chunk {
    workbook: Workbook,
    sheet_name: String,
    /// Source `cellXfs` index to the index registered in `workbook`.
    style_map: HashMap<usize, usize>,
    rows: usize,
    repeated_header: bool,
}

impl Chunk {
    fn create(
        path: PathBuf,
        sheet_name: &str,
        columns: &[Column],
        theme: Option<Arc<[u8]>>,
    ) -> Result<Self> {
        let mut workbook = WorkbookBuilder::new(path).set_sheets([sheet_name]).build()?;
        if let Some(theme) = theme {
            workbook.set_theme(theme);
        }
        if let Some(sheet) = workbook.get_sheet(sheet_name) {
            sheet.set_columns(columns.to_vec());
        }
        Ok(Chunk {
            workbook,
            sheet_name: sheet_name.to_string(),
            style_map: HashMap::new(),
            rows: 0,
            repeated_header: false,
        })
    }

    fn write(&mut self, row: &Row, styles: &[Style]) -> Result<()> {
        let cells = row
            .cells
            .iter()
            .map(|cell| Cell {
                col: cell.col,
                value: cell.value.clone(),
                style: self.output_style(cell.style, styles),
            })
            .collect();
        let copy = Row {
            index: row.index,
            height: row.height,
            cells,
        };

        let sheet = self
            .workbook
            .get_sheet(&self.sheet_name)
            .ok_or_else(|| SplitterError::NotFound(format!("sheet '{}'", self.sheet_name)))?;
        sheet.write_row(&copy)?;
        self.rows += 1;
        Ok(())
    }

    fn output_style(&mut self, source_idx: usize, styles: &[Style]) -> usize {
        if let Some(&idx) = self.style_map.get(&source_idx) {
            return idx;
        }
        let style = styles.get(source_idx).cloned().unwrap_or_default();
        let idx = self.workbook.register_style(&style);
        self.style_map.insert(source_idx, idx);
        idx
    }

    fn finish(self) -> Result<ChunkInfo> {
        let path = self.workbook.output_path().to_path_buf();
        info!(path = %path.display(), rows = self.rows, "writing chunk");
        self.workbook.finish()?;
        Ok(ChunkInfo {
            path,
            rows: self.rows,
            source_rows: self.rows - usize::from(self.repeated_header),
        })
    }
}
