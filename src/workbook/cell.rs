/// Value held by a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Every number is an f64 in xlsx.
    Number(f64),
    /// Written as an inline string so rows can be streamed without a sharedStrings part.
    Text(String),
    Bool(bool),
    /// Excel serial date. Stored like a number, recognised by its date number format.
    Date(f64),
    /// Formula text without the leading `=`, e.g. "SUM(A1:A10)".
    Formula(String),
    Blank,
}

impl CellValue {
    pub fn num(v: f64) -> Self {
        CellValue::Number(v)
    }
    pub fn text(v: impl Into<String>) -> Self {
        CellValue::Text(v.into())
    }
    pub fn bool(v: bool) -> Self {
        CellValue::Bool(v)
    }
    pub fn date(serial: f64) -> Self {
        CellValue::Date(serial)
    }
    pub fn formula(v: impl Into<String>) -> Self {
        CellValue::Formula(v.into())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

/// A cell placed at a 0-based column. `style` is an index into `cellXfs`,
/// 0 being the default style.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub col: u32,
    pub value: CellValue,
    pub style: usize,
}

impl Cell {
    pub fn new(col: u32, value: CellValue) -> Self {
        Cell {
            col,
            value,
            style: 0,
        }
    }

    pub fn with_style(mut self, style: usize) -> Self {
        self.style = style;
        self
    }
}

/// A physical row of a sheet. `index` is 0-based in the sheet it was read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub index: u32,
    pub height: Option<f64>,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(index: u32) -> Self {
        Row {
            index,
            ..Default::default()
        }
    }

    /// Builds a row from consecutive values starting at column A.
    pub fn from_values(index: u32, values: impl IntoIterator<Item = CellValue>) -> Self {
        let cells = values
            .into_iter()
            .enumerate()
            .map(|(col, value)| Cell::new(col as u32, value))
            .collect();
        Row {
            index,
            height: None,
            cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
