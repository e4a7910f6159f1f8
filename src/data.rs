use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

/// A single spreadsheet cell as delivered by ingestion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Infer a typed cell from untyped text (CSV input).
    /// Blank text is empty, finite numbers become numeric cells, everything else stays text.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Rectangular block of cells treated as one; content lives in the top-left (anchor) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl MergeRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        // Normalize so start is always the top-left corner
        Self {
            start: CellRef::new(start.row.min(end.row), start.col.min(end.col)),
            end: CellRef::new(start.row.max(end.row), start.col.max(end.col)),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        self.start.row == row && self.start.col == col
    }

    pub fn row_span(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    pub fn col_span(&self) -> usize {
        self.end.col - self.start.col + 1
    }
}

/// Raw worksheet as produced by the ingestion layer: a cell range plus merges and sizing.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    pub name: String,
    pub cells: Vec<Vec<CellValue>>,
    pub merges: Vec<MergeRange>,
    /// Row heights in pixels, keyed by row index
    pub row_heights: BTreeMap<usize, f64>,
    /// Column widths in pixels, keyed by column index
    pub col_widths: BTreeMap<usize, f64>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl SheetGrid {
    pub fn new(name: impl Into<String>, cells: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            cells,
            ..Default::default()
        }
    }

    pub fn with_merges(mut self, merges: Vec<MergeRange>) -> Self {
        self.merges = merges;
        self
    }

    /// Number of rows in the used range
    pub fn height(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns in the used range (widest row)
    pub fn width(&self) -> usize {
        self.cells.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Overwrite a cell, growing the range if needed
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Read a headerless CSV stream; every record becomes one grid row.
    pub fn from_csv_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut cells = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
            cells.push(record.iter().map(CellValue::from_text).collect());
        }

        if cells.is_empty() {
            return Err(anyhow!("CSV input contains no rows"));
        }

        Ok(Self::new(name, cells))
    }

    /// Create a grid from a JSON array of arrays.
    /// Values keep their JSON type: numbers are numeric cells, strings stay text.
    pub fn from_json(name: &str, value: &Value) -> Result<Self> {
        let array = value.as_array().ok_or_else(||
            anyhow!("Input grid must be a JSON array of rows")
        )?;

        if array.is_empty() {
            return Err(anyhow!("Input grid is empty"));
        }

        let mut cells = Vec::with_capacity(array.len());
        for (r, row) in array.iter().enumerate() {
            let row = row.as_array().ok_or_else(||
                anyhow!("Row {} must be an array of cells", r + 1)
            )?;

            let mut out = Vec::with_capacity(row.len());
            for (c, item) in row.iter().enumerate() {
                let cell = match item {
                    Value::Null => CellValue::Empty,
                    Value::Bool(b) => CellValue::Bool(*b),
                    Value::Number(n) => CellValue::Number(n.as_f64().ok_or_else(||
                        anyhow!("Cell ({}, {}) is not representable as f64", r, c)
                    )?),
                    Value::String(s) if s.is_empty() => CellValue::Empty,
                    Value::String(s) => CellValue::Text(s.clone()),
                    _ => return Err(anyhow!("Unsupported value type at cell ({}, {})", r, c)),
                };
                out.push(cell);
            }
            cells.push(out);
        }

        Ok(Self::new(name, cells))
    }
}

/// One data record: column name -> cell value. Absent keys are empty cells.
pub type RowData = BTreeMap<String, CellValue>;

/// Columns sharing the same last header level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGroup {
    pub key: String,
    pub columns: Vec<String>,
}

/// Normalized worksheet: flat unique columns plus data records.
#[derive(Debug, Clone, Default)]
pub struct WorksheetData {
    pub header_rows: Vec<Vec<String>>,
    pub columns: Vec<String>,
    pub rows: Vec<RowData>,
    pub merges: Vec<MergeRange>,
    pub column_groups: Vec<ColumnGroup>,
    pub header_row_count: usize,
}

impl WorksheetData {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_infers_types() {
        assert_eq!(CellValue::from_text("  "), CellValue::Empty);
        assert_eq!(CellValue::from_text(" 12.5 "), CellValue::Number(12.5));
        assert_eq!(CellValue::from_text("inf"), CellValue::Text("inf".to_string()));
        assert_eq!(CellValue::from_text("X"), CellValue::Text("X".to_string()));
    }

    #[test]
    fn test_csv_reader_ragged_rows() {
        let csv = "a,b,c\n1,2\n";
        let grid = SheetGrid::from_csv_reader("Sheet1", csv.as_bytes()).unwrap();
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(1, 2), &CellValue::Empty);
        assert_eq!(grid.cell(1, 1), &CellValue::Number(2.0));
    }

    #[test]
    fn test_from_json_keeps_types() {
        let value: Value = serde_json::json!([["a", null], ["12", 12]]);
        let grid = SheetGrid::from_json("S", &value).unwrap();
        assert_eq!(grid.cell(0, 1), &CellValue::Empty);
        assert_eq!(grid.cell(1, 0), &CellValue::Text("12".to_string()));
        assert_eq!(grid.cell(1, 1), &CellValue::Number(12.0));
    }

    #[test]
    fn test_from_json_rejects_objects() {
        let value: Value = serde_json::json!([{"a": 1}]);
        assert!(SheetGrid::from_json("S", &value).is_err());
    }

    #[test]
    fn test_set_cell_grows_range() {
        let mut grid = SheetGrid::new("S", vec![vec![CellValue::from(1.0)]]);
        grid.set_cell(2, 3, CellValue::from(5.0));
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.cell(2, 3), &CellValue::Number(5.0));
        assert_eq!(grid.cell(1, 0), &CellValue::Empty);
    }

    #[test]
    fn test_merge_range_spans() {
        let m = MergeRange::new(CellRef::new(1, 2), CellRef::new(0, 0));
        assert_eq!(m.start, CellRef::new(0, 0));
        assert_eq!(m.row_span(), 2);
        assert_eq!(m.col_span(), 3);
        assert!(m.contains(1, 1));
        assert!(m.is_anchor(0, 0));
        assert!(!m.is_anchor(1, 1));
    }
}
