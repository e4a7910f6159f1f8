//! Raw layout projection: cell text, merge spans and sizes for a spreadsheet
//! editor widget. This is a one-way view of a grid and is never read back.

use crate::data::{CellValue, MergeRange, SheetGrid};
use crate::parser::encode_range;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawCell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// [extra rows, extra columns] covered by a merge anchored here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<[usize; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub cells: BTreeMap<usize, RawCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawColumn {
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSheet {
    pub name: String,
    pub freeze: String,
    pub merges: Vec<String>,
    pub rows: BTreeMap<usize, RawRow>,
    pub cols: BTreeMap<usize, RawColumn>,
}

/// True when (row, col) lies inside a merge without being its anchor
pub fn is_cell_merged(row: usize, col: usize, merges: &[MergeRange]) -> bool {
    merges
        .iter()
        .any(|m| m.contains(row, col) && !m.is_anchor(row, col))
}

/// Rows spanned by the merge anchored at (row, col); 1 when none is
pub fn row_span(row: usize, col: usize, merges: &[MergeRange]) -> usize {
    merges
        .iter()
        .find(|m| m.is_anchor(row, col))
        .map_or(1, MergeRange::row_span)
}

/// Columns spanned by the merge anchored at (row, col); 1 when none is
pub fn col_span(row: usize, col: usize, merges: &[MergeRange]) -> usize {
    merges
        .iter()
        .find(|m| m.is_anchor(row, col))
        .map_or(1, MergeRange::col_span)
}

fn display_text(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Empty => None,
        CellValue::Bool(true) => Some("TRUE".to_string()),
        CellValue::Bool(false) => Some("FALSE".to_string()),
        other => Some(other.to_string()),
    }
}

/// Project one grid, walking every cell in range order
pub fn project_sheet(grid: &SheetGrid) -> RawSheet {
    let mut rows = BTreeMap::new();

    for r in 0..grid.height() {
        let mut row = RawRow {
            height: grid.row_heights.get(&r).map(|h| h.round() as u32),
            cells: BTreeMap::new(),
        };

        for c in 0..grid.width() {
            let text = display_text(grid.cell(r, c));

            let merge = match grid.merges.iter().find(|m| m.contains(r, c)) {
                // Covered cells carry nothing; the anchor holds the content
                Some(m) if !m.is_anchor(r, c) => continue,
                Some(m) => {
                    let extent = [m.row_span() - 1, m.col_span() - 1];
                    (extent != [0, 0]).then_some(extent)
                }
                None => None,
            };

            // An empty anchor still carries its span
            if text.is_some() || merge.is_some() {
                row.cells.insert(c, RawCell { text, merge });
            }
        }

        rows.insert(r, row);
    }

    RawSheet {
        name: grid.name.clone(),
        freeze: "A1".to_string(),
        merges: grid.merges.iter().map(encode_range).collect(),
        rows,
        cols: grid
            .col_widths
            .iter()
            .map(|(&c, &w)| (c, RawColumn { width: w.round() as u32 }))
            .collect(),
    }
}

/// One projection per sheet, in workbook order
pub fn project_workbook(sheets: &[SheetGrid]) -> Vec<RawSheet> {
    sheets.iter().map(project_sheet).collect()
}
