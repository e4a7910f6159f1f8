//! Header normalization: header row detection, multi-level column name synthesis
//! and column grouping by last header level.

use crate::data::{CellValue, ColumnGroup, RowData, SheetGrid, WorksheetData};
use tracing::{debug, info};

/// Default separator between header levels in a synthesized column name
pub const DEFAULT_SEPARATOR: &str = "-";

/// Group name used when the header has a single level
pub const ALL_DATA_GROUP: &str = "All Data";

/// Count how many leading rows form the header.
///
/// Scanning stops at the first entirely empty row or the first row holding a
/// numeric cell; every row before that is header. At least one row is always header.
pub fn detect_header_row_count(grid: &SheetGrid) -> usize {
    let width = grid.width();
    let mut header_row_count = 1;

    for (r, row) in grid.cells.iter().enumerate() {
        let empty_count = (0..width)
            .filter(|&c| row.get(c).map_or(true, CellValue::is_empty))
            .count();

        // Whole row empty: no more headers
        if empty_count == width {
            break;
        }

        // A number means data has started
        if row.iter().any(CellValue::is_number) {
            break;
        }

        header_row_count = r + 1;
    }

    header_row_count
}

/// Extract the header rows as display text, padded to the grid width
pub fn extract_header_rows(grid: &SheetGrid, header_row_count: usize) -> Vec<Vec<String>> {
    let width = grid.width();
    (0..header_row_count)
        .map(|r| (0..width).map(|c| grid.cell(r, c).to_string()).collect())
        .collect()
}

/// Flatten possibly multi-level header rows into unique column names.
///
/// Each column walks the header rows top to bottom. A non-empty cell contributes its
/// trimmed text; an empty cell borrows the nearest non-empty cell to its left in the
/// same row (merged-cell substitute) unless that text is already a segment of this
/// column. Empty names become `Column<N>`; collisions get `_1`, `_2`, ... suffixes.
pub fn generate_columns(header_rows: &[Vec<String>], separator: &str) -> Vec<String> {
    let col_count = header_rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut columns: Vec<String> = Vec::with_capacity(col_count);

    for c in 0..col_count {
        let mut parts: Vec<&str> = Vec::new();

        for row in header_rows {
            let cell = row.get(c).map(|s| s.trim()).unwrap_or("");
            if !cell.is_empty() {
                parts.push(cell);
                continue;
            }

            let found = row[..c.min(row.len())]
                .iter()
                .rev()
                .map(|s| s.trim())
                .find(|s| !s.is_empty());

            if let Some(value) = found {
                if !parts.contains(&value) {
                    parts.push(value);
                }
            }
        }

        let mut name = parts.join(separator);
        if name.is_empty() {
            name = format!("Column{}", c + 1);
        }

        let mut final_name = name.clone();
        let mut counter = 1;
        while columns.contains(&final_name) {
            final_name = format!("{}_{}", name, counter);
            counter += 1;
        }

        columns.push(final_name);
    }

    debug!(?columns, "generated column names");
    columns
}

/// Bucket columns by the text after the last separator, preserving first-seen order
pub fn group_columns_by_last_level(columns: &[String], separator: &str) -> Vec<ColumnGroup> {
    let mut groups: Vec<ColumnGroup> = Vec::new();

    for column in columns {
        let last_level = column.rsplit(separator).next().unwrap_or(column.as_str());

        match groups.iter_mut().find(|g| g.key == last_level) {
            Some(group) => group.columns.push(column.clone()),
            None => groups.push(ColumnGroup {
                key: last_level.to_string(),
                columns: vec![column.clone()],
            }),
        }
    }

    groups
}

/// Summary of how many header levels a sheet has
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLevel {
    pub is_multi_level: bool,
    pub level_count: usize,
    pub description: String,
}

pub fn analyze_header_level(header_rows: &[Vec<String>]) -> HeaderLevel {
    let level_count = header_rows.len();
    let description = match level_count {
        0 => "no header".to_string(),
        1 => "single-level header".to_string(),
        n => format!("{}-level header", n),
    };

    HeaderLevel {
        is_multi_level: level_count > 1,
        level_count,
        description,
    }
}

/// Chart groups for a worksheet: one `All Data` group for single-level headers,
/// otherwise one group per last header level.
pub fn groups_by_header_level(worksheet: &WorksheetData, separator: &str) -> Vec<ColumnGroup> {
    if analyze_header_level(&worksheet.header_rows).is_multi_level {
        group_columns_by_last_level(&worksheet.columns, separator)
    } else {
        vec![ColumnGroup {
            key: ALL_DATA_GROUP.to_string(),
            columns: worksheet.columns.clone(),
        }]
    }
}

/// Normalize a raw grid into a worksheet: header rows, unique columns and data records
pub fn load_worksheet(grid: &SheetGrid, separator: &str) -> WorksheetData {
    let header_row_count = detect_header_row_count(grid);
    let header_rows = extract_header_rows(grid, header_row_count);
    let columns = generate_columns(&header_rows, separator);

    let rows: Vec<RowData> = grid
        .cells
        .iter()
        .skip(header_row_count)
        .map(|cells| {
            columns
                .iter()
                .enumerate()
                .filter_map(|(idx, col)| {
                    cells
                        .get(idx)
                        .filter(|v| !matches!(v, CellValue::Empty))
                        .map(|v| (col.clone(), v.clone()))
                })
                .collect()
        })
        .collect();

    info!(
        sheet = %grid.name,
        header_row_count,
        columns = columns.len(),
        rows = rows.len(),
        "loaded worksheet"
    );

    WorksheetData {
        column_groups: group_columns_by_last_level(&columns, separator),
        header_rows,
        columns,
        rows,
        merges: grid.merges.clone(),
        header_row_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from_text(s)
    }

    fn header(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn make_grid() -> SheetGrid {
        SheetGrid::new(
            "Sheet1",
            vec![
                vec![text("机械手"), text(""), text("相机"), text("")],
                vec![text("X"), text("Y"), text("X"), text("Y")],
                vec![text("1"), text("2"), text("3"), text("4")],
                vec![text("5"), text("6"), text("7"), text("8")],
            ],
        )
    }

    #[test]
    fn test_detect_two_header_rows() {
        assert_eq!(detect_header_row_count(&make_grid()), 2);
    }

    #[test]
    fn test_detect_stops_at_empty_row() {
        let grid = SheetGrid::new(
            "S",
            vec![
                vec![text("A"), text("B")],
                vec![text(""), text("")],
                vec![text("C"), text("D")],
            ],
        );
        assert_eq!(detect_header_row_count(&grid), 1);
    }

    #[test]
    fn test_detect_at_least_one_row() {
        let grid = SheetGrid::new("S", vec![vec![text("1"), text("2")]]);
        assert_eq!(detect_header_row_count(&grid), 1);
    }

    #[test]
    fn test_multi_level_names_borrow_left() {
        let headers = header(&[&["机械手", "", "相机", ""], &["X", "Y", "X", "Y"]]);
        let columns = generate_columns(&headers, "-");
        assert_eq!(columns, vec!["机械手-X", "机械手-Y", "相机-X", "相机-Y"]);
    }

    #[test]
    fn test_borrowed_segment_not_repeated() {
        // Column B borrows "A" in both rows but keeps it once
        let headers = header(&[&["A", ""], &["A", ""]]);
        let columns = generate_columns(&headers, "-");
        assert_eq!(columns, vec!["A-A", "A"]);
    }

    #[test]
    fn test_placeholder_and_uniqueness() {
        let headers = header(&[&["", "X", "X", "X"]]);
        let columns = generate_columns(&headers, "-");
        // First column has nothing to its left to borrow
        assert_eq!(columns, vec!["Column1", "X", "X_1", "X_2"]);
    }

    #[test]
    fn test_header_determinism() {
        let headers = header(&[&["机械手", "", "序号"], &["X", "Y", ""]]);
        let first = generate_columns(&headers, "-");
        let second = generate_columns(&headers, "-");
        assert_eq!(first, second);
    }

    #[test]
    fn test_group_by_last_level() {
        let columns: Vec<String> = ["机械手-X", "机械手-Y", "相机-X", "序号"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let groups = group_columns_by_last_level(&columns, "-");
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key, "X");
        assert_eq!(groups[0].columns, vec!["机械手-X", "相机-X"]);
        assert_eq!(groups[1].key, "Y");
        assert_eq!(groups[2].key, "序号");
    }

    #[test]
    fn test_analyze_header_level() {
        assert!(!analyze_header_level(&[]).is_multi_level);
        assert_eq!(analyze_header_level(&[]).level_count, 0);
        let two = header(&[&["a"], &["b"]]);
        let level = analyze_header_level(&two);
        assert!(level.is_multi_level);
        assert_eq!(level.description, "2-level header");
    }

    #[test]
    fn test_load_worksheet() {
        let ws = load_worksheet(&make_grid(), "-");
        assert_eq!(ws.header_row_count, 2);
        assert_eq!(ws.columns.len(), 4);
        assert_eq!(ws.rows.len(), 2);
        assert_eq!(ws.rows[1].get("相机-Y"), Some(&CellValue::Number(8.0)));
        assert_eq!(ws.column_groups.len(), 2);

        let groups = groups_by_header_level(&ws, "-");
        assert_eq!(groups[0].key, "X");
    }

    #[test]
    fn test_single_level_all_data_group() {
        let grid = SheetGrid::new(
            "S",
            vec![vec![text("A"), text("B")], vec![text("1"), text("2")]],
        );
        let ws = load_worksheet(&grid, "-");
        let groups = groups_by_header_level(&ws, "-");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, ALL_DATA_GROUP);
        assert_eq!(groups[0].columns, vec!["A", "B"]);
    }
}
