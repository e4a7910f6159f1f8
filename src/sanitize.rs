//! Row sanitization: drops statistic/summary rows and empty rows, removes the
//! sequence-number column, and remembers where every retained row came from.

use crate::data::{CellValue, RowData};
use crate::series::parse_finite;
use tracing::{debug, info};

/// Column label treated as a running sequence number and never charted
pub const DEFAULT_SEQUENCE_LABEL: &str = "序号";

/// Cell text that marks a row as a summary/statistics row
pub const STATS_KEYWORDS: &[&str] = &[
    "最大值", "最小值", "误差", "平均值", "标准差",
    "方差", "中位数", "众数", "四分位数", "极差",
    "偏差", "总计", "合计", "汇总", "统计", "小计",
    "max", "min", "mean", "avg", "average", "std", "variance",
    "median", "mode", "range", "error", "total", "subtotal",
];

/// Rules for dropping rows and columns before charting
#[derive(Debug, Clone)]
pub struct SanitizeRules {
    pub keywords: Vec<String>,
    pub sequence_label: String,
}

impl Default for SanitizeRules {
    fn default() -> Self {
        Self {
            keywords: STATS_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            sequence_label: DEFAULT_SEQUENCE_LABEL.to_string(),
        }
    }
}

impl SanitizeRules {
    pub fn with_extra_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(extra.into_iter().map(Into::into));
        self
    }

    /// True when the trimmed text equals or contains a keyword (ASCII case-insensitive)
    pub fn is_stats_text(&self, text: &str) -> bool {
        let cell = text.trim().to_lowercase();
        if cell.is_empty() {
            return false;
        }
        self.keywords
            .iter()
            .any(|k| cell.contains(k.to_lowercase().as_str()))
    }

    pub fn is_sequence_column(&self, column: &str) -> bool {
        column.trim() == self.sequence_label
    }
}

/// Output of row sanitization
#[derive(Debug, Clone, Default)]
pub struct SanitizedRows {
    pub rows: Vec<RowData>,
    pub columns: Vec<String>,
    /// For each retained row, its index in the input data rows
    pub source_rows: Vec<usize>,
}

impl SanitizedRows {
    /// Filtered index of the row that was at `source_row` in the input, if retained
    pub fn filtered_index(&self, source_row: usize) -> Option<usize> {
        self.source_rows.binary_search(&source_row).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_stats_row(row: &RowData, rules: &SanitizeRules) -> bool {
    row.values().any(|value| match value {
        CellValue::Empty => false,
        other => rules.is_stats_text(&other.to_string()),
    })
}

fn is_empty_row(row: &RowData) -> bool {
    row.values().all(CellValue::is_empty)
}

fn has_valid_numbers(row: &RowData, columns: &[String]) -> bool {
    columns
        .iter()
        .any(|col| row.get(col).and_then(parse_finite).is_some())
}

/// Whether `filter_data_rows` would keep this row
pub fn is_chartable_row(row: &RowData, columns: &[String], rules: &SanitizeRules) -> bool {
    !is_stats_row(row, rules) && !is_empty_row(row) && has_valid_numbers(row, columns)
}

/// Keep only charting rows and drop the sequence column.
///
/// A row is dropped when any cell is statistic text, when every cell is empty, or
/// when none of `columns` holds a finite number. Retained rows keep their order.
pub fn filter_data_rows(rows: &[RowData], columns: &[String], rules: &SanitizeRules) -> SanitizedRows {
    let input_count = rows.len();
    let mut kept = Vec::new();
    let mut source_rows = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        if is_stats_row(row, rules) {
            debug!(row = idx, "dropping statistics row");
            continue;
        }
        if is_empty_row(row) {
            debug!(row = idx, "dropping empty row");
            continue;
        }
        if !has_valid_numbers(row, columns) {
            debug!(row = idx, "dropping row without numeric values");
            continue;
        }
        kept.push(row.clone());
        source_rows.push(idx);
    }

    let (columns, rows) = remove_sequence_column(columns, kept, rules);

    info!(
        input_rows = input_count,
        retained = rows.len(),
        columns = columns.len(),
        "sanitized data rows"
    );

    SanitizedRows {
        rows,
        columns,
        source_rows,
    }
}

/// Remove the sequence column from the column list and every row; no-op when absent
pub fn remove_sequence_column(
    columns: &[String],
    mut rows: Vec<RowData>,
    rules: &SanitizeRules,
) -> (Vec<String>, Vec<RowData>) {
    let Some(sequence) = columns.iter().find(|c| rules.is_sequence_column(c)) else {
        return (columns.to_vec(), rows);
    };

    let kept: Vec<String> = columns.iter().filter(|c| *c != sequence).cloned().collect();
    for row in &mut rows {
        row.remove(sequence);
    }
    (kept, rows)
}
