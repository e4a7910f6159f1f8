//! Series construction: per-column numeric arrays and the jittered scatter overlay.

use crate::data::{CellValue, RowData};
use crate::ir::{ChartSeriesPoint, Emphasis, ItemStyle, RawValue, ScatterSeries};
use crate::palette;
use std::collections::HashMap;
use tracing::warn;

/// Total horizontal spread of the jitter band around a category
pub const JITTER_SPREAD: f64 = 0.4;

/// Appended to a column name to form its scatter series name
pub const SCATTER_SUFFIX: &str = " scatter";

pub const SCATTER_Z: u32 = 2;
pub const SCATTER_HOVER_Z: u32 = 10;

/// Parse text to a finite number: non-empty after trimming, numeric, not NaN/inf
pub fn parse_finite_str(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// The single acceptance test for numeric cells, shared by every extraction path
pub fn parse_finite(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_finite_str(s),
        _ => None,
    }
}

/// Horizontal offset for the point at (column, filtered row). Pure in its inputs.
pub fn jitter(column_index: usize, row_index: usize) -> f64 {
    let seed = column_index as f64 * 12345.0 + row_index as f64 * 6789.0;
    let pseudo = seed.sin() * 10000.0;
    let fraction = pseudo - pseudo.floor() - 0.5;
    fraction * JITTER_SPREAD
}

pub fn fixed_x(column_index: usize, row_index: usize) -> f64 {
    column_index as f64 + jitter(column_index, row_index)
}

/// Scatter symbol size shrinks as the sample count grows
pub fn symbol_size(sample_count: usize) -> u32 {
    if sample_count > 100 {
        2
    } else if sample_count > 50 {
        4
    } else {
        8
    }
}

pub fn scatter_series_name(column: &str) -> String {
    format!("{}{}", column, SCATTER_SUFFIX)
}

/// Numeric values per column, in row order, non-numeric cells skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDataMap {
    values: HashMap<String, Vec<f64>>,
}

impl DeviceDataMap {
    pub fn get(&self, column: &str) -> &[f64] {
        self.values.get(column).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Per-column arrays in the given column order (missing columns are empty)
    pub fn ordered(&self, columns: &[String]) -> Vec<Vec<f64>> {
        columns.iter().map(|c| self.get(c).to_vec()).collect()
    }

    pub fn all_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.values().flatten().copied()
    }
}

/// Build the numeric array of every column. Columns with no numeric cell are left out.
pub fn extract_coordinate_data(rows: &[RowData], columns: &[String]) -> DeviceDataMap {
    let mut values = HashMap::new();

    for column in columns {
        let column_values: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(column).and_then(parse_finite))
            .collect();

        if column_values.is_empty() {
            warn!(column = %column, "column has no numeric values");
        } else {
            values.insert(column.clone(), column_values);
        }
    }

    DeviceDataMap { values }
}

fn raw_value(cell: &CellValue, numeric: f64) -> RawValue {
    match cell {
        CellValue::Text(s) => RawValue::Text(s.clone()),
        _ => RawValue::Number(numeric),
    }
}

/// Build one scatter series per column.
///
/// `source_rows[ri]` is the data-row index the filtered row `ri` came from; together
/// with `header_row_count` it gives each point its raw spreadsheet row.
pub fn create_scatter_series(
    rows: &[RowData],
    columns: &[String],
    source_rows: &[usize],
    header_row_count: usize,
) -> Vec<ScatterSeries> {
    columns
        .iter()
        .enumerate()
        .map(|(column_index, column)| {
            let data: Vec<ChartSeriesPoint> = rows
                .iter()
                .enumerate()
                .filter_map(|(row_index, row)| {
                    let cell = row.get(column)?;
                    let value = parse_finite(cell)?;
                    let x = fixed_x(column_index, row_index);
                    let source_row = source_rows.get(row_index).copied().unwrap_or(row_index);

                    Some(ChartSeriesPoint {
                        coordinates: [x, value],
                        column_label: column.clone(),
                        raw_value: raw_value(cell, value),
                        numeric_value: value,
                        fixed_x: x,
                        filtered_row_index: row_index,
                        original_row_index: source_row + header_row_count,
                        column_index,
                    })
                })
                .collect();

            let color = palette::color_for(column_index).to_string();

            ScatterSeries {
                name: scatter_series_name(column),
                column: column.clone(),
                symbol_size: symbol_size(data.len()),
                data,
                z: SCATTER_Z,
                item_style: ItemStyle {
                    color: color.clone(),
                    opacity: 0.7,
                },
                emphasis: Emphasis {
                    z: SCATTER_HOVER_Z,
                    opacity: 1.0,
                    border_color: "#fff".to_string(),
                    border_width: 2,
                },
            }
        })
        .collect()
}
