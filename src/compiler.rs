use crate::data::{ColumnGroup, WorksheetData};
use crate::ir::{
    BoxplotItem, BoxplotSeries, CategoryTooltip, ChartDescriptor, ChartTitle, DataZoom, Legend,
    ScatterSeries, Series, Toolbox, TooltipConfig, ZoomAxis,
};
use crate::sanitize::{filter_data_rows, SanitizeRules, SanitizedRows};
use crate::scale::{category_axis, value_axis};
use crate::series::{create_scatter_series, extract_coordinate_data, DeviceDataMap};
use crate::stats::{calculate_statistics, five_number_summary};
use serde::Serialize;
use tracing::{debug, info};

pub const BOXPLOT_SERIES_NAME: &str = "Boxplot";
pub const BOXPLOT_Z: u32 = 1;

/// One chart per column group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedChart {
    pub group: String,
    pub chart: ChartDescriptor,
}

// =============================================================================
// Descriptor assembly
// =============================================================================

fn build_boxplot(columns: &[String], data: &DeviceDataMap) -> BoxplotSeries {
    // Arrays go in column order so summaries stay index-aligned with the axis
    let arrays = data.ordered(columns);
    let summary = five_number_summary(&arrays);

    let data_items = summary
        .quartiles
        .iter()
        .enumerate()
        .map(|(category, values)| BoxplotItem { category, values: *values })
        .collect();

    let tooltips = columns
        .iter()
        .zip(summary.quartiles.iter())
        .map(|(column, quartiles)| CategoryTooltip {
            column: column.clone(),
            stats: calculate_statistics(data.get(column)),
            q1: quartiles.map(|q| q[1]),
            q3: quartiles.map(|q| q[3]),
        })
        .collect();

    BoxplotSeries {
        name: BOXPLOT_SERIES_NAME.to_string(),
        data: data_items,
        outliers: summary.outliers,
        box_width: ("5%".to_string(), "60%".to_string()),
        z: BOXPLOT_Z,
        tooltips,
    }
}

fn inside_zoom(axis: ZoomAxis) -> DataZoom {
    DataZoom {
        kind: "inside".to_string(),
        axis,
        start: 0.0,
        end: 100.0,
    }
}

/// Assemble a descriptor from per-column values and their scatter overlay.
///
/// Returns None when no column holds a single numeric value.
pub fn create_chart_option(
    columns: &[String],
    data: &DeviceDataMap,
    scatter: Vec<ScatterSeries>,
) -> Option<ChartDescriptor> {
    let y_axis = value_axis(data.all_values())?;
    let boxplot = build_boxplot(columns, data);

    let mut series = Vec::with_capacity(scatter.len() + 1);
    series.push(Series::Boxplot(boxplot));
    series.extend(scatter.into_iter().map(Series::Scatter));

    let legend = Legend {
        kind: "scroll".to_string(),
        show: true,
        bottom: 10,
        data: series.iter().map(|s| s.name().to_string()).collect(),
    };

    Some(ChartDescriptor {
        generation: 0,
        title: None,
        tooltip: TooltipConfig { trigger: "item".to_string() },
        legend,
        toolbox: Toolbox {
            restore: true,
            save_as_image_pixel_ratio: 2,
        },
        data_zoom: vec![inside_zoom(ZoomAxis::X), inside_zoom(ZoomAxis::Y)],
        x_axis: category_axis(columns),
        y_axis,
        series,
    })
}

fn chart_from_sanitized(
    sanitized: &SanitizedRows,
    columns: &[String],
    header_row_count: usize,
) -> Option<ChartDescriptor> {
    let data = extract_coordinate_data(&sanitized.rows, columns);
    let scatter = create_scatter_series(&sanitized.rows, columns, &sanitized.source_rows, header_row_count);
    create_chart_option(columns, &data, scatter)
}

/// Run sanitize, extraction and assembly over a whole worksheet
pub fn build_chart(worksheet: &WorksheetData, rules: &SanitizeRules) -> Option<ChartDescriptor> {
    let sanitized = filter_data_rows(&worksheet.rows, &worksheet.columns, rules);
    if sanitized.is_empty() {
        info!("no chartable rows");
        return None;
    }

    let chart = chart_from_sanitized(&sanitized, &sanitized.columns, worksheet.header_row_count)?;
    info!(
        columns = sanitized.columns.len(),
        rows = sanitized.rows.len(),
        series = chart.series.len(),
        "assembled chart"
    );
    Some(chart)
}

/// One independent descriptor per column group, all drawn from the same filtered rows.
/// Groups left without columns after sequence-column removal, or without numeric values,
/// are skipped.
pub fn build_grouped_charts(
    worksheet: &WorksheetData,
    groups: &[ColumnGroup],
    rules: &SanitizeRules,
) -> Vec<GroupedChart> {
    let sanitized = filter_data_rows(&worksheet.rows, &worksheet.columns, rules);
    if sanitized.is_empty() {
        info!("no chartable rows");
        return Vec::new();
    }

    let mut charts = Vec::new();
    for group in groups {
        let columns: Vec<String> = group
            .columns
            .iter()
            .filter(|c| !rules.is_sequence_column(c))
            .cloned()
            .collect();

        if columns.is_empty() {
            debug!(group = %group.key, "skipping group without columns");
            continue;
        }

        let Some(mut chart) = chart_from_sanitized(&sanitized, &columns, worksheet.header_row_count) else {
            debug!(group = %group.key, "skipping group without numeric values");
            continue;
        };
        chart.title = Some(ChartTitle {
            text: format!("{} analysis", group.key),
        });
        charts.push(GroupedChart {
            group: group.key.clone(),
            chart,
        });
    }

    info!(groups = groups.len(), charts = charts.len(), "assembled grouped charts");
    charts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CellValue, RowData};

    fn make_worksheet(columns: &[&str], rows: &[&[f64]]) -> WorksheetData {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows: Vec<RowData> = rows
            .iter()
            .map(|vals| {
                columns
                    .iter()
                    .cloned()
                    .zip(vals.iter().map(|&v| CellValue::from(v)))
                    .collect()
            })
            .collect();
        WorksheetData {
            header_rows: vec![columns.clone()],
            columns,
            rows,
            header_row_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_series_box_alignment() {
        let ws = make_worksheet(&["A", "B", "C"], &[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let chart = build_chart(&ws, &SanitizeRules::default()).unwrap();

        let boxplot = chart.boxplot().unwrap();
        assert_eq!(boxplot.data.len(), 3);
        assert_eq!(boxplot.data[1].category, 1);
        assert_eq!(boxplot.tooltips[1].column, "B");

        let scatter: Vec<_> = chart.scatter_series().map(|(_, s)| s).collect();
        assert_eq!(scatter[1].column, "B");
        assert_eq!(chart.x_axis.labels[1], "B");
        assert!(matches!(chart.series[0], Series::Boxplot(_)));
    }

    #[test]
    fn test_end_to_end_medians() {
        let ws = make_worksheet(
            &["机械手-X", "机械手-Y"],
            &[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]],
        );
        let chart = build_chart(&ws, &SanitizeRules::default()).unwrap();

        let scatter: Vec<_> = chart.scatter_series().map(|(_, s)| s).collect();
        assert_eq!(scatter.len(), 2);
        assert!(scatter.iter().all(|s| s.data.len() == 3));

        let boxplot = chart.boxplot().unwrap();
        assert_eq!(boxplot.data.len(), 2);
        assert_eq!(boxplot.data[0].median(), Some(3.0));
        assert_eq!(boxplot.data[1].median(), Some(4.0));

        let medians: Vec<f64> = boxplot
            .tooltips
            .iter()
            .map(|t| t.stats.as_ref().unwrap().median)
            .collect();
        assert_eq!(medians, vec![3.0, 4.0]);
        assert!(boxplot.tooltips[0].to_string().contains("Median: 3"));
    }

    #[test]
    fn test_chart_chrome() {
        let ws = make_worksheet(&["A", "B"], &[&[0.0, 10.0]]);
        let chart = build_chart(&ws, &SanitizeRules::default()).unwrap();

        assert_eq!(chart.legend.data, vec!["Boxplot", "A scatter", "B scatter"]);
        assert_eq!(chart.legend.kind, "scroll");
        assert_eq!(chart.data_zoom.len(), 2);
        assert_eq!(chart.y_axis.min, -1.0);
        assert_eq!(chart.y_axis.max, 11.0);
        assert_eq!(chart.x_axis.max, 2.0);
        assert!(chart.title.is_none());
    }

    #[test]
    fn test_no_numeric_data_yields_none() {
        let ws = make_worksheet(&["A"], &[]);
        assert!(build_chart(&ws, &SanitizeRules::default()).is_none());
    }

    #[test]
    fn test_grouped_charts() {
        let ws = make_worksheet(
            &["序号", "R1-X", "R2-X", "R1-Y"],
            &[&[1.0, 1.0, 2.0, 3.0], &[2.0, 4.0, 5.0, 6.0]],
        );
        let groups = vec![
            ColumnGroup { key: "X".into(), columns: vec!["R1-X".into(), "R2-X".into()] },
            ColumnGroup { key: "Y".into(), columns: vec!["R1-Y".into()] },
            ColumnGroup { key: "序号".into(), columns: vec!["序号".into()] },
        ];
        let charts = build_grouped_charts(&ws, &groups, &SanitizeRules::default());

        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].group, "X");
        assert_eq!(charts[0].chart.title.as_ref().unwrap().text, "X analysis");
        assert_eq!(charts[0].chart.columns(), &["R1-X", "R2-X"]);
        assert_eq!(charts[1].chart.scatter_series().count(), 1);
    }
}
