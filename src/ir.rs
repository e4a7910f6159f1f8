use serde::Serialize;
use std::fmt;

// =============================================================================
// Scatter points
// =============================================================================

/// The cell value exactly as it was read, kept for precise display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

/// One scatter point. `coordinates[0]` is always `fixed_x`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeriesPoint {
    pub coordinates: [f64; 2],
    pub column_label: String,
    pub raw_value: RawValue,
    pub numeric_value: f64,
    pub fixed_x: f64,
    /// Row index within the sanitized row set
    pub filtered_row_index: usize,
    /// Row index in raw spreadsheet coordinates (header rows included)
    pub original_row_index: usize,
    pub column_index: usize,
}

impl ChartSeriesPoint {
    pub fn x(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn y(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn tooltip(&self) -> String {
        format!("Type: {}\nValue: {}", self.column_label, self.raw_value)
    }
}

// =============================================================================
// Series
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStyle {
    pub color: String,
    pub opacity: f64,
}

/// Style applied while a point is hovered
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Emphasis {
    pub z: u32,
    pub opacity: f64,
    pub border_color: String,
    pub border_width: u32,
}

/// Scatter overlay for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterSeries {
    pub name: String,
    pub column: String,
    pub data: Vec<ChartSeriesPoint>,
    pub symbol_size: u32,
    pub z: u32,
    pub item_style: ItemStyle,
    pub emphasis: Emphasis,
}

impl ScatterSeries {
    pub fn column_label(&self) -> &str {
        &self.column
    }

    /// Index of the point drawn from raw spreadsheet row `raw_row`
    pub fn point_index_for_row(&self, raw_row: usize) -> Option<usize> {
        self.data.iter().position(|p| p.original_row_index == raw_row)
    }
}

/// Five-number summary of one category: [low, q1, median, q3, high]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxplotItem {
    pub category: usize,
    pub values: Option<[f64; 5]>,
}

impl BoxplotItem {
    pub fn median(&self) -> Option<f64> {
        self.values.map(|v| v[2])
    }
}

/// Display statistics for a box-plot category, recomputed from the raw values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTooltip {
    pub column: String,
    pub stats: Option<CategoryStats>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
}

impl fmt::Display for CategoryTooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column)?;
        match &self.stats {
            Some(s) => {
                writeln!(f, "Max: {}", s.max)?;
                writeln!(f, "Min: {}", s.min)?;
                writeln!(f, "Median: {}", s.median)?;
                writeln!(f, "Mean: {}", s.mean)?;
            }
            None => writeln!(f, "No numeric values")?,
        }
        if let (Some(q1), Some(q3)) = (self.q1, self.q3) {
            writeln!(f, "Q1: {}", q1)?;
            writeln!(f, "Q3: {}", q3)?;
        }
        write!(f, "Samples: {}", self.stats.as_ref().map_or(0, |s| s.count))
    }
}

/// Box-plot series: one item per column, index-aligned with the x-axis labels
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxplotSeries {
    pub name: String,
    pub data: Vec<BoxplotItem>,
    /// (category index, value) pairs outside the whiskers
    pub outliers: Vec<(usize, f64)>,
    pub box_width: (String, String),
    pub z: u32,
    pub tooltips: Vec<CategoryTooltip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Series {
    Boxplot(BoxplotSeries),
    Scatter(ScatterSeries),
}

impl Series {
    pub fn name(&self) -> &str {
        match self {
            Series::Boxplot(b) => &b.name,
            Series::Scatter(s) => &s.name,
        }
    }

    pub fn as_scatter(&self) -> Option<&ScatterSeries> {
        match self {
            Series::Scatter(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scatter_mut(&mut self) -> Option<&mut ScatterSeries> {
        match self {
            Series::Scatter(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Chart chrome
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTitle {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipConfig {
    pub trigger: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    #[serde(rename = "type")]
    pub kind: String,
    pub show: bool,
    pub bottom: u32,
    pub data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toolbox {
    pub restore: bool,
    pub save_as_image_pixel_ratio: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomAxis {
    X,
    Y,
}

/// Wheel/pinch zoom without a slider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataZoom {
    #[serde(rename = "type")]
    pub kind: String,
    pub axis: ZoomAxis,
    pub start: f64,
    pub end: f64,
}

/// Value axis whose integer ticks are labelled with column names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAxis {
    pub min: f64,
    pub max: f64,
    pub interval: f64,
    pub labels: Vec<String>,
    pub rotate: f64,
}

impl CategoryAxis {
    /// Label shown at a tick: the column at the nearest integer position
    pub fn label_for(&self, value: f64) -> &str {
        let idx = value.round();
        if idx < 0.0 {
            return "";
        }
        self.labels.get(idx as usize).map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAxis {
    pub min: f64,
    pub max: f64,
}

// =============================================================================
// Descriptor
// =============================================================================

/// Complete chart: box-plot series first, then one scatter series per column in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDescriptor {
    /// Bumped every time a full rebuild is installed on a surface
    pub generation: u64,
    pub title: Option<ChartTitle>,
    pub tooltip: TooltipConfig,
    pub legend: Legend,
    pub toolbox: Toolbox,
    pub data_zoom: Vec<DataZoom>,
    pub x_axis: CategoryAxis,
    pub y_axis: ValueAxis,
    pub series: Vec<Series>,
}

impl ChartDescriptor {
    pub fn columns(&self) -> &[String] {
        &self.x_axis.labels
    }

    pub fn boxplot(&self) -> Option<&BoxplotSeries> {
        self.series.iter().find_map(|s| match s {
            Series::Boxplot(b) => Some(b),
            _ => None,
        })
    }

    /// Scatter series with their index in `series`
    pub fn scatter_series(&self) -> impl Iterator<Item = (usize, &ScatterSeries)> {
        self.series
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| s.as_scatter().map(|sc| (idx, sc)))
    }
}
