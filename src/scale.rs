use crate::ir::{CategoryAxis, ValueAxis};

/// Fraction of the data span added above and below the value axis
pub const AXIS_PADDING: f64 = 0.1;

/// Label rotation once the x axis gets crowded
pub const CROWDED_LABEL_ROTATION: f64 = 15.0;
const CROWDED_COLUMN_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MinMax {
    min: f64,
    max: f64,
}

fn calculate_min_max<I>(values: I) -> Option<MinMax>
where
    I: IntoIterator<Item = f64>,
{
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for val in values {
        if val < min { min = val; }
        if val > max { max = val; }
    }

    // Handle empty case
    if min > max { None } else { Some(MinMax { min, max }) }
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * AXIS_PADDING;
        (min - padding, max + padding)
    }
}

/// Value axis covering every numeric value, padded by 10% of the span.
/// Returns None when there are no values.
pub fn value_axis<I>(values: I) -> Option<ValueAxis>
where
    I: IntoIterator<Item = f64>,
{
    let mm = calculate_min_max(values)?;
    let (min, max) = pad_range(mm.min, mm.max);
    Some(ValueAxis { min, max })
}

/// Category positions 0..n-1 with one empty slot on each side
pub fn category_axis(columns: &[String]) -> CategoryAxis {
    let rotate = if columns.len() > CROWDED_COLUMN_COUNT {
        CROWDED_LABEL_ROTATION
    } else {
        0.0
    };

    CategoryAxis {
        min: -1.0,
        max: columns.len() as f64,
        interval: 1.0,
        labels: columns.to_vec(),
        rotate,
    }
}
