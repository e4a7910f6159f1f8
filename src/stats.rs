//! Box-plot statistics: five-number summaries with 1.5 IQR whiskers, and the
//! display statistics shown in category tooltips.

use crate::ir::CategoryStats;

/// Whisker reach as a multiple of the interquartile range
pub const BOUND_IQR: f64 = 1.5;

/// Summaries for a set of categories, index-aligned with the input arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxplotSummary {
    /// [low, q1, median, q3, high] per category; None when the category has no values
    pub quartiles: Vec<Option<[f64; 5]>>,
    /// (category index, value) for every value outside its whiskers
    pub outliers: Vec<(usize, f64)>,
}

/// Linear-interpolated quantile of sorted data
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] + weight * (sorted_data[upper_idx] - sorted_data[lower_idx])
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut ys = values.to_vec();
    ys.sort_by(f64::total_cmp);
    ys
}

/// Five-number summary per category.
///
/// Whiskers are clamped to the data range: low = max(min, q1 - 1.5 IQR),
/// high = min(max, q3 + 1.5 IQR). Values beyond them are reported as outliers.
pub fn five_number_summary(columns: &[Vec<f64>]) -> BoxplotSummary {
    let mut quartiles = Vec::with_capacity(columns.len());
    let mut outliers = Vec::new();

    for (category, values) in columns.iter().enumerate() {
        if values.is_empty() {
            quartiles.push(None);
            continue;
        }

        let ys = sorted(values);
        let q1 = percentile(&ys, 0.25);
        let median = percentile(&ys, 0.50);
        let q3 = percentile(&ys, 0.75);
        let bound = BOUND_IQR * (q3 - q1);

        let min = ys[0];
        let max = ys[ys.len() - 1];
        let low = min.max(q1 - bound);
        let high = max.min(q3 + bound);

        quartiles.push(Some([low, q1, median, q3, high]));

        // Outliers keep input order within a category
        outliers.extend(
            values
                .iter()
                .filter(|&&v| v < low || v > high)
                .map(|&v| (category, v)),
        );
    }

    BoxplotSummary { quartiles, outliers }
}

/// Min, max, mean and median straight from the raw values
pub fn calculate_statistics(values: &[f64]) -> Option<CategoryStats> {
    if values.is_empty() {
        return None;
    }

    let ys = sorted(values);
    let n = ys.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (ys[n / 2 - 1] + ys[n / 2]) / 2.0
    } else {
        ys[n / 2]
    };

    Some(CategoryStats {
        min: ys[0],
        max: ys[n - 1],
        mean,
        median,
        count: n,
    })
}
