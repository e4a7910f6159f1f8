use crate::ir::{BoxplotSeries, ChartDescriptor, ScatterSeries, Series};
use crate::palette;
use crate::reconcile::{ApplyMode, RenderSurface, SeriesPatch, SurfaceError};
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

type ChartArea<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Box width in category units
const BOX_WIDTH: f64 = 0.6;
const BOX_COLOR: RGBColor = RGBColor(84, 112, 198);

// =============================================================================
// Boxplot Geometry Helpers
// =============================================================================

/// Computed geometry for a single boxplot, expressed as primitive shapes
struct BoxplotGeometry {
    lower_whisker: Vec<(f64, f64)>,
    upper_whisker: Vec<(f64, f64)>,
    min_cap: Vec<(f64, f64)>,
    max_cap: Vec<(f64, f64)>,
    box_tl: (f64, f64),
    box_br: (f64, f64),
    median_line: Vec<(f64, f64)>,
    outlier_points: Vec<(f64, f64)>,
}

/// Geometry for one category from its [low, q1, median, q3, high] summary
fn compute_boxplot_geometry(x: f64, width: f64, q: [f64; 5], outliers: &[f64]) -> BoxplotGeometry {
    let [low, q1, median, q3, high] = q;
    let half_width = width / 2.0;
    let cap_half = width * 0.2;

    BoxplotGeometry {
        lower_whisker: vec![(x, low), (x, q1)],
        upper_whisker: vec![(x, q3), (x, high)],
        min_cap: vec![(x - cap_half, low), (x + cap_half, low)],
        max_cap: vec![(x - cap_half, high), (x + cap_half, high)],
        box_tl: (x - half_width, q3),
        box_br: (x + half_width, q1),
        median_line: vec![(x - half_width, median), (x + half_width, median)],
        outlier_points: outliers.iter().map(|&v| (x, v)).collect(),
    }
}

fn series_color(hex: &str) -> RGBColor {
    palette::parse_hex(hex)
        .map(|(r, g, b)| RGBColor(r, g, b))
        .unwrap_or(BLUE)
}

// =============================================================================
// Drawing
// =============================================================================

fn draw_boxplot<DB>(chart: &mut ChartArea<'_, DB>, series: &BoxplotSeries) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut boxes = Vec::new();
    let mut lines = Vec::new();
    let mut outliers = Vec::new();

    for item in &series.data {
        let Some(q) = item.values else { continue };
        let category_outliers: Vec<f64> = series
            .outliers
            .iter()
            .filter(|(c, _)| *c == item.category)
            .map(|&(_, v)| v)
            .collect();

        let g = compute_boxplot_geometry(item.category as f64, BOX_WIDTH, q, &category_outliers);
        boxes.push(Rectangle::new([g.box_tl, g.box_br], BOX_COLOR.mix(0.25).filled()));
        boxes.push(Rectangle::new([g.box_tl, g.box_br], BOX_COLOR.stroke_width(1)));
        lines.extend([g.lower_whisker, g.upper_whisker, g.min_cap, g.max_cap, g.median_line]);
        outliers.extend(g.outlier_points);
    }

    chart
        .draw_series(boxes)
        .context("Failed to draw boxes")?
        .label(&series.name)
        .legend(|(x, y)| Rectangle::new([(x - 5, y - 5), (x + 5, y + 5)], BOX_COLOR.mix(0.25).filled()));

    chart
        .draw_series(lines.into_iter().map(|pts| PathElement::new(pts, BOX_COLOR.stroke_width(2))))
        .context("Failed to draw whiskers")?;

    chart
        .draw_series(outliers.into_iter().map(|p| Circle::new(p, 3, BOX_COLOR.stroke_width(1))))
        .context("Failed to draw outliers")?;

    Ok(())
}

fn draw_scatter<DB>(chart: &mut ChartArea<'_, DB>, series: &ScatterSeries) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let color = series_color(&series.item_style.color);
    let style = color.mix(series.item_style.opacity).filled();
    let radius = (series.symbol_size as i32 / 2).max(1);

    chart
        .draw_series(series.data.iter().map(|p| Circle::new((p.x(), p.y()), radius, style)))
        .context("Failed to draw scatter series")?
        .label(&series.name)
        .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));

    Ok(())
}

fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, descriptor: &ChartDescriptor) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    let caption = descriptor.title.as_ref().map_or("", |t| t.text.as_str());
    let x = &descriptor.x_axis;
    let y = &descriptor.y_axis;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(caption, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x.min..x.max, y.min..y.max)
        .context("Failed to build chart")?;

    // Only integer ticks carry a column label
    let tick_count = ((x.max - x.min) / x.interval) as usize + 1;
    chart
        .configure_mesh()
        .x_labels(tick_count)
        .x_label_formatter(&|v| {
            if (v - v.round()).abs() > 1e-6 {
                String::new()
            } else {
                x.label_for(*v).to_string()
            }
        })
        .draw()
        .context("Failed to draw mesh")?;

    // Series order is draw order: box plot below, scatter on top
    for series in &descriptor.series {
        match series {
            Series::Boxplot(b) => draw_boxplot(&mut chart, b)?,
            Series::Scatter(s) => draw_scatter(&mut chart, s)?,
        }
    }

    if descriptor.legend.show {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::LowerRight)
            .draw()
            .context("Failed to draw legend")?;
    }

    root.present().context("Failed to present drawing")?;
    Ok(())
}

fn render_png(descriptor: &ChartDescriptor, width: u32, height: u32) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_chart(&root, descriptor)?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

fn render_svg(descriptor: &ChartDescriptor, width: u32, height: u32) -> Result<Vec<u8>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_chart(&root, descriptor)?;
    }
    Ok(svg.into_bytes())
}

/// Draw a chart to PNG or SVG bytes
pub fn render_descriptor(descriptor: &ChartDescriptor, options: &RenderOptions) -> Result<Vec<u8>> {
    match options.format {
        OutputFormat::Png => render_png(descriptor, options.width, options.height),
        OutputFormat::Svg => render_svg(descriptor, options.width, options.height),
    }
}

// =============================================================================
// Canvas surface
// =============================================================================

/// Render surface that re-draws the chart after every accepted update
pub struct CanvasSurface {
    options: RenderOptions,
    state: Option<ChartDescriptor>,
    frame: Option<Vec<u8>>,
}

impl CanvasSurface {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            state: None,
            frame: None,
        }
    }

    /// The most recent rendered image
    pub fn frame(&self) -> Option<&[u8]> {
        self.frame.as_deref()
    }

    // State only changes once the new frame has been drawn
    fn redraw(&mut self, next: ChartDescriptor) -> Result<(), SurfaceError> {
        let bytes = render_descriptor(&next, &self.options)
            .map_err(|e| SurfaceError::Rejected(format!("{:#}", e)))?;
        debug!(bytes = bytes.len(), generation = next.generation, "redrew canvas");
        self.state = Some(next);
        self.frame = Some(bytes);
        Ok(())
    }
}

impl RenderSurface for CanvasSurface {
    fn apply_descriptor(&mut self, descriptor: &ChartDescriptor, _mode: ApplyMode) -> Result<(), SurfaceError> {
        self.redraw(descriptor.clone())
    }

    fn current_state(&self) -> Option<ChartDescriptor> {
        self.state.clone()
    }

    fn patch_series(&mut self, series_index: usize, patch: &SeriesPatch) -> Result<(), SurfaceError> {
        let mut next = self.state.clone().ok_or(SurfaceError::Empty)?;
        let series = next
            .series
            .get_mut(series_index)
            .ok_or(SurfaceError::SeriesOutOfRange(series_index))?;
        if !patch.apply_to(series) {
            return Err(SurfaceError::NotScatter(series_index));
        }
        self.redraw(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::build_chart;
    use crate::data::{CellValue, RowData, WorksheetData};
    use crate::sanitize::SanitizeRules;

    fn make_chart() -> ChartDescriptor {
        let columns = vec!["A".to_string(), "B".to_string()];
        let rows: Vec<RowData> = [[1.0, 2.0], [3.0, 9.0], [5.0, 4.0], [40.0, 5.0]]
            .iter()
            .map(|vals| {
                columns
                    .iter()
                    .cloned()
                    .zip(vals.iter().map(|&v| CellValue::from(v)))
                    .collect()
            })
            .collect();
        let ws = WorksheetData {
            header_rows: vec![columns.clone()],
            columns,
            rows,
            header_row_count: 1,
            ..Default::default()
        };
        build_chart(&ws, &SanitizeRules::default()).unwrap()
    }

    fn small_options(format: OutputFormat) -> RenderOptions {
        RenderOptions { width: 320, height: 240, format }
    }

    #[test]
    fn test_render_png() {
        let bytes = render_descriptor(&make_chart(), &small_options(OutputFormat::Png)).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_render_svg() {
        let bytes = render_descriptor(&make_chart(), &small_options(OutputFormat::Svg)).unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_boxplot_geometry() {
        let g = compute_boxplot_geometry(1.0, 0.6, [0.0, 1.0, 2.0, 3.0, 4.0], &[9.0]);
        assert_eq!(g.box_tl, (0.7, 3.0));
        assert_eq!(g.box_br, (1.3, 1.0));
        assert_eq!(g.median_line[0].1, 2.0);
        assert_eq!(g.outlier_points, vec![(1.0, 9.0)]);
    }

    #[test]
    fn test_canvas_surface_redraws() {
        let mut surface = CanvasSurface::new(small_options(OutputFormat::Svg));
        assert!(surface.frame().is_none());

        surface.apply_descriptor(&make_chart(), ApplyMode::Animated).unwrap();
        let first = surface.frame().unwrap().to_vec();

        let patch = SeriesPatch { name: Some("renamed".into()), data: None };
        surface.patch_series(1, &patch).unwrap();
        assert_ne!(surface.frame().unwrap(), first.as_slice());
        assert_eq!(surface.current_state().unwrap().series[1].name(), "renamed");
    }

    #[test]
    fn test_canvas_surface_rejects_boxplot_patch() {
        let mut surface = CanvasSurface::new(small_options(OutputFormat::Svg));
        surface.apply_descriptor(&make_chart(), ApplyMode::Animated).unwrap();
        let before = surface.current_state();

        assert_eq!(
            surface.patch_series(0, &SeriesPatch::default()),
            Err(SurfaceError::NotScatter(0))
        );
        assert_eq!(surface.current_state(), before);
    }
}
