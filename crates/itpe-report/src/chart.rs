use std::path::{Path, PathBuf};

use itpe_core::{ItpeError, Result};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use tracing::debug;

use crate::series::{Chart, ChartFamily, StyledSeries};
use crate::style::{Marker, Rgb};

const CHART_SIZE: (u32, u32) = (1024, 768);

/// Destination for rendered charts.
pub trait ChartSink {
    /// Called once before the first chart is written.
    fn prepare(&mut self) -> Result<()>;

    /// Persists one chart and returns where it went.
    fn write(&mut self, chart: &Chart) -> Result<PathBuf>;
}

/// Writes charts as SVG files under one plot directory.
#[derive(Debug, Clone)]
pub struct ChartWriter {
    plot_dir: PathBuf,
    size: (u32, u32),
}

impl ChartWriter {
    pub fn new(plot_dir: impl Into<PathBuf>) -> Self {
        Self {
            plot_dir: plot_dir.into(),
            size: CHART_SIZE,
        }
    }

    pub fn plot_dir(&self) -> &Path {
        &self.plot_dir
    }
}

impl ChartSink for ChartWriter {
    fn prepare(&mut self) -> Result<()> {
        for family in [ChartFamily::ByModel, ChartFamily::ByLength] {
            std::fs::create_dir_all(self.plot_dir.join(family.dir_name()))?;
        }
        Ok(())
    }

    fn write(&mut self, chart: &Chart) -> Result<PathBuf> {
        let path = self.plot_dir.join(&chart.path);
        draw(chart, &path, self.size)
            .map_err(|e| ItpeError::Chart(format!("failed to save {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Saved chart");
        Ok(path)
    }
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

/// Axis ranges covering every point, padded so single points stay visible.
fn bounds(chart: &Chart) -> ((f64, f64), (f64, f64)) {
    let points = chart.series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (f64::MAX, f64::MIN, 0.0_f64, f64::MIN);
    for (x, y) in points {
        x_min = x_min.min(*x);
        x_max = x_max.max(*x);
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }
    if x_min > x_max {
        return ((0.0, 1.0), (0.0, 1.0));
    }
    if y_max < 0.0 {
        y_max = 0.0;
    }

    let x_pad = ((x_max - x_min) * 0.05).max(0.5);
    let y_pad = ((y_max - y_min) * 0.1).max(1e-6);
    (
        (x_min - x_pad, x_max + x_pad),
        (if y_min < 0.0 { y_min - y_pad } else { 0.0 }, y_max + y_pad),
    )
}

fn draw(
    chart: &Chart,
    path: &Path,
    size: (u32, u32),
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let ((x0, x1), (y0, y1)) = bounds(chart);
    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()?;

    for series in &chart.series {
        let color = rgb(series.line.color);
        let style = color.stroke_width(series.line.width);

        let anno = match series.line.dash.pattern() {
            None => ctx.draw_series(LineSeries::new(series.points.clone(), style))?,
            Some((dash, gap)) => ctx.draw_series(DashedLineSeries::new(
                series.points.clone(),
                dash,
                gap,
                style,
            ))?,
        };
        anno.label(series.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));

        draw_markers(&mut ctx, series)?;
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_markers<DB: DrawingBackend>(
    ctx: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    series: &StyledSeries,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let color = rgb(series.glyph.color);
    let size = series.glyph.size as i32;
    let points = series.points.iter().copied();

    match series.glyph.marker {
        Marker::Circle => {
            ctx.draw_series(points.map(|p| Circle::new(p, size, color.filled())))?;
        }
        Marker::Ring => {
            ctx.draw_series(points.map(|p| Circle::new(p, size, color.stroke_width(1))))?;
        }
        Marker::Triangle => {
            ctx.draw_series(points.map(|p| TriangleMarker::new(p, size, color.filled())))?;
        }
        Marker::Cross => {
            ctx.draw_series(points.map(|p| Cross::new(p, size, color.stroke_width(2))))?;
        }
    }
    Ok(())
}
