use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{chart_path, padded_range, year_columns};
use crate::analyzers::utility::{linear_fit, max, min};
use crate::config::YearSpan;
use crate::sheet::YearWorkbook;

/// One scatter plot series: `x_column` against `y_column`, one chart per year.
#[derive(Debug, Clone, Copy)]
pub struct ScatterPlot<'a> {
    pub x_column: &'a str,
    pub y_column: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Chart caption; the year is appended.
    pub title: &'a str,
    /// File name stem; the year is appended.
    pub name: &'a str,
}

/// Draws a scatter plot with a red least-squares trendline for every year.
///
/// All years share the x-axis `0..max(x)` so the charts can be compared side
/// by side.
#[tracing::instrument(skip_all, fields(workbook = %workbook.display(), chart = plot.name))]
pub fn scatter_plots(
    workbook: &Path,
    years: YearSpan,
    plot: &ScatterPlot,
    plots_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut book = YearWorkbook::open(workbook)?;

    let mut series = Vec::with_capacity(years.len());
    for year in years.iter() {
        let mut columns = year_columns(&mut book, year, &[plot.x_column, plot.y_column])?;
        let ys = columns.pop().unwrap_or_default();
        let xs = columns.pop().unwrap_or_default();
        series.push((year, xs, ys));
    }

    let x_limit = shared_x_limit(series.iter().map(|(_, xs, _)| xs.as_slice()));

    let mut written = Vec::with_capacity(series.len());
    for (year, xs, ys) in &series {
        let path = chart_path(plots_dir, "Scatterplots", &format!("{}{year}", plot.name))?;
        draw_scatter(&path, plot, *year, x_limit, xs, ys)
            .with_context(|| format!("failed to draw {}", path.display()))?;
        debug!(year, points = xs.len(), "Scatter plot drawn");
        written.push(path);
    }

    info!(charts = written.len(), x_limit, "Scatter plots written");
    Ok(written)
}

/// Upper x-axis limit shared by every year: the largest x across all years,
/// or 1.0 when no x is positive.
fn shared_x_limit<'a>(years: impl IntoIterator<Item = &'a [f64]>) -> f64 {
    let limit = years.into_iter().filter_map(max).fold(0.0, f64::max);
    if limit > 0.0 { limit } else { 1.0 }
}

fn draw_scatter(
    path: &Path,
    plot: &ScatterPlot,
    year: i32,
    x_limit: f64,
    xs: &[f64],
    ys: &[f64],
) -> Result<()> {
    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{}{year}", plot.title), ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_limit, padded_range(ys))?;

    chart
        .configure_mesh()
        .x_desc(plot.x_label)
        .y_desc(plot.y_label)
        .draw()?;

    chart.draw_series(
        xs.iter()
            .zip(ys)
            .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    match (linear_fit(xs, ys), min(xs), max(xs)) {
        (Some((slope, intercept)), Some(lo), Some(hi)) => {
            let line = [lo, hi].map(|x| (x, slope * x + intercept));
            chart.draw_series(LineSeries::new(line, RED.stroke_width(2)))?;
        }
        _ => warn!(year, points = xs.len(), "Not enough spread for a trendline"),
    }

    root.present()?;
    Ok(())
}
