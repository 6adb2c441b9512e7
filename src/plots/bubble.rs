use anyhow::{Context, Result};
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{chart_path, padded_range, year_columns};
use crate::analyzers::utility::max;
use crate::config::YearSpan;
use crate::sheet::YearWorkbook;

const DARK_BLUE: RGBColor = RGBColor(0, 0, 139);
/// Marker area in square pixels for the largest `size_column` value.
const MAX_BUBBLE_AREA: f64 = 2000.0;

/// One bubble plot series: `x_column` against `y_column` with marker area
/// scaled by `size_column`.
#[derive(Debug, Clone, Copy)]
pub struct BubblePlot<'a> {
    pub x_column: &'a str,
    pub y_column: &'a str,
    pub size_column: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Caption and file name stem; the year is appended.
    pub name: &'a str,
}

/// Draws a bubble plot for every year.
#[tracing::instrument(skip_all, fields(workbook = %workbook.display(), chart = plot.name))]
pub fn bubble_plots(
    workbook: &Path,
    years: YearSpan,
    plot: &BubblePlot,
    plots_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut book = YearWorkbook::open(workbook)?;
    let mut written = Vec::with_capacity(years.len());

    for year in years.iter() {
        let mut columns = year_columns(
            &mut book,
            year,
            &[plot.x_column, plot.y_column, plot.size_column],
        )?;
        let sizes = columns.pop().unwrap_or_default();
        let ys = columns.pop().unwrap_or_default();
        let xs = columns.pop().unwrap_or_default();

        let path = chart_path(plots_dir, "Bubbleplots", &format!("{}{year}", plot.name))?;
        draw_bubbles(&path, plot, year, &xs, &ys, &bubble_radii(&sizes))
            .with_context(|| format!("failed to draw {}", path.display()))?;
        debug!(year, bubbles = xs.len(), "Bubble plot drawn");
        written.push(path);
    }

    info!(charts = written.len(), "Bubble plots written");
    Ok(written)
}

/// Radius in pixels for each size so that marker area is proportional to
/// `size / max(size)`.
fn bubble_radii(sizes: &[f64]) -> Vec<i32> {
    let largest = max(sizes).filter(|m| *m > 0.0).unwrap_or(1.0);
    sizes
        .iter()
        .map(|size| {
            let area = (size / largest).max(0.0) * MAX_BUBBLE_AREA;
            ((area / PI).sqrt().round() as i32).max(1)
        })
        .collect()
}

fn draw_bubbles(
    path: &Path,
    plot: &BubblePlot,
    year: i32,
    xs: &[f64],
    ys: &[f64],
    radii: &[i32],
) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{}{year}", plot.name), ("sans-serif", 20))
        .margin(30)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(padded_range(xs), padded_range(ys))?;

    chart
        .configure_mesh()
        .x_desc(plot.x_label)
        .y_desc(plot.y_label)
        .draw()?;

    chart.draw_series(
        xs.iter()
            .zip(ys)
            .zip(radii)
            .map(|((&x, &y), &r)| Circle::new((x, y), r, DARK_BLUE.mix(0.5).filled())),
    )?;

    root.present()?;
    Ok(())
}
