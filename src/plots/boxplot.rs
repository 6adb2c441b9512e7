use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{chart_path, padded_range};
use crate::analyzers::utility::percentile;
use crate::config::YearSpan;
use crate::sheet::YearWorkbook;

/// One box plot series: the distribution of `column`, one chart per year.
#[derive(Debug, Clone, Copy)]
pub struct BoxPlot<'a> {
    pub column: &'a str,
    /// Tick label under the box, also used as the value axis description.
    pub label: &'a str,
    /// Chart caption; the year is appended.
    pub title: &'a str,
    /// File name stem; the year is appended.
    pub name: &'a str,
}

/// Draws a box plot for every year. Whiskers reach the furthest values within
/// 1.5 IQR of the quartiles and values beyond them are marked as outliers.
///
/// Years with no values are skipped with a warning.
#[tracing::instrument(skip_all, fields(workbook = %workbook.display(), chart = plot.name))]
pub fn box_plots(
    workbook: &Path,
    years: YearSpan,
    plot: &BoxPlot,
    plots_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut book = YearWorkbook::open(workbook)?;
    let mut written = Vec::with_capacity(years.len());

    for year in years.iter() {
        let values = book.table(year)?.numbers(plot.column)?;
        if values.is_empty() {
            warn!(year, column = plot.column, "No values to plot");
            continue;
        }

        let path = chart_path(plots_dir, "Boxplots", &format!("{}{year}", plot.name))?;
        let outliers = draw_box(&path, plot, year, &values)
            .with_context(|| format!("failed to draw {}", path.display()))?;
        debug!(year, values = values.len(), outliers, "Box plot drawn");
        written.push(path);
    }

    info!(charts = written.len(), "Box plots written");
    Ok(written)
}

/// Box and whisker positions for one distribution.
///
/// Whiskers end at the most extreme values still within 1.5 IQR of the
/// quartiles, so both ends are always actual data points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoxStats {
    q1: f64,
    median: f64,
    q3: f64,
    low: f64,
    high: f64,
}

fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 25.0)?;
    let median = percentile(&sorted, 50.0)?;
    let q3 = percentile(&sorted, 75.0)?;
    let reach = 1.5 * (q3 - q1);

    let low = sorted.iter().copied().find(|&v| v >= q1 - reach)?;
    let high = sorted.iter().rev().copied().find(|&v| v <= q3 + reach)?;

    Some(BoxStats {
        q1,
        median,
        q3,
        low,
        high,
    })
}

/// Values beyond the whisker ends.
fn outliers(values: &[f64], stats: &BoxStats) -> Vec<f64> {
    values
        .iter()
        .copied()
        .filter(|&v| v < stats.low || v > stats.high)
        .collect()
}

const CENTER: f64 = 0.5;
const HALF_BOX: f64 = 0.15;
const HALF_CAP: f64 = 0.08;

/// Draws one chart and returns how many outliers it marked.
fn draw_box(path: &Path, plot: &BoxPlot, year: i32, values: &[f64]) -> Result<usize> {
    let stats = box_stats(values).ok_or_else(|| anyhow!("no values for {year}"))?;
    let outliers = outliers(values, &stats);

    let root = SVGBackend::new(path, (600, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{}{year}", plot.title), ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..1.0, padded_range(values))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(1)
        .x_label_formatter(&|_| String::new())
        .x_desc(plot.label)
        .y_desc(plot.label)
        .draw()?;

    chart.draw_series(std::iter::once(Rectangle::new(
        [(CENTER - HALF_BOX, stats.q1), (CENTER + HALF_BOX, stats.q3)],
        BLUE.stroke_width(1),
    )))?;

    let horizontal = |y: f64, half: f64| vec![(CENTER - half, y), (CENTER + half, y)];
    let lines = [
        horizontal(stats.median, HALF_BOX),
        vec![(CENTER, stats.q3), (CENTER, stats.high)],
        horizontal(stats.high, HALF_CAP),
        vec![(CENTER, stats.q1), (CENTER, stats.low)],
        horizontal(stats.low, HALF_CAP),
    ];
    chart.draw_series(lines.into_iter().enumerate().map(|(i, points)| {
        let color = if i == 0 { RED } else { BLACK };
        PathElement::new(points, color.stroke_width(1))
    }))?;

    chart.draw_series(
        outliers
            .iter()
            .map(|&v| Circle::new((CENTER, v), 3, BLACK.stroke_width(1))),
    )?;

    root.present()?;
    Ok(outliers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_year_workbook;
    use crate::wrangle::types::SuburbIncidents;
    use std::collections::BTreeMap;

    fn row(suburb: &str, incidents: u64) -> SuburbIncidents {
        SuburbIncidents {
            suburb: suburb.to_string(),
            incidents,
        }
    }

    #[test]
    fn test_outliers_beyond_whiskers() {
        let values = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 500.0];
        let stats = box_stats(&values).unwrap();

        assert_eq!(outliers(&values, &stats), vec![500.0]);
        assert_eq!(stats.high, 15.0);
    }

    #[test]
    fn test_whiskers_end_on_data_points() {
        // Fences sit at 6.5 and 16.5; neither is a value in the data.
        let values = [14.0, 0.0, 12.0, 10.0, 13.0, 11.0];
        let stats = box_stats(&values).unwrap();

        assert_eq!(stats.q1, 10.25);
        assert_eq!(stats.median, 11.5);
        assert_eq!(stats.q3, 12.75);
        assert_eq!(stats.low, 10.0);
        assert_eq!(stats.high, 14.0);
        assert_eq!(outliers(&values, &stats), vec![0.0]);
    }

    #[test]
    fn test_box_stats_empty() {
        assert_eq!(box_stats(&[]), None);
    }

    #[test]
    fn test_box_plots_skip_empty_years() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("incidents.xlsx");
        let years = BTreeMap::from([
            (2011, vec![row("Abbotsford", 120), row("Carlton", 300), row("Kew", 90)]),
            (2012, vec![]),
        ]);
        write_year_workbook(&book, &years).unwrap();

        let plot = BoxPlot {
            column: "Incidents Recorded",
            label: "Total Incidents Recorded",
            title: "Total Crime Incidents in ",
            name: "Box ",
        };
        let plots = dir.path().join("Plots");
        let written = box_plots(&book, YearSpan::new(2011, 2012), &plot, &plots).unwrap();

        assert_eq!(written, vec![plots.join("Boxplots").join("Box 2011.svg")]);
        assert!(written[0].exists());
    }
}
