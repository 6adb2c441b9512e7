use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{chart_path, padded_range};
use crate::analyzers::utility::mean;
use crate::config::YearSpan;
use crate::sheet::YearWorkbook;

/// The yearly mean of one column drawn as a single line.
#[derive(Debug, Clone, Copy)]
pub struct LineGraph<'a> {
    pub column: &'a str,
    /// Caption and file name stem.
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
}

/// Averages `graph.column` on every year sheet and draws the means over the
/// span. Years with no values leave a gap in the series.
#[tracing::instrument(skip_all, fields(workbook = %workbook.display(), chart = graph.title))]
pub fn line_graph(
    workbook: &Path,
    years: YearSpan,
    graph: &LineGraph,
    plots_dir: &Path,
) -> Result<PathBuf> {
    let mut book = YearWorkbook::open(workbook)?;

    let mut means = Vec::with_capacity(years.len());
    for year in years.iter() {
        let values = book.table(year)?.numbers(graph.column)?;
        if values.is_empty() {
            warn!(year, column = graph.column, "No values to average");
            continue;
        }
        means.push((year, mean(&values)));
    }

    let path = chart_path(plots_dir, "Linegraphs", graph.title)?;
    draw_line(&path, graph, years, &means)
        .with_context(|| format!("failed to draw {}", path.display()))?;

    info!(points = means.len(), path = %path.display(), "Line graph written");
    Ok(path)
}

fn draw_line(path: &Path, graph: &LineGraph, years: YearSpan, means: &[(i32, f64)]) -> Result<()> {
    let values: Vec<f64> = means.iter().map(|(_, m)| *m).collect();

    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(graph.title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(years.first..years.last + 1, padded_range(&values))?;

    chart
        .configure_mesh()
        .x_labels(years.len())
        .x_desc(graph.x_label)
        .y_desc(graph.y_label)
        .draw()?;

    for run in contiguous_runs(means) {
        chart.draw_series(LineSeries::new(run.iter().copied(), RED.stroke_width(2)))?;
    }
    chart.draw_series(
        means
            .iter()
            .map(|&(year, m)| Circle::new((year, m), 4, RED.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Splits yearly points into runs of consecutive years so that a missing
/// year breaks the line instead of being bridged.
fn contiguous_runs(points: &[(i32, f64)]) -> Vec<&[(i32, f64)]> {
    points
        .chunk_by(|(a, _), (b, _)| b - a == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_year_workbook;
    use crate::wrangle::types::LgaCrime;
    use std::collections::BTreeMap;

    fn lga(name: &str, incidents: u64) -> LgaCrime {
        LgaCrime {
            lga: name.to_string(),
            incidents,
            rate_per_100k: incidents as f64 * 10.0,
        }
    }

    #[test]
    fn test_line_graph_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("crime.xlsx");
        let years = BTreeMap::from([
            (2011, vec![lga("Alpine", 100), lga("Yarra", 300)]),
            (2012, vec![lga("Alpine", 150), lga("Yarra", 350)]),
            (2013, vec![]),
        ]);
        write_year_workbook(&book, &years).unwrap();

        let graph = LineGraph {
            column: "Incidents Recorded",
            title: "Line Graph of Incidents Recorded",
            x_label: "Years",
            y_label: "Incidents Recorded",
        };
        let plots = dir.path().join("Plots");
        let path = line_graph(&book, YearSpan::new(2011, 2013), &graph, &plots).unwrap();

        assert_eq!(
            path,
            plots.join("Linegraphs").join("Line Graph of Incidents Recorded.svg")
        );
        assert!(path.exists());
    }

    #[test]
    fn test_contiguous_runs_split_at_missing_years() {
        let points = [(2011, 1.0), (2012, 2.0), (2014, 4.0), (2015, 5.0), (2017, 7.0)];

        let runs = contiguous_runs(&points);

        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], &[(2011, 1.0), (2012, 2.0)]);
        assert_eq!(runs[1], &[(2014, 4.0), (2015, 5.0)]);
        assert_eq!(runs[2], &[(2017, 7.0)]);
        assert!(contiguous_runs(&[]).is_empty());
    }
}
