//! Chart rendering. Every chart reads its series from a per-year workbook and
//! is written as an SVG file under a fixed subdirectory of the plots directory.

pub mod boxplot;
pub mod bubble;
pub mod line;
pub mod scatter;

use anyhow::{Context, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::analyzers::utility::{max, min};
use crate::sheet::YearWorkbook;

pub use boxplot::{BoxPlot, box_plots};
pub use bubble::{BubblePlot, bubble_plots};
pub use line::{LineGraph, line_graph};
pub use scatter::{ScatterPlot, scatter_plots};

/// Creates `plots_dir/subdir` and returns the path of `<name>.svg` inside it.
fn chart_path(plots_dir: &Path, subdir: &str, name: &str) -> Result<PathBuf> {
    let dir = plots_dir.join(subdir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir.join(format!("{name}.svg")))
}

/// Reads the named columns of one year's sheet, one vector per column. Rows
/// missing any of the values are left out of every column.
fn year_columns(book: &mut YearWorkbook, year: i32, names: &[&str]) -> Result<Vec<Vec<f64>>> {
    let rows = book.table(year)?.numeric_rows(names)?;

    let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
    for row in rows {
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }
    Ok(columns)
}

/// Axis range covering `values` with a 5% margin on each side.
fn padded_range(values: &[f64]) -> Range<f64> {
    let (Some(lo), Some(hi)) = (min(values), max(values)) else {
        return 0.0..1.0;
    };
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad)..(hi + pad)
}
