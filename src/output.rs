//! Output persistence: per-year workbooks, correlation CSVs and the run summary.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::correlation::YearCorrelation;
use crate::wrangle::types::{Cell, Record};

/// Writes one sheet per year, named by the year, each with a bold header row
/// followed by the records.
///
/// Years with no records still get a sheet carrying only the header.
pub fn write_year_workbook<R: Record>(
    path: &Path,
    years: &BTreeMap<i32, Vec<R>>,
) -> Result<()> {
    ensure_parent(path)?;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for (year, records) in years {
        let sheet = workbook.add_worksheet();
        sheet.set_name(year.to_string())?;

        for (col, header) in R::HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }

        for (i, record) in records.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, cell) in record.to_cells().into_iter().enumerate() {
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(row, col as u16, s)?;
                    }
                    Cell::Number(n) => {
                        sheet.write_number(row, col as u16, n)?;
                    }
                    Cell::Blank => {}
                }
            }
        }

        debug!(year, rows = records.len(), "Sheet written");
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;

    info!(path = %path.display(), sheets = years.len(), "Workbook written");
    Ok(())
}

/// Writes `year,coefficient` rows without a header. An undefined coefficient
/// leaves the second field empty.
pub fn write_correlations(path: &Path, correlations: &[YearCorrelation]) -> Result<()> {
    ensure_parent(path)?;

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    for c in correlations {
        writer.serialize((c.year, c.coefficient))?;
    }
    writer.flush()?;

    info!(path = %path.display(), years = correlations.len(), "Correlations written");
    Ok(())
}

/// A correlation series as reported in the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationSummary {
    pub x: String,
    pub y: String,
    pub file: PathBuf,
    pub years: Vec<CorrelationYear>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationYear {
    pub year: i32,
    pub coefficient: Option<f64>,
    pub strength: Option<String>,
}

/// Everything one run produced, written as `run_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub workbooks: Vec<PathBuf>,
    pub charts: Vec<PathBuf>,
    pub correlations: Vec<CorrelationSummary>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            generated_at: Utc::now(),
            workbooks: Vec::new(),
            charts: Vec::new(),
            correlations: Vec::new(),
        }
    }
}

impl RunSummary {
    pub fn extend(&mut self, other: RunSummary) {
        self.workbooks.extend(other.workbooks);
        self.charts.extend(other.charts);
        self.correlations.extend(other.correlations);
    }
}

/// Writes the summary as pretty-printed JSON.
pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    ensure_parent(path)?;
    let body = serde_json::to_vec_pretty(summary)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;

    info!(
        path = %path.display(),
        workbooks = summary.workbooks.len(),
        charts = summary.charts.len(),
        correlations = summary.correlations.len(),
        "Run summary written"
    );
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::YearWorkbook;
    use crate::wrangle::types::{LgaProperty, SuburbIncidents};
    use std::fs;

    #[test]
    fn test_year_workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incidents.xlsx");

        let mut years = BTreeMap::new();
        years.insert(
            2011,
            vec![
                SuburbIncidents {
                    suburb: "Abbotsford".to_string(),
                    incidents: 120,
                },
                SuburbIncidents {
                    suburb: "Aberfeldie".to_string(),
                    incidents: 45,
                },
            ],
        );
        years.insert(2012, vec![]);

        write_year_workbook(&path, &years).unwrap();

        let mut book = YearWorkbook::open(&path).unwrap();
        assert_eq!(book.years(), vec![2011, 2012]);
        assert_eq!(book.records::<SuburbIncidents>(2011).unwrap(), years[&2011]);
        assert!(book.records::<SuburbIncidents>(2012).unwrap().is_empty());
    }

    #[test]
    fn test_blank_cells_read_back_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("property.xlsx");

        let row = LgaProperty {
            lga: "Alpine Shire".to_string(),
            num_sales: None,
            median_price: Some(310000.0),
            mean_price: Some(330000.0),
        };
        let years = BTreeMap::from([(2015, vec![row.clone()])]);

        write_year_workbook(&path, &years).unwrap();

        let mut book = YearWorkbook::open(&path).unwrap();
        assert_eq!(book.records::<LgaProperty>(2015).unwrap(), vec![row]);
    }

    #[test]
    fn test_correlations_have_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corr.csv");

        write_correlations(
            &path,
            &[
                YearCorrelation {
                    year: 2011,
                    coefficient: Some(0.5),
                },
                YearCorrelation {
                    year: 2012,
                    coefficient: None,
                },
            ],
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["2011,0.5", "2012,"]);
    }

    #[test]
    fn test_run_summary_is_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run_summary.json");

        let summary = RunSummary {
            workbooks: vec![PathBuf::from("a.xlsx")],
            ..Default::default()
        };
        write_run_summary(&path, &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["workbooks"][0], "a.xlsx");
        assert!(value["generated_at"].is_string());
    }
}
