use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::strength::strength;
use crate::analyzers::utility::pearson;
use crate::config::YearSpan;
use crate::output::{CorrelationSummary, CorrelationYear, write_correlations};
use crate::sheet::YearWorkbook;

/// Pearson coefficient between two columns for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearCorrelation {
    pub year: i32,
    pub coefficient: Option<f64>,
}

/// Correlates `x` with `y` on every year sheet of `workbook`.
///
/// Rows missing either value are left out of that year's coefficient.
#[tracing::instrument(skip(workbook), fields(workbook = %workbook.display()))]
pub fn pearson_by_year(
    workbook: &Path,
    years: YearSpan,
    x: &str,
    y: &str,
) -> Result<Vec<YearCorrelation>> {
    let mut book = YearWorkbook::open(workbook)?;
    let mut correlations = Vec::with_capacity(years.len());

    for year in years.iter() {
        let rows = book.table(year)?.numeric_rows(&[x, y])?;
        let (xs, ys): (Vec<f64>, Vec<f64>) = rows.iter().map(|r| (r[0], r[1])).unzip();
        let coefficient = pearson(&xs, &ys);

        debug!(year, pairs = xs.len(), ?coefficient, "Correlation computed");
        correlations.push(YearCorrelation { year, coefficient });
    }

    Ok(correlations)
}

/// Runs [`pearson_by_year`], writes the CSV to `output` and returns the summary entry.
pub fn correlate(
    workbook: &Path,
    years: YearSpan,
    x: &str,
    y: &str,
    output: &Path,
) -> Result<CorrelationSummary> {
    let correlations = pearson_by_year(workbook, years, x, y)?;
    write_correlations(output, &correlations)?;

    let defined = correlations
        .iter()
        .filter(|c| c.coefficient.is_some())
        .count();
    info!(x, y, years = correlations.len(), defined, "Correlation series complete");

    Ok(CorrelationSummary {
        x: x.to_string(),
        y: y.to_string(),
        file: output.to_path_buf(),
        years: correlations
            .into_iter()
            .map(|c| CorrelationYear {
                year: c.year,
                coefficient: c.coefficient,
                strength: c.coefficient.map(strength),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_year_workbook;
    use crate::wrangle::types::SuburbPriceIncidents;
    use std::collections::BTreeMap;

    fn row(price: i64, incidents: u64) -> SuburbPriceIncidents {
        SuburbPriceIncidents {
            suburb: format!("Suburb {price}"),
            median_house_price: price,
            incidents,
        }
    }

    #[test]
    fn test_pearson_by_year_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("merged.xlsx");
        let years = BTreeMap::from([
            (2011, vec![row(100, 10), row(200, 20), row(300, 30)]),
            (2012, vec![row(100, 30), row(200, 20), row(300, 10)]),
            (2013, vec![row(100, 5)]),
        ]);
        write_year_workbook(&book, &years).unwrap();

        let output = dir.path().join("corr.csv");
        let summary = correlate(
            &book,
            YearSpan::new(2011, 2013),
            "Median House Price",
            "Incidents Recorded",
            &output,
        )
        .unwrap();

        let coefficients: Vec<_> = summary.years.iter().map(|y| y.coefficient).collect();
        assert!((coefficients[0].unwrap() - 1.0).abs() < 1e-9);
        assert!((coefficients[1].unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(coefficients[2], None);
        assert_eq!(summary.years[0].strength.as_deref(), Some("strong"));
        assert!(output.exists());
    }

    #[test]
    fn test_missing_year_sheet_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("merged.xlsx");
        let years = BTreeMap::from([(2011, vec![row(100, 10), row(200, 20)])]);
        write_year_workbook(&book, &years).unwrap();

        let err = pearson_by_year(
            &book,
            YearSpan::new(2011, 2012),
            "Median House Price",
            "Incidents Recorded",
        )
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("no sheet for 2012"));
        assert!(message.contains("(has [2011])"));
    }
}
