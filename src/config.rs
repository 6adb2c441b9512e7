//! Run configuration: where the source datasets live, where outputs go, and
//! the handful of knobs the wrangling stages need.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// An inclusive span of calendar years, e.g. 2011–2019.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSpan {
    pub first: i32,
    pub last: i32,
}

impl YearSpan {
    pub const fn new(first: i32, last: i32) -> Self {
        Self { first, last }
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.first..=self.last
    }

    pub fn contains(&self, year: i32) -> bool {
        self.iter().contains(&year)
    }

    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pipeline settings.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "datasets_dir": "Datasets",
///   "plots_dir": "Plots",
///   "outlier_z_threshold": 3.0,
///   "suburb_years": { "first": 2011, "last": 2019 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub datasets_dir: PathBuf,
    pub plots_dir: PathBuf,

    pub crime_workbook: String,
    /// Sheet holding incidents per suburb, offence and year.
    pub suburb_incidents_sheet: usize,
    /// Sheet holding incidents and rates per LGA and year.
    pub lga_incidents_sheet: usize,

    pub suburb_prices_workbook: String,
    pub suburb_codes_csv: String,
    pub suburb_populations_csv: String,
    pub lga_property_workbook: String,

    pub outlier_z_threshold: f64,
    pub suburb_years: YearSpan,
    pub lga_years: YearSpan,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            datasets_dir: PathBuf::from("Datasets"),
            plots_dir: PathBuf::from("Plots"),
            crime_workbook: "Data_Tables_LGA_Criminal_Incidents_Year_Ending_December_2020.xlsx"
                .to_string(),
            suburb_incidents_sheet: 3,
            lga_incidents_sheet: 1,
            suburb_prices_workbook: "Suburb_House_final.xls".to_string(),
            suburb_codes_csv: "Suburb_Code_To_Name.csv".to_string(),
            suburb_populations_csv: "Suburb_Populations_2016_Census.csv".to_string(),
            lga_property_workbook: "YearlySummaryFinal.xls".to_string(),
            outlier_z_threshold: 3.0,
            suburb_years: YearSpan::new(2011, 2019),
            lga_years: YearSpan::new(2011, 2020),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Resolves a file name against the datasets directory.
    pub fn dataset(&self, name: &str) -> PathBuf {
        self.datasets_dir.join(name)
    }

    pub fn crime_workbook_path(&self) -> PathBuf {
        self.dataset(&self.crime_workbook)
    }
}
