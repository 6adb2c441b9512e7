//! The two end-to-end runs: suburb-level and LGA-level.
//!
//! Each run executes its wrangling stages in order (every stage reads the
//! previous stage's workbook from the datasets directory), then renders its
//! fixed set of charts and correlation series.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::correlation::correlate;
use crate::config::{PipelineConfig, YearSpan};
use crate::output::RunSummary;
use crate::plots::{
    BoxPlot, BubblePlot, LineGraph, ScatterPlot, box_plots, bubble_plots, line_graph,
    scatter_plots,
};
use crate::wrangle::types::{
    CRIME_RATE_PER_1000, INCIDENTS, MEDIAN_HOUSE_PRICE, MEDIAN_PRICE, NUM_SALES, RATE_PER_100K,
};
use crate::wrangle::{lga, suburb};

pub const SUBURB_INCIDENTS: &str = "Incidents_Per_Suburb_Year_Separated.xlsx";
pub const SUBURB_PRICES_AND_INCIDENTS: &str = "Incidents_and_Prices_Per_Suburb_Year_Separated.xlsx";
pub const SUBURB_CRIME_RATES: &str = "Crime_Per_Suburb_Per_Year.xlsx";
pub const LGA_CRIME: &str = "Crime_Per_Local_Area_Year_Separated.xlsx";
pub const LGA_PROPERTY: &str = "Property_Per_Local_Area_Year_Separated.xlsx";
pub const LGA_CRIME_AND_PROPERTY: &str = "Local_Crime_And_Property_Per_Year.xlsx";

const MEDIAN_PRICE_LABEL: &str = "Median House Price (AUS$)";
const INCIDENTS_LABEL: &str = "Total Incidents Recorded";
const SALES_LABEL: &str = "Frequency of House Sales";

/// Which workbook a chart or correlation reads from.
#[derive(Debug, Clone, Copy)]
enum Source {
    PricesAndIncidents,
    CrimeRates,
}

const SUBURB_SCATTERS: [(Source, ScatterPlot<'static>); 2] = [
    (
        Source::PricesAndIncidents,
        ScatterPlot {
            x_column: MEDIAN_HOUSE_PRICE,
            y_column: INCIDENTS,
            x_label: MEDIAN_PRICE_LABEL,
            y_label: INCIDENTS_LABEL,
            title: "Median House Prices vs Total Crime Incidents for Victorian Suburbs in ",
            name: "Total Incidents Scatter Plot ",
        },
    ),
    (
        Source::CrimeRates,
        ScatterPlot {
            x_column: MEDIAN_HOUSE_PRICE,
            y_column: CRIME_RATE_PER_1000,
            x_label: MEDIAN_PRICE_LABEL,
            y_label: "Crime Rate Per 1000 People",
            title: "Median House Prices vs Crime Rates for Victorian Suburbs in ",
            name: "Crime Rates Scatter Plot v3 ",
        },
    ),
];

const SUBURB_BOXES: [(Source, BoxPlot<'static>); 3] = [
    (
        Source::CrimeRates,
        BoxPlot {
            column: MEDIAN_HOUSE_PRICE,
            label: MEDIAN_PRICE_LABEL,
            title: "Median House Prices for Victorian Suburbs in ",
            name: "Median House Price Box Plot ",
        },
    ),
    (
        Source::CrimeRates,
        BoxPlot {
            column: CRIME_RATE_PER_1000,
            label: "Crime Rate Per 1000 People",
            title: "Crime Rate Per 1000 People for Victorian Suburbs in ",
            name: "Crime Rate Per 1000 Box Plot ",
        },
    ),
    (
        Source::PricesAndIncidents,
        BoxPlot {
            column: INCIDENTS,
            label: INCIDENTS_LABEL,
            title: "Total Crime Incidents for Victorian Suburbs in ",
            name: "Total Incidents Box Plot ",
        },
    ),
];

/// `(source, x, y, file name)` of each suburb correlation series.
const SUBURB_CORRELATIONS: [(Source, &str, &str, &str); 2] = [
    (
        Source::PricesAndIncidents,
        MEDIAN_HOUSE_PRICE,
        INCIDENTS,
        "Pearson Correlation of Median House Price and Incidents.csv",
    ),
    (
        Source::CrimeRates,
        MEDIAN_HOUSE_PRICE,
        CRIME_RATE_PER_1000,
        "Pearson Correlation of Median House Price and Crime Rate Per 1000.csv",
    ),
];

const LGA_SCATTERS: [ScatterPlot<'static>; 4] = [
    ScatterPlot {
        x_column: NUM_SALES,
        y_column: INCIDENTS,
        x_label: SALES_LABEL,
        y_label: INCIDENTS_LABEL,
        title: "Frequency of House Sales vs Total Crime Incidents for Victorian LGAs in ",
        name: "LGA Total Incidents Scatter Plot ",
    },
    ScatterPlot {
        x_column: NUM_SALES,
        y_column: RATE_PER_100K,
        x_label: SALES_LABEL,
        y_label: "Crime Rate Per 100000 People",
        title: "Frequency of House Sales vs Crime Rates for Victorian LGAs in ",
        name: "LGA Crime Rates Scatter Plot ",
    },
    ScatterPlot {
        x_column: MEDIAN_PRICE,
        y_column: INCIDENTS,
        x_label: MEDIAN_PRICE_LABEL,
        y_label: INCIDENTS_LABEL,
        title: "Median House Prices vs Total Crime Incidents for Victorian LGAs in ",
        name: "LGA Median House Prices vs Total Incidents Scatter Plot ",
    },
    ScatterPlot {
        x_column: MEDIAN_PRICE,
        y_column: RATE_PER_100K,
        x_label: MEDIAN_PRICE_LABEL,
        y_label: "Crime Rate Per 100 000 People",
        title: "Median House Prices vs Crime Rates for Victorian LGAs in ",
        name: "LGA Median House Prices vs Crime Rates Scatter Plot ",
    },
];

const LGA_BOXES: [BoxPlot<'static>; 4] = [
    BoxPlot {
        column: NUM_SALES,
        label: SALES_LABEL,
        title: "Frequency of House Sales for Victorian LGAs in ",
        name: "LGA House Sales Box Plot ",
    },
    BoxPlot {
        column: RATE_PER_100K,
        label: "Crime Rate Per 100,000 People",
        title: "Crime Rates for Victorian LGAs in ",
        name: "LGA Crime Rate Per 100000 Box Plot ",
    },
    BoxPlot {
        column: INCIDENTS,
        label: INCIDENTS_LABEL,
        title: "Total Crime Incidents for Victorian LGAs in ",
        name: "LGA Total Incidents Box Plot ",
    },
    BoxPlot {
        column: MEDIAN_PRICE,
        label: MEDIAN_PRICE_LABEL,
        title: "Median House Prices for Victorian LGAs in ",
        name: "LGA Median House Price Box Plot ",
    },
];

const LGA_BUBBLES: BubblePlot<'static> = BubblePlot {
    x_column: NUM_SALES,
    y_column: INCIDENTS,
    size_column: MEDIAN_PRICE,
    x_label: "Number of House Sales",
    y_label: "Number of Crime Incidents",
    name: "Bubble Plot ",
};

const LGA_LINES: [LineGraph<'static>; 4] = [
    LineGraph {
        column: INCIDENTS,
        title: "Line Graph of Incidents Recorded",
        x_label: "Years",
        y_label: "Incidents Recorded",
    },
    LineGraph {
        column: MEDIAN_PRICE,
        title: "Line Graph of Median House Prices",
        x_label: "Years",
        y_label: "Median House Prices",
    },
    LineGraph {
        column: NUM_SALES,
        title: "Line Graph of Frequency of House Sales",
        x_label: "Years",
        y_label: "Frequency of House Sales",
    },
    LineGraph {
        column: RATE_PER_100K,
        title: "Line Graph of Crime Rate",
        x_label: "Years",
        y_label: "Crime rate per 100,000 population",
    },
];

const LGA_CORRELATIONS: [(&str, &str, &str); 2] = [
    (
        NUM_SALES,
        INCIDENTS,
        "Pearson Correlation of Frequency of House Sales and Incidents.csv",
    ),
    (
        NUM_SALES,
        RATE_PER_100K,
        "Pearson Correlation of Frequency of House Sales and Crime Rate Per 100000.csv",
    ),
];

/// Suburb run: incident totals, price join, crime rates, then charts and
/// correlations over `config.suburb_years`.
#[tracing::instrument(skip_all, fields(datasets = %config.datasets_dir.display()))]
pub fn suburb_data_processing(config: &PipelineConfig, skip_plots: bool) -> Result<RunSummary> {
    let years = config.suburb_years;
    let incidents = config.dataset(SUBURB_INCIDENTS);
    let prices_and_incidents = config.dataset(SUBURB_PRICES_AND_INCIDENTS);
    let crime_rates = config.dataset(SUBURB_CRIME_RATES);

    suburb::total_incidents(
        &config.crime_workbook_path(),
        config.suburb_incidents_sheet,
        years,
        &incidents,
    )?;
    suburb::merge_prices_and_incidents(
        &config.dataset(&config.suburb_prices_workbook),
        &incidents,
        years,
        &prices_and_incidents,
    )?;
    suburb::crime_rates(
        &config.dataset(&config.suburb_codes_csv),
        &config.dataset(&config.suburb_populations_csv),
        &prices_and_incidents,
        years,
        config.outlier_z_threshold,
        &crime_rates,
    )?;

    let mut summary = RunSummary {
        workbooks: vec![
            incidents.clone(),
            prices_and_incidents.clone(),
            crime_rates.clone(),
        ],
        ..RunSummary::default()
    };

    let source = |s: Source| match s {
        Source::PricesAndIncidents => prices_and_incidents.as_path(),
        Source::CrimeRates => crime_rates.as_path(),
    };

    if skip_plots {
        info!("Skipping suburb charts");
    } else {
        for (s, plot) in &SUBURB_SCATTERS {
            summary
                .charts
                .extend(scatter_plots(source(*s), years, plot, &config.plots_dir)?);
        }
        for (s, plot) in &SUBURB_BOXES {
            summary
                .charts
                .extend(box_plots(source(*s), years, plot, &config.plots_dir)?);
        }
    }

    for (s, x, y, name) in SUBURB_CORRELATIONS {
        let output = config.dataset(name);
        summary
            .correlations
            .push(correlate(source(s), years, x, y, &output)?);
    }

    info!(
        workbooks = summary.workbooks.len(),
        charts = summary.charts.len(),
        "Suburb processing complete"
    );
    Ok(summary)
}

/// LGA run: crime per LGA, property summary parsing, the crime/property join,
/// then charts and correlations over `config.lga_years`.
#[tracing::instrument(skip_all, fields(datasets = %config.datasets_dir.display()))]
pub fn local_areas_data_processing(
    config: &PipelineConfig,
    skip_plots: bool,
) -> Result<RunSummary> {
    let years = config.lga_years;
    let crime = config.dataset(LGA_CRIME);
    let property = config.dataset(LGA_PROPERTY);
    let merged = config.dataset(LGA_CRIME_AND_PROPERTY);

    let crime_years = lga::local_crime(
        &config.crime_workbook_path(),
        config.lga_incidents_sheet,
        &crime,
    )?;
    info!(?crime_years, "LGA crime years available");

    lga::local_property(&config.dataset(&config.lga_property_workbook), years, &property)?;
    lga::merge_property_and_crime(&crime, &property, years, &merged)?;

    let mut summary = RunSummary {
        workbooks: vec![crime, property, merged.clone()],
        ..RunSummary::default()
    };

    if skip_plots {
        info!("Skipping LGA charts");
    } else {
        summary.charts.extend(lga_charts(&merged, years, &config.plots_dir)?);
    }

    for (x, y, name) in LGA_CORRELATIONS {
        let output = config.dataset(name);
        summary
            .correlations
            .push(correlate(&merged, years, x, y, &output)?);
    }

    info!(
        workbooks = summary.workbooks.len(),
        charts = summary.charts.len(),
        "LGA processing complete"
    );
    Ok(summary)
}

fn lga_charts(merged: &Path, years: YearSpan, plots_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut charts = Vec::new();
    for plot in &LGA_SCATTERS {
        charts.extend(scatter_plots(merged, years, plot, plots_dir)?);
    }
    for plot in &LGA_BOXES {
        charts.extend(box_plots(merged, years, plot, plots_dir)?);
    }
    charts.extend(bubble_plots(merged, years, &LGA_BUBBLES, plots_dir)?);
    for graph in &LGA_LINES {
        charts.push(line_graph(merged, years, graph, plots_dir)?);
    }
    Ok(charts)
}

/// Runs both pipelines, suburbs first.
pub fn run_all(config: &PipelineConfig, skip_plots: bool) -> Result<RunSummary> {
    let mut summary = suburb_data_processing(config, skip_plots)?;
    summary.extend(local_areas_data_processing(config, skip_plots)?);
    Ok(summary)
}
