//! Suburb-level wrangling: incident totals, the price join and crime rates.

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, Trim};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

use crate::analyzers::utility::retain_within_z;
use crate::cleanse::{census_code, census_suburb_key, crime_suburb_key, price_suburb_key};
use crate::config::YearSpan;
use crate::output::write_year_workbook;
use crate::sheet::{Grid, Table, YearWorkbook, cell_number, cell_text};
use crate::wrangle::types::{
    INCIDENTS, SUBURB, SuburbCrimeRate, SuburbIncidents, SuburbPriceIncidents, YEAR,
};

/// The price sheet opens with a title row; column headers sit on row 1 and a
/// units row below them is skipped.
const PRICE_HEADER_ROW: usize = 1;
const PRICE_UNITS_ROW: usize = 2;

const CENSUS_TOTAL_COLUMN: usize = 3;
const CENSUS_MALES: &str = "Tot_P_M";
const CENSUS_FEMALES: &str = "Tot_P_F";

/// Sums incidents per suburb and year from the offence-level crime table and
/// writes one sheet per year, suburbs in name order.
#[tracing::instrument(skip(crime_workbook, output), fields(crime = %crime_workbook.display()))]
pub fn total_incidents(
    crime_workbook: &Path,
    sheet_index: usize,
    years: YearSpan,
    output: &Path,
) -> Result<()> {
    let table = Grid::open_at(crime_workbook, sheet_index)?.first_table();
    if table.is_empty() {
        warn!(sheet = sheet_index, "Suburb incidents sheet has no rows");
    }
    let totals = sum_incidents(&table, years)?;

    let sheets: BTreeMap<i32, Vec<SuburbIncidents>> = years
        .iter()
        .map(|year| {
            let rows: Vec<_> = totals
                .get(&year)
                .into_iter()
                .flatten()
                .map(|(suburb, incidents)| SuburbIncidents {
                    suburb: suburb.clone(),
                    incidents: *incidents,
                })
                .collect();
            if rows.is_empty() {
                warn!(year, "No suburb incidents recorded for year");
            }
            (year, rows)
        })
        .collect();

    write_year_workbook(output, &sheets)
}

fn sum_incidents(table: &Table, years: YearSpan) -> Result<BTreeMap<i32, BTreeMap<String, u64>>> {
    let year_col = table.column(YEAR)?;
    let suburb_col = table.column(SUBURB)?;
    let incidents_col = table.column(INCIDENTS)?;

    let mut totals: BTreeMap<i32, BTreeMap<String, u64>> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in 0..table.len() {
        let year = cell_number(table.cell(row, year_col));
        let suburb = cell_text(table.cell(row, suburb_col));
        let incidents = cell_number(table.cell(row, incidents_col));

        let (Some(year), Some(suburb), Some(incidents)) = (year, suburb, incidents) else {
            skipped += 1;
            continue;
        };

        let year = year as i32;
        if !years.contains(year) {
            continue;
        }

        *totals.entry(year).or_default().entry(suburb).or_default() += incidents.round() as u64;
    }

    info!(
        rows = table.len(),
        skipped,
        years = totals.len(),
        "Suburb incidents summed"
    );
    Ok(totals)
}

/// Joins each year's median house prices with that year's incident totals.
///
/// Rows whose price is `-` (or otherwise not a number) are dropped.
#[tracing::instrument(skip_all, fields(prices = %prices_workbook.display()))]
pub fn merge_prices_and_incidents(
    prices_workbook: &Path,
    incidents_workbook: &Path,
    years: YearSpan,
    output: &Path,
) -> Result<()> {
    let prices = Grid::open_at(prices_workbook, 0)?.table(PRICE_HEADER_ROW, &[PRICE_UNITS_ROW]);
    let mut incidents = YearWorkbook::open(incidents_workbook)?;

    let mut sheets = BTreeMap::new();
    for year in years.iter() {
        let price_col = prices
            .column(&year.to_string())
            .with_context(|| format!("no price column for {year}"))?;
        let crimes = incidents.records::<SuburbIncidents>(year)?;

        let merged = join_prices(&prices, price_col, &crimes);
        info!(year, rows = merged.len(), "Prices joined with incidents");
        sheets.insert(year, merged);
    }

    write_year_workbook(output, &sheets)
}

/// Inner join on the cleansed suburb name, keeping price-table order.
fn join_prices(
    prices: &Table,
    price_col: usize,
    crimes: &[SuburbIncidents],
) -> Vec<SuburbPriceIncidents> {
    let mut by_key: HashMap<String, Vec<u64>> = HashMap::new();
    for crime in crimes {
        by_key
            .entry(crime_suburb_key(&crime.suburb))
            .or_default()
            .push(crime.incidents);
    }

    let mut merged = Vec::new();
    for row in 0..prices.len() {
        let Some(name) = cell_text(prices.cell(row, 0)) else {
            continue;
        };
        let key = price_suburb_key(&name);
        let Some(matches) = by_key.get(&key) else {
            continue;
        };
        let Some(price) = cell_number(prices.cell(row, price_col)) else {
            continue;
        };

        merged.extend(matches.iter().map(|&incidents| SuburbPriceIncidents {
            suburb: key.clone(),
            median_house_price: price as i64,
            incidents,
        }));
    }
    merged
}

/// A census suburb with a measured population.
#[derive(Debug, Clone, PartialEq)]
pub struct SuburbPopulation {
    pub suburb: String,
    pub code: u32,
    pub total_population: u64,
}

/// Joins the suburb code list with the census populations.
///
/// Only suburbs with both male and female residents counted are kept.
#[tracing::instrument(skip_all, fields(codes = %codes_csv.display(), populations = %populations_csv.display()))]
pub fn load_suburb_populations(
    codes_csv: &Path,
    populations_csv: &Path,
) -> Result<Vec<SuburbPopulation>> {
    let populations = read_populations(populations_csv)?;

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(codes_csv)
        .with_context(|| format!("failed to open {}", codes_csv.display()))?;

    let mut joined = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(name), Some(code)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Some(code) = code.parse::<f64>().ok().map(|c| c as u32) else {
            continue;
        };

        for &total_population in populations.get(&code).into_iter().flatten() {
            joined.push(SuburbPopulation {
                suburb: census_suburb_key(name),
                code,
                total_population,
            });
        }
    }

    info!(suburbs = joined.len(), "Suburb populations joined");
    Ok(joined)
}

fn read_populations(path: &Path) -> Result<HashMap<u32, Vec<u64>>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("column '{name}' not found in {}", path.display()))
    };
    let males_col = column(CENSUS_MALES)?;
    let females_col = column(CENSUS_FEMALES)?;

    let number = |field: Option<&str>| field.and_then(|f| f.parse::<f64>().ok());

    let mut populations: HashMap<u32, Vec<u64>> = HashMap::new();
    let mut unmeasured = 0usize;
    for record in reader.records() {
        let record = record?;
        let males = number(record.get(males_col)).unwrap_or(0.0);
        let females = number(record.get(females_col)).unwrap_or(0.0);
        if males <= 0.0 || females <= 0.0 {
            unmeasured += 1;
            continue;
        }

        let code = record.get(0).and_then(census_code);
        let total = number(record.get(CENSUS_TOTAL_COLUMN));
        if let (Some(code), Some(total)) = (code, total) {
            populations
                .entry(code)
                .or_default()
                .push(total.round() as u64);
        }
    }

    info!(
        regions = populations.len(),
        unmeasured, "Census populations read"
    );
    Ok(populations)
}

/// Joins each year's price/incident rows with suburb populations, derives the
/// crime rate per 1000 residents and drops rate outliers.
#[tracing::instrument(skip_all)]
pub fn crime_rates(
    codes_csv: &Path,
    populations_csv: &Path,
    merged_workbook: &Path,
    years: YearSpan,
    z_threshold: f64,
    output: &Path,
) -> Result<()> {
    let populations = load_suburb_populations(codes_csv, populations_csv)?;
    let mut merged = YearWorkbook::open(merged_workbook)?;

    let mut sheets = BTreeMap::new();
    for year in years.iter() {
        let rows = merged.records::<SuburbPriceIncidents>(year)?;
        let joined = rows.len();
        let rates = compute_crime_rates(&rows, &populations, z_threshold);

        info!(year, joined, kept = rates.len(), "Crime rates computed");
        sheets.insert(year, rates);
    }

    write_year_workbook(output, &sheets)
}

/// Inner join of `rows` with `populations` on suburb name (row order kept),
/// then the |z| < `z_threshold` filter on the resulting rates.
pub fn compute_crime_rates(
    rows: &[SuburbPriceIncidents],
    populations: &[SuburbPopulation],
    z_threshold: f64,
) -> Vec<SuburbCrimeRate> {
    let mut by_name: HashMap<&str, Vec<&SuburbPopulation>> = HashMap::new();
    for population in populations {
        by_name
            .entry(population.suburb.as_str())
            .or_default()
            .push(population);
    }

    let mut rates = Vec::new();
    for row in rows {
        for population in by_name.get(row.suburb.as_str()).into_iter().flatten() {
            if population.total_population == 0 {
                continue;
            }
            rates.push(SuburbCrimeRate {
                suburb: row.suburb.clone(),
                median_house_price: row.median_house_price,
                incidents: row.incidents,
                suburb_code: population.code,
                total_population: population.total_population,
                crime_rate_per_1000: row.incidents as f64 / population.total_population as f64
                    * 1000.0,
            });
        }
    }

    retain_within_z(rates, z_threshold, |r| r.crime_rate_per_1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Data;
    use std::fs;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    fn offence(year: f64, postcode: f64, suburb: &str, incidents: f64) -> Vec<Data> {
        vec![
            Data::Float(year),
            Data::Float(postcode),
            text(suburb),
            Data::Float(incidents),
        ]
    }

    #[test]
    fn test_sum_incidents_groups_by_year_and_suburb() {
        let table = Table::new(
            vec![
                YEAR.to_string(),
                "Postcode".to_string(),
                SUBURB.to_string(),
                INCIDENTS.to_string(),
            ],
            vec![
                offence(2011.0, 3067.0, "ABBOTSFORD", 10.0),
                offence(2011.0, 3067.0, "ABBOTSFORD", 5.0),
                offence(2011.0, 3040.0, "ABERFELDIE", 2.0),
                offence(2012.0, 3067.0, "ABBOTSFORD", 7.0),
                offence(2020.0, 3067.0, "ABBOTSFORD", 99.0),
            ],
        );

        let totals = sum_incidents(&table, YearSpan::new(2011, 2019)).unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&2011]["ABBOTSFORD"], 15);
        assert_eq!(totals[&2011]["ABERFELDIE"], 2);
        assert_eq!(totals[&2012]["ABBOTSFORD"], 7);
    }

    #[test]
    fn test_join_prices_cleanses_and_drops_dashes() {
        let prices = Table::new(
            vec!["Locality".to_string(), "2011".to_string()],
            vec![
                vec![text("ABBOTSFORD"), Data::Float(900000.0)],
                vec![text("BELLFIELD (Ballarat)"), Data::Float(250000.0)],
                vec![text("BELLFIELD (Banyule)"), Data::Float(700000.0)],
                vec![text("ABERFELDIE"), text("-")],
                vec![text("NOWHERE"), Data::Float(1.0)],
            ],
        );
        let crimes = vec![
            SuburbIncidents {
                suburb: "ABBOTSFORD".to_string(),
                incidents: 15,
            },
            SuburbIncidents {
                suburb: "ABERFELDIE".to_string(),
                incidents: 2,
            },
            SuburbIncidents {
                suburb: "BELLFIELD".to_string(),
                incidents: 4,
            },
        ];

        let merged = join_prices(&prices, 1, &crimes);

        assert_eq!(
            merged,
            vec![
                SuburbPriceIncidents {
                    suburb: "Abbotsford".to_string(),
                    median_house_price: 900000,
                    incidents: 15,
                },
                SuburbPriceIncidents {
                    suburb: "Bellfield".to_string(),
                    median_house_price: 250000,
                    incidents: 4,
                },
                SuburbPriceIncidents {
                    suburb: "Bellfield".to_string(),
                    median_house_price: 700000,
                    incidents: 4,
                },
            ]
        );
    }

    #[test]
    fn test_load_suburb_populations_filters_unmeasured() {
        let dir = tempfile::tempdir().unwrap();
        let codes = dir.path().join("codes.csv");
        let populations = dir.path().join("populations.csv");

        fs::write(
            &codes,
            "SSC_NAME,SSC_CODE\nAbbotsford (Vic.),20001\nAberfeldie (Vic.),20002\nAlbert Park (Vic.),20003\n",
        )
        .unwrap();
        fs::write(
            &populations,
            "SSC_CODE_2016,Tot_P_M,Tot_P_F,Tot_P_P\nSSC20001,4000,4100,8100\nSSC20002,0,3,3\nSSC20003,3000,3200,6200\n",
        )
        .unwrap();

        let joined = load_suburb_populations(&codes, &populations).unwrap();

        assert_eq!(
            joined,
            vec![
                SuburbPopulation {
                    suburb: "Abbotsford".to_string(),
                    code: 20001,
                    total_population: 8100,
                },
                SuburbPopulation {
                    suburb: "Albert park".to_string(),
                    code: 20003,
                    total_population: 6200,
                },
            ]
        );
    }

    #[test]
    fn test_compute_crime_rates_per_1000() {
        let rows = vec![SuburbPriceIncidents {
            suburb: "Abbotsford".to_string(),
            median_house_price: 900000,
            incidents: 81,
        }];
        let populations = vec![SuburbPopulation {
            suburb: "Abbotsford".to_string(),
            code: 20001,
            total_population: 8100,
        }];

        let rates = compute_crime_rates(&rows, &populations, 3.0);

        assert_eq!(rates.len(), 1);
        assert!((rates[0].crime_rate_per_1000 - 10.0).abs() < 1e-9);
        assert_eq!(rates[0].suburb_code, 20001);
    }

    #[test]
    fn test_compute_crime_rates_drops_outlier() {
        let mut rows = Vec::new();
        let mut populations = Vec::new();
        for i in 0..20u32 {
            let suburb = format!("Suburb {i}");
            rows.push(SuburbPriceIncidents {
                suburb: suburb.clone(),
                median_house_price: 500000,
                incidents: 10,
            });
            populations.push(SuburbPopulation {
                suburb,
                code: i,
                total_population: 1000,
            });
        }
        // A suburb with a handful of residents and a shopping strip.
        rows.push(SuburbPriceIncidents {
            suburb: "Tiny".to_string(),
            median_house_price: 500000,
            incidents: 900,
        });
        populations.push(SuburbPopulation {
            suburb: "Tiny".to_string(),
            code: 99,
            total_population: 10,
        });

        let rates = compute_crime_rates(&rows, &populations, 3.0);

        assert_eq!(rates.len(), 20);
        assert!(rates.iter().all(|r| r.suburb != "Tiny"));
    }
}
