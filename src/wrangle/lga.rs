//! LGA-level wrangling: crime per LGA, the property summary layout parser and
//! the crime/property join.

use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cleanse::{crime_lga_key, property_lga_key};
use crate::config::YearSpan;
use crate::output::write_year_workbook;
use crate::sheet::{Grid, Table, YearWorkbook, cell_number, cell_text, is_blank};
use crate::wrangle::types::{
    INCIDENTS, LGA, LgaCrime, LgaCrimeProperty, LgaProperty, RATE_PER_100K, YEAR,
};

const TOTAL_ROW: &str = "Total";

/// Writes incidents and rates per LGA, one sheet per year present in the crime
/// table, LGAs in name order. Returns the years written.
#[tracing::instrument(skip(crime_workbook, output), fields(crime = %crime_workbook.display()))]
pub fn local_crime(crime_workbook: &Path, sheet_index: usize, output: &Path) -> Result<Vec<i32>> {
    let table = Grid::open_at(crime_workbook, sheet_index)?.first_table();
    if table.is_empty() {
        warn!(sheet = sheet_index, "LGA crime sheet has no rows");
    }
    let sheets = group_lga_crime(&table)?;

    write_year_workbook(output, &sheets)?;
    Ok(sheets.keys().copied().collect())
}

fn group_lga_crime(table: &Table) -> Result<BTreeMap<i32, Vec<LgaCrime>>> {
    let year_col = table.column(YEAR)?;
    let lga_col = table.column(LGA)?;
    let incidents_col = table.column(INCIDENTS)?;
    let rate_col = table.column(RATE_PER_100K)?;

    let mut sheets: BTreeMap<i32, Vec<LgaCrime>> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in 0..table.len() {
        let Some(lga) = cell_text(table.cell(row, lga_col)) else {
            skipped += 1;
            continue;
        };
        if lga.trim() == TOTAL_ROW {
            continue;
        }

        let year = cell_number(table.cell(row, year_col));
        let incidents = cell_number(table.cell(row, incidents_col));
        let rate = cell_number(table.cell(row, rate_col));
        let (Some(year), Some(incidents), Some(rate)) = (year, incidents, rate) else {
            skipped += 1;
            continue;
        };

        sheets.entry(year as i32).or_default().push(LgaCrime {
            lga,
            incidents: incidents.round() as u64,
            rate_per_100k: rate,
        });
    }

    for rows in sheets.values_mut() {
        rows.sort_by(|a, b| a.lga.cmp(&b.lga));
    }

    info!(years = sheets.len(), skipped, "LGA crime grouped");
    Ok(sheets)
}

/// Column F: every LGA table header row has a value here.
const MARKER_COL: usize = 5;
/// Column E: the year column; the last year closes each LGA table.
const YEAR_COL: usize = 4;
/// Column B: the LGA name, above each table.
const NAME_COL: usize = 1;
/// The summary tables at the top of the sheet also hit both markers.
const LEADING_TABLES: usize = 3;
const NAME_ROWS_ABOVE_HEADER: usize = 9;

/// Where one LGA's table sits in the property summary sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTable {
    pub name: String,
    pub header_row: usize,
    pub end_row: usize,
}

impl PropertyTable {
    fn data_rows(&self) -> RangeInclusive<usize> {
        self.header_row + 1..=self.end_row
    }
}

/// Finds the per-LGA tables in the property summary sheet.
///
/// Header rows are the rows below the sheet header with a value in column F;
/// end rows hold `final_year` in column E. The first three of each belong to
/// the statewide summaries and are skipped. The n-th header pairs with the
/// n-th end.
pub fn locate_tables(grid: &Grid, final_year: i32) -> Result<Vec<PropertyTable>> {
    let starts: Vec<usize> = (1..grid.height())
        .filter(|&row| !is_blank(grid.cell(row, MARKER_COL)))
        .skip(LEADING_TABLES)
        .collect();
    let ends: Vec<usize> = (1..grid.height())
        .filter(|&row| cell_number(grid.cell(row, YEAR_COL)) == Some(final_year as f64))
        .skip(LEADING_TABLES)
        .collect();

    if starts.len() != ends.len() {
        bail!(
            "property layout mismatch: {} table headers but {} rows ending in {final_year}",
            starts.len(),
            ends.len()
        );
    }

    starts
        .into_iter()
        .zip(ends)
        .map(|(header_row, end_row)| {
            if end_row <= header_row {
                bail!(
                    "property table at row {} ends before it starts (row {})",
                    header_row + 1,
                    end_row + 1
                );
            }
            let name_row = header_row
                .checked_sub(NAME_ROWS_ABOVE_HEADER)
                .ok_or_else(|| {
                    anyhow!(
                        "property table at row {} has no room for a name above it",
                        header_row + 1
                    )
                })?;
            let name = cell_text(grid.cell(name_row, NAME_COL)).ok_or_else(|| {
                anyhow!(
                    "no LGA name in B{} above the table at row {}",
                    name_row + 1,
                    header_row + 1
                )
            })?;

            Ok(PropertyTable {
                name: name.trim().to_string(),
                header_row,
                end_row,
            })
        })
        .collect()
}

/// Reads the sales figures for each year in `years` from one LGA table.
///
/// Empty columns inside the table are ignored. Of the remaining columns the
/// first holds the year and the next three the number of sales, median price
/// and mean price.
pub fn read_property_table(
    grid: &Grid,
    table: &PropertyTable,
    years: YearSpan,
) -> BTreeMap<i32, LgaProperty> {
    let columns: Vec<usize> = (0..grid.width())
        .filter(|&col| table.data_rows().any(|row| !is_blank(grid.cell(row, col))))
        .collect();

    let &[year_col, sales_col, median_col, mean_col, ..] = columns.as_slice() else {
        warn!(lga = %table.name, columns = columns.len(), "Property table has too few columns");
        return BTreeMap::new();
    };

    let mut figures = BTreeMap::new();
    for row in table.data_rows() {
        let Some(year) = cell_number(grid.cell(row, year_col)) else {
            continue;
        };
        if year.fract() != 0.0 || !years.contains(year as i32) {
            continue;
        }

        figures.entry(year as i32).or_insert_with(|| LgaProperty {
            lga: table.name.clone(),
            num_sales: cell_number(grid.cell(row, sales_col)),
            median_price: cell_number(grid.cell(row, median_col)),
            mean_price: cell_number(grid.cell(row, mean_col)),
        });
    }
    figures
}

/// Parses the property summary workbook into one sheet per year of house
/// sales figures per LGA.
#[tracing::instrument(skip(property_workbook, output), fields(property = %property_workbook.display()))]
pub fn local_property(property_workbook: &Path, years: YearSpan, output: &Path) -> Result<()> {
    let grid = Grid::open_at(property_workbook, 0)?;
    let tables = locate_tables(&grid, years.last)?;
    info!(tables = tables.len(), "Property tables located");

    let mut sheets: BTreeMap<i32, Vec<LgaProperty>> =
        years.iter().map(|year| (year, Vec::new())).collect();

    for table in &tables {
        let mut figures = read_property_table(&grid, table, years);
        debug!(lga = %table.name, years = figures.len(), "Property table read");

        for (year, rows) in sheets.iter_mut() {
            match figures.remove(year) {
                Some(property) => rows.push(property),
                None => warn!(lga = %table.name, year, "No property figures for year"),
            }
        }
    }

    write_year_workbook(output, &sheets)
}

/// Joins each year's LGA crime with that year's property figures.
#[tracing::instrument(skip_all, fields(crime = %crime_workbook.display(), property = %property_workbook.display()))]
pub fn merge_property_and_crime(
    crime_workbook: &Path,
    property_workbook: &Path,
    years: YearSpan,
    output: &Path,
) -> Result<()> {
    let mut crime = YearWorkbook::open(crime_workbook)?;
    let mut property = YearWorkbook::open(property_workbook)?;

    let mut sheets = BTreeMap::new();
    for year in years.iter() {
        let crimes = crime.records::<LgaCrime>(year)?;
        let properties = property.records::<LgaProperty>(year)?;

        let merged = join_lga(&crimes, &properties);
        info!(year, crimes = crimes.len(), merged = merged.len(), "LGA crime joined with property");
        sheets.insert(year, merged);
    }

    write_year_workbook(output, &sheets)
}

/// Inner join on the cleansed LGA name, keeping crime-table order.
///
/// Matches whose property figures are incomplete are dropped.
pub fn join_lga(crimes: &[LgaCrime], properties: &[LgaProperty]) -> Vec<LgaCrimeProperty> {
    let mut by_key: HashMap<String, Vec<&LgaProperty>> = HashMap::new();
    for property in properties {
        by_key
            .entry(property_lga_key(&property.lga))
            .or_default()
            .push(property);
    }

    let mut merged = Vec::new();
    for crime in crimes {
        let key = crime_lga_key(&crime.lga);
        for property in by_key.get(&key).into_iter().flatten() {
            let (Some(num_sales), Some(median_price), Some(mean_price)) =
                (property.num_sales, property.median_price, property.mean_price)
            else {
                warn!(lga = %key, "Incomplete property figures, dropping");
                continue;
            };

            merged.push(LgaCrimeProperty {
                lga: key.clone(),
                incidents: crime.incidents,
                rate_per_100k: crime.rate_per_100k,
                num_sales,
                median_price,
                mean_price,
            });
        }
    }
    merged
}
