//! Row types written to and read back from the per-year workbooks.

use calamine::Data;

use crate::sheet::{cell_number, cell_text};

/// A value to write into one worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Blank, Cell::Number)
    }
}

/// A row with a fixed set of named columns.
pub trait Record: Sized {
    /// Column headers, in sheet order.
    const HEADERS: &'static [&'static str];

    /// Cells in `HEADERS` order.
    fn to_cells(&self) -> Vec<Cell>;

    /// Decodes a row from cells in `HEADERS` order. `None` skips the row.
    fn from_cells(cells: &[&Data]) -> Option<Self>;
}

pub const YEAR: &str = "Year";
pub const SUBURB: &str = "Suburb/Town Name";
pub const INCIDENTS: &str = "Incidents Recorded";
pub const MEDIAN_HOUSE_PRICE: &str = "Median House Price";
pub const SUBURB_CODE: &str = "Suburb Code";
pub const TOTAL_POP: &str = "Total Pop";
pub const CRIME_RATE_PER_1000: &str = "Crime Rate Per 1000";

pub const LGA: &str = "Local Government Area";
pub const RATE_PER_100K: &str = "Rate per 100,000 population";
pub const NUM_SALES: &str = "Num Sales";
pub const MEDIAN_PRICE: &str = "Median Price";
pub const MEAN_PRICE: &str = "Mean Price";

/// Total incidents recorded in one suburb for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct SuburbIncidents {
    pub suburb: String,
    pub incidents: u64,
}

impl Record for SuburbIncidents {
    const HEADERS: &'static [&'static str] = &[SUBURB, INCIDENTS];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.suburb.clone()),
            Cell::Number(self.incidents as f64),
        ]
    }

    fn from_cells(cells: &[&Data]) -> Option<Self> {
        Some(Self {
            suburb: cell_text(cells[0])?,
            incidents: count(cells[1])?,
        })
    }
}

/// A suburb's median house price joined with its incident total.
#[derive(Debug, Clone, PartialEq)]
pub struct SuburbPriceIncidents {
    pub suburb: String,
    pub median_house_price: i64,
    pub incidents: u64,
}

impl Record for SuburbPriceIncidents {
    const HEADERS: &'static [&'static str] = &[SUBURB, MEDIAN_HOUSE_PRICE, INCIDENTS];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.suburb.clone()),
            Cell::Number(self.median_house_price as f64),
            Cell::Number(self.incidents as f64),
        ]
    }

    fn from_cells(cells: &[&Data]) -> Option<Self> {
        Some(Self {
            suburb: cell_text(cells[0])?,
            median_house_price: cell_number(cells[1])?.round() as i64,
            incidents: count(cells[2])?,
        })
    }
}

/// Price, incidents and census population for a suburb, with the derived rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SuburbCrimeRate {
    pub suburb: String,
    pub median_house_price: i64,
    pub incidents: u64,
    pub suburb_code: u32,
    pub total_population: u64,
    pub crime_rate_per_1000: f64,
}

impl Record for SuburbCrimeRate {
    const HEADERS: &'static [&'static str] = &[
        SUBURB,
        MEDIAN_HOUSE_PRICE,
        INCIDENTS,
        SUBURB_CODE,
        TOTAL_POP,
        CRIME_RATE_PER_1000,
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.suburb.clone()),
            Cell::Number(self.median_house_price as f64),
            Cell::Number(self.incidents as f64),
            Cell::Number(self.suburb_code as f64),
            Cell::Number(self.total_population as f64),
            Cell::Number(self.crime_rate_per_1000),
        ]
    }

    fn from_cells(cells: &[&Data]) -> Option<Self> {
        Some(Self {
            suburb: cell_text(cells[0])?,
            median_house_price: cell_number(cells[1])?.round() as i64,
            incidents: count(cells[2])?,
            suburb_code: count(cells[3])? as u32,
            total_population: count(cells[4])?,
            crime_rate_per_1000: cell_number(cells[5])?,
        })
    }
}

/// Incidents and rate per 100,000 people in one LGA for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct LgaCrime {
    pub lga: String,
    pub incidents: u64,
    pub rate_per_100k: f64,
}

impl Record for LgaCrime {
    const HEADERS: &'static [&'static str] = &[LGA, INCIDENTS, RATE_PER_100K];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.lga.clone()),
            Cell::Number(self.incidents as f64),
            Cell::Number(self.rate_per_100k),
        ]
    }

    fn from_cells(cells: &[&Data]) -> Option<Self> {
        Some(Self {
            lga: cell_text(cells[0])?,
            incidents: count(cells[1])?,
            rate_per_100k: cell_number(cells[2])?,
        })
    }
}

/// House sales summary for one LGA in one year. Any figure may be missing
/// (published as `-`).
#[derive(Debug, Clone, PartialEq)]
pub struct LgaProperty {
    pub lga: String,
    pub num_sales: Option<f64>,
    pub median_price: Option<f64>,
    pub mean_price: Option<f64>,
}

impl Record for LgaProperty {
    const HEADERS: &'static [&'static str] = &[LGA, NUM_SALES, MEDIAN_PRICE, MEAN_PRICE];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.lga.clone()),
            self.num_sales.into(),
            self.median_price.into(),
            self.mean_price.into(),
        ]
    }

    fn from_cells(cells: &[&Data]) -> Option<Self> {
        Some(Self {
            lga: cell_text(cells[0])?,
            num_sales: cell_number(cells[1]),
            median_price: cell_number(cells[2]),
            mean_price: cell_number(cells[3]),
        })
    }
}

/// LGA crime joined with that year's house sales.
#[derive(Debug, Clone, PartialEq)]
pub struct LgaCrimeProperty {
    pub lga: String,
    pub incidents: u64,
    pub rate_per_100k: f64,
    pub num_sales: f64,
    pub median_price: f64,
    pub mean_price: f64,
}

impl Record for LgaCrimeProperty {
    const HEADERS: &'static [&'static str] = &[
        LGA,
        INCIDENTS,
        RATE_PER_100K,
        NUM_SALES,
        MEDIAN_PRICE,
        MEAN_PRICE,
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.lga.clone()),
            Cell::Number(self.incidents as f64),
            Cell::Number(self.rate_per_100k),
            Cell::Number(self.num_sales),
            Cell::Number(self.median_price),
            Cell::Number(self.mean_price),
        ]
    }

    fn from_cells(cells: &[&Data]) -> Option<Self> {
        Some(Self {
            lga: cell_text(cells[0])?,
            incidents: count(cells[1])?,
            rate_per_100k: cell_number(cells[2])?,
            num_sales: cell_number(cells[3])?,
            median_price: cell_number(cells[4])?,
            mean_price: cell_number(cells[5])?,
        })
    }
}

fn count(cell: &Data) -> Option<u64> {
    cell_number(cell)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_match_cells() {
        let row = SuburbCrimeRate {
            suburb: "Abbotsford".to_string(),
            median_house_price: 1_200_000,
            incidents: 300,
            suburb_code: 20001,
            total_population: 4000,
            crime_rate_per_1000: 75.0,
        };
        assert_eq!(row.to_cells().len(), SuburbCrimeRate::HEADERS.len());

        let property = LgaProperty {
            lga: "Alpine Shire".to_string(),
            num_sales: None,
            median_price: Some(320000.0),
            mean_price: Some(350000.0),
        };
        assert_eq!(property.to_cells()[1], Cell::Blank);
        assert_eq!(property.to_cells().len(), LgaProperty::HEADERS.len());
    }

    #[test]
    fn test_from_cells_rejects_missing_figures() {
        let name = Data::String("Abbotsford".to_string());
        let dash = Data::String("-".to_string());
        let incidents = Data::Float(12.0);

        assert!(SuburbPriceIncidents::from_cells(&[&name, &dash, &incidents]).is_none());
    }

    #[test]
    fn test_property_keeps_missing_figures() {
        let name = Data::String("Alpine Shire".to_string());
        let dash = Data::String("-".to_string());
        let price = Data::Float(320000.0);

        let property = LgaProperty::from_cells(&[&name, &dash, &price, &price]).unwrap();
        assert_eq!(property.num_sales, None);
        assert_eq!(property.median_price, Some(320000.0));
    }
}
