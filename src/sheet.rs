//! Spreadsheet reading on top of calamine.
//!
//! [`Grid`] gives absolute-coordinate access to one worksheet, which the
//! layout scanner in [`crate::wrangle::lga`] needs. [`Table`] is the usual
//! header-plus-rows view used by every other stage. [`YearWorkbook`] reads the
//! per-year workbooks the stages write for each other.

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::wrangle::types::Record;

static EMPTY: Data = Data::Empty;

/// Opens an `.xls` or `.xlsx` workbook, detecting the format from the extension.
pub fn open_workbook(path: &Path) -> Result<Sheets<BufReader<File>>> {
    open_workbook_auto(path).with_context(|| format!("failed to open workbook {}", path.display()))
}

/// One worksheet addressed by absolute (row, column) positions.
pub struct Grid {
    range: Range<Data>,
}

impl Grid {
    /// Reads the worksheet at zero-based `index`.
    pub fn open_at(path: &Path, index: usize) -> Result<Self> {
        let mut workbook = open_workbook(path)?;
        let range = workbook
            .worksheet_range_at(index)
            .ok_or_else(|| anyhow!("{} has no sheet at index {index}", path.display()))?
            .with_context(|| format!("failed to read sheet {index} of {}", path.display()))?;
        Ok(Self::from_range(range))
    }

    pub fn from_range(range: Range<Data>) -> Self {
        Self { range }
    }

    /// Number of rows from the top of the sheet to the last used row.
    pub fn height(&self) -> usize {
        self.range.end().map_or(0, |(row, _)| row as usize + 1)
    }

    /// Number of columns from column A to the last used column.
    pub fn width(&self) -> usize {
        self.range.end().map_or(0, |(_, col)| col as usize + 1)
    }

    /// First used row, where a header row normally sits.
    pub fn first_row(&self) -> usize {
        self.range.start().map_or(0, |(row, _)| row as usize)
    }

    /// Cell at an absolute position; anything outside the used range is empty.
    pub fn cell(&self, row: usize, col: usize) -> &Data {
        self.range
            .get_value((row as u32, col as u32))
            .unwrap_or(&EMPTY)
    }

    /// Builds a [`Table`] whose header is `header_row`. Rows listed in `skip`
    /// and blank rows are left out.
    pub fn table(&self, header_row: usize, skip: &[usize]) -> Table {
        let width = self.width();
        let headers = (0..width)
            .map(|col| header_text(self.cell(header_row, col)))
            .collect();

        let rows = (header_row + 1..self.height())
            .filter(|row| !skip.contains(row))
            .map(|row| {
                (0..width)
                    .map(|col| self.cell(row, col).clone())
                    .collect::<Vec<_>>()
            })
            .filter(|cells| cells.iter().any(|cell| !is_blank(cell)))
            .collect();

        Table { headers, rows }
    }

    /// Table headed by the first used row.
    pub fn first_table(&self) -> Table {
        self.table(self.first_row(), &[])
    }
}

/// A header row and the data rows below it.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Data>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Data>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column headed `name`.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("column '{name}' not found (have {:?})", self.headers))
    }

    pub fn cell(&self, row: usize, col: usize) -> &Data {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Rows where every named column holds a number, as `[f64; names.len()]`
    /// vectors in column order. Rows with a missing value are skipped.
    pub fn numeric_rows(&self, names: &[&str]) -> Result<Vec<Vec<f64>>> {
        let columns = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..self.rows.len())
            .filter_map(|row| {
                columns
                    .iter()
                    .map(|&col| cell_number(self.cell(row, col)))
                    .collect::<Option<Vec<_>>>()
            })
            .collect())
    }

    /// Numeric values of one column, skipping missing values.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self
            .numeric_rows(&[name])?
            .into_iter()
            .map(|row| row[0])
            .collect())
    }

    /// Decodes every row into `R`, looking columns up by `R::HEADERS`.
    pub fn records<R: Record>(&self) -> Result<Vec<R>> {
        let columns = R::HEADERS
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(self.rows.len());
        for row in 0..self.rows.len() {
            let cells: Vec<&Data> = columns.iter().map(|&col| self.cell(row, col)).collect();
            match R::from_cells(&cells) {
                Some(record) => records.push(record),
                None => debug!(row, ?cells, "Skipping undecodable row"),
            }
        }
        Ok(records)
    }
}

/// A workbook with one sheet per year, as written by [`crate::output::write_year_workbook`].
pub struct YearWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl YearWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            sheets: open_workbook(path)?,
        })
    }

    /// Years that have a sheet, in workbook order.
    pub fn years(&self) -> Vec<i32> {
        self.sheets
            .sheet_names()
            .iter()
            .filter_map(|name| name.trim().parse().ok())
            .collect()
    }

    pub fn table(&mut self, year: i32) -> Result<Table> {
        let range = self
            .sheets
            .worksheet_range(&year.to_string())
            .with_context(|| {
                format!(
                    "no sheet for {year} in {} (has {:?})",
                    self.path.display(),
                    self.years()
                )
            })?;
        let grid = Grid::from_range(range);
        if grid.height() == 0 {
            bail!("sheet {year} of {} is empty", self.path.display());
        }
        Ok(grid.first_table())
    }

    pub fn records<R: Record>(&mut self, year: i32) -> Result<Vec<R>> {
        self.table(year)?
            .records()
            .with_context(|| format!("sheet {year} of {}", self.path.display()))
    }
}

/// True for empty cells and whitespace-only text.
pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text content of a cell. Numbers are rendered without a trailing `.0`.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_number(*f)),
        Data::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric content of a cell. Numeric text parses; `-` and other text do not.
pub fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn header_text(cell: &Data) -> String {
    cell_text(cell).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cells: &[((u32, u32), Data)]) -> Grid {
        let end = cells.iter().fold((0, 0), |(r, c), ((row, col), _)| {
            (r.max(*row), c.max(*col))
        });
        let mut range = Range::new((0, 0), end);
        for (pos, value) in cells {
            range.set_value(*pos, value.clone());
        }
        Grid::from_range(range)
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_cell_number_coercion() {
        assert_eq!(cell_number(&Data::Int(7)), Some(7.0));
        assert_eq!(cell_number(&Data::Float(2.5)), Some(2.5));
        assert_eq!(cell_number(&text(" 650000 ")), Some(650000.0));
        assert_eq!(cell_number(&text("-")), None);
        assert_eq!(cell_number(&text("n/a")), None);
        assert_eq!(cell_number(&Data::Empty), None);
    }

    #[test]
    fn test_cell_text_renders_whole_floats_as_integers() {
        assert_eq!(cell_text(&Data::Float(2011.0)), Some("2011".to_string()));
        assert_eq!(cell_text(&Data::Float(1.5)), Some("1.5".to_string()));
        assert_eq!(cell_text(&text("  ")), None);
    }

    #[test]
    fn test_grid_out_of_range_is_empty() {
        let grid = grid(&[((1, 1), text("x"))]);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 2);
        assert!(is_blank(grid.cell(10, 10)));
        assert_eq!(cell_text(grid.cell(1, 1)), Some("x".to_string()));
    }

    #[test]
    fn test_table_skips_rows_and_blank_rows() {
        let grid = grid(&[
            ((0, 0), text("Median house prices")),
            ((1, 0), text("Suburb")),
            ((1, 1), Data::Float(2011.0)),
            ((2, 1), text("annual")),
            ((3, 0), text("Abbotsford")),
            ((3, 1), Data::Float(900000.0)),
            ((5, 0), text("Aberfeldie")),
            ((5, 1), text("-")),
        ]);

        let table = grid.table(1, &[2]);

        assert_eq!(table.column("Suburb").unwrap(), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("2011").unwrap(), 1);
        assert_eq!(table.numbers("2011").unwrap(), vec![900000.0]);
    }

    #[test]
    fn test_missing_column_names_available_headers() {
        let table = Table::new(vec!["Year".to_string()], vec![]);
        let err = table.column("Suburb/Town Name").unwrap_err().to_string();
        assert!(err.contains("Suburb/Town Name"));
        assert!(err.contains("Year"));
    }

    #[test]
    fn test_numeric_rows_requires_every_column() {
        let table = Table::new(
            vec!["x".to_string(), "y".to_string()],
            vec![
                vec![Data::Float(1.0), Data::Float(2.0)],
                vec![Data::Float(3.0), Data::Empty],
                vec![Data::Int(5), text("6")],
            ],
        );

        let rows = table.numeric_rows(&["x", "y"]).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![5.0, 6.0]]);
    }
}
