//! Data wrangling stages. Each stage reads source spreadsheets or an earlier
//! stage's workbook and writes a new workbook with one sheet per year.

pub mod lga;
pub mod suburb;
pub mod types;
