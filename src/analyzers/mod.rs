//! Statistics over the wrangled per-year tables.
//!
//! This module holds the small amount of numerics the pipeline needs
//! (z-score filtering, least-squares trendlines, Pearson coefficients) and
//! turns per-year coefficients into CSV files and summary entries.

pub mod correlation;
pub mod strength;
pub mod utility;
