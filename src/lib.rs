pub mod analyzers;
pub mod cleanse;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod plots;
pub mod sheet;
pub mod wrangle;
