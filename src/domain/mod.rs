pub mod cell;
pub mod column_map;
pub mod dataset;
pub mod error;
