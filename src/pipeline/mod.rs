//! Building the working table from raw datasets.

pub mod join;

pub use join::build_working_table;
