//! Typed errors for loading and statistics.
//!
//! Loading errors are fatal and bubble up through `anyhow` in `main`.
//! Statistics errors describe degenerate input and are turned into
//! `n/a` placeholders by the dashboard builder.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading one of the input datasets.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file is missing or could not be opened.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid CSV or a record does not fit the schema.
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The header row lacks a column the schema requires.
    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    /// A blocking load task panicked or was cancelled.
    #[error("loader task for {dataset} failed: {reason}")]
    Task {
        dataset: &'static str,
        reason: String,
    },
}

/// Degenerate input to a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatsError {
    /// The working table has no rows.
    #[error("table is empty")]
    EmptyTable,

    /// The column has no non-missing values.
    #[error("no valid values")]
    NoValues,

    /// One side of a two-sample test has no observations.
    #[error("sample is empty")]
    EmptySample,
}
