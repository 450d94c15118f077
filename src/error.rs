//! Fatal error taxonomy for the pipeline.
//!
//! Only loading and schema problems abort a run. Individual bad rows are
//! dropped and counted during cleaning, and empty aggregation groups become
//! `Aggregate::NoData`, so neither appears here.

use std::path::PathBuf;
use thiserror::Error;

/// File access or decoding failure while reading the source CSV.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown encoding label '{0}'")]
    UnknownEncoding(String),

    #[error("'{path}' contains byte sequences invalid for encoding {encoding}")]
    Decode { path: PathBuf, encoding: String },

    #[error("'{path}' contains no data rows")]
    Empty { path: PathBuf },

    #[error("csv parse error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Required columns absent from the source header row.
#[derive(Error, Debug)]
#[error("missing required columns: {}", missing.join(", "))]
pub struct SchemaError {
    /// Column names that were expected but not found, in expected order.
    pub missing: Vec<String>,
}
