//! SaleScope: A Rust CLI application for descriptive sales analytics
//!
//! This library loads a static sales CSV, cleans and type-checks it into a
//! strongly-typed dataset, computes grouped aggregates (regional totals,
//! monthly trend, top products, price tiers, RFM segments, correlations),
//! and renders the results as chart artifacts.

pub mod aggregate;
pub mod cli;
pub mod data;
pub mod error;
pub mod rfm;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{aggregate, Aggregate, AggregateResult};
pub use cli::Args;
pub use data::{clean, load, CleanStats, CleanedDataset, DealSize, RawTable, SalesRecord};
pub use error::{LoadError, SchemaError};
pub use rfm::{compute_rfm, segment_label, CustomerRfm};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
