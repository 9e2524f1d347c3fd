//! Loading source rows for a transform.
//!
//! The pipeline normally supplies rows itself; [`csv`] covers hosts and tools that start from
//! a file of addresses.

pub mod csv;

pub use self::csv::{ingest_csv_from_path, ingest_csv_from_reader, rows_from_queries};
