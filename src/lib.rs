//! `geocode-transform` is a pipeline row transform that enriches records by calling the Google
//! Maps Geocoding (and Places) APIs, under a caller-imposed requests-per-interval quota.
//!
//! The host pipeline hands the transform a stream of [`types::Row`]s. The transform splits the
//! stream into fixed-size batches, runs each batch's lookups concurrently on a bounded worker
//! pool (every lookup first passing a shared [`rate_gate::RateGate`]) and re-emits the rows with
//! the configured output fields filled in.
//!
//! ## Transforms
//!
//! - [`transform::GeocodeTransform`] (`google-geocode`, `fromaddress`): the input text is sent as
//!   an address when it contains a space and as a place id otherwise.
//! - [`transform::PlaceTransform`] (`google-place`): the input text is resolved with a place
//!   search first, then the resulting place id is geocoded.
//!
//! ## Output fields
//!
//! Output fields are matched to result values by name, case-insensitively:
//!
//! | name(s) | value |
//! |---|---|
//! | `lat`, `latitude` | latitude (`double`) |
//! | `lon`, `long`, `longitude` | longitude (`double`) |
//! | `address`, `formattedaddress` | formatted address |
//! | `place`, `placeid` | place id |
//! | `type`, `locationtype` | location type |
//! | `partialmatch` | partial-match flag |
//! | `state`, `administrative_area_level_1` | state short name |
//! | `country` | country short name |
//! | `zip`, `zipcode`, `postalcode` | postal code |
//!
//! Any other name is left alone.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use geocode_transform::config::{OperationConfig, TransformContext};
//! use geocode_transform::ingestion::rows_from_queries;
//! use geocode_transform::transform::{GeocodeTransform, RowTransform};
//! use geocode_transform::types::{DataType, Field, Schema};
//!
//! # fn main() -> Result<(), geocode_transform::TransformError> {
//! let op = OperationConfig::from_json_str(r#"{
//!     "method": "google-geocode",
//!     "key": "<key>",
//!     "limit": 10,
//!     "time": 1000,
//!     "fields": [
//!         {"name": "Latitude", "type": "double"},
//!         {"name": "Longitude", "type": "double"},
//!         {"name": "FormattedAddress", "length": 128}
//!     ]
//! }"#)?;
//! let schema = Arc::new(
//!     Schema::new(vec![Field::new("Address", DataType::Utf8)]).with_calculated(op.fields.clone()),
//! );
//! let rows = rows_from_queries(&schema, "Address", ["1009 Broad Street St. Joseph MI 49085"])?;
//!
//! let transform = GeocodeTransform::new(
//!     TransformContext::new(schema.clone(), "Address", op).with_update_size(50),
//! );
//! for row in transform.operate_rows(rows) {
//!     println!("{:?}", row.values());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`transform`]: the transforms, their signatures and a method-name factory
//! - [`rate_gate`]: sliding-window admission control
//! - [`execution`]: batch dispatch, metrics and observers
//! - [`fields`]: output-field role resolution
//! - [`geocoding`]: remote service contract and the Google client
//! - [`config`]: operation configuration and transform context
//! - [`logging`]: the error/debug sink
//! - [`ingestion`]: loading source rows from CSV
//! - [`types`]: fields, rows and values

pub mod config;
pub mod connection;
pub mod error;
pub mod execution;
pub mod fields;
pub mod geocoding;
pub mod ingestion;
pub mod logging;
pub mod rate_gate;
pub mod transform;
pub mod types;

pub use error::{TransformError, TransformResult};
pub use transform::{
    create_transform, create_transform_with, GeocodeTransform, PlaceTransform, RowTransform,
};
