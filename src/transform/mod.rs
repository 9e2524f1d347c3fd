//! Row transforms and the invocation names they answer to.
//!
//! - [`GeocodeTransform`]: `google-geocode` / `fromaddress`
//! - [`PlaceTransform`]: `google-place`
//!
//! Both share setup, rate limiting, batching and response mapping; they differ only in the
//! upstream call made per row.

pub mod geocode;
pub mod place;
mod runtime;

use std::sync::Arc;

use crate::config::{OperationConfig, TransformContext};
use crate::error::{TransformError, TransformResult};
use crate::execution::{BatchDispatcher, Batches};
use crate::geocoding::MapsService;
use crate::types::Row;

pub use geocode::GeocodeTransform;
pub use place::PlaceTransform;
pub use runtime::google_service;

/// A batch-row transform: rows in, the same rows (enriched) out.
pub trait RowTransform: Send + Sync {
    /// Primary invocation name.
    fn name(&self) -> &'static str;

    /// Whether setup succeeded. A disabled transform never calls the remote service.
    fn is_enabled(&self) -> bool;

    /// Transform one row. Failures are reported to the logger and the row is returned as is.
    fn operate(&self, row: Row) -> Row;

    /// Whether a row can be looked up at all. Rejected rows are reported and passed through
    /// without taking a rate-gate slot.
    fn check_row(&self, _row: &Row) -> TransformResult<()> {
        Ok(())
    }

    /// The batch dispatcher, `None` when disabled.
    fn dispatcher(&self) -> Option<&BatchDispatcher>;

    /// Invocation names and required parameters.
    fn signatures(&self) -> Vec<OperationSignature>;

    /// Transform a stream of rows batch by batch. Empty when disabled.
    fn operate_rows<I>(&self, rows: I) -> Batches<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Row>,
        Self: Sized,
    {
        Batches::new(self, rows.into_iter())
    }
}

impl dyn RowTransform + '_ {
    /// Transform a stream of rows batch by batch. Empty when disabled.
    ///
    /// Same as [`RowTransform::operate_rows`], for transforms built by [`create_transform`].
    pub fn operate_rows<I>(&self, rows: I) -> Batches<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Row>,
    {
        Batches::new(self, rows.into_iter())
    }
}

/// A configuration parameter an invocation accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationParameter {
    /// Parameter name.
    pub name: String,
    /// Default value; `None` makes the parameter required.
    pub default: Option<String>,
}

/// An invocation name a transform answers to, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSignature {
    /// Invocation name.
    pub method: String,
    /// Accepted parameters.
    pub parameters: Vec<OperationParameter>,
}

impl OperationSignature {
    /// Create a signature with no parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a required parameter.
    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(OperationParameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Whether `method` names this signature (case-insensitive).
    pub fn matches(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method.trim())
    }

    /// Check that every required parameter is configured.
    pub fn validate(&self, operation: &OperationConfig) -> TransformResult<()> {
        let missing: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.default.is_none() && operation.parameter(&p.name).is_none())
            .map(|p| p.name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TransformError::configuration(format!(
                "The {} method requires the {} parameter(s).",
                self.method,
                missing.join(", ")
            )))
        }
    }
}

/// Signatures of every transform in this crate.
pub fn signatures() -> Vec<OperationSignature> {
    geocode::signatures()
        .into_iter()
        .chain(place::signatures())
        .collect()
}

/// Build the transform whose signature matches the configured method, against the Google
/// Maps APIs.
///
/// Returns `None` for methods this crate does not implement.
pub fn create_transform(context: TransformContext) -> Option<Box<dyn RowTransform>> {
    create_transform_with(context, google_service)
}

/// Like [`create_transform`], building the service with `factory` once setup validation has
/// passed.
pub fn create_transform_with<F>(
    context: TransformContext,
    factory: F,
) -> Option<Box<dyn RowTransform>>
where
    F: FnOnce(&OperationConfig) -> TransformResult<Arc<dyn MapsService>>,
{
    let method = context.operation.method.clone();
    if geocode::signatures().iter().any(|s| s.matches(&method)) {
        Some(Box::new(GeocodeTransform::with_service_factory(context, factory)))
    } else if place::signatures().iter().any(|s| s.matches(&method)) {
        Some(Box::new(PlaceTransform::with_service_factory(context, factory)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{signatures, OperationSignature};
    use crate::config::OperationConfig;

    #[test]
    fn answers_to_expected_methods() {
        let all = signatures();
        for method in ["google-geocode", "fromaddress", "Google-Place"] {
            assert!(all.iter().any(|s| s.matches(method)), "{method}");
        }
        assert!(!all.iter().any(|s| s.matches("geohash")));
    }

    #[test]
    fn validate_reports_missing_api_key() {
        let sig = OperationSignature::new("google-geocode").with_parameter("apikey");
        let mut op = OperationConfig::new("google-geocode");

        let err = sig.validate(&op).unwrap_err();
        assert!(err.to_string().contains("requires the apikey parameter"));

        op.api_key = Some("key".to_string());
        assert!(sig.validate(&op).is_ok());
    }
}
