//! `google-place`: free text to a place, then geocode that place.

use std::sync::Arc;

use crate::config::{OperationConfig, TransformContext};
use crate::error::TransformResult;
use crate::execution::{BatchDispatcher, DispatchMetricsSnapshot};
use crate::fields::Variant;
use crate::geocoding::MapsService;
use crate::types::Row;

use super::runtime::{fixed_service, google_service, RuntimeSlot};
use super::{OperationSignature, RowTransform};

/// Invocation names this transform answers to.
pub fn signatures() -> Vec<OperationSignature> {
    vec![OperationSignature::new("google-place").with_parameter("apikey")]
}

/// Resolves the input text with a place search, writes the candidate's place id and geometry,
/// then geocodes the place id into the same output fields.
///
/// A row whose search finds no candidate is reported and left untouched.
pub struct PlaceTransform {
    runtime: RuntimeSlot,
}

impl PlaceTransform {
    /// Set up against the Google Maps Places and Geocoding APIs.
    pub fn new(context: TransformContext) -> Self {
        Self::with_service_factory(context, google_service)
    }

    /// Set up against an already constructed service.
    pub fn with_service(context: TransformContext, service: Arc<dyn MapsService>) -> Self {
        Self::with_service_factory(context, fixed_service(service))
    }

    /// Set up, building the service with `factory` once validation has passed.
    pub fn with_service_factory<F>(context: TransformContext, factory: F) -> Self
    where
        F: FnOnce(&OperationConfig) -> TransformResult<Arc<dyn MapsService>>,
    {
        Self {
            runtime: RuntimeSlot::setup(&context, Variant::Place, factory),
        }
    }

    /// Dispatch counters, `None` when disabled.
    pub fn metrics(&self) -> Option<DispatchMetricsSnapshot> {
        self.runtime.metrics()
    }

    /// Release the rate gate, the service client and the raised connection limit.
    pub fn dispose(&mut self) {
        self.runtime.release();
    }
}

impl RowTransform for PlaceTransform {
    fn name(&self) -> &'static str {
        Variant::Place.label()
    }

    fn is_enabled(&self) -> bool {
        self.runtime.is_enabled()
    }

    fn operate(&self, mut row: Row) -> Row {
        let Some(runtime) = self.runtime.get() else {
            return row;
        };

        let result = runtime
            .query(&row)
            .and_then(|input| runtime.place_into(&mut row, &input));
        if let Err(e) = result {
            runtime.report(&e);
        }
        row
    }

    fn check_row(&self, row: &Row) -> TransformResult<()> {
        self.runtime.check_row(row)
    }

    fn dispatcher(&self) -> Option<&BatchDispatcher> {
        self.runtime.dispatcher()
    }

    fn signatures(&self) -> Vec<OperationSignature> {
        signatures()
    }
}
