//! `google-geocode`: address or place id to coordinates.

use std::sync::Arc;

use crate::config::{OperationConfig, TransformContext};
use crate::error::TransformResult;
use crate::execution::{BatchDispatcher, DispatchMetricsSnapshot};
use crate::fields::Variant;
use crate::geocoding::{GeocodeQuery, MapsService};
use crate::types::Row;

use super::runtime::{fixed_service, google_service, RuntimeSlot};
use super::{OperationSignature, RowTransform};

/// Invocation names this transform answers to.
pub fn signatures() -> Vec<OperationSignature> {
    vec![
        OperationSignature::new("google-geocode").with_parameter("apikey"),
        OperationSignature::new("fromaddress").with_parameter("apikey"),
    ]
}

/// Geocodes the input field of every row and writes the configured output fields.
///
/// Input text containing a space is sent as an address; anything else is sent as a place id.
///
/// ```no_run
/// use std::sync::Arc;
/// use geocode_transform::config::{OperationConfig, TransformContext};
/// use geocode_transform::transform::{GeocodeTransform, RowTransform};
/// use geocode_transform::types::{DataType, Field, Schema};
///
/// let mut op = OperationConfig::new("google-geocode");
/// op.api_key = Some("<key>".to_string());
/// op.fields = vec![
///     Field::new("Latitude", DataType::Float64),
///     Field::new("Longitude", DataType::Float64),
/// ];
/// let schema = Schema::new(vec![Field::new("Address", DataType::Utf8)])
///     .with_calculated(op.fields.clone());
/// let schema = Arc::new(schema);
///
/// let transform = GeocodeTransform::new(TransformContext::new(schema.clone(), "Address", op));
/// let address = schema.field_id("Address").unwrap();
/// let mut row = schema.new_row();
/// row.set(address, "1009 Broad Street St. Joseph MI 49085");
///
/// for row in transform.operate_rows(vec![row]) {
///     println!("{:?}", row.values());
/// }
/// ```
pub struct GeocodeTransform {
    runtime: RuntimeSlot,
}

impl GeocodeTransform {
    /// Set up against the Google Maps Geocoding API.
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
            runtime: RuntimeSlot::setup(&context, Variant::Geocode, factory),
        }
    }

    /// Dispatch counters, `None` when disabled.
    pub fn metrics(&self) -> Option<DispatchMetricsSnapshot> {
        self.runtime.metrics()
    }

    /// Release the rate gate, the service client and the raised connection limit.
    ///
    /// The transform is disabled afterwards.
    pub fn dispose(&mut self) {
        self.runtime.release();
    }
}

impl RowTransform for GeocodeTransform {
    fn name(&self) -> &'static str {
        Variant::Geocode.label()
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
            .and_then(|q| runtime.geocode_into(&mut row, GeocodeQuery::classify(&q)));
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
