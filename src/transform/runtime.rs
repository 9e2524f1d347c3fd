//! Setup, lookups and field mapping shared by the geocode and place transforms.

use std::sync::Arc;

use crate::config::{OperationConfig, TransformContext};
use crate::connection::{ConnectionLimitGuard, ELEVATED_CONNECTION_LIMIT};
use crate::error::{TransformError, TransformResult};
use crate::execution::{BatchDispatcher, DispatchMetricsSnapshot, DispatchOptions};
use crate::fields::{resolve, ResolvedFields, SemanticRole, Variant};
use crate::geocoding::{
    ComponentFilter, GeocodeQuery, GeocodeResult, GeocodingRequest, GoogleMapsClient, MapsService,
    PlaceCandidate, PlaceSearchRequest, ServiceStatus,
};
use crate::logging::TransformLogger;
use crate::rate_gate::RateGate;
use crate::types::Row;

/// Builds the production service from the operation configuration.
pub fn google_service(operation: &OperationConfig) -> TransformResult<Arc<dyn MapsService>> {
    Ok(Arc::new(GoogleMapsClient::from_operation(operation)?))
}

/// A service factory that hands out an already constructed service.
pub(crate) fn fixed_service(
    service: Arc<dyn MapsService>,
) -> impl FnOnce(&OperationConfig) -> TransformResult<Arc<dyn MapsService>> {
    move |_| Ok(service)
}

/// A transform's runtime; empty while the transform is disabled.
pub(crate) struct RuntimeSlot(Option<Runtime>);

impl RuntimeSlot {
    pub(crate) fn setup<F>(context: &TransformContext, variant: Variant, factory: F) -> Self
    where
        F: FnOnce(&OperationConfig) -> TransformResult<Arc<dyn MapsService>>,
    {
        Self(Runtime::setup(context, variant, factory))
    }

    pub(crate) fn get(&self) -> Option<&Runtime> {
        self.0.as_ref()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) fn dispatcher(&self) -> Option<&BatchDispatcher> {
        self.0.as_ref().map(|rt| &rt.dispatcher)
    }

    pub(crate) fn metrics(&self) -> Option<DispatchMetricsSnapshot> {
        self.dispatcher().map(|d| d.metrics().snapshot())
    }

    /// Rejects rows with nothing to look up before they reach the rate gate.
    pub(crate) fn check_row(&self, row: &Row) -> TransformResult<()> {
        match &self.0 {
            Some(rt) => rt.query(row).map(drop),
            None => Ok(()),
        }
    }

    /// Drop the runtime, releasing everything it owns.
    pub(crate) fn release(&mut self) {
        self.0 = None;
    }
}

/// Everything a successfully set up transform owns.
///
/// Dropping it closes the rate gate, releases the service client and finally restores the
/// connection limit.
pub(crate) struct Runtime {
    fields: ResolvedFields,
    components: ComponentFilter,
    service: Arc<dyn MapsService>,
    pub(crate) dispatcher: BatchDispatcher,
    logger: Arc<dyn TransformLogger>,
    _connections: ConnectionLimitGuard,
}

impl Runtime {
    /// Run setup. `None` means the transform stays disabled; the reason has been reported.
    pub(crate) fn setup<F>(context: &TransformContext, variant: Variant, factory: F) -> Option<Self>
    where
        F: FnOnce(&OperationConfig) -> TransformResult<Arc<dyn MapsService>>,
    {
        let logger = &context.logger;
        if context.operation.api_key().is_none() {
            logger.debug(&format!(
                "The {} transform has no api key and will not run.",
                variant.label()
            ));
            return None;
        }

        match Self::build(context, variant, factory) {
            Ok(runtime) => {
                logger.debug(&format!(
                    "The {} transform is initialized and will run.",
                    variant.label()
                ));
                Some(runtime)
            }
            Err(e) => {
                logger.error(&e.to_string());
                logger.debug(&format!(
                    "The {} transform will not run due to setup issues.",
                    variant.label()
                ));
                None
            }
        }
    }

    fn build<F>(context: &TransformContext, variant: Variant, factory: F) -> TransformResult<Self>
    where
        F: FnOnce(&OperationConfig) -> TransformResult<Arc<dyn MapsService>>,
    {
        let operation = &context.operation;
        let batch_size = context.batch_size()?;
        let fields = resolve(context, variant)?;

        let components = ComponentFilter {
            administrative_area: operation.administrative_area.clone(),
            country: operation.country.clone(),
            locality: operation.locality.clone(),
            postal_code: operation.postal_code.clone(),
            route: operation.route.clone(),
        };

        // Released on every early return below.
        let connections = ConnectionLimitGuard::raise(ELEVATED_CONNECTION_LIMIT);
        let gate = Arc::new(RateGate::new(operation.limit(), operation.time())?);

        let service = factory(operation).map_err(|e| TransformError::ServiceSetup {
            message: e.to_string(),
        })?;

        let dispatcher = BatchDispatcher::new(
            gate,
            DispatchOptions {
                batch_size,
                num_threads: operation.max_workers,
            },
            Arc::clone(&context.logger),
            context.observer.clone(),
        )?;

        Ok(Self {
            fields,
            components,
            service,
            dispatcher,
            logger: Arc::clone(&context.logger),
            _connections: connections,
        })
    }

    /// Query text held by the input field; blank or null input is an error.
    pub(crate) fn query(&self, row: &Row) -> TransformResult<String> {
        let query = row
            .get(self.fields.input)
            .map(ToString::to_string)
            .unwrap_or_default();
        if query.trim().is_empty() {
            return Err(TransformError::EmptyQuery);
        }
        Ok(query)
    }

    /// Report a row-level failure.
    pub(crate) fn report(&self, error: &TransformError) {
        self.dispatcher.report_failure(&error.to_string());
    }

    /// Geocode `query` and map the best result onto the row.
    ///
    /// The row is only written once a usable result is in hand.
    pub(crate) fn geocode_into(&self, row: &mut Row, query: GeocodeQuery) -> TransformResult<()> {
        let request = GeocodingRequest {
            query,
            components: self.components.clone(),
        };
        let response = self.service.geocode(&request)?;
        if response.status != ServiceStatus::Ok {
            return Err(TransformError::ServiceStatus {
                status: response.status,
                message: response.error_message,
            });
        }

        let first = response
            .results
            .first()
            .ok_or_else(|| TransformError::NoResults {
                query: request.query.as_str().to_string(),
            })?;
        self.apply_result(row, first);
        Ok(())
    }

    /// Resolve free text to a place, write the candidate, then geocode by its place id.
    pub(crate) fn place_into(&self, row: &mut Row, input: &str) -> TransformResult<()> {
        let response = self.service.find_place(&PlaceSearchRequest {
            input: input.to_string(),
        })?;

        match response.status {
            ServiceStatus::Ok | ServiceStatus::ZeroResults => {}
            status => {
                return Err(TransformError::ServiceStatus {
                    status,
                    message: response.error_message,
                });
            }
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| TransformError::NoResults {
                query: input.to_string(),
            })?;
        self.apply_candidate(row, candidate);

        self.geocode_into(row, GeocodeQuery::PlaceId(candidate.place_id.clone()))
    }

    fn apply_result(&self, row: &mut Row, result: &GeocodeResult) {
        for (field, role) in self.fields.bound() {
            match role {
                SemanticRole::PartialMatch => row.set(field, result.partial_match),
                SemanticRole::Latitude => row.set(field, result.geometry.location.lat),
                SemanticRole::Longitude => row.set(field, result.geometry.location.lng),
                SemanticRole::LocationType => {
                    if let Some(location_type) = result.geometry.location_type {
                        row.set(field, location_type.to_string());
                    }
                }
                SemanticRole::PlaceId => row.set(field, result.place_id.clone()),
                SemanticRole::State | SemanticRole::Country | SemanticRole::PostalCode => {
                    if let Some(component) =
                        role.component_type().and_then(|kind| result.component(kind))
                    {
                        row.set(field, component.short_name.clone());
                    }
                }
                SemanticRole::FormattedAddress => {
                    // Never overwrite the query itself.
                    if field == self.fields.input {
                        continue;
                    }
                    row.set(field, result.formatted_address.clone());
                    self.logger.debug(&result.formatted_address);
                }
            }
        }
    }

    fn apply_candidate(&self, row: &mut Row, candidate: &PlaceCandidate) {
        let location = candidate.geometry.as_ref().map(|g| g.location);
        for (field, role) in self.fields.bound() {
            match role {
                SemanticRole::PlaceId => row.set(field, candidate.place_id.clone()),
                SemanticRole::Latitude => {
                    if let Some(location) = location {
                        row.set(field, location.lat);
                    }
                }
                SemanticRole::Longitude => {
                    if let Some(location) = location {
                        row.set(field, location.lng);
                    }
                }
                SemanticRole::FormattedAddress if field != self.fields.input => {
                    if let Some(address) = &candidate.formatted_address {
                        row.set(field, address.clone());
                    }
                }
                _ => {}
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.dispatcher.gate().close();
    }
}
