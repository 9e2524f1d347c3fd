#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use geocode_transform::config::{OperationConfig, TransformContext};
use geocode_transform::geocoding::{
    AddressComponent, GeocodeQuery, GeocodeResult, GeocodingRequest, GeocodingResponse, Geometry,
    LatLng, LocationType, MapsService, PlaceCandidate, PlaceSearchRequest, PlaceSearchResponse,
    ServiceStatus,
};
use geocode_transform::logging::MemoryLogger;
use geocode_transform::types::{DataType, Field, Row, Schema};
use geocode_transform::TransformError;

pub const BROAD_STREET: &str = "1009 Broad Street St. Joseph MI 49085";
pub const BROAD_STREET_SHORT: &str = "1009 Broad St. Joe 49085";
pub const BROAD_STREET_PLACE_ID: &str = "ChIJsxyoG5_GEIgRMN8IWvngddA";
pub const BROAD_STREET_FORMATTED: &str = "1009 Broad St, St Joseph, MI 49085, USA";

/// In-process stand-in for the Google Maps APIs.
///
/// - the Broad Street address, short form and place id resolve to a fixed result
/// - queries containing `denied` answer `REQUEST_DENIED`
/// - queries containing `unreachable` fail at the transport level
/// - place searches containing `nowhere` answer `ZERO_RESULTS`
/// - anything else resolves to a result derived from the query text
#[derive(Default)]
pub struct FakeMaps {
    pub geocode_calls: Mutex<Vec<GeocodingRequest>>,
    pub place_calls: Mutex<Vec<PlaceSearchRequest>>,
    pub call_times: Mutex<Vec<Instant>>,
    pub delay: Option<fn(&str) -> Duration>,
}

impl FakeMaps {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: fn(&str) -> Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn geocode_requests(&self) -> Vec<GeocodingRequest> {
        self.geocode_calls.lock().unwrap().clone()
    }

    pub fn place_requests(&self) -> Vec<PlaceSearchRequest> {
        self.place_calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.geocode_calls.lock().unwrap().len() + self.place_calls.lock().unwrap().len()
    }

    /// When each call arrived, sorted.
    pub fn call_instants(&self) -> Vec<Instant> {
        let mut times = self.call_times.lock().unwrap().clone();
        times.sort();
        times
    }

    fn pause(&self, query: &str) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay(query));
        }
    }
}

pub fn broad_street_result() -> GeocodeResult {
    GeocodeResult {
        address_components: vec![
            component("1009", "1009", "street_number"),
            component("Broad Street", "Broad St", "route"),
            component("Michigan", "MI", "administrative_area_level_1"),
            component("United States", "US", "country"),
            component("49085", "49085", "postal_code"),
        ],
        formatted_address: BROAD_STREET_FORMATTED.to_string(),
        geometry: Geometry {
            location: LatLng {
                lat: 42.1096,
                lng: -86.4806,
            },
            location_type: Some(LocationType::Rooftop),
        },
        place_id: BROAD_STREET_PLACE_ID.to_string(),
        partial_match: false,
        types: vec!["street_address".to_string()],
    }
}

fn derived_result(query: &str) -> GeocodeResult {
    GeocodeResult {
        address_components: vec![component("Somewhere", "SW", "locality")],
        formatted_address: format!("{query} (resolved)"),
        geometry: Geometry {
            location: LatLng {
                lat: query.len() as f64,
                lng: -(query.len() as f64),
            },
            location_type: Some(LocationType::Approximate),
        },
        place_id: if query.starts_with("place-") {
            query.to_string()
        } else {
            format!("place-{}", query.replace(' ', "-"))
        },
        partial_match: true,
        types: Vec::new(),
    }
}

fn component(long: &str, short: &str, kind: &str) -> AddressComponent {
    AddressComponent {
        long_name: long.to_string(),
        short_name: short.to_string(),
        types: vec![kind.to_string(), "political".to_string()],
    }
}

fn status_only(status: ServiceStatus) -> GeocodingResponse {
    GeocodingResponse {
        status,
        results: Vec::new(),
        error_message: Some("fake".to_string()),
    }
}

impl MapsService for FakeMaps {
    fn geocode(&self, request: &GeocodingRequest) -> Result<GeocodingResponse, TransformError> {
        self.call_times.lock().unwrap().push(Instant::now());
        self.geocode_calls.lock().unwrap().push(request.clone());
        let query = request.query.as_str();
        self.pause(query);

        if query.contains("unreachable") {
            return Err(TransformError::Io(std::io::Error::other("connection reset by peer")));
        }
        if query.contains("denied") {
            return Ok(status_only(ServiceStatus::RequestDenied));
        }

        let result = match &request.query {
            GeocodeQuery::Address(a) if a == BROAD_STREET => broad_street_result(),
            GeocodeQuery::PlaceId(p) if p == BROAD_STREET_PLACE_ID => broad_street_result(),
            _ => derived_result(query),
        };
        Ok(GeocodingResponse {
            status: ServiceStatus::Ok,
            results: vec![result],
            error_message: None,
        })
    }

    fn find_place(&self, request: &PlaceSearchRequest) -> Result<PlaceSearchResponse, TransformError> {
        self.call_times.lock().unwrap().push(Instant::now());
        self.place_calls.lock().unwrap().push(request.clone());
        let input = request.input.as_str();
        self.pause(input);

        if input.contains("nowhere") {
            return Ok(PlaceSearchResponse {
                status: ServiceStatus::ZeroResults,
                candidates: Vec::new(),
                error_message: None,
            });
        }
        if input.contains("denied") {
            return Ok(PlaceSearchResponse {
                status: ServiceStatus::RequestDenied,
                candidates: Vec::new(),
                error_message: Some("The provided API key is invalid.".to_string()),
            });
        }

        let candidate = if input == BROAD_STREET_SHORT || input == BROAD_STREET {
            PlaceCandidate {
                place_id: BROAD_STREET_PLACE_ID.to_string(),
                formatted_address: Some(BROAD_STREET_FORMATTED.to_string()),
                geometry: Some(broad_street_result().geometry),
            }
        } else {
            PlaceCandidate {
                place_id: format!("place-{}", input.replace(' ', "-")),
                formatted_address: None,
                geometry: None,
            }
        };
        Ok(PlaceSearchResponse {
            status: ServiceStatus::Ok,
            candidates: vec![candidate],
            error_message: None,
        })
    }
}

/// Latitude, longitude, address, place id and location type.
pub fn standard_outputs() -> Vec<Field> {
    vec![
        Field::new("Latitude", DataType::Float64),
        Field::new("Longitude", DataType::Float64),
        Field::new("FormattedAddress", DataType::Utf8).with_length(128),
        Field::new("PlaceId", DataType::Utf8),
        Field::new("LocationType", DataType::Utf8),
    ]
}

pub struct Harness {
    pub schema: Arc<Schema>,
    pub logger: Arc<MemoryLogger>,
    pub context: TransformContext,
}

impl Harness {
    /// An entity with an `Address` input field plus `outputs` as calculated fields.
    pub fn new(method: &str, outputs: Vec<Field>) -> Self {
        let mut op = OperationConfig::new(method);
        op.api_key = Some("test-key".to_string());
        op.limit = Some(1_000);
        op.time = Some(1_000);
        op.fields = outputs.clone();

        let schema = Arc::new(
            Schema::new(vec![Field::new("Address", DataType::Utf8)]).with_calculated(outputs),
        );
        let logger = Arc::new(MemoryLogger::default());
        let context = TransformContext::new(Arc::clone(&schema), "Address", op)
            .with_logger(logger.clone());

        Self {
            schema,
            logger,
            context,
        }
    }

    pub fn row(&self, query: &str) -> Row {
        let mut row = self.schema.new_row();
        row.set(self.id("Address"), query);
        row
    }

    pub fn id(&self, name: &str) -> geocode_transform::types::FieldId {
        self.schema.field_id(name).unwrap()
    }

    pub fn text(&self, row: &Row, name: &str) -> String {
        row[self.id(name)].to_string()
    }
}
