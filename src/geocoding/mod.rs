//! Remote mapping-service contract.
//!
//! The transforms only see the [`MapsService`] trait; [`google::GoogleMapsClient`] is the
//! production implementation. Response types mirror the Google Maps JSON payloads.

pub mod google;

use std::fmt;

use serde::Deserialize;

use crate::error::TransformResult;

pub use google::GoogleMapsClient;

/// A geocoding or place-search call against the remote service.
pub trait MapsService: Send + Sync {
    /// Geocode an address or a place id.
    fn geocode(&self, request: &GeocodingRequest) -> TransformResult<GeocodingResponse>;

    /// Find places matching free text.
    fn find_place(&self, request: &PlaceSearchRequest) -> TransformResult<PlaceSearchResponse>;
}

/// Geographic constraints narrowing a geocoding lookup. Unset parts are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentFilter {
    pub administrative_area: Option<String>,
    pub country: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub route: Option<String>,
}

impl ComponentFilter {
    /// Whether no component is constrained.
    pub fn is_empty(&self) -> bool {
        self.parts().next().is_none()
    }

    fn parts(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("administrative_area", &self.administrative_area),
            ("country", &self.country),
            ("locality", &self.locality),
            ("postal_code", &self.postal_code),
            ("route", &self.route),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
    }
}

/// Renders the `components=` query value, e.g. `administrative_area:MI|country:US`.
impl fmt::Display for ComponentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.parts().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}

/// What a geocoding request looks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeQuery {
    /// Free-text address.
    Address(String),
    /// Opaque place identifier.
    PlaceId(String),
}

impl GeocodeQuery {
    /// Text containing a space is an address; anything else is taken as a place id.
    pub fn classify(query: &str) -> Self {
        if query.contains(' ') {
            Self::Address(query.to_string())
        } else {
            Self::PlaceId(query.to_string())
        }
    }

    /// The query text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Address(s) | Self::PlaceId(s) => s,
        }
    }
}

/// A geocoding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodingRequest {
    pub query: GeocodeQuery,
    pub components: ComponentFilter,
}

/// A free-text place search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceSearchRequest {
    pub input: String,
}

/// Status reported in the body of every Google Maps response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    OverDailyLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    NotFound,
    #[serde(other)]
    Unrecognized,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::OverDailyLimit => "OVER_DAILY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Unrecognized => "UNRECOGNIZED",
        };
        f.write_str(s)
    }
}

/// Precision of a geocoded location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Rooftop,
    RangeInterpolated,
    GeometricCenter,
    Approximate,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rooftop => "Rooftop",
            Self::RangeInterpolated => "RangeInterpolated",
            Self::GeometricCenter => "GeometricCenter",
            Self::Approximate => "Approximate",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
    #[serde(default)]
    pub location_type: Option<LocationType>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// One geocoding match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub partial_match: bool,
    #[serde(default)]
    pub types: Vec<String>,
}

impl GeocodeResult {
    /// First address component tagged with `kind` (e.g. `country`).
    pub fn component(&self, kind: &str) -> Option<&AddressComponent> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodingResponse {
    pub status: ServiceStatus,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One place-search candidate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceSearchResponse {
    pub status: ServiceStatus,
    #[serde(default)]
    pub candidates: Vec<PlaceCandidate>,
    #[serde(default)]
    pub error_message: Option<String>,
}
