//! Google Maps Geocoding and Places (find place) client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::OperationConfig;
use crate::connection::connection_limit;
use crate::error::{TransformError, TransformResult};

use super::{
    GeocodeQuery, GeocodingRequest, GeocodingResponse, MapsService, PlaceSearchRequest,
    PlaceSearchResponse,
};

/// Public Google Maps API root.
pub const GOOGLE_MAPS_API_URL: &str = "https://maps.googleapis.com/maps/api";

/// Fields requested from the find-place endpoint.
const PLACE_FIELDS: &str = "place_id,formatted_address,geometry";

/// Blocking client shared read-only by every worker of a transform.
pub struct GoogleMapsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleMapsClient {
    /// Build a client for `api_key`.
    ///
    /// The per-host idle connection pool is sized from the current process-wide
    /// [`connection_limit`], so build it after raising the limit.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> TransformResult<Self> {
        Self::with_base_url(GOOGLE_MAPS_API_URL, api_key, timeout)
    }

    /// Build a client against a different API root.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> TransformResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TransformError::configuration("an api key is required"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(connection_limit())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build a client from an operation's key, timeout and optional base URL.
    pub fn from_operation(operation: &OperationConfig) -> TransformResult<Self> {
        let api_key = operation
            .api_key()
            .ok_or_else(|| TransformError::configuration("an api key is required"))?;
        match operation.base_url.as_deref() {
            Some(base) => Self::with_base_url(base, api_key, operation.timeout()),
            None => Self::new(api_key, operation.timeout()),
        }
    }

    /// Query parameters for a geocoding request, without the key.
    pub fn geocode_params(request: &GeocodingRequest) -> Vec<(&'static str, String)> {
        let mut params = match &request.query {
            GeocodeQuery::Address(address) => vec![("address", address.clone())],
            GeocodeQuery::PlaceId(place_id) => vec![("place_id", place_id.clone())],
        };
        if !request.components.is_empty() {
            params.push(("components", request.components.to_string()));
        }
        params
    }

    /// Query parameters for a place search, without the key.
    pub fn place_params(request: &PlaceSearchRequest) -> Vec<(&'static str, String)> {
        vec![
            ("input", request.input.clone()),
            ("inputtype", "textquery".to_string()),
            ("fields", PLACE_FIELDS.to_string()),
        ]
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> TransformResult<T> {
        let url = format!("{}/{path}", self.base_url);
        debug!(%url, ?params, "calling maps api");

        params.push(("key", self.api_key.clone()));
        let response = self
            .client
            .get(&url)
            .header(
                USER_AGENT,
                format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            )
            .query(&params)
            .send()?
            .error_for_status()?;

        Ok(response.json()?)
    }
}

impl MapsService for GoogleMapsClient {
    fn geocode(&self, request: &GeocodingRequest) -> TransformResult<GeocodingResponse> {
        self.get_json("geocode/json", Self::geocode_params(request))
    }

    fn find_place(&self, request: &PlaceSearchRequest) -> TransformResult<PlaceSearchResponse> {
        self.get_json("place/findplacefromtext/json", Self::place_params(request))
    }
}
