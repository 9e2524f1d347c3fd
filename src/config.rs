//! Operation configuration and the per-transform context handed over by the host.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{TransformError, TransformResult};
use crate::execution::BatchObserver;
use crate::logging::{TracingLogger, TransformLogger};
use crate::types::Schema;

/// Rows per batch when the entity does not set one.
pub const DEFAULT_UPDATE_SIZE: usize = 100;

/// Default request quota: calls per window.
pub const DEFAULT_LIMIT: u32 = 50;

/// Default request quota window in milliseconds.
pub const DEFAULT_TIME_MS: u64 = 1_000;

/// Default HTTP request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// The transform's own configuration, as declared on the field it is attached to.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OperationConfig {
    /// Invocation name, e.g. `google-geocode`.
    pub method: String,
    /// API key for the remote service. A missing key disables the transform.
    #[serde(alias = "key", alias = "apikey")]
    pub api_key: Option<String>,
    /// Calls admitted per `time` window.
    pub limit: Option<u32>,
    /// Rate window in milliseconds.
    pub time: Option<u64>,
    /// Component filter: administrative area.
    pub administrative_area: Option<String>,
    /// Component filter: country.
    pub country: Option<String>,
    /// Component filter: locality.
    pub locality: Option<String>,
    /// Component filter: postal code.
    pub postal_code: Option<String>,
    /// Component filter: route.
    pub route: Option<String>,
    /// Declared output fields.
    pub fields: Vec<crate::types::Field>,
    /// HTTP request timeout in milliseconds.
    pub timeout: Option<u64>,
    /// Upper bound on concurrently running lookups.
    pub max_workers: Option<usize>,
    /// Service root override (e.g. a proxy); defaults to the public Google endpoint.
    pub base_url: Option<String>,
}

impl OperationConfig {
    /// Create a configuration for `method` with everything else unset.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(input: &str) -> TransformResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Calls per window.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Rate window.
    pub fn time(&self) -> Duration {
        Duration::from_millis(self.time.unwrap_or(DEFAULT_TIME_MS))
    }

    /// HTTP request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Look up a named parameter (used by signature validation).
    pub fn parameter(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "apikey" | "api-key" | "key" => self.api_key().map(str::to_string),
            "limit" => self.limit.map(|v| v.to_string()),
            "time" => self.time.map(|v| v.to_string()),
            "administrative-area" | "administrativearea" => self.administrative_area.clone(),
            "country" => self.country.clone(),
            "locality" => self.locality.clone(),
            "postal-code" | "postalcode" => self.postal_code.clone(),
            "route" => self.route.clone(),
            _ => None,
        }
    }
}

impl fmt::Debug for OperationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationConfig")
            .field("method", &self.method)
            .field("api_key_set", &self.api_key().is_some())
            .field("limit", &self.limit)
            .field("time", &self.time)
            .field("administrative_area", &self.administrative_area)
            .field("country", &self.country)
            .field("locality", &self.locality)
            .field("postal_code", &self.postal_code)
            .field("route", &self.route)
            .field("fields", &self.fields)
            .field("timeout", &self.timeout)
            .field("max_workers", &self.max_workers)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Everything a transform needs from the host: schema, the field it hangs off, its operation
/// configuration, the batch size and the reporting sinks.
#[derive(Clone)]
pub struct TransformContext {
    /// Entity schema, including the calculated output fields.
    pub schema: Arc<Schema>,
    /// Name of the field supplying the query text.
    pub field: String,
    /// Operation configuration.
    pub operation: OperationConfig,
    /// Rows per batch.
    pub update_size: usize,
    /// Error/debug sink.
    pub logger: Arc<dyn TransformLogger>,
    /// Optional batch execution observer.
    pub observer: Option<Arc<dyn BatchObserver>>,
}

impl TransformContext {
    /// Create a context with default batch size and a `tracing`-backed logger.
    pub fn new(schema: Arc<Schema>, field: impl Into<String>, operation: OperationConfig) -> Self {
        Self {
            schema,
            field: field.into(),
            operation,
            update_size: DEFAULT_UPDATE_SIZE,
            logger: Arc::new(TracingLogger),
            observer: None,
        }
    }

    /// Replace the reporting sink.
    pub fn with_logger(mut self, logger: Arc<dyn TransformLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the rows-per-batch size.
    pub fn with_update_size(mut self, update_size: usize) -> Self {
        self.update_size = update_size;
        self
    }

    /// Attach an execution observer.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validated batch size.
    pub fn batch_size(&self) -> TransformResult<usize> {
        if self.update_size == 0 {
            return Err(TransformError::configuration("update size must be > 0"));
        }
        Ok(self.update_size)
    }
}

impl fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("field", &self.field)
            .field("operation", &self.operation)
            .field("update_size", &self.update_size)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}
