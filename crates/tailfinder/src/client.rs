//! Flight lookup client.
//!
//! One GET per lookup against the provider-specific endpoint. There are no
//! retries and no caching; every navigation asks the backend afresh.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::provider::Provider;

/// Sentinel the backend uses (and the views show) for missing values.
pub const NOT_AVAILABLE: &str = "Not available";

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LookupRequest {
    /// Flight number as it appears in the path.
    pub flight_number: String,
    /// Calendar date of the flight.
    pub date: NaiveDate,
    /// Backend to ask.
    pub provider: Provider,
}

impl LookupRequest {
    /// Endpoint for this request under `base_url`.
    ///
    /// The default provider lives at `{base}/aircraft/...`, the alternate at
    /// `{base}/flightaware/aircraft/...`.
    #[must_use]
    pub fn endpoint(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let date = self.date.format("%Y-%m-%d");
        match self.provider {
            Provider::AeroDataBox => format!("{base}/aircraft/{}/{date}", self.flight_number),
            Provider::FlightAware => {
                format!("{base}/flightaware/aircraft/{}/{date}", self.flight_number)
            }
        }
    }
}

/// Great-circle distance of the flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    /// Distance in kilometres.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub kilometers: String,
    /// Distance in statute miles.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub miles: String,
}

/// One end of the flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightLeg {
    /// Airport name or code.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub airport: String,
    /// Scheduled time as sent by the backend.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub scheduled_time: String,
    /// Terminal, if known.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub terminal: String,
    /// Gate, if known.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub gate: String,
}

impl Default for FlightLeg {
    fn default() -> Self {
        Self {
            airport: not_available(),
            scheduled_time: not_available(),
            terminal: not_available(),
            gate: not_available(),
        }
    }
}

/// The aircraft assigned to a flight.
///
/// Every text field falls back to [`NOT_AVAILABLE`] when the backend omits
/// it or sends `null`; numbers are kept as their decimal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftRecord {
    /// Operating airline.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub airline: String,
    /// Flight number as reported by the provider.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub flight_number: String,
    /// Flight status (scheduled, en route, landed, ...).
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub status: String,
    /// Aircraft registration (tail number).
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub registration: String,
    /// Aircraft model.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub model: String,
    /// Which backend produced the record.
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub data_source: String,
    /// Airframe age in years.
    #[serde(
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub aircraft_age: Option<String>,
    /// Flight distance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    /// Departure leg.
    #[serde(default)]
    pub departure: FlightLeg,
    /// Arrival leg.
    #[serde(default)]
    pub arrival: FlightLeg,
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn value_to_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_text(value).unwrap_or_else(not_available))
}

fn lenient_optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_text(value))
}

/// Body the backend sends with a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable reason, when the backend provides one.
    #[serde(default)]
    pub code: Option<String>,
}

/// An unclassified lookup failure, as observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// The backend answered with an error status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Parsed error body (empty if the body was not JSON).
        body: ErrorBody,
    },
    /// The request never produced a usable response.
    Transport {
        /// Description of the failure.
        message: String,
    },
}

impl LookupFailure {
    /// The server-supplied message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rejected { body, .. } => body.message.as_deref(),
            Self::Transport { .. } => None,
        }
    }

    /// The server-supplied error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { body, .. } => body.code.as_deref(),
            Self::Transport { .. } => None,
        }
    }
}

/// A source of aircraft records.
#[async_trait::async_trait]
pub trait LookupClient: Send + Sync {
    /// Issue exactly one request for `request`.
    async fn lookup(
        &self,
        request: &LookupRequest,
    ) -> std::result::Result<AircraftRecord, LookupFailure>;
}

/// [`LookupClient`] backed by the lookup HTTP API.
#[derive(Debug, Clone)]
pub struct HttpLookupClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLookupClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:5000/api`).
    ///
    /// `timeout` of `None` keeps the transport default.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("tailfinder/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into(),
        })
    }

    /// The API root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl LookupClient for HttpLookupClient {
    async fn lookup(
        &self,
        request: &LookupRequest,
    ) -> std::result::Result<AircraftRecord, LookupFailure> {
        let url = request.endpoint(&self.base_url);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupFailure::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!("{} -> {}", url, status);

        if status.is_success() {
            return response
                .json::<AircraftRecord>()
                .await
                .map_err(|e| LookupFailure::Transport {
                    message: format!("invalid response body: {e}"),
                });
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|e| {
            warn!("Error response from {} was not JSON: {}", url, e);
            ErrorBody::default()
        });
        Err(LookupFailure::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
