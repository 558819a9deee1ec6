//! Flight-data providers.
//!
//! Two interchangeable backends can answer a lookup. AeroDataBox is the
//! default and has the wider schedule coverage; FlightAware carries richer
//! live-tracking data but only looks a few days ahead.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A flight-data backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// The default provider.
    #[default]
    AeroDataBox,
    /// The alternate provider with a short lookahead window.
    FlightAware,
}

impl Provider {
    /// The identifier used in paths and persisted preferences.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AeroDataBox => "aerodatabox",
            Self::FlightAware => "flightaware",
        }
    }

    /// Human-readable API name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AeroDataBox => "AeroDataBox API",
            Self::FlightAware => "FlightAware API",
        }
    }

    /// Whether this is the alternate (short lookahead) provider.
    #[must_use]
    pub fn is_alternate(self) -> bool {
        self == Self::FlightAware
    }

    /// Resolve a path segment. Only the exact alternate name selects the
    /// alternate provider; anything else, including other casings, is the
    /// default.
    #[must_use]
    pub fn from_segment(segment: &str) -> Self {
        if segment == Self::FlightAware.as_str() {
            Self::FlightAware
        } else {
            Self::default()
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}' (expected 'aerodatabox' or 'flightaware')")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aerodatabox" => Ok(Self::AeroDataBox),
            "flightaware" => Ok(Self::FlightAware),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}
