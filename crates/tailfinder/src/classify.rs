//! Turns raw lookup failures into actionable messages.
//!
//! The two providers have different data horizons, so a bare "not found" is
//! rarely the whole story. Classification runs most specific first:
//!
//! 1. the alternate provider's lookahead window was exceeded;
//! 2. the aircraft assignment is not finalized yet;
//! 3. alternate provider, anything else: a hint based on how far away the
//!    flight is, suggesting the default provider;
//! 4. default provider, anything else: the server message verbatim.
//!
//! A structured `code` in the error body takes precedence over matching on
//! the message text.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::client::{LookupFailure, LookupRequest};

/// Message fragment the alternate provider uses for window overruns.
pub const WINDOW_EXCEEDED_PATTERN: &str = "FlightAware typically only has data for flights within";

/// Message fragment used when the assignment is not final.
pub const NOT_FINALIZED_PATTERN: &str = "aircraft assignment may not be finalized";

/// Structured code for window overruns.
pub const WINDOW_EXCEEDED_CODE: &str = "WINDOW_EXCEEDED";

/// Structured code for unfinalized assignments.
pub const NOT_FINALIZED_CODE: &str = "NOT_FINALIZED";

/// Shown when a request fails without any server message.
pub const GENERIC_FAILURE: &str = "An error occurred while fetching the aircraft data";

/// A classified lookup failure. `Display` is the text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The flight is beyond the alternate provider's lookahead window.
    #[error(
        "Flight information not available yet. FlightAware typically only provides aircraft data \
         for flights within 7 days of departure."
    )]
    WindowExceeded,

    /// The airline has not assigned an aircraft yet.
    #[error(
        "Flight information not available yet. The aircraft assignment may not be finalized this \
         far in advance."
    )]
    NotFinalized,

    /// Alternate provider had nothing and the flight is in the future.
    #[error(
        "Unable to find aircraft information for {flight_number} on {}. FlightAware typically \
         only has data for flights within 7 days of departure. Your flight is {days} days in the \
         future. Try using the AeroDataBox API instead, which may have schedule information.",
        display_date(.date)
    )]
    FutureDate {
        /// Requested flight.
        flight_number: String,
        /// Requested date.
        date: NaiveDate,
        /// Whole days between today and the flight.
        days: i64,
    },

    /// Alternate provider had nothing for a flight today or in the past.
    #[error(
        "Unable to find aircraft information for {flight_number} on {}. FlightAware may not have \
         data for this flight. Try using the AeroDataBox API instead.",
        display_date(.date)
    )]
    NoData {
        /// Requested flight.
        flight_number: String,
        /// Requested date.
        date: NaiveDate,
    },

    /// Default provider error, passed through as sent.
    #[error("{message}")]
    Provider {
        /// Server-supplied message.
        message: String,
    },

    /// Network or decoding failure.
    #[error("{message}")]
    Transport {
        /// What went wrong.
        message: String,
    },
}

impl LookupError {
    /// Whether retrying with the default provider may help.
    #[must_use]
    pub fn suggests_default_provider(&self) -> bool {
        matches!(self, Self::FutureDate { .. } | Self::NoData { .. })
    }

    /// Short machine-friendly name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WindowExceeded => "window_exceeded",
            Self::NotFinalized => "not_finalized",
            Self::FutureDate { .. } => "future_date",
            Self::NoData { .. } => "no_data",
            Self::Provider { .. } => "provider",
            Self::Transport { .. } => "transport",
        }
    }
}

/// US-style `M/D/YYYY`.
fn display_date(date: &NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// Classify `failure` for `request`, measuring future distance from `today`.
#[must_use]
pub fn classify(failure: &LookupFailure, request: &LookupRequest, today: NaiveDate) -> LookupError {
    let message = failure.message().unwrap_or(GENERIC_FAILURE);

    let error = match failure.code() {
        Some(WINDOW_EXCEEDED_CODE) => LookupError::WindowExceeded,
        Some(NOT_FINALIZED_CODE) => LookupError::NotFinalized,
        _ if message.contains(WINDOW_EXCEEDED_PATTERN) => LookupError::WindowExceeded,
        _ if message.contains(NOT_FINALIZED_PATTERN) => LookupError::NotFinalized,
        _ if request.provider.is_alternate() => {
            let days = (request.date - today).num_days();
            if days > 0 {
                LookupError::FutureDate {
                    flight_number: request.flight_number.clone(),
                    date: request.date,
                    days,
                }
            } else {
                LookupError::NoData {
                    flight_number: request.flight_number.clone(),
                    date: request.date,
                }
            }
        }
        _ => match failure {
            LookupFailure::Transport { message: cause } => {
                debug!("Transport failure: {}", cause);
                LookupError::Transport {
                    message: GENERIC_FAILURE.to_string(),
                }
            }
            LookupFailure::Rejected { .. } => LookupError::Provider {
                message: message.to_string(),
            },
        },
    };

    debug!("Classified lookup failure as {}", error.kind());
    error
}
