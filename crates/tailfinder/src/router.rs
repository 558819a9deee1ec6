//! Maps application paths to views.
//!
//! ```text
//! /                                   search form
//! /aircraft/{flight}/{date}           details, default provider
//! /aircraft/{flight}/{date}/{provider}
//! anything else                       not found
//! ```

use chrono::NaiveDate;

use crate::client::LookupRequest;
use crate::provider::Provider;

/// A resolved application route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The search form.
    Search,
    /// Aircraft details for one lookup.
    Details(LookupRequest),
    /// Catch-all.
    NotFound(String),
}

impl Route {
    /// Resolve `path`. Query strings and fragments are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let trimmed = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_matches('/');

        if trimmed.is_empty() {
            return Self::Search;
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        match segments.as_slice() {
            ["aircraft", flight, date] => Self::details(path, flight, date, None),
            ["aircraft", flight, date, provider] => {
                Self::details(path, flight, date, Some(provider))
            }
            _ => Self::NotFound(path.to_string()),
        }
    }

    fn details(path: &str, flight: &str, date: &str, provider: Option<&str>) -> Self {
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            return Self::NotFound(path.to_string());
        };
        if flight.is_empty() {
            return Self::NotFound(path.to_string());
        }
        Self::Details(LookupRequest {
            flight_number: flight.to_string(),
            date,
            provider: provider.map(Provider::from_segment).unwrap_or_default(),
        })
    }

    /// Canonical path for this route. Details always carry the provider.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Search => "/".to_string(),
            Self::Details(request) => format!(
                "/aircraft/{}/{}/{}",
                request.flight_number,
                request.date.format("%Y-%m-%d"),
                request.provider
            ),
            Self::NotFound(path) => path.clone(),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
