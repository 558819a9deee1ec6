//! The search form: flight number validation, recent-search history and the
//! hand-off to the details view.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::LookupRequest;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::router::Route;
use crate::storage::{Preferences, Storage};

/// Upper bound on the number of remembered searches.
pub const MAX_RECENT_SEARCHES: usize = 5;

/// Notification shown when the flight number is rejected.
pub const INVALID_FLIGHT_NUMBER: &str = "Please enter a valid flight number (e.g., BA123)";

/// 2-3 alphanumerics (the carrier code) followed by 1-4 digits.
const FLIGHT_NUMBER_PATTERN: &str = r"(?i)^[A-Z0-9]{2,3}[0-9]{1,4}$";

fn flight_number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(FLIGHT_NUMBER_PATTERN).expect("Invalid regex pattern"))
}

/// Check whether `value` looks like a flight number (e.g. `BA123`).
#[must_use]
pub fn is_valid_flight_number(value: &str) -> bool {
    flight_number_regex().is_match(value)
}

/// A validated, upper-cased flight number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlightNumber(String);

impl FlightNumber {
    /// Canonicalize and validate user input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the input is empty or malformed.
    pub fn parse(input: &str) -> Result<Self> {
        let canonical = canonicalize(input);
        if canonical.is_empty() || !is_valid_flight_number(&canonical) {
            return Err(Error::validation(INVALID_FLIGHT_NUMBER));
        }
        Ok(Self(canonical))
    }

    /// The flight number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlightNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upper-case input as it is typed. Surrounding whitespace is dropped.
#[must_use]
pub fn canonicalize(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Parse the date widget value into a calendar date.
///
/// Accepts `YYYY-MM-DD` or a date-time; the time of day is dropped without
/// any timezone conversion.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if nothing matches.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt.date());
        }
    }
    Err(Error::InvalidDate {
        input: input.to_string(),
    })
}

/// A remembered lookup.
///
/// Serialized with the same keys the history has always used, so records
/// written before provider tracking still load (with `provider == None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// The upper-cased flight number.
    #[serde(rename = "flightNumber")]
    pub flight_number: String,
    /// Calendar date of the flight.
    pub date: NaiveDate,
    /// Provider used for the search.
    #[serde(
        rename = "apiProvider",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider: Option<Provider>,
}

impl SearchRecord {
    /// Create a record for a submitted search.
    #[must_use]
    pub fn new(flight_number: &FlightNumber, date: NaiveDate, provider: Provider) -> Self {
        Self {
            flight_number: flight_number.as_str().to_string(),
            date,
            provider: Some(provider),
        }
    }

    /// Whether `other` refers to the same flight on the same day.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.flight_number == other.flight_number && self.date == other.date
    }

    /// The lookup this record re-runs. Records without a stored provider
    /// use `fallback`.
    #[must_use]
    pub fn to_request(&self, fallback: Provider) -> LookupRequest {
        LookupRequest {
            flight_number: self.flight_number.clone(),
            date: self.date,
            provider: self.provider.unwrap_or(fallback),
        }
    }
}

/// Most-recent-first list of searches, unique on (flight number, date).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches(Vec<SearchRecord>);

impl RecentSearches {
    /// Build from persisted records, restoring the invariants in case the
    /// stored list was edited by hand.
    #[must_use]
    pub fn from_records(records: Vec<SearchRecord>, cap: usize) -> Self {
        let mut recent = Self::default();
        for record in records.into_iter().rev() {
            recent.record(record, cap);
        }
        recent
    }

    /// Put `record` at the front, dropping any entry with the same key and
    /// anything beyond `cap` entries.
    pub fn record(&mut self, record: SearchRecord, cap: usize) {
        let cap = cap.clamp(1, MAX_RECENT_SEARCHES);
        self.0.retain(|existing| !existing.same_key(&record));
        self.0.insert(0, record);
        self.0.truncate(cap);
    }

    /// Entry at `index` (0 = most recent).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SearchRecord> {
        self.0.get(index)
    }

    /// Iterate most recent first.
    pub fn iter(&self) -> std::slice::Iter<'_, SearchRecord> {
        self.0.iter()
    }

    /// Number of remembered searches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no searches are remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecentSearches {
    type Item = &'a SearchRecord;
    type IntoIter = std::slice::Iter<'a, SearchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The search form controller.
///
/// Holds the in-progress form fields. Preferences are read once when the
/// form is opened and written back as a whole on every valid submission.
#[derive(Debug)]
pub struct SearchForm<'a> {
    storage: &'a Storage,
    preferences: Preferences,
    max_recent: usize,
    flight_number: String,
    date: NaiveDate,
    provider: Provider,
}

impl<'a> SearchForm<'a> {
    /// Open the form, selecting the persisted provider (or `default_provider`
    /// when none was saved).
    ///
    /// # Errors
    ///
    /// Returns an error if the preferences cannot be read.
    pub fn open(
        storage: &'a Storage,
        default_provider: Provider,
        max_recent: usize,
        today: NaiveDate,
    ) -> Result<Self> {
        let preferences = storage.load(max_recent)?;
        let provider = preferences.provider.unwrap_or(default_provider);
        Ok(Self {
            storage,
            preferences,
            max_recent,
            flight_number: String::new(),
            date: today,
            provider,
        })
    }

    /// Update the flight number field; input is upper-cased.
    pub fn set_flight_number(&mut self, input: &str) {
        self.flight_number = canonicalize(input);
    }

    /// Update the date field.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    /// Select a provider.
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
    }

    /// Current flight number field.
    #[must_use]
    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    /// Currently selected provider.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Remembered searches, most recent first.
    #[must_use]
    pub fn recent(&self) -> &RecentSearches {
        &self.preferences.recent
    }

    /// Validate, record the search, persist preferences and return the
    /// details route to navigate to.
    ///
    /// Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad flight number, or a storage
    /// error if the preferences cannot be saved.
    pub fn submit(&mut self) -> Result<Route> {
        let flight_number = FlightNumber::parse(&self.flight_number)?;
        let record = SearchRecord::new(&flight_number, self.date, self.provider);
        let request = record.to_request(self.provider);

        let mut updated = self.preferences.clone();
        updated.recent.record(record, self.max_recent);
        updated.provider = Some(self.provider);
        self.storage.save(&updated)?;
        self.preferences = updated;

        info!(
            "Searching {} on {} via {}",
            request.flight_number, request.date, request.provider
        );
        Ok(Route::Details(request))
    }

    /// Route for re-running the recent search at `index`.
    #[must_use]
    pub fn select_recent(&self, index: usize) -> Option<Route> {
        let record = self.preferences.recent.get(index)?;
        debug!("Re-running recent search #{}", index + 1);
        Some(Route::Details(record.to_request(self.provider)))
    }
}
