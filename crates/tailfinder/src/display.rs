//! Text rendering for the terminal views.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use crate::client::{AircraftRecord, FlightLeg, LookupRequest, NOT_AVAILABLE};
use crate::details::ViewState;
use crate::search::RecentSearches;

/// Data source string the alternate provider stamps on its records.
pub const FLIGHTAWARE_SOURCE: &str = "FlightAware AeroAPI";

/// Visual weight of a flight status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    /// Nothing known.
    Default,
    /// Scheduled.
    Info,
    /// Airborne.
    Success,
    /// Landed or arrived.
    Primary,
    /// Delayed or diverted.
    Warning,
    /// Cancelled.
    Error,
}

impl StatusTone {
    /// Tone for a status string; first matching keyword wins.
    #[must_use]
    pub fn for_status(status: &str) -> Self {
        if status.is_empty() || status == NOT_AVAILABLE {
            return Self::Default;
        }
        let status = status.to_lowercase();
        let has = |needle: &str| status.contains(needle);
        if has("scheduled") {
            Self::Info
        } else if has("active") || has("en route") {
            Self::Success
        } else if has("landed") || has("arrived") {
            Self::Primary
        } else if has("delayed") || has("diverted") {
            Self::Warning
        } else if has("cancelled") {
            Self::Error
        } else {
            Self::Default
        }
    }

    /// Short marker shown next to the status.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Default => "·",
            Self::Info => "○",
            Self::Success => "▶",
            Self::Primary => "●",
            Self::Warning => "!",
            Self::Error => "✕",
        }
    }
}

/// Format a backend timestamp as `Thu, Oct 29, 2026, 08:30 AM`.
///
/// Times are shown in the offset they were sent with. Missing values become
/// [`NOT_AVAILABLE`]; anything unparsable is returned unchanged.
#[must_use]
pub fn format_date_time(value: &str) -> String {
    const OUTPUT: &str = "%a, %b %-d, %Y, %I:%M %p";

    let value = value.trim();
    if value.is_empty() || value == NOT_AVAILABLE {
        return NOT_AVAILABLE.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.format(OUTPUT).to_string();
    }
    for format in ["%Y-%m-%d %H:%M%:z", "%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return dt.format(OUTPUT).to_string();
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return dt.format(OUTPUT).to_string();
        }
    }
    value.to_string()
}

fn is_available(value: &str) -> bool {
    !value.is_empty() && value != NOT_AVAILABLE
}

fn push_leg(out: &mut Vec<String>, title: &str, leg: &FlightLeg) {
    out.push(title.to_string());
    out.push(format!("  Airport:     {}", leg.airport));
    out.push(format!(
        "  Scheduled:   {}",
        format_date_time(&leg.scheduled_time)
    ));
    if is_available(&leg.terminal) {
        out.push(format!("  Terminal:    {}", leg.terminal));
    }
    if is_available(&leg.gate) {
        out.push(format!("  Gate:        {}", leg.gate));
    }
}

/// Plain-text rendering of a found aircraft.
#[must_use]
pub fn render_aircraft(record: &AircraftRecord, request: &LookupRequest) -> String {
    let tone = StatusTone::for_status(&record.status);
    let mut out = vec![
        format!("{} {}", record.airline, record.flight_number),
        format!("Status:        {} {}", tone.marker(), record.status),
        String::new(),
        "Aircraft".to_string(),
        format!("  Registration: {}", record.registration),
        format!("  Model:        {}", record.model),
    ];

    if record.data_source == FLIGHTAWARE_SOURCE {
        if let Some(age) = record.aircraft_age.as_deref().filter(|a| is_available(a)) {
            out.push(format!("  Age:          {age} years"));
        }
        if let Some(distance) = record
            .distance
            .as_ref()
            .filter(|d| is_available(&d.kilometers))
        {
            out.push(format!(
                "  Distance:     {} km ({} miles)",
                distance.kilometers, distance.miles
            ));
        }
    }

    out.push(String::new());
    push_leg(&mut out, "Departure", &record.departure);
    out.push(String::new());
    push_leg(&mut out, "Arrival", &record.arrival);
    out.push(String::new());
    out.push(format!(
        "Data source:   {} (via {})",
        record.data_source,
        request.provider.label()
    ));
    out.join("\n")
}

/// Plain-text rendering of a settled or loading details view.
#[must_use]
pub fn render_view(state: &ViewState, request: &LookupRequest) -> String {
    match state {
        ViewState::Loading { progress } => format!(
            "Looking up {} on {} ({}%)",
            request.flight_number, request.date, progress
        ),
        ViewState::Success(record) => render_aircraft(record, request),
        ViewState::Failed(error) => format!(
            "{error}\n\nRequested via {}. Run `tailfind search` to try again.",
            request.provider.label()
        ),
    }
}

/// The not-found view.
#[must_use]
pub fn render_not_found(path: &str) -> String {
    format!("Page not found: {path}\n\nRun `tailfind open /` to return to the search form.")
}

/// The recent-search list, numbered from 1.
#[must_use]
pub fn render_recent(recent: &RecentSearches) -> String {
    if recent.is_empty() {
        return "No recent searches.".to_string();
    }
    recent
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let provider = record
                .provider
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            format!(
                "{:>2}. {:<8} {}  {}",
                i + 1,
                record.flight_number,
                record.date,
                provider
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Machine-readable form of a details view.
#[derive(Debug, Serialize)]
pub struct ViewReport<'a> {
    /// Canonical route of the lookup.
    pub route: String,
    /// The lookup parameters.
    pub request: &'a LookupRequest,
    /// `loading`, `success` or `failed`.
    pub state: &'static str,
    /// The aircraft, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<&'a AircraftRecord>,
    /// Status tone, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<StatusTone>,
    /// Error kind, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Error text, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> ViewReport<'a> {
    /// Build a report for `state`.
    #[must_use]
    pub fn new(state: &'a ViewState, request: &'a LookupRequest) -> Self {
        let mut report = Self {
            route: crate::router::Route::Details(request.clone()).path(),
            request,
            state: "loading",
            aircraft: None,
            tone: None,
            error_kind: None,
            error: None,
        };
        match state {
            ViewState::Loading { .. } => {}
            ViewState::Success(record) => {
                report.state = "success";
                report.aircraft = Some(record);
                report.tone = Some(StatusTone::for_status(&record.status));
            }
            ViewState::Failed(error) => {
                report.state = "failed";
                report.error_kind = Some(error.kind());
                report.error = Some(error.to_string());
            }
        }
        report
    }
}
