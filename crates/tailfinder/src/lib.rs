//! `tailfinder` - Find out which aircraft is flying a given flight
//!
//! This library provides the search form, preference storage, lookup client,
//! error classification and details view behind the `tailfind` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod classify;
pub mod cli;
pub mod client;
pub mod config;
pub mod details;
pub mod display;
pub mod error;
pub mod logging;
pub mod provider;
pub mod router;
pub mod search;
pub mod storage;

pub use classify::{classify, LookupError};
pub use client::{AircraftRecord, HttpLookupClient, LookupClient, LookupFailure, LookupRequest};
pub use config::Config;
pub use details::{DetailsView, ProgressSettings, ViewState};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use provider::Provider;
pub use router::Route;
pub use search::{FlightNumber, RecentSearches, SearchForm, SearchRecord};
pub use storage::{Preferences, Storage};
