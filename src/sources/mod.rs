//! Narrow interfaces to the outside world the renders draw from.
//!
//! Every source performs blocking network IO and is only ever called from inside
//! of a render cycle, which runs off the async reactor.

use chrono::{NaiveDate, NaiveDateTime};
use std::{error::Error, time::Duration};

pub mod feed;
pub mod ical;
pub mod weather;

pub use feed::RssSource;
pub use ical::IcalSource;
pub use weather::WeatherApiSource;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// A calendar entry in local wall clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub start: NaiveDateTime,

    /// Exclusive end. All day events end at midnight of the day after their
    /// last day.
    pub end: NaiveDateTime,
    pub title: String,
    pub all_day: bool,
}

impl Event {
    /// Days the event covers, first to last.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let first = self.start.date();
        let last = if self.end > self.start {
            // The end instant itself does not belong to the event
            (self.end - chrono::Duration::nanoseconds(1)).date()
        } else {
            first
        };

        first.iter_days().take_while(move |day| *day <= last)
    }

    pub fn overlaps(&self, window: &EventWindow) -> bool {
        let end = self.end.max(self.start);
        self.start < window.end && (end > window.start || self.start >= window.start)
    }
}

/// Half open span of local time events are fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl EventWindow {
    /// `days` whole days starting at midnight of `day`.
    pub fn days_from(day: NaiveDate, days: u32) -> Self {
        let start = day.and_time(chrono::NaiveTime::MIN);

        Self {
            start,
            end: start + chrono::Duration::days(days as i64),
        }
    }

    /// Smallest window covering both windows.
    pub fn union(&self, other: &EventWindow) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

pub trait CalendarSource: Send {
    /// Events overlapping `window`, ordered by start.
    fn fetch_events(&self, window: &EventWindow) -> Result<Vec<Event>, SourceError>;
}

/// Current conditions at the configured location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub temperature_c: f32,
    pub temperature_f: f32,
    pub humidity: f32,

    /// Condition code of the weather API, used to pick the icon
    pub icon_code: u32,
    pub condition: String,
}

pub trait WeatherSource: Send {
    fn fetch_current(&self) -> Result<WeatherSnapshot, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
}

pub trait FeedSource: Send {
    fn fetch_entries(&self) -> Result<Vec<FeedEntry>, SourceError>;
}

#[derive(Debug)]
pub enum SourceError {
    Request { url: String, reason: String },
    Parse { url: String, reason: String },
    Api(String),
}

impl Error for SourceError {}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { url, reason } => write!(f, "Request to {} failed: {}", url, reason),
            Self::Parse { url, reason } => write!(f, "Could not parse {}: {}", url, reason),
            Self::Api(reason) => write!(f, "Weather API error: {}", reason),
        }
    }
}

pub(crate) fn http_client() -> Result<reqwest::blocking::Client, SourceError> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| SourceError::Request {
            url: String::new(),
            reason: e.to_string(),
        })
}

/// Downloads `url` and returns the body.
pub(crate) fn fetch_bytes(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<u8>, SourceError> {
    let request_error = |e: reqwest::Error| SourceError::Request {
        url: url.to_owned(),
        reason: e.to_string(),
    };

    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(request_error)?;

    Ok(response.bytes().map_err(request_error)?.to_vec())
}
