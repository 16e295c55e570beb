use super::{fetch_bytes, http_client, CalendarSource, Event, EventWindow, SourceError};
use chrono::{Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime};
use log::{debug, warn};

/// Events from one or more iCalendar feeds.
pub struct IcalSource {
    urls: Vec<String>,
}

impl IcalSource {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }
}

impl CalendarSource for IcalSource {
    fn fetch_events(&self, window: &EventWindow) -> Result<Vec<Event>, SourceError> {
        let client = http_client()?;
        let mut events = Vec::new();

        for url in &self.urls {
            let body = fetch_bytes(&client, url)?;
            let text = String::from_utf8_lossy(&body);

            let parsed = parse_events(&text).map_err(|reason| SourceError::Parse {
                url: url.clone(),
                reason,
            })?;
            debug!("Parsed {} events from {}", parsed.len(), url);

            events.extend(parsed);
        }

        Ok(select_events(events, window))
    }
}

/// Keeps the events overlapping `window`, ordered by start then title.
pub fn select_events(events: Vec<Event>, window: &EventWindow) -> Vec<Event> {
    let mut events = events
        .into_iter()
        .filter(|event| event.overlaps(window))
        .collect::<Vec<_>>();

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
    events
}

/// Extracts every `VEVENT` of an iCalendar document in local time.
pub fn parse_events(text: &str) -> Result<Vec<Event>, String> {
    parse_events_in(text, &Local)
}

/// Extracts every `VEVENT` of an iCalendar document, timed events converted to
/// `zone`.
///
/// Floating times and times with an unknown `TZID` are taken as wall clock time
/// of `zone`. All day events end at the exclusive `DTEND` date; when that is
/// missing or not after the start the event covers the start day only.
pub fn parse_events_in<Z: TimeZone>(text: &str, zone: &Z) -> Result<Vec<Event>, String> {
    let calendar: Calendar = text.parse()?;

    let events = calendar
        .components
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(event),
            _ => None,
        })
        .filter_map(|event| {
            let start = event.get_start()?;
            let all_day = matches!(start, DatePerhapsTime::Date(_));
            let start = to_zone(start, zone);

            let end = match event.get_end().map(|end| to_zone(end, zone)) {
                Some(end) if end > start => end,
                _ if all_day => start + Duration::days(1),
                _ => start,
            };

            Some(Event {
                start,
                end,
                title: event.get_summary().unwrap_or("(no title)").trim().to_owned(),
                all_day,
            })
        })
        .collect();

    Ok(events)
}

fn to_zone<Z: TimeZone>(value: DatePerhapsTime, zone: &Z) -> NaiveDateTime {
    match value {
        DatePerhapsTime::Date(date) => date.and_time(NaiveTime::MIN),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(date_time)) => date_time,
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(date_time)) => {
            date_time.with_timezone(zone).naive_local()
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let source = match tzid.trim_matches('"').parse::<Tz>() {
                Ok(source) => source,
                Err(_) => {
                    warn!("Unknown time zone {tzid}, showing {date_time} as local time");
                    return date_time;
                }
            };

            match source.from_local_datetime(&date_time).earliest() {
                Some(date_time) => date_time.with_timezone(zone).naive_local(),
                // Skipped by a daylight saving change
                None => {
                    warn!("{date_time} does not exist in {tzid}, showing it as local time");
                    date_time
                }
            }
        }
    }
}
