use crate::{
    config::{Config, ConfigError, SectionContent, TimeFormat, WeekStart},
    layout::Placement,
    render::{ModuleSlot, Render},
    sources::{CalendarSource, IcalSource, RssSource, WeatherApiSource},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

pub mod agenda;
pub mod calendar;
pub mod rss;
pub mod weather;

pub use agenda::AgendaRender;
pub use calendar::CalendarRender;
pub use rss::RssRender;
pub use weather::WeatherRender;

/// Builds the render showing `content`, wired to the sources named in `config`.
pub fn build_render(
    placement: &Placement,
    content: SectionContent,
    config: &Config,
) -> Result<Box<dyn Render>, ConfigError> {
    let section = placement.region.section;
    let missing = |option| ConfigError::MissingSource { section, option };

    let render: Box<dyn Render> = match content {
        SectionContent::Weather => {
            let weather = config.weather.clone().ok_or_else(|| missing("weather"))?;
            Box::new(WeatherRender::new(Box::new(WeatherApiSource::new(weather))))
        }
        SectionContent::Calendar => {
            let source = (!config.ical_urls.is_empty()).then(|| {
                Box::new(IcalSource::new(config.ical_urls.clone())) as Box<dyn CalendarSource>
            });
            Box::new(CalendarRender::new(source, config.calendar_window_days))
        }
        SectionContent::Agenda => {
            if config.ical_urls.is_empty() {
                return Err(missing("ical_urls"));
            }
            Box::new(AgendaRender::new(
                Box::new(IcalSource::new(config.ical_urls.clone())),
                config.agenda_days,
            ))
        }
        SectionContent::Rss => {
            if config.rss_feeds.is_empty() {
                return Err(missing("rss_feeds"));
            }
            Box::new(RssRender::new(Box::new(RssSource::new(
                config.rss_feeds.clone(),
            ))))
        }
    };

    Ok(render)
}

/// One slot per section that has content assigned, top to bottom.
pub fn build_slots(config: &Config) -> Result<Vec<ModuleSlot>, ConfigError> {
    config
        .placements()?
        .iter()
        .filter_map(|placement| placement.content.map(|content| (placement, content)))
        .map(|(placement, content)| {
            build_render(placement, content, config)
                .map(|render| ModuleSlot::new(placement.region, render))
        })
        .collect()
}

pub(crate) fn format_time(time: NaiveTime, format: TimeFormat) -> String {
    match format {
        TimeFormat::TwentyFourHour => time.format("%H:%M").to_string(),
        TimeFormat::TwelveHour => time.format("%-I:%M %p").to_string(),
    }
}

pub(crate) fn first_weekday(week_start: WeekStart) -> Weekday {
    match week_start {
        WeekStart::Monday => Weekday::Mon,
        WeekStart::Sunday => Weekday::Sun,
    }
}

/// The day starting the week that contains `date`.
pub(crate) fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let first = first_weekday(week_start).num_days_from_monday();
    let current = date.weekday().num_days_from_monday();

    date - Duration::days(((7 + current - first) % 7) as i64)
}
