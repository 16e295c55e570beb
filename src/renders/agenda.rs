use super::format_time;
use crate::{
    config::TimeFormat,
    render::{text, ModuleLayers, Render, RenderContext},
    sources::{CalendarSource, Event, EventWindow},
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use embedded_graphics::{
    mono_font::ascii::FONT_7X13,
    pixelcolor::BinaryColor,
    prelude::{Point, Primitive, Size},
    primitives::{Line, PrimitiveStyle},
    Drawable,
};
use log::debug;

/// A line of the agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgendaLine {
    Day(NaiveDate),
    Event { time: String, title: String },
}

/// Day headers for every day of the horizon, each followed by the events of that
/// day. Timed events are ordered by start, all day events come first and are
/// repeated on every day they cover.
pub fn agenda_lines(
    events: &[Event],
    today: NaiveDate,
    days: u32,
    time_format: TimeFormat,
) -> Vec<AgendaLine> {
    let mut lines = Vec::new();

    for day in today.iter_days().take(days as usize) {
        lines.push(AgendaLine::Day(day));

        let mut day_events = events
            .iter()
            .filter(|event| event.days().any(|covered| covered == day))
            .collect::<Vec<_>>();
        day_events.sort_by_key(|event| (!event.all_day, event.start));

        lines.extend(day_events.into_iter().map(|event| {
            let time = if event.all_day {
                "All day".to_owned()
            } else if event.start.date() < day {
                // Timed event running past midnight
                "...".to_owned()
            } else {
                format_time(event.start.time(), time_format)
            };

            AgendaLine::Event {
                time,
                title: event.title.clone(),
            }
        }));
    }

    lines
}

/// Width of the time column: the longest time of `lines` plus one blank
/// character.
pub fn time_column_width(lines: &[AgendaLine]) -> u32 {
    let longest = lines
        .iter()
        .filter_map(|line| match line {
            AgendaLine::Event { time, .. } => Some(time.chars().count()),
            AgendaLine::Day(_) => None,
        })
        .max()
        .unwrap_or(0);

    (longest as u32 + 1) * (FONT_7X13.character_size.width + FONT_7X13.character_spacing)
}

/// Chronological list of the upcoming days and their events.
pub struct AgendaRender {
    source: Box<dyn CalendarSource>,
    days: u32,
}

impl AgendaRender {
    pub fn new(source: Box<dyn CalendarSource>, days: u32) -> Self {
        Self { source, days }
    }
}

impl Render for AgendaRender {
    fn render_name(&self) -> &'static str {
        "Agenda"
    }

    fn render(&self, context: &RenderContext<'_>, layers: &mut ModuleLayers) -> Result<()> {
        let today = context.now.date();
        let window = EventWindow::days_from(today, self.days);

        let events = self
            .source
            .fetch_events(&window)
            .context("Could not fetch calendar events")?;

        let Size { width, height } = layers.size();
        let border_x = (width * 2 / 100) as i32;
        let border_y = (height * 2 / 100) as i32;
        let line_width = width.saturating_sub(2 * border_x as u32);

        let line_height = text::line_height(&FONT_7X13) + 2;
        let max_lines = (height.saturating_sub(2 * border_y as u32) / line_height) as usize;

        let lines = agenda_lines(&events, today, self.days, context.presentation.time_format);

        let date_width = line_width * 20 / 100;
        let time_width = time_column_width(&lines).min(line_width.saturating_sub(date_width));
        let time_x = border_x + date_width as i32;
        let title_x = time_x + time_width as i32;
        let title_chars = text::chars_per_line(
            &FONT_7X13,
            line_width.saturating_sub(date_width + time_width),
        );

        for (index, line) in lines.iter().take(max_lines).enumerate() {
            let y = border_y + (index as u32 * line_height) as i32;

            match line {
                AgendaLine::Day(day) => {
                    // Day headers may use the whole line
                    let header = text::truncate(
                        &day.format("%a %-d %b").to_string(),
                        text::chars_per_line(&FONT_7X13, line_width),
                    );
                    text::draw_line(&mut layers.black, &header, Point::new(border_x, y + 1), &FONT_7X13)?;

                    let separator = if *day == today {
                        &mut layers.accent
                    } else {
                        &mut layers.black
                    };
                    Line::new(
                        Point::new(border_x, y),
                        Point::new(border_x + line_width as i32 - 1, y),
                    )
                    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
                    .draw(separator)?;
                }
                AgendaLine::Event { time, title } => {
                    text::draw_line(&mut layers.black, time, Point::new(time_x, y + 1), &FONT_7X13)?;
                    text::draw_line(
                        &mut layers.black,
                        &text::truncate(title, title_chars),
                        Point::new(title_x, y + 1),
                        &FONT_7X13,
                    )?;
                }
            }
        }

        if lines.len() > max_lines {
            debug!(
                "Agenda cropped to {} of {} lines",
                max_lines,
                lines.len()
            );
        }

        Ok(())
    }
}
