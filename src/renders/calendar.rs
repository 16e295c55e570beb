use super::{first_weekday, format_time, start_of_week};
use crate::{
    config::{TimeFormat, WeekStart},
    render::{text, ModuleLayers, Render, RenderContext},
    sources::{CalendarSource, Event, EventWindow},
};
use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_8X13},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::{Point, Primitive, Size},
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
    Drawable,
};
use std::collections::HashSet;

const WEEK_ROWS: usize = 6;

/// Month overview with the current week near the top and the upcoming events
/// listed underneath.
pub struct CalendarRender {
    source: Option<Box<dyn CalendarSource>>,
    window_days: u32,
}

impl CalendarRender {
    pub fn new(source: Option<Box<dyn CalendarSource>>, window_days: u32) -> Self {
        Self {
            source,
            window_days,
        }
    }
}

/// Six weeks of days starting on `week_start`.
///
/// The grid starts on the week of the first of the month. Later in the month it
/// scrolls so the current week is the second row and the grid continues into the
/// next month.
pub fn month_grid(today: NaiveDate, week_start: WeekStart) -> Vec<[NaiveDate; 7]> {
    let month_start = today.with_day(1).unwrap_or(today);
    let mut first = start_of_week(month_start, week_start);

    let current_row = (today - first).num_days() / 7;
    if current_row > 1 {
        first += Duration::weeks(current_row - 1);
    }

    (0..WEEK_ROWS as i64)
        .map(|row| {
            let week = first + Duration::weeks(row);
            std::array::from_fn(|column| week + Duration::days(column as i64))
        })
        .collect()
}

pub fn event_days(events: &[Event]) -> HashSet<NaiveDate> {
    events.iter().flat_map(|event| event.days()).collect()
}

/// Short lines naming the events that have not ended yet.
pub fn upcoming_lines(events: &[Event], now: NaiveDateTime, time_format: TimeFormat) -> Vec<String> {
    let today = now.date();

    events
        .iter()
        .filter(|event| event.end > now || (event.all_day && event.start.date() == today))
        .map(|event| {
            let day = event.start.date();
            let day_str = if day <= today {
                "Today".to_owned()
            } else if day == today + Duration::days(1) {
                "Tomorrow".to_owned()
            } else {
                day.format("%-d %b").to_string()
            };

            let time_str = if event.all_day {
                "all day".to_owned()
            } else {
                format_time(event.start.time(), time_format)
            };

            format!("{day_str} {time_str}: {}", event.title)
        })
        .collect()
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

fn month_title(grid: &[[NaiveDate; 7]], today: NaiveDate) -> String {
    let last = grid.last().map(|week| week[6]).unwrap_or(today);

    if last.month() != today.month() {
        format!("{} - {}", today.format("%B"), last.format("%B %Y"))
    } else {
        today.format("%B %Y").to_string()
    }
}

impl Render for CalendarRender {
    fn render_name(&self) -> &'static str {
        "Calendar"
    }

    fn render(&self, context: &RenderContext<'_>, layers: &mut ModuleLayers) -> Result<()> {
        let Self {
            source,
            window_days,
        } = self;

        let today = context.now.date();
        let week_start = context.presentation.week_starts_on;
        let grid = month_grid(today, week_start);

        let events = match source {
            Some(source) => {
                let grid_days = (WEEK_ROWS * 7) as u32;
                let window = EventWindow::days_from(grid[0][0], grid_days).union(
                    &EventWindow::days_from(today, *window_days),
                );

                source
                    .fetch_events(&window)
                    .context("Could not fetch calendar events")?
            }
            None => Vec::new(),
        };
        let marked_days = event_days(&events);

        let Size { width, height } = layers.size();
        let border_x = (width * 2 / 100) as i32;
        let border_y = (height * 2 / 100) as i32;
        let inner_width = width.saturating_sub(2 * border_x as u32);

        // Month name
        let title = text::truncate(
            &month_title(&grid, today),
            text::chars_per_line(&FONT_10X20, inner_width),
        );
        text::draw_line(
            &mut layers.black,
            &title,
            Point::new(border_x, border_y),
            &FONT_10X20,
        )?;

        let cell_width = inner_width / 7;
        let grid_x = border_x + ((inner_width % 7) / 2) as i32;
        let weekdays_y = border_y + text::line_height(&FONT_10X20) as i32 + 2;
        let grid_y = weekdays_y + text::line_height(&FONT_6X10) as i32 + 2;

        let events_height = height * 25 / 100;
        let grid_height = (height as i32 - grid_y - events_height as i32 - border_y).max(0) as u32;
        let cell_height = grid_height / WEEK_ROWS as u32;

        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let regular = MonoTextStyle::new(&FONT_8X13, BinaryColor::On);

        let first = first_weekday(week_start);
        let weekdays = std::iter::successors(Some(first), |day| Some(day.succ()));
        for (column, weekday) in weekdays.take(7).enumerate() {
            let x = grid_x + column as i32 * cell_width as i32 + cell_width as i32 / 2;
            Text::with_text_style(
                weekday_label(weekday),
                Point::new(x, weekdays_y + 5),
                small,
                centered,
            )
            .draw(&mut layers.black)?;
        }

        for (row, week) in grid.iter().enumerate() {
            for (column, day) in week.iter().enumerate() {
                let center = Point::new(
                    grid_x + column as i32 * cell_width as i32 + cell_width as i32 / 2,
                    grid_y + row as i32 * cell_height as i32 + cell_height as i32 / 2,
                );

                let number = day.day().to_string();
                let style = if day.month() == today.month() {
                    regular
                } else {
                    small
                };
                Text::with_text_style(&number, center, style, centered).draw(&mut layers.black)?;

                if *day == today {
                    let diameter = cell_width.min(cell_height).saturating_sub(2);
                    Circle::with_center(center, diameter)
                        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 2))
                        .draw(&mut layers.accent)?;
                }

                if marked_days.contains(day) {
                    Rectangle::new(center + Point::new(-4, 8), Size::new(9, 2))
                        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                        .draw(&mut layers.black)?;
                }
            }
        }

        // Upcoming events underneath the grid
        let events_y = height as i32 - events_height as i32;
        Line::new(
            Point::new(border_x, events_y - 2),
            Point::new(border_x + inner_width as i32, events_y - 2),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(&mut layers.black)?;

        let line_height = text::line_height(&FONT_6X10);
        let max_lines = (events_height.saturating_sub(border_y as u32) / line_height) as usize;
        let max_chars = text::chars_per_line(&FONT_6X10, inner_width);

        let mut lines = upcoming_lines(&events, context.now, context.presentation.time_format);
        if lines.is_empty() {
            lines.push("No upcoming events.".to_owned());
        }

        for (index, line) in lines.iter().take(max_lines).enumerate() {
            text::draw_line(
                &mut layers.black,
                &text::truncate(line, max_chars),
                Point::new(border_x, events_y + (index as u32 * line_height) as i32),
                &FONT_6X10,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{render::Presentation, sources::SourceError};

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn grid_scrolls_to_keep_current_week_near_top() {
        let grid = month_grid(day(3, 14), WeekStart::Monday);

        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0][0], day(3, 4));
        assert!(grid[1].contains(&day(3, 14)));
        assert_eq!(grid[5][6], day(4, 14));
    }

    #[test]
    fn grid_starts_on_configured_weekday() {
        let grid = month_grid(day(3, 1), WeekStart::Sunday);

        assert_eq!(grid[0][0], day(2, 25));
        assert_eq!(grid[0][0].weekday(), Weekday::Sun);
        assert_eq!(grid[0][5], day(3, 1));
    }

    #[test]
    fn upcoming_lines_skip_finished_events() {
        let now = day(3, 14).and_hms_opt(12, 0, 0).unwrap();
        let events = vec![
            Event {
                start: day(3, 14).and_hms_opt(9, 0, 0).unwrap(),
                end: day(3, 14).and_hms_opt(10, 0, 0).unwrap(),
                title: "Standup".to_owned(),
                all_day: false,
            },
            Event {
                start: day(3, 15).and_hms_opt(8, 30, 0).unwrap(),
                end: day(3, 15).and_hms_opt(9, 0, 0).unwrap(),
                title: "Dentist".to_owned(),
                all_day: false,
            },
            Event {
                start: day(3, 20).and_hms_opt(0, 0, 0).unwrap(),
                end: day(3, 21).and_hms_opt(0, 0, 0).unwrap(),
                title: "Birthday".to_owned(),
                all_day: true,
            },
        ];

        let lines = upcoming_lines(&events, now, TimeFormat::TwentyFourHour);

        assert_eq!(lines, vec!["Tomorrow 08:30: Dentist", "20 Mar all day: Birthday"]);
    }

    struct FixedCalendar(Vec<Event>);

    impl CalendarSource for FixedCalendar {
        fn fetch_events(&self, window: &EventWindow) -> Result<Vec<Event>, SourceError> {
            Ok(self
                .0
                .iter()
                .filter(|event| event.overlaps(window))
                .cloned()
                .collect())
        }
    }

    #[test]
    fn today_is_circled_on_the_accent_layer() {
        let presentation = Presentation::default();
        let context = RenderContext {
            now: day(3, 14).and_hms_opt(14, 37, 0).unwrap(),
            presentation: &presentation,
        };
        let render = CalendarRender::new(
            Some(Box::new(FixedCalendar(vec![Event {
                start: day(3, 15).and_hms_opt(9, 0, 0).unwrap(),
                end: day(3, 15).and_hms_opt(10, 0, 0).unwrap(),
                title: "Review".to_owned(),
                all_day: false,
            }]))),
            42,
        );
        let mut layers = ModuleLayers::new(Size::new(384, 416));

        render.render(&context, &mut layers).unwrap();

        assert!(!layers.accent.is_blank());
        assert!(layers.black.ink_count() > 0);
    }
}
