use crate::{
    config::Units,
    render::{text, ModuleLayers, Render, RenderContext},
    sources::{WeatherSnapshot, WeatherSource},
};
use anyhow::{Context, Result};
use embedded_graphics::{
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, Point, Primitive, Size},
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
    transform::Transform,
    Drawable,
};
use embedded_layout::{
    layout::linear::{spacing, LinearLayout},
    prelude::{horizontal, vertical, Align, Chain},
};

const MARGIN: i32 = 4;
const SPACING: i32 = 8;
const MAX_ICON_SIZE: u32 = 48;

/// Temperatures at or beyond these (°C) are drawn in the accent colour
const HOT_CELSIUS: f32 = 30.0;
const COLD_CELSIUS: f32 = 0.0;

/// Broad condition groups of the weatherapi.com condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIcon {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Rain,
    Snow,
    Thunder,
    Unknown,
}

impl WeatherIcon {
    pub fn from_code(code: u32) -> Self {
        match code {
            1000 => Self::Clear,
            1003 => Self::PartlyCloudy,
            1006 | 1009 => Self::Cloudy,
            1030 | 1135 | 1147 => Self::Fog,
            1087 | 1273..=1282 => Self::Thunder,
            1066 | 1069 | 1072 | 1114 | 1117 | 1204..=1237 | 1249..=1264 => Self::Snow,
            1063 | 1150..=1201 | 1240..=1246 => Self::Rain,
            _ => Self::Unknown,
        }
    }
}

pub fn format_temperature(snapshot: &WeatherSnapshot, units: Units) -> String {
    match units {
        Units::Metric => format!("{:.0}°C", snapshot.temperature_c),
        Units::Imperial => format!("{:.0}°F", snapshot.temperature_f),
    }
}

fn is_extreme(temperature_c: f32) -> bool {
    temperature_c >= HOT_CELSIUS || temperature_c <= COLD_CELSIUS
}

/// Current conditions: icon, temperature and a small column of details.
pub struct WeatherRender {
    source: Box<dyn WeatherSource>,
}

impl WeatherRender {
    pub fn new(source: Box<dyn WeatherSource>) -> Self {
        Self { source }
    }
}

impl Render for WeatherRender {
    fn render_name(&self) -> &'static str {
        "Weather"
    }

    fn render(&self, context: &RenderContext<'_>, layers: &mut ModuleLayers) -> Result<()> {
        let snapshot = self
            .source
            .fetch_current()
            .context("Could not get current conditions")?;

        let Size { width, height } = layers.size();

        let icon_size = height.saturating_sub(2 * MARGIN as u32).min(MAX_ICON_SIZE);
        let icon_area = Rectangle::new(
            Point::new(MARGIN, (height - icon_size) as i32 / 2),
            Size::new(icon_size, icon_size),
        );
        draw_icon(
            &mut layers.black,
            WeatherIcon::from_code(snapshot.icon_code),
            icon_area,
        )?;

        let temperature = format_temperature(&snapshot, context.presentation.units);
        let temperature_text = Text::with_baseline(
            &temperature,
            Point::zero(),
            MonoTextStyle::new(&FONT_10X20, BinaryColor::On),
            Baseline::Top,
        )
        .align_to(&icon_area, horizontal::LeftToRight, vertical::Center)
        .translate(Point::new(SPACING, 0));

        let details_x = MARGIN
            + icon_size as i32
            + SPACING
            + (temperature.chars().count() as u32 * FONT_10X20.character_size.width) as i32
            + SPACING;
        let max_chars = text::chars_per_line(&FONT_6X10, width.saturating_sub(details_x as u32));

        let location = text::truncate(&snapshot.location_name, max_chars);
        let condition = text::truncate(&snapshot.condition, max_chars);
        let humidity = text::truncate(&format!("Humidity {:.0}%", snapshot.humidity), max_chars);
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        let details = LinearLayout::vertical(
            Chain::new(Text::new(&location, Point::zero(), small))
                .append(Text::new(&condition, Point::zero(), small))
                .append(Text::new(&humidity, Point::zero(), small)),
        )
        .with_alignment(horizontal::Left)
        .with_spacing(spacing::FixedMargin(1))
        .arrange()
        .align_to(&temperature_text, horizontal::LeftToRight, vertical::Center);
        // Text is both a View and a Transform
        let details = embedded_layout::View::translate(details, Point::new(SPACING, 0));

        if is_extreme(snapshot.temperature_c) {
            temperature_text.draw(&mut layers.accent)?;
        } else {
            temperature_text.draw(&mut layers.black)?;
        }
        details.draw(&mut layers.black)?;

        Ok(())
    }
}

/// Positions inside an icon, in percent of the icon size.
struct IconGrid {
    origin: Point,
    size: i32,
}

impl IconGrid {
    fn at(&self, x: i32, y: i32) -> Point {
        self.origin + Point::new(x * self.size / 100, y * self.size / 100)
    }

    fn len(&self, percent: i32) -> u32 {
        (percent * self.size / 100).max(1) as u32
    }
}

fn draw_cloud<D>(target: &mut D, grid: &IconGrid, dy: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let fill = PrimitiveStyle::with_fill(BinaryColor::On);

    Circle::with_center(grid.at(32, 58 + dy), grid.len(32))
        .into_styled(fill)
        .draw(target)?;
    Circle::with_center(grid.at(56, 48 + dy), grid.len(42))
        .into_styled(fill)
        .draw(target)?;
    Circle::with_center(grid.at(74, 62 + dy), grid.len(26))
        .into_styled(fill)
        .draw(target)?;
    Rectangle::with_corners(grid.at(18, 60 + dy), grid.at(86, 74 + dy))
        .into_styled(fill)
        .draw(target)?;

    Ok(())
}

fn draw_icon<D>(target: &mut D, icon: WeatherIcon, area: Rectangle) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let grid = IconGrid {
        origin: area.top_left,
        size: area.size.width as i32,
    };
    if grid.size < 8 {
        return Ok(());
    }

    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 2);
    let line = |x1, y1, x2, y2| Line::new(grid.at(x1, y1), grid.at(x2, y2)).into_styled(stroke);

    match icon {
        WeatherIcon::Clear => {
            Circle::with_center(grid.at(50, 50), grid.len(44))
                .into_styled(stroke)
                .draw(target)?;

            for (x1, y1, x2, y2) in [
                (50, 2, 50, 16),
                (50, 84, 50, 98),
                (2, 50, 16, 50),
                (84, 50, 98, 50),
                (16, 16, 25, 25),
                (75, 75, 84, 84),
                (16, 84, 25, 75),
                (75, 25, 84, 16),
            ] {
                line(x1, y1, x2, y2).draw(target)?;
            }
        }
        WeatherIcon::PartlyCloudy => {
            Circle::with_center(grid.at(34, 34), grid.len(40))
                .into_styled(stroke)
                .draw(target)?;
            draw_cloud(target, &grid, 10)?;
        }
        WeatherIcon::Cloudy => draw_cloud(target, &grid, 0)?,
        WeatherIcon::Fog => {
            for y in [30, 45, 60, 75] {
                line(10, y, 90, y).draw(target)?;
            }
        }
        WeatherIcon::Rain => {
            draw_cloud(target, &grid, -16)?;
            for x in [30, 50, 70] {
                line(x, 68, x - 8, 92).draw(target)?;
            }
        }
        WeatherIcon::Snow => {
            draw_cloud(target, &grid, -16)?;
            for (x, y) in [(28, 72), (50, 82), (72, 72), (38, 94), (62, 94)] {
                Circle::with_center(grid.at(x, y), grid.len(8))
                    .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                    .draw(target)?;
            }
        }
        WeatherIcon::Thunder => {
            draw_cloud(target, &grid, -16)?;
            line(56, 62, 42, 80).draw(target)?;
            line(42, 80, 58, 80).draw(target)?;
            line(58, 80, 44, 98).draw(target)?;
        }
        WeatherIcon::Unknown => {
            Circle::with_center(grid.at(50, 50), grid.len(90))
                .into_styled(stroke)
                .draw(target)?;
            text::draw_line(target, "?", grid.at(50, 50) - Point::new(3, 5), &FONT_6X10)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{render::Presentation, sources::SourceError};
    use chrono::NaiveDate;

    struct FixedWeather(Option<WeatherSnapshot>);

    impl WeatherSource for FixedWeather {
        fn fetch_current(&self) -> Result<WeatherSnapshot, SourceError> {
            self.0
                .clone()
                .ok_or_else(|| SourceError::Api("quota exceeded".to_owned()))
        }
    }

    fn snapshot(temperature_c: f32) -> WeatherSnapshot {
        WeatherSnapshot {
            location_name: "Philadelphia".to_owned(),
            temperature_c,
            temperature_f: temperature_c * 9.0 / 5.0 + 32.0,
            humidity: 48.0,
            icon_code: 1063,
            condition: "Patchy rain possible".to_owned(),
        }
    }

    fn render(source: FixedWeather) -> Result<ModuleLayers> {
        let presentation = Presentation::default();
        let context = RenderContext {
            now: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(14, 37, 0)
                .unwrap(),
            presentation: &presentation,
        };
        let mut layers = ModuleLayers::new(Size::new(384, 64));

        WeatherRender::new(Box::new(source)).render(&context, &mut layers)?;
        Ok(layers)
    }

    #[test]
    fn mild_weather_is_drawn_in_black() {
        let layers = render(FixedWeather(Some(snapshot(18.0)))).unwrap();

        assert!(layers.black.ink_count() > 0);
        assert!(layers.accent.is_blank());
    }

    #[test]
    fn extreme_temperature_uses_accent() {
        let layers = render(FixedWeather(Some(snapshot(34.0)))).unwrap();

        assert!(!layers.accent.is_blank());
    }

    #[test]
    fn details_are_drawn_right_of_the_temperature() {
        let layers = render(FixedWeather(Some(snapshot(34.0)))).unwrap();

        // Icon column ends at MARGIN + 48, the temperature went to the accent layer
        let details_ink = (60..384)
            .flat_map(|x| (0..64).map(move |y| Point::new(x, y)))
            .filter(|point| layers.black.pixel(*point) == Some(BinaryColor::On))
            .count();
        assert!(details_ink > 0);
    }

    #[test]
    fn source_failure_is_reported() {
        assert!(render(FixedWeather(None)).is_err());
    }

    #[test]
    fn temperature_follows_units() {
        let snapshot = snapshot(20.0);

        assert_eq!(format_temperature(&snapshot, Units::Metric), "20°C");
        assert_eq!(format_temperature(&snapshot, Units::Imperial), "68°F");
    }

    #[test]
    fn condition_codes_map_to_icons() {
        assert_eq!(WeatherIcon::from_code(1000), WeatherIcon::Clear);
        assert_eq!(WeatherIcon::from_code(1195), WeatherIcon::Rain);
        assert_eq!(WeatherIcon::from_code(1225), WeatherIcon::Snow);
        assert_eq!(WeatherIcon::from_code(1276), WeatherIcon::Thunder);
        assert_eq!(WeatherIcon::from_code(42), WeatherIcon::Unknown);
    }
}
