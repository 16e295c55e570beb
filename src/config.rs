use crate::{
    driver::registry,
    layout::{self, Placement, Section},
    render::Presentation,
    scheduler::UpdateInterval,
    sources::weather::Location,
};
use anyhow::{Context, Result};
use embedded_graphics::prelude::Size;
use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use strum_macros::{AsRefStr, EnumString};

/// Name of the configuration file looked up in the home directory.
pub const CONFIG_FILE: &str = "rustic-ink-display.yaml";

/// Content a screen section can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SectionContent {
    Weather,
    Calendar,
    Agenda,
    Rss,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaperColour {
    #[default]
    White,
    Black,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, EnumString, AsRefStr)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    #[strum(serialize = "24h")]
    TwentyFourHour,

    #[serde(rename = "12h")]
    #[strum(serialize = "12h")]
    TwelveHour,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct WeatherConfig {
    pub api_key: String,
    pub location: Location,
}

/// Wiring of the SPI panels. Pin numbers are BCM GPIO numbers.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PanelBusConfig {
    pub spi_clock_hz: u32,
    pub rst_pin: u8,
    pub dc_pin: u8,
    pub busy_pin: u8,

    /// How long to wait for the controller to drop its busy line
    pub busy_timeout_secs: u64,
}

impl Default for PanelBusConfig {
    fn default() -> Self {
        Self {
            spi_clock_hz: 4_000_000,
            rst_pin: 17,
            dc_pin: 25,
            busy_pin: 24,
            busy_timeout_secs: 60,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub display_width: u32,
    pub display_height: u32,
    pub panel_model: String,

    pub top_section: Option<String>,
    pub middle_section: Option<String>,
    pub bottom_section: Option<String>,
    pub section_heights: Option<[u32; 3]>,

    /// Minutes between refreshes, must divide 60
    pub update_interval: u32,
    pub calibration_hours: Vec<u32>,
    pub calibration_cycles: u32,

    pub background_colour: PaperColour,
    pub orientation: u32,
    pub skip_unchanged: bool,

    pub week_starts_on: WeekStart,
    pub time_format: TimeFormat,
    pub units: Units,
    pub agenda_days: u32,
    pub calendar_window_days: u32,

    pub ical_urls: Vec<String>,
    pub rss_feeds: Vec<String>,
    pub weather: Option<WeatherConfig>,

    pub output_dir: PathBuf,
    pub panel: PanelBusConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_width: 480,
            display_height: 800,
            panel_model: "image_file".to_owned(),
            top_section: None,
            middle_section: None,
            bottom_section: None,
            section_heights: None,
            update_interval: 60,
            calibration_hours: vec![0, 12, 18],
            calibration_cycles: 3,
            background_colour: PaperColour::default(),
            orientation: 0,
            skip_unchanged: false,
            week_starts_on: WeekStart::default(),
            time_format: TimeFormat::default(),
            units: Units::default(),
            agenda_days: 7,
            calendar_window_days: 42,
            ical_urls: Vec::new(),
            rss_feeds: Vec::new(),
            weather: None,
            output_dir: PathBuf::from("output"),
            panel: PanelBusConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidInterval(u32),
    InvalidCalibrationHour(u32),
    InvalidCalibrationCycles,
    InvalidOrientation(u32),
    UnknownPanelModel(String),
    CanvasSize { canvas: Size, panel: Size },
    UnknownRenderer { section: Section, name: String },
    RegionOverlap(Section, Section),
    RegionOutOfBounds(Section),
    MissingSource {
        section: Section,
        option: &'static str,
    },
}

impl Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInterval(minutes) => write!(
                f,
                "Update interval of {} minutes does not divide an hour",
                minutes
            ),
            Self::InvalidCalibrationHour(hour) => {
                write!(f, "Calibration hour {} is not between 0 and 23", hour)
            }
            Self::InvalidCalibrationCycles => write!(f, "Calibration needs at least one cycle"),
            Self::InvalidOrientation(degrees) => {
                write!(f, "Orientation {} is not supported, use 0 or 180", degrees)
            }
            Self::UnknownPanelModel(model) => write!(
                f,
                "Panel model \"{}\" was not found, known models are {}",
                model,
                registry::panel_model_names().join(", ")
            ),
            Self::CanvasSize { canvas, panel } => write!(
                f,
                "Canvas of {}x{} does not fit a {}x{} panel",
                canvas.width, canvas.height, panel.width, panel.height
            ),
            Self::UnknownRenderer { section, name } => write!(
                f,
                "Render \"{}\" of the {} section was not found",
                name,
                section.as_ref()
            ),
            Self::RegionOverlap(first, second) => write!(
                f,
                "The {} and {} sections overlap",
                first.as_ref(),
                second.as_ref()
            ),
            Self::RegionOutOfBounds(section) => {
                write!(f, "The {} section exceeds the canvas", section.as_ref())
            }
            Self::MissingSource { section, option } => write!(
                f,
                "The {} section needs the \"{}\" option",
                section.as_ref(),
                option
            ),
        }
    }
}

impl Config {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_yaml::from_reader(reader).context("Unable to parse YAML file")
    }

    /// Reads and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file {}", path.display()))?;

        let config = Self::from_reader(BufReader::new(file))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf> {
        let home_dir = std::env::var("HOME").context("Can not load HOME environment variable")?;

        Ok(Path::new(&home_dir).join(CONFIG_FILE))
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.display_width, self.display_height)
    }

    pub fn presentation(&self) -> Presentation {
        Presentation {
            week_starts_on: self.week_starts_on,
            time_format: self.time_format,
            units: self.units,
        }
    }

    /// Regions of the canvas and the content assigned to each of them.
    pub fn placements(&self) -> Result<Vec<Placement>, ConfigError> {
        layout::compute(
            self.canvas_size(),
            self.section_heights,
            [
                self.top_section.as_deref(),
                self.middle_section.as_deref(),
                self.bottom_section.as_deref(),
            ],
        )
    }

    /// Checks everything that can be checked without touching the network or
    /// the panel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        UpdateInterval::new(self.update_interval)?;

        if let Some(hour) = self.calibration_hours.iter().find(|hour| **hour > 23) {
            return Err(ConfigError::InvalidCalibrationHour(*hour));
        }

        if self.calibration_cycles == 0 {
            return Err(ConfigError::InvalidCalibrationCycles);
        }

        if self.orientation != 0 && self.orientation != 180 {
            return Err(ConfigError::InvalidOrientation(self.orientation));
        }

        let model = registry::panel_model(&self.panel_model)
            .ok_or_else(|| ConfigError::UnknownPanelModel(self.panel_model.clone()))?;

        let canvas = self.canvas_size();
        let transposed = Size::new(canvas.height, canvas.width);
        if canvas != model.size && transposed != model.size {
            return Err(ConfigError::CanvasSize {
                canvas,
                panel: model.size,
            });
        }

        for placement in self.placements()? {
            let section = placement.region.section;
            let missing = match placement.content {
                Some(SectionContent::Weather) if self.weather.is_none() => Some("weather"),
                Some(SectionContent::Agenda) if self.ical_urls.is_empty() => Some("ical_urls"),
                Some(SectionContent::Rss) if self.rss_feeds.is_empty() => Some("rss_feeds"),
                _ => None,
            };

            if let Some(option) = missing {
                return Err(ConfigError::MissingSource { section, option });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
display_width: 384
display_height: 640
panel_model: epd_7_in_5_colour
top_section: weather
middle_section: Calendar
bottom_section: rss
update_interval: 20
calibration_hours: [0, 12]
time_format: 12h
week_starts_on: sunday
units: imperial
ical_urls:
  - https://example.com/basic.ics
rss_feeds:
  - https://example.com/feed.xml
weather:
  api_key: secret
  location: !City Philadelphia
panel:
  busy_pin: 5
"#;

    fn parse(yaml: &str) -> Config {
        Config::from_reader(yaml.as_bytes()).unwrap()
    }

    #[test]
    fn example_configuration_is_valid() {
        let config = parse(EXAMPLE);

        config.validate().unwrap();
        assert_eq!(config.time_format, TimeFormat::TwelveHour);
        assert_eq!(config.week_starts_on, WeekStart::Sunday);
        assert_eq!(config.units, Units::Imperial);
        assert_eq!(config.panel.busy_pin, 5);
        assert_eq!(config.panel.rst_pin, 17);
        assert_eq!(config.calibration_cycles, 3);
        assert!(matches!(
            config.weather.map(|weather| weather.location),
            Some(Location::City(city)) if city == "Philadelphia"
        ));
    }

    #[test]
    fn interval_not_dividing_an_hour_is_rejected() {
        let mut config = parse(EXAMPLE);
        config.update_interval = 25;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval(25))
        ));
    }

    #[test]
    fn unknown_panel_model_is_rejected() {
        let mut config = parse(EXAMPLE);
        config.panel_model = "epd_13_in_3".to_owned();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownPanelModel(model)) if model == "epd_13_in_3"
        ));

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("epd_7_in_5_colour, image_file"));
    }

    #[test]
    fn unknown_section_content_is_rejected() {
        let mut config = parse(EXAMPLE);
        config.bottom_section = Some("stocks".to_owned());

        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownRenderer {
                section: Section::Bottom,
                ..
            })
        ));
    }

    #[test]
    fn canvas_must_match_the_panel() {
        let mut config = parse(EXAMPLE);
        config.display_width = 400;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::CanvasSize { .. })
        ));
    }

    #[test]
    fn bad_calibration_hour_is_rejected() {
        let mut config = parse(EXAMPLE);
        config.calibration_hours = vec![3, 24];

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCalibrationHour(24))
        ));
    }

    #[test]
    fn sections_need_their_sources() {
        let mut config = parse(EXAMPLE);
        config.rss_feeds.clear();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSource {
                section: Section::Bottom,
                option: "rss_feeds"
            })
        ));
    }

    #[test]
    fn defaults_fill_in_missing_options() {
        let config = parse("panel_model: image_file\n");

        config.validate().unwrap();
        assert_eq!(config.update_interval, 60);
        assert_eq!(config.canvas_size(), Size::new(480, 800));
        assert!(config.top_section.is_none());
    }
}
