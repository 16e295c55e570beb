use super::{epd7in5, image_file, PanelCapability, PanelDriver};
use crate::config::Config;
use anyhow::Result;
use embedded_graphics::prelude::Size;
use std::collections::HashMap;

type BuildFn = fn(&Config) -> Result<Box<dyn PanelDriver>>;

/// A panel model selectable with the `panel_model` option.
pub struct PanelModel {
    pub name: &'static str,

    /// Native resolution
    pub size: Size,
    pub capability: PanelCapability,
    build: BuildFn,
}

impl PanelModel {
    pub fn build(&self, config: &Config) -> Result<Box<dyn PanelDriver>> {
        (self.build)(config)
    }
}

lazy_static! {
    static ref PANEL_MODELS: HashMap<&'static str, PanelModel> = [
        PanelModel {
            name: "epd_7_in_5",
            size: Size::new(epd7in5::WIDTH, epd7in5::HEIGHT),
            capability: PanelCapability::TwoColour,
            build: build_epd_7_in_5,
        },
        PanelModel {
            name: "epd_7_in_5_colour",
            size: Size::new(epd7in5::WIDTH, epd7in5::HEIGHT),
            capability: PanelCapability::ThreeColour,
            build: build_epd_7_in_5,
        },
        PanelModel {
            name: "image_file",
            size: Size::new(image_file::WIDTH, image_file::HEIGHT),
            capability: PanelCapability::TwoColour,
            build: build_image_file,
        },
        PanelModel {
            name: "image_file_colour",
            size: Size::new(image_file::WIDTH, image_file::HEIGHT),
            capability: PanelCapability::ThreeColour,
            build: build_image_file,
        },
        PanelModel {
            name: "simulator",
            size: Size::new(640, 384),
            capability: PanelCapability::ThreeColour,
            build: build_simulator,
        },
    ]
    .into_iter()
    .map(|model| (model.name, model))
    .collect();
}

/// Looks up a panel model by its case insensitive name.
pub fn panel_model(name: &str) -> Option<&'static PanelModel> {
    PANEL_MODELS.get(name.trim().to_ascii_lowercase().as_str())
}

/// Names of every known panel model, sorted.
pub fn panel_model_names() -> Vec<&'static str> {
    let mut names = PANEL_MODELS.keys().copied().collect::<Vec<_>>();
    names.sort_unstable();
    names
}

fn capability_of(config: &Config) -> PanelCapability {
    panel_model(&config.panel_model)
        .map(|model| model.capability)
        .unwrap_or(PanelCapability::TwoColour)
}

fn build_image_file(config: &Config) -> Result<Box<dyn PanelDriver>> {
    Ok(Box::new(image_file::ImageFilePanel::new(
        config.output_dir.clone(),
        capability_of(config),
    )))
}

#[cfg(feature = "rpi")]
fn build_epd_7_in_5(config: &Config) -> Result<Box<dyn PanelDriver>> {
    use anyhow::Context;

    let bus = super::bus::RppalBus::new(&config.panel).context("Could not open the panel bus")?;

    Ok(Box::new(epd7in5::Epd7in5::new(bus, capability_of(config))))
}

#[cfg(not(feature = "rpi"))]
fn build_epd_7_in_5(_config: &Config) -> Result<Box<dyn PanelDriver>> {
    Err(super::DriverError::Unavailable("rpi").into())
}

#[cfg(feature = "simulator")]
fn build_simulator(config: &Config) -> Result<Box<dyn PanelDriver>> {
    Ok(Box::new(super::simulator::SimulatorPanel::new(
        capability_of(config),
    )))
}

#[cfg(not(feature = "simulator"))]
fn build_simulator(_config: &Config) -> Result<Box<dyn PanelDriver>> {
    Err(super::DriverError::Unavailable("simulator").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_are_found_case_insensitively() {
        let model = panel_model(" EPD_7_in_5_Colour ").unwrap();

        assert_eq!(model.capability, PanelCapability::ThreeColour);
        assert_eq!(model.size, Size::new(640, 384));
        assert!(panel_model("epd_2_in_9").is_none());
    }

    #[test]
    fn image_file_panels_build_without_hardware() {
        let config = Config {
            panel_model: "image_file_colour".to_owned(),
            ..Config::default()
        };

        let panel = panel_model(&config.panel_model)
            .unwrap()
            .build(&config)
            .unwrap();

        assert_eq!(panel.capability(), PanelCapability::ThreeColour);
        assert_eq!(panel.size(), Size::new(800, 480));
    }

    #[test]
    fn names_are_listed() {
        assert!(panel_model_names().contains(&"image_file"));
    }
}
