use super::{check_frames, DriverError, PanelCapability, PanelDriver};
use crate::{compositor::write_png, render::Frame};
use embedded_graphics::prelude::Size;
use log::info;
use std::path::PathBuf;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 480;

pub const PANEL_FILE: &str = "panel.png";
pub const ACCENT_PANEL_FILE: &str = "panel_colour.png";

/// A pretend panel writing every refresh to PNG files.
pub struct ImageFilePanel {
    dir: PathBuf,
    capability: PanelCapability,
    refreshes: usize,
}

impl ImageFilePanel {
    pub fn new(dir: PathBuf, capability: PanelCapability) -> Self {
        Self {
            dir,
            capability,
            refreshes: 0,
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl PanelDriver for ImageFilePanel {
    fn capability(&self) -> PanelCapability {
        self.capability
    }

    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }

    fn init(&mut self) -> Result<(), DriverError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DriverError::Output(e.to_string()))
    }

    fn send(&mut self, black: &Frame, accent: Option<&Frame>) -> Result<(), DriverError> {
        check_frames(self.capability, self.size(), black, accent)?;

        let output_error = |e: anyhow::Error| DriverError::Output(format!("{e:#}"));

        write_png(black, &self.dir.join(PANEL_FILE)).map_err(output_error)?;
        if let (PanelCapability::ThreeColour, Some(accent)) = (self.capability, accent) {
            write_png(accent, &self.dir.join(ACCENT_PANEL_FILE)).map_err(output_error)?;
        }

        self.refreshes += 1;
        info!("Panel image written to {}", self.dir.display());

        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
