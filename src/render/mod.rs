use crate::config::{TimeFormat, Units, WeekStart};
use anyhow::Result;
use chrono::NaiveDateTime;
use embedded_graphics::prelude::{OriginDimensions, Size};

mod frame;
mod slot;
mod sub_canvas;
pub mod text;

pub use frame::Frame;
pub use slot::{placeholder, ModuleSlot, OutputSource};
pub use sub_canvas::SubCanvas;

/// Presentation options shared by every render.
#[derive(Debug, Clone, Copy, Default)]
pub struct Presentation {
    pub week_starts_on: WeekStart,
    pub time_format: TimeFormat,
    pub units: Units,
}

/// What a render gets to know about the cycle it is drawing for.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Local wall clock time the cycle started at
    pub now: NaiveDateTime,

    pub presentation: &'a Presentation,
}

/// The two drawing planes handed to a render, both sized to its region.
#[derive(Debug, Clone)]
pub struct ModuleLayers {
    pub black: Frame,
    pub accent: Frame,
}

impl ModuleLayers {
    pub fn new(size: Size) -> Self {
        Self {
            black: Frame::new(size),
            accent: Frame::new(size),
        }
    }

    pub fn size(&self) -> Size {
        self.black.size()
    }

    pub fn into_output(self) -> ModuleOutput {
        let Self { black, accent } = self;

        ModuleOutput {
            black,
            accent: if accent.is_blank() { None } else { Some(accent) },
        }
    }
}

/// The finished image of a single module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutput {
    pub black: Frame,

    /// `None` when the module drew nothing in the accent colour
    pub accent: Option<Frame>,
}

/// Draws the content of one screen section.
///
/// Implementations fetch whatever data they need from their source while
/// rendering. Errors are allowed to escape `render`; the [`ModuleSlot`] owning the
/// render turns them into a cached or placeholder image.
pub trait Render: Send {
    /// Short human readable name used in logs and placeholders
    fn render_name(&self) -> &'static str;

    fn render(&self, context: &RenderContext<'_>, layers: &mut ModuleLayers) -> Result<()>;
}
