use crate::{
    config::PaperColour,
    driver::PanelCapability,
    layout::Region,
    render::{Frame, ModuleOutput, SubCanvas},
};
use anyhow::{Context, Result};
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Point, Size},
    primitives::Rectangle,
    Pixel,
};
use image::{GrayImage, ImageFormat, Luma};
use log::{debug, warn};
use std::path::{Path, PathBuf};

pub const CANVAS_FILE: &str = "canvas.png";
pub const ACCENT_CANVAS_FILE: &str = "canvas_colour.png";

const INK_LUMA: u8 = 0;
const PAPER_LUMA: u8 = 255;

/// The finished canvases of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub black: Frame,

    /// Present for three colour panels only
    pub accent: Option<Frame>,
}

/// Pastes module images onto the full canvas.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    canvas_size: Size,
    background: PaperColour,
    capability: PanelCapability,
}

impl Compositor {
    pub fn new(canvas_size: Size, background: PaperColour, capability: PanelCapability) -> Self {
        Self {
            canvas_size,
            background,
            capability,
        }
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    fn paper(&self) -> BinaryColor {
        match self.background {
            PaperColour::White => BinaryColor::Off,
            PaperColour::Black => BinaryColor::On,
        }
    }

    /// Composes the canvases for one cycle.
    ///
    /// Outputs are pasted top to bottom. Nothing is drawn outside of the region
    /// an output belongs to; larger outputs are cropped. On a black background
    /// module ink is drawn white.
    pub fn compose(&self, outputs: &[(Region, ModuleOutput)]) -> Composition {
        let paper = self.paper();
        let mut black = Frame::filled(self.canvas_size, paper);
        let mut accent = match self.capability {
            PanelCapability::ThreeColour => Some(Frame::new(self.canvas_size)),
            PanelCapability::TwoColour => None,
        };

        let mut ordered = outputs.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|(region, _)| region.section);

        for (region, output) in ordered {
            let mut black_layer = fit_to_region(&output.black, region);

            match (&mut accent, &output.accent) {
                (Some(accent), Some(layer)) => {
                    paste(accent, region, &fit_to_region(layer, region), false);
                }
                (None, Some(layer)) => black_layer.merge_ink(&fit_to_region(layer, region)),
                (_, None) => {}
            }

            paste(&mut black, region, &black_layer, paper.is_on());
        }

        Composition { black, accent }
    }

    /// Recovers the module image of `region` from a composed canvas.
    pub fn extract(&self, composition: &Composition, region: &Region) -> ModuleOutput {
        let mut black = composition.black.crop(&region.area);
        if self.paper().is_on() {
            black = invert(&black);
        }

        let accent = composition
            .accent
            .as_ref()
            .map(|accent| accent.crop(&region.area))
            .filter(|accent| !accent.is_blank());

        ModuleOutput { black, accent }
    }
}

fn fit_to_region(layer: &Frame, region: &Region) -> Frame {
    if layer.size() == region.size() {
        return layer.clone();
    }

    if layer.size().width > region.size().width || layer.size().height > region.size().height {
        warn!(
            "Output of {}x{} cropped to the {}x{} {} section",
            layer.size().width,
            layer.size().height,
            region.size().width,
            region.size().height,
            region.name()
        );
    } else {
        debug!("Output smaller than the {} section", region.name());
    }

    layer.crop(&Rectangle::new(Point::zero(), region.size()))
}

fn invert(frame: &Frame) -> Frame {
    let mut inverted = Frame::new(frame.size());
    let _ = inverted.draw_iter(frame.rows().enumerate().flat_map(|(y, row)| {
        row.iter()
            .enumerate()
            .map(move |(x, color)| Pixel(Point::new(x as i32, y as i32), color.invert()))
    }));

    inverted
}

/// Copies every pixel of `layer` into `region` of `canvas`, inverting it if asked.
fn paste(canvas: &mut Frame, region: &Region, layer: &Frame, inverted: bool) {
    let mut sub_canvas = SubCanvas::new(region.area, canvas);

    let pixels = layer.rows().enumerate().flat_map(|(y, row)| {
        row.iter().enumerate().map(move |(x, color)| {
            let color = if inverted { color.invert() } else { *color };
            Pixel(Point::new(x as i32, y as i32), color)
        })
    });

    // Frames never fail to draw
    let _ = sub_canvas.draw_iter(pixels);
}

fn to_luma(frame: &Frame) -> GrayImage {
    let Size { width, height } = frame.size();

    GrayImage::from_fn(width, height, |x, y| {
        match frame.pixel(Point::new(x as i32, y as i32)) {
            Some(BinaryColor::On) => Luma([INK_LUMA]),
            _ => Luma([PAPER_LUMA]),
        }
    })
}

fn from_luma(image: &GrayImage) -> Frame {
    let mut frame = Frame::new(Size::new(image.width(), image.height()));

    for (x, y, Luma([luma])) in image.enumerate_pixels() {
        if *luma < 128 {
            frame.set_pixel(Point::new(x as i32, y as i32), BinaryColor::On);
        }
    }

    frame
}

pub(crate) fn write_png(frame: &Frame, path: &Path) -> Result<()> {
    // Renamed into place once complete
    let partial = path.with_extension("png.partial");

    to_luma(frame)
        .save_with_format(&partial, ImageFormat::Png)
        .with_context(|| format!("Could not write {}", partial.display()))?;
    std::fs::rename(&partial, path)
        .with_context(|| format!("Could not move canvas to {}", path.display()))?;

    Ok(())
}

impl Composition {
    pub fn canvas_path(dir: &Path) -> PathBuf {
        dir.join(CANVAS_FILE)
    }

    pub fn accent_path(dir: &Path) -> PathBuf {
        dir.join(ACCENT_CANVAS_FILE)
    }

    /// Writes the canvases as PNG files into `dir`, ink black and paper white.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create {}", dir.display()))?;

        write_png(&self.black, &Self::canvas_path(dir))?;
        if let Some(accent) = &self.accent {
            write_png(accent, &Self::accent_path(dir))?;
        }

        Ok(())
    }

    /// Loads canvases written by [`Composition::save`].
    ///
    /// Returns `None` when there is no saved canvas of `size`.
    pub fn load(dir: &Path, size: Size, capability: PanelCapability) -> Result<Option<Self>> {
        let canvas_path = Self::canvas_path(dir);
        if !canvas_path.exists() {
            return Ok(None);
        }

        let black = from_luma(
            &image::open(&canvas_path)
                .with_context(|| format!("Could not read {}", canvas_path.display()))?
                .to_luma8(),
        );
        if black.size() != size {
            warn!(
                "Ignoring saved canvas of {}x{}, expected {}x{}",
                black.size().width,
                black.size().height,
                size.width,
                size.height
            );
            return Ok(None);
        }

        let accent_path = Self::accent_path(dir);
        let accent = match capability {
            PanelCapability::ThreeColour if accent_path.exists() => {
                let accent = from_luma(
                    &image::open(&accent_path)
                        .with_context(|| format!("Could not read {}", accent_path.display()))?
                        .to_luma8(),
                );
                if accent.size() == size {
                    Some(accent)
                } else {
                    Some(Frame::new(size))
                }
            }
            PanelCapability::ThreeColour => Some(Frame::new(size)),
            PanelCapability::TwoColour => None,
        };

        Ok(Some(Self { black, accent }))
    }
}
