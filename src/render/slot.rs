use super::{text, Frame, ModuleLayers, ModuleOutput, Render, RenderContext};
use crate::layout::Region;
use anyhow::anyhow;
use embedded_graphics::{
    mono_font::ascii::FONT_6X10,
    pixelcolor::BinaryColor,
    prelude::{OriginDimensions, Point, Primitive, Size},
    primitives::{Line, PrimitiveStyle, Rectangle},
    Drawable,
};
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};

/// A render bound to the region it draws into.
///
/// The slot is the failure boundary of a render: whatever happens inside of
/// [`Render::render`], [`ModuleSlot::produce`] hands back an image that is exactly
/// the size of the region. A failed render is replaced by the last image the slot
/// produced successfully, or by a placeholder if there is none yet.
pub struct ModuleSlot {
    region: Region,
    render: Box<dyn Render>,

    /// Last successfully rendered image, reused when the render fails
    cached_output: Option<ModuleOutput>,
}

/// Where the image returned by [`ModuleSlot::produce`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Fresh,
    Cached,
    Placeholder,
}

impl ModuleSlot {
    pub fn new(region: Region, render: Box<dyn Render>) -> Self {
        Self {
            region,
            render,
            cached_output: None,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn render_name(&self) -> &'static str {
        self.render.render_name()
    }

    /// Seeds the fallback cache, e.g. with the region cut out of the last
    /// persisted canvas. Outputs of the wrong size are ignored.
    pub fn seed_cache(&mut self, output: ModuleOutput) {
        if output.black.size() == self.region.size() {
            self.cached_output = Some(output);
        }
    }

    pub fn produce(&mut self, context: &RenderContext<'_>) -> (ModuleOutput, OutputSource) {
        let Self {
            region,
            render,
            cached_output,
        } = self;

        let mut layers = ModuleLayers::new(region.size());

        let result = panic::catch_unwind(AssertUnwindSafe(|| render.render(context, &mut layers)))
            .unwrap_or_else(|_| Err(anyhow!("render panicked")));

        match result {
            Ok(()) => {
                debug!(
                    "{} rendered into {} section",
                    render.render_name(),
                    region.name()
                );

                let output = layers.into_output();
                *cached_output = Some(output.clone());
                (output, OutputSource::Fresh)
            }
            Err(error) => match cached_output {
                Some(cached) => {
                    warn!(
                        "{} failed in {} section, showing previous image: {error:#}",
                        render.render_name(),
                        region.name()
                    );
                    (cached.clone(), OutputSource::Cached)
                }
                None => {
                    warn!(
                        "{} failed in {} section, showing placeholder: {error:#}",
                        render.render_name(),
                        region.name()
                    );
                    (
                        placeholder(region.size(), render.render_name()),
                        OutputSource::Placeholder,
                    )
                }
            },
        }
    }
}

/// A crossed out box with the module name, clearly different from real content.
pub fn placeholder(size: Size, render_name: &str) -> ModuleOutput {
    let mut black = Frame::new(size);
    let style = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
    let bottom_right = Point::new(size.width as i32 - 1, size.height as i32 - 1);

    // Drawing into a frame can not fail
    let _ = Rectangle::new(Point::zero(), size)
        .into_styled(style)
        .draw(&mut black);
    let _ = Line::new(Point::zero(), bottom_right)
        .into_styled(style)
        .draw(&mut black);
    let _ = Line::new(Point::new(0, bottom_right.y), Point::new(bottom_right.x, 0))
        .into_styled(style)
        .draw(&mut black);

    let label = text::truncate(
        &format!("{render_name} unavailable"),
        text::chars_per_line(&FONT_6X10, size.width.saturating_sub(4)),
    );
    let label_area = Rectangle::new(
        Point::new(2, 2),
        Size::new(size.width.saturating_sub(4), text::line_height(&FONT_6X10)),
    );
    let _ = label_area
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(&mut black);
    let _ = text::draw_line(&mut black, &label, label_area.top_left, &FONT_6X10);

    ModuleOutput {
        black,
        accent: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layout::Section, render::Presentation};
    use anyhow::{bail, Result};
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct ScriptedRender {
        outcomes: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Render for ScriptedRender {
        fn render_name(&self) -> &'static str {
            "Scripted"
        }

        fn render(&self, _context: &RenderContext<'_>, layers: &mut ModuleLayers) -> Result<()> {
            match self.outcomes.lock().remove(0) {
                "ok" => {
                    layers.black.set_pixel(Point::new(1, 1), BinaryColor::On);
                    Ok(())
                }
                "oversized" => {
                    // Lines past the edge of the layer are clipped away
                    let _ = Line::new(Point::new(0, 0), Point::new(500, 0))
                        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
                        .draw(&mut layers.black);
                    Ok(())
                }
                "panic" => panic!("font missing"),
                _ => bail!("network unreachable"),
            }
        }
    }

    fn slot(outcomes: Vec<&'static str>) -> ModuleSlot {
        let region = Region::new(
            Section::Middle,
            Rectangle::new(Point::new(0, 10), Size::new(40, 20)),
        );

        ModuleSlot::new(
            region,
            Box::new(ScriptedRender {
                outcomes: Arc::new(Mutex::new(outcomes)),
            }),
        )
    }

    fn produce(slot: &mut ModuleSlot) -> (ModuleOutput, OutputSource) {
        let presentation = Presentation::default();
        let context = RenderContext {
            now: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(14, 37, 0)
                .unwrap(),
            presentation: &presentation,
        };

        slot.produce(&context)
    }

    #[test]
    fn failure_without_cache_yields_sized_placeholder() {
        let mut slot = slot(vec!["fail"]);

        let (output, source) = produce(&mut slot);

        assert_eq!(source, OutputSource::Placeholder);
        assert_eq!(output.black.size(), Size::new(40, 20));
        assert!(output.black.ink_count() > 0);
    }

    #[test]
    fn failure_after_success_reuses_previous_image() {
        let mut slot = slot(vec!["ok", "fail"]);

        let (fresh, source) = produce(&mut slot);
        assert_eq!(source, OutputSource::Fresh);

        let (cached, source) = produce(&mut slot);
        assert_eq!(source, OutputSource::Cached);
        assert_eq!(cached, fresh);
    }

    #[test]
    fn panicking_render_is_contained() {
        let mut slot = slot(vec!["panic"]);

        let (output, source) = produce(&mut slot);

        assert_eq!(source, OutputSource::Placeholder);
        assert_eq!(output.black.size(), Size::new(40, 20));
    }

    #[test]
    fn oversized_drawing_stays_inside_region() {
        let mut slot = slot(vec!["oversized"]);

        let (output, _) = produce(&mut slot);

        assert_eq!(output.black.size(), Size::new(40, 20));
        assert_eq!(output.black.ink_count(), 40);
    }

    #[test]
    fn seeded_cache_is_used_on_first_failure() {
        let mut slot = slot(vec!["fail"]);
        let mut seeded = Frame::new(Size::new(40, 20));
        seeded.set_pixel(Point::new(3, 3), BinaryColor::On);
        slot.seed_cache(ModuleOutput {
            black: seeded.clone(),
            accent: None,
        });

        let (output, source) = produce(&mut slot);

        assert_eq!(source, OutputSource::Cached);
        assert_eq!(output.black, seeded);
    }
}
