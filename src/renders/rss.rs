use crate::{
    render::{text, ModuleLayers, Render, RenderContext},
    sources::{FeedEntry, FeedSource},
};
use anyhow::{Context, Result};
use embedded_graphics::{
    mono_font::ascii::FONT_6X10,
    prelude::{Point, Size},
};

/// Wraps every entry to `max_chars` and keeps the entries whose lines still fit
/// into `max_lines`. An entry is never cut in half.
pub fn feed_lines(entries: &[FeedEntry], max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for entry in entries {
        let headline = if entry.summary.is_empty() {
            entry.title.clone()
        } else {
            format!("{}: {}", entry.title, entry.summary)
        };

        let wrapped = text::wrap(&headline, max_chars);
        if lines.len() + wrapped.len() <= max_lines {
            lines.extend(wrapped);
        }
    }

    lines
}

/// Headlines of the configured news feeds.
pub struct RssRender {
    source: Box<dyn FeedSource>,
}

impl RssRender {
    pub fn new(source: Box<dyn FeedSource>) -> Self {
        Self { source }
    }
}

impl Render for RssRender {
    fn render_name(&self) -> &'static str {
        "RSS"
    }

    fn render(&self, _context: &RenderContext<'_>, layers: &mut ModuleLayers) -> Result<()> {
        let entries = self
            .source
            .fetch_entries()
            .context("Could not fetch feed entries")?;

        let Size { width, height } = layers.size();
        let border_x = (width * 2 / 100) as i32;
        let border_y = (height * 5 / 100) as i32;

        let line_height = text::line_height(&FONT_6X10);
        let max_lines = (height.saturating_sub(2 * border_y as u32) / line_height) as usize;
        let max_chars = text::chars_per_line(&FONT_6X10, width.saturating_sub(2 * border_x as u32));

        // Center the block of lines vertically
        let y_padding = (height.saturating_sub(2 * border_y as u32) % line_height / 2) as i32;

        for (index, line) in feed_lines(&entries, max_chars, max_lines).iter().enumerate() {
            text::draw_line(
                &mut layers.black,
                line,
                Point::new(border_x, border_y + y_padding + (index as u32 * line_height) as i32),
                &FONT_6X10,
            )?;
        }

        Ok(())
    }
}
