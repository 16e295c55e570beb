//! Small helpers for laying out monospaced text.

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, Point},
    text::{Baseline, Text},
    Drawable,
};

/// Number of characters of `font` that fit into `width` pixels.
pub fn chars_per_line(font: &MonoFont<'_>, width: u32) -> usize {
    let advance = font.character_size.width + font.character_spacing;
    if advance == 0 {
        return 0;
    }

    // The last glyph does not need its trailing spacing
    ((width + font.character_spacing) / advance) as usize
}

/// Line height of `font` including a one pixel gap.
pub fn line_height(font: &MonoFont<'_>) -> u32 {
    font.character_size.height + 1
}

/// Cuts `text` down to `max_chars` characters, marking the cut with `~`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    match max_chars {
        0 => String::new(),
        _ => {
            let mut truncated = text.chars().take(max_chars - 1).collect::<String>();
            truncated.push('~');
            truncated
        }
    }
}

/// Greedy word wrap. Words longer than a line are hard broken.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_owned();

        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            let head = word.chars().take(max_chars).collect::<String>();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }

        if !word.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Draws a single line of text with its top edge at `position`.
pub fn draw_line<D>(
    target: &mut D,
    text: &str,
    position: Point,
    font: &MonoFont<'static>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_baseline(
        text,
        position,
        MonoTextStyle::new(font, BinaryColor::On),
        Baseline::Top,
    )
    .draw(target)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mono_font::ascii::FONT_6X10;

    #[test]
    fn chars_per_line_accounts_for_spacing() {
        // FONT_6X10 has no extra spacing between glyphs
        assert_eq!(chars_per_line(&FONT_6X10, 60), 10);
        assert_eq!(chars_per_line(&FONT_6X10, 65), 10);
    }

    #[test]
    fn wrap_keeps_words_together() {
        let lines = wrap("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_breaks_overlong_words() {
        let lines = wrap("abcdefghijkl xy", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl xy"]);
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate("Meeting", 10), "Meeting");
        assert_eq!(truncate("Planning session", 8), "Plannin~");
    }
}
