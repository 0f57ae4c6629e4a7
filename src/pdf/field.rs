use pdf_writer::{Content, Name, Str};

use crate::fonts::{FontFace, PageFonts, to_winansi_bytes};
use crate::model::{FieldLayout, OverlayStyle};

/// Stamp one value into its box: paint the box with the background colour so
/// nothing printed underneath shows through, then draw the text on top.
///
/// The last baseline sits `padding` above and right of the box origin and
/// earlier lines stack upward by `font_size * line_height_factor`, so a single
/// line sits at `(x + padding, y + padding)`. Lines that would rise above the
/// box are dropped; the box is always at least one line tall.
pub(crate) fn render_field(
    content: &mut Content,
    value: &str,
    layout: &FieldLayout,
    fonts: &PageFonts,
    style: &OverlayStyle,
) {
    let [r, g, b] = style.background;
    content.save_state();
    content.set_fill_rgb(r, g, b);
    content
        .rect(layout.x, layout.y, layout.width, layout.height)
        .fill_nonzero();
    content.restore_state();

    if value.trim().is_empty() {
        return;
    }

    let (font_name, face) = fonts.pick(layout.emphasis);
    let max_width = (layout.width - 2.0 * style.padding).max(0.0);
    let mut lines = wrap_text(value, face, layout.font_size, max_width);
    let line_h = layout.font_size * style.line_height_factor;
    let fit = lines_that_fit(layout, style.padding, line_h);
    if lines.len() > fit {
        log::warn!(
            "{} line(s) do not fit a {}pt tall box; dropped from {value:?}",
            lines.len() - fit,
            layout.height,
        );
        lines.truncate(fit);
    }
    let x = layout.x + style.padding;
    let first_baseline = layout.y + style.padding + (lines.len().max(1) - 1) as f32 * line_h;

    let [r, g, b] = style.text_color;
    content.save_state();
    content.set_fill_rgb(r, g, b);
    for (i, line) in lines.iter().enumerate() {
        let (bytes, dropped) = to_winansi_bytes(line);
        if dropped > 0 {
            log::warn!("Dropped {dropped} char(s) not representable in WinAnsi from {line:?}");
        }
        if bytes.is_empty() {
            continue;
        }
        content
            .begin_text()
            .set_font(Name(font_name.as_bytes()), layout.font_size)
            .next_line(x, first_baseline - i as f32 * line_h)
            .show(Str(&bytes))
            .end_text();
    }
    content.restore_state();
}

/// How many baselines stacked `line_h` apart fit between `y + padding` and
/// the top of the box with the glyphs of the top line still inside.
fn lines_that_fit(layout: &FieldLayout, padding: f32, line_h: f32) -> usize {
    let spare = layout.height - 2.0 * padding - layout.font_size;
    if spare < 0.0 || line_h <= 0.0 {
        return 1;
    }
    (spare / line_h + 1e-4).floor() as usize + 1
}

/// Greedy word wrap. Explicit newlines always break; a word wider than the
/// line stays alone on its own line rather than being split.
pub(crate) fn wrap_text(text: &str, face: &FontFace, font_size: f32, max_width: f32) -> Vec<String> {
    let space_w = face.text_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_w = 0.0f32;
        for word in paragraph.split_whitespace() {
            let ww = face.text_width(word, font_size);
            if current.is_empty() {
                current.push_str(word);
                current_w = ww;
            } else if current_w + space_w + ww <= max_width {
                current.push(' ');
                current.push_str(word);
                current_w += space_w + ww;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_w = ww;
            }
        }
        lines.push(current);
    }

    // Trailing blank lines draw nothing
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
