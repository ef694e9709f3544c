use ab_glyph::{Font, ScaleFont};
use hfv_viz::latex::{self, Shift};

use crate::font::FontHandle;
use crate::primitives::{FontStyle, FontWeight, TextStyle};

/// Relative size of sub- and superscripts.
pub const SCRIPT_SCALE: f64 = 0.7;

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

/// Measure text width and height in points using ab_glyph.
pub fn measure_text<F: Font>(font: &F, text: &str, size_pt: f64) -> TextMetrics {
    let scale = ab_glyph::PxScale::from(size_pt as f32);
    let scaled = font.as_scaled(scale);

    let mut width: f32 = 0.0;
    let mut prev_glyph_id = None;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = prev_glyph_id {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev_glyph_id = Some(glyph_id);
    }

    let ascent = scaled.ascent();
    let descent = scaled.descent();
    TextMetrics { width: width as f64, height: (ascent - descent) as f64, ascent: ascent as f64 }
}

/// Width estimate from Helvetica-like advance widths, for when no font file is loaded.
pub fn estimate_text(text: &str, size_pt: f64, bold: bool) -> TextMetrics {
    let em: f64 = text
        .chars()
        .map(|c| match c {
            // combining marks take no space
            '\u{0300}'..='\u{036F}' => 0.0,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.24,
            ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' => 0.32,
            'm' | 'w' | 'M' | 'W' => 0.85,
            '0'..='9' => 0.556,
            c if c.is_uppercase() => 0.68,
            _ => 0.53,
        })
        .sum();
    let width = em * size_pt * if bold { 1.06 } else { 1.0 };
    TextMetrics { width, height: 1.15 * size_pt, ascent: 0.77 * size_pt }
}

/// Measure plain text with a TextStyle, selecting the correct font face.
pub fn measure_styled(fonts: &FontHandle, text: &str, style: &TextStyle) -> TextMetrics {
    match fonts.select(style.weight, style.style) {
        Some(font) => measure_text(font, text, style.size),
        None => estimate_text(text, style.size, style.weight == FontWeight::Bold),
    }
}

/// Measure TLatex markup as it is rendered: scripts at reduced size.
pub fn measure_markup(fonts: &FontHandle, markup: &str, style: &TextStyle) -> TextMetrics {
    let mut width = 0.0;
    for span in latex::parse(markup) {
        let size = match span.shift {
            Shift::Normal => style.size,
            Shift::Sub | Shift::Sup => style.size * SCRIPT_SCALE,
        };
        let span_style = TextStyle {
            size,
            weight: if span.bold { FontWeight::Bold } else { style.weight },
            style: if span.italic { FontStyle::Italic } else { style.style },
            ..style.clone()
        };
        width += measure_styled(fonts, &span.text, &span_style).width;
    }
    let base = measure_styled(fonts, "", style);
    TextMetrics { width, ..base }
}
