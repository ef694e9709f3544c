use std::path::Path;

use ab_glyph::{FontVec, InvalidFont};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::config::FontConfig;
use crate::primitives::{FontStyle, FontWeight};

/// A loaded TrueType face and its file bytes (kept for embedding).
pub struct FontFace {
    pub font: FontVec,
    bytes: Vec<u8>,
}

impl FontFace {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| crate::RenderError::Font(format!("{}: {e}", path.display())))?;
        let font = FontVec::try_from_vec(bytes.clone())
            .map_err(|e: InvalidFont| crate::RenderError::Font(format!("{}: {e}", path.display())))?;
        Ok(Self { font, bytes })
    }
}

/// Font family plus whichever faces were configured.
pub struct FontHandle {
    pub family: String,
    regular: Option<FontFace>,
    bold: Option<FontFace>,
    italic: Option<FontFace>,
    embed: bool,
}

impl FontHandle {
    /// Family name only; metrics are estimated.
    pub fn generic(family: impl Into<String>) -> Self {
        Self { family: family.into(), regular: None, bold: None, italic: None, embed: false }
    }

    pub fn from_config(cfg: &FontConfig) -> crate::Result<Self> {
        let load = |p: &Option<std::path::PathBuf>| p.as_deref().map(FontFace::load).transpose();
        let regular = load(&cfg.regular)?;
        let bold = load(&cfg.bold)?;
        let italic = load(&cfg.italic)?;
        if regular.is_some() {
            log::debug!("loaded font faces for '{}'", cfg.family);
        }
        Ok(Self { family: cfg.family.clone(), regular, bold, italic, embed: cfg.embed })
    }

    /// Face for a weight/style, falling back to the regular face.
    pub fn select(&self, weight: FontWeight, style: FontStyle) -> Option<&FontVec> {
        let face = match (weight, style) {
            (FontWeight::Bold, _) => self.bold.as_ref(),
            (_, FontStyle::Italic) => self.italic.as_ref(),
            _ => None,
        };
        face.or(self.regular.as_ref()).map(|f| &f.font)
    }

    pub fn has_metrics(&self) -> bool {
        self.regular.is_some()
    }

    /// SVG `<style>` block with embedded @font-face declarations, if any face is loaded.
    pub fn svg_font_style(&self) -> Option<String> {
        if !self.embed {
            return None;
        }
        let name = self.family.split(',').next().unwrap_or_default().trim().trim_matches('\'');
        let faces = [(&self.regular, 400, "normal"), (&self.bold, 700, "normal"), (&self.italic, 400, "italic")];
        let mut css = String::new();
        for (face, weight, style) in faces {
            if let Some(f) = face {
                let b64 = STANDARD.encode(&f.bytes);
                css.push_str(&format!(
                    "@font-face {{\n  font-family: '{name}';\n  font-weight: {weight};\n  font-style: {style};\n  src: url('data:font/ttf;base64,{b64}') format('truetype');\n}}\n"
                ));
            }
        }
        if css.is_empty() { None } else { Some(format!("<style>\n{css}</style>")) }
    }
}
