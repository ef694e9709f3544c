use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// `#RRGGBB`; malformed components read as 0.
    pub fn hex(s: &str) -> Self {
        let s = s.strip_prefix('#').unwrap_or(s);
        let comp = |i: usize| s.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok()).unwrap_or(0);
        Self { r: comp(0), g: comp(2), b: comp(4), a: 1.0 }
    }

    /// `#RRGGBB`, a ROOT color name with offset (`kAzure+2`) or a ROOT color index.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(h) = s.strip_prefix('#') {
            if h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(Self::hex(h));
            }
            return None;
        }
        if let Ok(index) = s.parse::<i32>() {
            return Some(root::color(index));
        }
        root::index_of(s).map(root::color)
    }

    /// Like [`parse`](Self::parse), falling back to black with a warning.
    pub fn from_style(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            log::warn!("unknown color '{s}', using black");
            Self::rgb(0, 0, 0)
        })
    }

    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    pub fn to_svg_fill(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation between two colors (for colormaps).
    pub fn lerp(a: Color, b: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: (a.r as f64 * (1.0 - t) + b.r as f64 * t).round() as u8,
            g: (a.g as f64 * (1.0 - t) + b.g as f64 * t).round() as u8,
            b: (a.b as f64 * (1.0 - t) + b.b as f64 * t).round() as u8,
            a: a.a * (1.0 - t) + b.a * t,
        }
    }

    fn scaled(self, f: f64) -> Color {
        let s = |c: u8| (c as f64 * f).round().clamp(0.0, 255.0) as u8;
        Color { r: s(self.r), g: s(self.g), b: s(self.b), a: self.a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_svg_fill())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color '{s}'")))
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

/// ROOT color indices (EColor) and their RGB values.
///
/// Offsets from the wheel colors darken towards black for `+n` and lighten
/// towards white for `-n`, following the shading of the ROOT color wheel.
pub mod root {
    use super::Color;

    pub const K_WHITE: i32 = 0;
    pub const K_BLACK: i32 = 1;
    pub const K_GRAY: i32 = 920;
    pub const K_RED: i32 = 632;
    pub const K_GREEN: i32 = 416;
    pub const K_BLUE: i32 = 600;
    pub const K_YELLOW: i32 = 400;
    pub const K_MAGENTA: i32 = 616;
    pub const K_CYAN: i32 = 432;
    pub const K_ORANGE: i32 = 800;
    pub const K_SPRING: i32 = 820;
    pub const K_TEAL: i32 = 840;
    pub const K_AZURE: i32 = 860;
    pub const K_VIOLET: i32 = 880;
    pub const K_PINK: i32 = 900;

    // (name, index, base rgb, lowest offset, highest offset)
    const WHEEL: &[(&str, i32, (u8, u8, u8), i32, i32)] = &[
        ("kRed", K_RED, (255, 0, 0), -10, 4),
        ("kGreen", K_GREEN, (0, 255, 0), -10, 4),
        ("kBlue", K_BLUE, (0, 0, 255), -10, 4),
        ("kYellow", K_YELLOW, (255, 255, 0), -10, 4),
        ("kMagenta", K_MAGENTA, (255, 0, 255), -10, 4),
        ("kCyan", K_CYAN, (0, 255, 255), -10, 4),
        ("kOrange", K_ORANGE, (255, 204, 0), -9, 10),
        ("kSpring", K_SPRING, (204, 255, 0), -9, 10),
        ("kTeal", K_TEAL, (0, 255, 204), -9, 10),
        ("kAzure", K_AZURE, (0, 204, 255), -9, 10),
        ("kViolet", K_VIOLET, (204, 0, 255), -9, 10),
        ("kPink", K_PINK, (255, 0, 204), -9, 10),
    ];

    const BASIC: [(u8, u8, u8); 10] = [
        (255, 255, 255),
        (0, 0, 0),
        (255, 0, 0),
        (0, 255, 0),
        (0, 0, 255),
        (255, 255, 0),
        (255, 0, 255),
        (0, 255, 255),
        (89, 212, 84),
        (89, 84, 217),
    ];

    /// Index of a name such as `kBlack`, `kAzure+2` or `kSpring-6`.
    pub fn index_of(name: &str) -> Option<i32> {
        let name = name.trim();
        let split = name.char_indices().skip(1).find(|&(_, c)| c == '+' || c == '-').map(|(i, _)| i);
        let (base, offset) = match split {
            Some(i) => (name[..i].trim(), name[i..].replace(' ', "").parse::<i32>().ok()?),
            None => (name, 0),
        };
        let index = match base {
            "kWhite" => K_WHITE,
            "kBlack" => K_BLACK,
            "kGray" | "kGrey" => K_GRAY,
            _ => WHEEL.iter().find(|w| w.0 == base)?.1,
        };
        Some(index + offset)
    }

    /// RGB of a ROOT color index; unknown indices map to mid gray.
    pub fn color(index: i32) -> Color {
        if (0..10).contains(&index) {
            let (r, g, b) = BASIC[index as usize];
            return Color::rgb(r, g, b);
        }
        if (K_GRAY..=K_GRAY + 3).contains(&index) {
            let v = 204 - 51 * (index - K_GRAY) as u8;
            return Color::rgb(v, v, v);
        }
        for &(_, base, (r, g, b), lo, hi) in WHEEL {
            let k = index - base;
            if (lo..=hi).contains(&k) {
                let c = Color::rgb(r, g, b);
                let step = if hi > 4 { 0.09 } else { 0.2 };
                return if k >= 0 {
                    c.scaled((1.0 - step * k as f64).max(0.1))
                } else {
                    Color::lerp(c, Color::rgb(255, 255, 255), 0.1 * (-k) as f64)
                };
            }
        }
        log::debug!("ROOT color index {index} not in the color wheel");
        Color::rgb(128, 128, 128)
    }
}

// --- Colormap for 2D histograms ---

/// ROOT kBird palette, `t` in [0, 1].
pub fn bird(t: f64) -> Color {
    const STOPS: [f64; 9] = [0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875, 1.0];
    const RED: [f64; 9] = [0.2082, 0.0592, 0.0780, 0.0232, 0.1802, 0.5301, 0.8186, 0.9956, 0.9764];
    const GREEN: [f64; 9] = [0.1664, 0.3599, 0.5041, 0.6419, 0.7178, 0.7492, 0.7328, 0.7862, 0.9832];
    const BLUE: [f64; 9] = [0.5293, 0.8684, 0.8385, 0.7914, 0.6425, 0.4662, 0.3499, 0.1968, 0.0539];

    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let i = STOPS.iter().rposition(|&s| s <= t).unwrap_or(0).min(STOPS.len() - 2);
    let f = (t - STOPS[i]) / (STOPS[i + 1] - STOPS[i]);
    let at = |c: &[f64; 9]| ((c[i] + (c[i + 1] - c[i]) * f) * 255.0).round() as u8;
    Color::rgb(at(&RED), at(&GREEN), at(&BLUE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        let c = Color::hex("#1D4ED8");
        assert_eq!((c.r, c.g, c.b), (0x1D, 0x4E, 0xD8));
        assert!((c.a - 1.0).abs() < 1e-9);
        assert_eq!(Color::hex("#12"), Color::rgb(0x12, 0, 0));
    }

    #[test]
    fn svg_fill() {
        assert_eq!(Color::rgb(29, 78, 216).to_svg_fill(), "#1d4ed8");
        assert_eq!(Color::rgb(29, 78, 216).with_alpha(0.5).to_svg_fill(), "rgba(29,78,216,0.500)");
    }

    #[test]
    fn root_names() {
        assert_eq!(root::index_of("kAzure+2"), Some(862));
        assert_eq!(root::index_of("kSpring-6"), Some(814));
        assert_eq!(root::index_of("kBlack"), Some(1));
        assert_eq!(root::index_of("kNope"), None);
        assert_eq!(Color::parse("kRed"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("kRed+1"), Some(Color::rgb(204, 0, 0)));
        assert_eq!(Color::parse("kGray+1"), Some(Color::rgb(153, 153, 153)));
        assert_eq!(Color::parse("4"), Some(Color::rgb(0, 0, 255)));
        assert_eq!(Color::parse("#00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::parse("#00ff"), None);
    }

    #[test]
    fn lighter_and_darker_shades() {
        let base = root::color(root::K_AZURE);
        let dark = root::color(root::K_AZURE + 4);
        let light = root::color(root::K_AZURE - 4);
        assert!(dark.b < base.b);
        assert!(light.r > base.r);
    }

    #[test]
    fn bird_endpoints() {
        assert_eq!(bird(0.0), Color::rgb(53, 42, 135));
        assert_eq!(bird(1.0), Color::rgb(249, 251, 14));
        assert_eq!(bird(f64::NAN), bird(0.0));
    }
}
