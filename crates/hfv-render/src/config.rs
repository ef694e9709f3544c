use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::Color;
use crate::theme::BuiltinTheme;

/// Top-level rendering configuration (YAML or programmatic).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub theme: String,
    pub figure: FigureConfig,
    pub font: FontConfig,
    pub pad: PadConfig,
    pub axes: AxesConfig,
    pub grid: GridConfig,
    pub title: TitleConfig,
    pub legend: LegendConfig,
}

impl Default for VizConfig {
    fn default() -> Self {
        BuiltinTheme::Root.base_config()
    }
}

/// Canvas size used when a figure is built without an explicit size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
    pub background: Color,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self { width: 800.0, height: 600.0, background: Color::rgb(255, 255, 255) }
    }
}

/// Font family and optional TrueType files for metrics and embedding.
///
/// Without files, text is emitted with the family name only and widths are
/// estimated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub embed: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Helvetica, Arial, sans-serif".into(),
            regular: None,
            bold: None,
            italic: None,
            embed: true,
        }
    }
}

/// Pad defaults (gStyle); margins and sizes are fractions of the pad.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PadConfig {
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    pub label_size: f64,
    pub title_size: f64,
    pub x_title_offset: f64,
    pub y_title_offset: f64,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            left_margin: 0.15,
            right_margin: 0.035,
            top_margin: 0.075,
            bottom_margin: 0.1,
            label_size: 0.045,
            title_size: 0.045,
            x_title_offset: 1.1,
            y_title_offset: 1.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    pub tick_direction: String,
    pub show_top_ticks: bool,
    pub show_right_ticks: bool,
    /// Fraction of the frame size.
    pub tick_length: f64,
    pub minor_tick_length: f64,
    pub line_width: f64,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_direction: "in".into(),
            show_top_ticks: true,
            show_right_ticks: true,
            tick_length: 0.03,
            minor_tick_length: 0.015,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub color: Color,
    pub alpha: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { color: Color::rgb(204, 204, 204), alpha: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub show: bool,
    pub size: f64,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self { show: true, size: 0.05 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub background: Option<Color>,
    pub border_color: Color,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self { background: None, border_color: Color::rgb(0, 0, 0) }
    }
}

#[derive(Deserialize, Default)]
struct ThemeOnly {
    #[serde(default)]
    theme: Option<String>,
}

/// Resolve a VizConfig from an optional YAML string.
///
/// The `theme` key picks the base preset; every other key overrides it.
pub fn resolve_config(user_yaml: Option<&str>) -> crate::Result<VizConfig> {
    let Some(yaml) = user_yaml.filter(|y| !y.trim().is_empty()) else {
        return Ok(VizConfig::default());
    };
    let head: ThemeOnly =
        serde_yaml_ng::from_str(yaml).map_err(|e| crate::RenderError::Config(e.to_string()))?;
    let base = BuiltinTheme::parse(head.theme.as_deref().unwrap_or("root")).base_config();
    let overrides: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(yaml).map_err(|e| crate::RenderError::Config(e.to_string()))?;
    if overrides.is_null() {
        return Ok(base);
    }
    merge_into(base, overrides)
}

/// Read and resolve a YAML config file.
pub fn load_config(path: &Path) -> crate::Result<VizConfig> {
    let yaml = std::fs::read_to_string(path)?;
    resolve_config(Some(&yaml))
}

fn merge_into(base: VizConfig, overrides: serde_yaml_ng::Value) -> crate::Result<VizConfig> {
    let mut merged =
        serde_yaml_ng::to_value(&base).map_err(|e| crate::RenderError::Config(e.to_string()))?;
    merge_values(&mut merged, overrides);
    serde_yaml_ng::from_value(merged).map_err(|e| crate::RenderError::Config(e.to_string()))
}

fn merge_values(dst: &mut serde_yaml_ng::Value, src: serde_yaml_ng::Value) {
    use serde_yaml_ng::Value;
    match (dst, src) {
        (Value::Mapping(d), Value::Mapping(s)) => {
            for (k, v) in s {
                match d.get_mut(&k) {
                    Some(slot) => merge_values(slot, v),
                    None => {
                        d.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_root_style() {
        let c = resolve_config(None).unwrap();
        assert_eq!(c.theme, "root");
        assert_eq!(c.pad.left_margin, 0.15);
        assert_eq!(c.pad.right_margin, 0.035);
        assert_eq!(c.pad.top_margin, 0.075);
        assert_eq!(c.pad.bottom_margin, 0.1);
        assert_eq!(c.pad.label_size, 0.045);
        assert!(c.font.regular.is_none());
    }

    #[test]
    fn yaml_overrides_keep_theme_values() {
        let c = resolve_config(Some("theme: minimal\npad:\n  left_margin: 0.2\n")).unwrap();
        assert_eq!(c.theme, "minimal");
        assert_eq!(c.pad.left_margin, 0.2);
        // untouched keys come from the minimal preset
        assert_eq!(c.axes.tick_direction, "out");
        assert!(!c.axes.show_top_ticks);
    }

    #[test]
    fn colors_accept_root_names() {
        let c = resolve_config(Some("grid:\n  color: kGray\n")).unwrap();
        assert_eq!(c.grid.color, Color::rgb(204, 204, 204));
        assert!(resolve_config(Some("grid:\n  color: notacolor\n")).is_err());
    }

    #[test]
    fn empty_yaml_is_default() {
        let c = resolve_config(Some("")).unwrap();
        assert_eq!(c.theme, "root");
    }
}
