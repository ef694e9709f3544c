use crate::color::Color;
use crate::config::*;

/// Built-in theme presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTheme {
    /// gStyle of the analysis macros: inward ticks on all four sides.
    Root,
    Minimal,
}

impl BuiltinTheme {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "root" => Self::Root,
            other => {
                log::warn!("unknown theme '{other}', using 'root'");
                Self::Root
            }
        }
    }

    pub fn base_config(self) -> VizConfig {
        match self {
            Self::Root => root(),
            Self::Minimal => minimal(),
        }
    }
}

fn root() -> VizConfig {
    VizConfig {
        theme: "root".into(),
        figure: FigureConfig::default(),
        font: FontConfig::default(),
        pad: PadConfig::default(),
        axes: AxesConfig::default(),
        grid: GridConfig::default(),
        title: TitleConfig::default(),
        legend: LegendConfig::default(),
    }
}

fn minimal() -> VizConfig {
    VizConfig {
        theme: "minimal".into(),
        axes: AxesConfig {
            tick_direction: "out".into(),
            show_top_ticks: false,
            show_right_ticks: false,
            tick_length: 0.02,
            minor_tick_length: 0.01,
            line_width: 0.8,
        },
        grid: GridConfig { color: Color::hex("#E5E7EB"), alpha: 1.0 },
        title: TitleConfig { show: false, ..TitleConfig::default() },
        ..root()
    }
}
