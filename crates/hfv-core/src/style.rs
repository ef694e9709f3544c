//! Drawing attributes attached to histograms.
//!
//! Marker and line codes follow ROOT numbering so that configuration values
//! carried over from analysis macros keep their meaning. Colors are
//! `#RRGGBB` strings.

use serde::{Deserialize, Serialize};

/// ROOT marker style codes used by the analyses.
pub mod marker {
    /// kFullCircle
    pub const FULL_CIRCLE: i32 = 20;
    /// kFullSquare
    pub const FULL_SQUARE: i32 = 21;
    /// kFullTriangleUp
    pub const FULL_TRIANGLE_UP: i32 = 22;
    /// kFullTriangleDown
    pub const FULL_TRIANGLE_DOWN: i32 = 23;
    /// kOpenCircle
    pub const OPEN_CIRCLE: i32 = 24;
    /// kOpenSquare
    pub const OPEN_SQUARE: i32 = 25;
    /// kOpenTriangleUp
    pub const OPEN_TRIANGLE_UP: i32 = 26;
    /// kOpenDiamond
    pub const OPEN_DIAMOND: i32 = 27;
    /// kOpenCross
    pub const OPEN_CROSS: i32 = 28;
    /// kFullStar
    pub const FULL_STAR: i32 = 29;
    /// kOpenStar
    pub const OPEN_STAR: i32 = 30;
    /// kOpenTriangleDown
    pub const OPEN_TRIANGLE_DOWN: i32 = 32;
    /// kFullDiamond
    pub const FULL_DIAMOND: i32 = 33;
    /// kFullCross
    pub const FULL_CROSS: i32 = 34;
    /// kOpenDoubleDiamond
    pub const OPEN_DOUBLE_DIAMOND: i32 = 42;
    /// kFullDoubleDiamond
    pub const FULL_DOUBLE_DIAMOND: i32 = 43;
    /// kOpenFourTrianglesX
    pub const OPEN_FOUR_TRIANGLES_X: i32 = 44;
    /// kFullFourTrianglesX
    pub const FULL_FOUR_TRIANGLES_X: i32 = 45;
    /// kOpenCrossX
    pub const OPEN_CROSS_X: i32 = 46;
    /// kFullCrossX
    pub const FULL_CROSS_X: i32 = 47;
    /// kFullFourTrianglesPlus
    pub const FULL_FOUR_TRIANGLES_PLUS: i32 = 49;
}

/// Open counterpart of a full marker; other codes are returned unchanged.
pub fn empty_marker(code: i32) -> i32 {
    use marker::*;
    match code {
        FULL_DIAMOND => OPEN_DIAMOND,
        FULL_CROSS => OPEN_CROSS,
        FULL_CIRCLE => OPEN_CIRCLE,
        FULL_SQUARE => OPEN_SQUARE,
        FULL_STAR => OPEN_STAR,
        FULL_CROSS_X => OPEN_CROSS_X,
        FULL_DOUBLE_DIAMOND => OPEN_DOUBLE_DIAMOND,
        FULL_FOUR_TRIANGLES_X => OPEN_FOUR_TRIANGLES_X,
        FULL_TRIANGLE_UP => OPEN_TRIANGLE_UP,
        FULL_TRIANGLE_DOWN => OPEN_TRIANGLE_DOWN,
        other => other,
    }
}

/// Marker/line/fill attributes of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistStyle {
    pub marker_style: i32,
    pub marker_color: String,
    pub marker_size: f64,
    pub line_color: String,
    pub line_width: f64,
    /// ROOT line style (1 solid, 2 dashed, 3 dotted, 9 long dash).
    pub line_style: i32,
    pub fill_color: Option<String>,
    /// ROOT fill style (0 hollow, 1001 solid, 3004/3005 hatches).
    pub fill_style: i32,
    pub alpha: f64,
}

impl Default for HistStyle {
    fn default() -> Self {
        Self {
            marker_style: marker::FULL_CIRCLE,
            marker_color: "#000000".into(),
            marker_size: 1.0,
            line_color: "#000000".into(),
            line_width: 1.0,
            line_style: 1,
            fill_color: None,
            fill_style: 0,
            alpha: 1.0,
        }
    }
}

impl HistStyle {
    /// Marker and line in the same color.
    pub fn markers(color: impl Into<String>, marker_style: i32, marker_size: f64) -> Self {
        let color = color.into();
        Self {
            marker_style,
            marker_color: color.clone(),
            marker_size,
            line_color: color,
            ..Default::default()
        }
    }

    /// Builder: line width.
    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    /// Builder: transparency applied to marker and line.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Black open-marker variant drawn on top of a colored marker.
    pub fn empty_overlay(&self) -> Self {
        Self {
            marker_style: empty_marker(self.marker_style),
            marker_color: "#000000".into(),
            line_width: 0.0,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_marker_map() {
        assert_eq!(empty_marker(20), 24);
        assert_eq!(empty_marker(21), 25);
        assert_eq!(empty_marker(33), 27);
        assert_eq!(empty_marker(34), 28);
        assert_eq!(empty_marker(29), 30);
        assert_eq!(empty_marker(47), 46);
        assert_eq!(empty_marker(43), 42);
        assert_eq!(empty_marker(45), 44);
        assert_eq!(empty_marker(22), 26);
        assert_eq!(empty_marker(23), 32);
        assert_eq!(empty_marker(49), 49);
    }

    #[test]
    fn overlay_is_black_and_lineless() {
        let s = HistStyle::markers("#D84315", marker::FULL_SQUARE, 1.5);
        let o = s.empty_overlay();
        assert_eq!(o.marker_style, marker::OPEN_SQUARE);
        assert_eq!(o.marker_color, "#000000");
        assert_eq!(o.line_width, 0.0);
        assert_eq!(o.marker_size, 1.5);
    }
}
