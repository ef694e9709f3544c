use crate::color::Color;

/// Fill + stroke style for rectangles and polygons.
#[derive(Debug, Clone)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { fill: None, stroke: None, stroke_width: 1.0, opacity: 1.0 }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self { fill: Some(color), ..Default::default() }
    }

    pub fn stroked(color: Color, width: f64) -> Self {
        Self { stroke: Some(color), stroke_width: width, ..Default::default() }
    }
}

/// Line style.
#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    pub dash: Option<String>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self { color: Color::rgb(0, 0, 0), width: 1.0, dash: None }
    }
}

impl LineStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: None }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self { color, width, dash: Some("6 3".into()) }
    }

    /// ROOT line style code (TAttLine) to a dash pattern.
    pub fn from_root(color: Color, width: f64, code: i32) -> Self {
        let dash = match code {
            2 => Some("6 3"),
            3 => Some("1.5 2"),
            4 => Some("6 2 1.5 2"),
            5 => Some("6 2 1.5 2 1.5 2"),
            7 => Some("8 4"),
            9 => Some("12 4"),
            10 => Some("12 3 1.5 3"),
            _ => None,
        };
        Self { color, width, dash: dash.map(String::from) }
    }
}

/// Text style.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub weight: FontWeight,
    pub style: FontStyle,
    pub anchor: TextAnchor,
    pub baseline: TextBaseline,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 10.0,
            color: Color::rgb(0, 0, 0),
            weight: FontWeight::Regular,
            style: FontStyle::Normal,
            anchor: TextAnchor::Start,
            baseline: TextBaseline::Alphabetic,
        }
    }
}

impl TextStyle {
    pub fn sized(size: f64) -> Self {
        Self { size, ..Default::default() }
    }

    /// Anchor and baseline from a ROOT text alignment (`10 * h + v`).
    pub fn with_root_align(mut self, align: i32) -> Self {
        self.anchor = match align / 10 {
            2 => TextAnchor::Middle,
            3 => TextAnchor::End,
            _ => TextAnchor::Start,
        };
        self.baseline = match align % 10 {
            2 => TextBaseline::Central,
            3 => TextBaseline::Hanging,
            _ => TextBaseline::Alphabetic,
        };
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(&self) -> &str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Alphabetic,
    Central,
    Hanging,
}

impl TextBaseline {
    pub fn as_str(&self) -> &str {
        match self {
            TextBaseline::Alphabetic => "auto",
            TextBaseline::Central => "central",
            TextBaseline::Hanging => "hanging",
        }
    }
}

/// Marker style for data points.
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    pub shape: MarkerShape,
    /// Half-size in points.
    pub size: f64,
    pub color: Color,
    pub fill: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Dot,
    Circle,
    Square,
    TriangleUp,
    TriangleDown,
    Diamond,
    Star,
    Cross,
    CrossX,
    DoubleDiamond,
    FourTrianglesX,
    FourTrianglesPlus,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self { shape: MarkerShape::Circle, size: 3.0, color: Color::rgb(0, 0, 0), fill: true }
    }
}

impl MarkerStyle {
    /// Marker for a ROOT marker code (TAttMarker); `size` is the ROOT marker size.
    ///
    /// Unknown codes draw a full circle.
    pub fn from_root(code: i32, size: f64, color: Color) -> Self {
        use MarkerShape::*;
        let (shape, fill) = match code {
            1 | 6 | 7 => (Dot, true),
            8 | 20 => (Circle, true),
            24 => (Circle, false),
            21 => (Square, true),
            25 => (Square, false),
            22 => (TriangleUp, true),
            26 => (TriangleUp, false),
            23 => (TriangleDown, true),
            32 => (TriangleDown, false),
            33 => (Diamond, true),
            27 => (Diamond, false),
            29 => (Star, true),
            30 => (Star, false),
            34 => (Cross, true),
            28 => (Cross, false),
            47 => (CrossX, true),
            46 => (CrossX, false),
            43 => (DoubleDiamond, true),
            42 => (DoubleDiamond, false),
            45 => (FourTrianglesX, true),
            44 => (FourTrianglesX, false),
            49 => (FourTrianglesPlus, true),
            48 => (FourTrianglesPlus, false),
            _ => (Circle, true),
        };
        // ROOT marker size 1 is roughly 8 px across
        let size = if shape == Dot { 1.0 } else { 4.0 * size.max(0.1) };
        Self { shape, size, color, fill }
    }
}
