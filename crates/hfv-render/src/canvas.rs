use std::fmt::Write as FmtWrite;

use hfv_viz::latex::{self, Shift, Span};

use crate::color::Color;
use crate::font::FontHandle;
use crate::primitives::*;
use crate::text::{SCRIPT_SCALE, TextMetrics, measure_markup};

/// An SVG element stored for deferred rendering.
#[derive(Debug, Clone)]
enum SvgElement {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        style: Style,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        style: LineStyle,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        style: LineStyle,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        style: Style,
        fill_url: Option<String>,
    },
    Text {
        x: f64,
        y: f64,
        spans: Vec<Span>,
        style: TextStyle,
        rotate: Option<f64>,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        style: Style,
    },
    Group {
        clip_id: Option<String>,
        children: Vec<SvgElement>,
    },
}

/// Immediate-mode SVG canvas. Coordinates in points, origin top-left.
///
/// Elements drawn between [`push_clip`](Canvas::push_clip) and
/// [`pop_clip`](Canvas::pop_clip) are grouped under that clip rectangle.
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    background: Option<Color>,
    elements: Vec<SvgElement>,
    defs: Vec<String>,
    patterns: Vec<String>,
    clip_stack: Vec<(String, Vec<SvgElement>)>,
    next_clip_id: usize,
    fonts: FontHandle,
}

impl Canvas {
    /// Canvas with estimated text metrics and a white background.
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_fonts(width, height, FontHandle::generic("Helvetica, Arial, sans-serif"))
    }

    pub fn with_fonts(width: f64, height: f64, fonts: FontHandle) -> Self {
        Self {
            width,
            height,
            background: Some(Color::rgb(255, 255, 255)),
            elements: Vec::new(),
            defs: Vec::new(),
            patterns: Vec::new(),
            clip_stack: Vec::new(),
            next_clip_id: 0,
            fonts,
        }
    }

    pub fn set_background(&mut self, color: Option<Color>) {
        self.background = color;
    }

    pub fn fonts(&self) -> &FontHandle {
        &self.fonts
    }

    // --- Drawing primitives ---

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: &Style) {
        self.push(SvgElement::Rect { x, y, w, h, style: style.clone() });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        self.push(SvgElement::Line { x1, y1, x2, y2, style: style.clone() });
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], style: &LineStyle) {
        if points.len() < 2 {
            return;
        }
        self.push(SvgElement::Polyline { points: points.to_vec(), style: style.clone() });
    }

    pub fn polygon(&mut self, points: &[(f64, f64)], style: &Style) {
        self.push(SvgElement::Polygon { points: points.to_vec(), style: style.clone(), fill_url: None });
    }

    /// Polygon filled with parallel hatch lines at `angle` degrees.
    pub fn hatched_polygon(&mut self, points: &[(f64, f64)], color: Color, angle: f64, spacing: f64) {
        let id = self.hatch_pattern(color, angle, spacing);
        self.push(SvgElement::Polygon {
            points: points.to_vec(),
            style: Style::default(),
            fill_url: Some(id),
        });
    }

    fn hatch_pattern(&mut self, color: Color, angle: f64, spacing: f64) -> String {
        let key = format!("{}:{angle:.0}:{spacing:.1}", color.to_svg_fill());
        let idx = match self.patterns.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                let i = self.patterns.len();
                self.defs.push(format!(
                    r#"<pattern id="hatch{i}" patternUnits="userSpaceOnUse" width="{sp:.2}" height="{sp:.2}" patternTransform="rotate({angle:.0})"><line x1="0" y1="0" x2="0" y2="{sp:.2}" stroke="{c}" stroke-width="0.8"/></pattern>"#,
                    sp = spacing,
                    c = color.to_svg_fill(),
                ));
                self.patterns.push(key);
                i
            }
        };
        format!("hatch{idx}")
    }

    /// Plain text (no markup interpretation).
    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        let spans = vec![Span {
            text: content.to_string(),
            shift: Shift::Normal,
            italic: false,
            bold: false,
        }];
        self.push(SvgElement::Text { x, y, spans, style: style.clone(), rotate: None });
    }

    /// TLatex markup, with sub/superscripts as shifted `tspan`s.
    pub fn latex(&mut self, x: f64, y: f64, markup: &str, style: &TextStyle) {
        self.push(SvgElement::Text { x, y, spans: latex::parse(markup), style: style.clone(), rotate: None });
    }

    pub fn latex_rotated(&mut self, x: f64, y: f64, markup: &str, style: &TextStyle, angle: f64) {
        self.push(SvgElement::Text {
            x,
            y,
            spans: latex::parse(markup),
            style: style.clone(),
            rotate: Some(angle),
        });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, style: &Style) {
        self.push(SvgElement::Circle { cx, cy, r, style: style.clone() });
    }

    /// Error bar: vertical line + optional horizontal caps.
    pub fn error_bar(&mut self, x: f64, y_lo: f64, y_hi: f64, cap_width: f64, style: &LineStyle) {
        self.line(x, y_lo, x, y_hi, style);
        if cap_width > 0.0 {
            let half = cap_width / 2.0;
            self.line(x - half, y_lo, x + half, y_lo, style);
            self.line(x - half, y_hi, x + half, y_hi, style);
        }
    }

    /// Data marker centered at `(x, y)`.
    pub fn marker(&mut self, x: f64, y: f64, marker: &MarkerStyle) {
        let style = if marker.fill {
            Style { fill: Some(marker.color), stroke: Some(marker.color), stroke_width: 0.5, opacity: 1.0 }
        } else {
            Style { fill: None, stroke: Some(marker.color), stroke_width: 1.0, opacity: 1.0 }
        };
        let s = marker.size;
        match marker.shape {
            MarkerShape::Dot => self.circle(x, y, s.min(1.0), &Style::filled(marker.color)),
            MarkerShape::Circle => self.circle(x, y, s, &style),
            MarkerShape::Cross | MarkerShape::CrossX => {
                let angle = if marker.shape == MarkerShape::CrossX { 45.0 } else { 0.0 };
                self.polygon(&rotated(x, y, &cross_outline(s), angle), &style);
            }
            shape => self.polygon(&shape_outline(shape, x, y, s), &style),
        }
    }

    // --- Clip paths ---

    /// Start clipping subsequent elements to the rectangle; returns the clip id.
    pub fn push_clip(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("clip{}", self.next_clip_id);
        self.next_clip_id += 1;
        self.defs.push(format!(
            r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" /></clipPath>"#
        ));
        self.clip_stack.push((id.clone(), Vec::new()));
        id
    }

    pub fn pop_clip(&mut self) {
        if let Some((id, children)) = self.clip_stack.pop()
            && !children.is_empty()
        {
            self.push(SvgElement::Group { clip_id: Some(id), children });
        }
    }

    // --- Text measurement ---

    pub fn measure_latex(&self, markup: &str, style: &TextStyle) -> TextMetrics {
        measure_markup(&self.fonts, markup, style)
    }

    // --- SVG output ---

    fn push(&mut self, elem: SvgElement) {
        match self.clip_stack.last_mut() {
            Some((_, children)) => children.push(elem),
            None => self.elements.push(elem),
        }
    }

    pub fn finish_svg(&self) -> String {
        let mut out = String::with_capacity(32 * 1024);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        );

        if let Some(style) = self.fonts.svg_font_style() {
            out.push_str(&style);
            out.push('\n');
        }

        if !self.defs.is_empty() {
            out.push_str("<defs>\n");
            for d in &self.defs {
                out.push_str(d);
                out.push('\n');
            }
            out.push_str("</defs>\n");
        }

        if let Some(bg) = self.background {
            let _ = writeln!(
                out,
                r#"<rect width="{}" height="{}" fill="{}" />"#,
                self.width,
                self.height,
                bg.to_svg_fill()
            );
        }

        let family = escape(&self.fonts.family);
        for elem in self.elements.iter().chain(self.clip_stack.iter().flat_map(|(_, c)| c)) {
            render_element(&mut out, elem, &family);
        }

        out.push_str("</svg>\n");
        out
    }
}

fn shape_outline(shape: MarkerShape, x: f64, y: f64, s: f64) -> Vec<(f64, f64)> {
    let poly = |pts: &[(f64, f64)]| -> Vec<(f64, f64)> {
        pts.iter().map(|&(dx, dy)| (x + dx * s, y + dy * s)).collect()
    };
    match shape {
        MarkerShape::Square => poly(&[(-0.85, -0.85), (0.85, -0.85), (0.85, 0.85), (-0.85, 0.85)]),
        MarkerShape::TriangleUp => poly(&[(0.0, -1.1), (1.0, 0.7), (-1.0, 0.7)]),
        MarkerShape::TriangleDown => poly(&[(0.0, 1.1), (1.0, -0.7), (-1.0, -0.7)]),
        MarkerShape::Diamond => poly(&[(0.0, -1.2), (0.7, 0.0), (0.0, 1.2), (-0.7, 0.0)]),
        MarkerShape::DoubleDiamond => poly(&[
            (0.0, -1.2),
            (0.25, -0.25),
            (1.2, 0.0),
            (0.25, 0.25),
            (0.0, 1.2),
            (-0.25, 0.25),
            (-1.2, 0.0),
            (-0.25, -0.25),
        ]),
        MarkerShape::Star => {
            let pts: Vec<(f64, f64)> = (0..10)
                .map(|k| {
                    let r = if k % 2 == 0 { 1.2 } else { 0.5 };
                    let a = std::f64::consts::PI * (k as f64) / 5.0 - std::f64::consts::FRAC_PI_2;
                    (r * a.cos(), r * a.sin())
                })
                .collect();
            poly(&pts)
        }
        MarkerShape::FourTrianglesX | MarkerShape::FourTrianglesPlus => {
            let base: [(f64, f64); 12] = [
                (0.0, 0.0),
                (-0.5, -1.0),
                (0.5, -1.0),
                (0.0, 0.0),
                (1.0, -0.5),
                (1.0, 0.5),
                (0.0, 0.0),
                (0.5, 1.0),
                (-0.5, 1.0),
                (0.0, 0.0),
                (-1.0, 0.5),
                (-1.0, -0.5),
            ];
            let angle = if shape == MarkerShape::FourTrianglesX { 45.0 } else { 0.0 };
            let scaled: Vec<(f64, f64)> = base.iter().map(|&(dx, dy)| (dx * s, dy * s)).collect();
            rotated(x, y, &scaled, angle)
        }
        MarkerShape::Dot | MarkerShape::Circle | MarkerShape::Cross | MarkerShape::CrossX => {
            poly(&[(-1.0, 0.0), (0.0, -1.0), (1.0, 0.0), (0.0, 1.0)])
        }
    }
}

fn cross_outline(s: f64) -> Vec<(f64, f64)> {
    let (a, b) = (0.3 * s, 1.1 * s);
    vec![
        (-a, -b),
        (a, -b),
        (a, -a),
        (b, -a),
        (b, a),
        (a, a),
        (a, b),
        (-a, b),
        (-a, a),
        (-b, a),
        (-b, -a),
        (-a, -a),
    ]
}

fn rotated(x: f64, y: f64, offsets: &[(f64, f64)], angle_deg: f64) -> Vec<(f64, f64)> {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    offsets.iter().map(|&(dx, dy)| (x + dx * cos - dy * sin, y + dx * sin + dy * cos)).collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_points(out: &mut String, points: &[(f64, f64)]) {
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{x:.2},{y:.2}");
    }
}

fn render_element(out: &mut String, elem: &SvgElement, family: &str) {
    match elem {
        SvgElement::Rect { x, y, w, h, style } => {
            let _ = write!(out, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#);
            write_style_attrs(out, style);
            out.push_str(" />\n");
        }
        SvgElement::Line { x1, y1, x2, y2, style } => {
            let _ = write!(out, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#);
            write_line_attrs(out, style);
            out.push_str(" />\n");
        }
        SvgElement::Polyline { points, style } => {
            out.push_str(r#"<polyline points=""#);
            write_points(out, points);
            out.push_str(r#"" fill="none""#);
            write_line_attrs(out, style);
            out.push_str(" />\n");
        }
        SvgElement::Polygon { points, style, fill_url } => {
            out.push_str(r#"<polygon points=""#);
            write_points(out, points);
            out.push('"');
            match fill_url {
                Some(id) => {
                    let _ = write!(out, r#" fill="url(#{id})""#);
                }
                None => write_style_attrs(out, style),
            }
            out.push_str(" />\n");
        }
        SvgElement::Text { x, y, spans, style, rotate } => {
            let _ = write!(out, r#"<text x="{x:.2}" y="{y:.2}""#);
            let _ = write!(out, r#" font-family="{family}" font-size="{:.1}""#, style.size);
            let _ = write!(out, r#" fill="{}""#, style.color.to_svg_fill());
            let _ = write!(out, r#" text-anchor="{}""#, style.anchor.as_str());
            let _ = write!(out, r#" dominant-baseline="{}""#, style.baseline.as_str());
            if style.weight == FontWeight::Bold {
                out.push_str(r#" font-weight="bold""#);
            }
            if style.style == FontStyle::Italic {
                out.push_str(r#" font-style="italic""#);
            }
            if let Some(angle) = rotate {
                let _ = write!(out, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#);
            }
            out.push('>');
            write_spans(out, spans, style.size);
            out.push_str("</text>\n");
        }
        SvgElement::Circle { cx, cy, r, style } => {
            let _ = write!(out, r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}""#);
            write_style_attrs(out, style);
            out.push_str(" />\n");
        }
        SvgElement::Group { clip_id, children } => {
            out.push_str("<g");
            if let Some(id) = clip_id {
                let _ = write!(out, r#" clip-path="url(#{id})""#);
            }
            out.push_str(">\n");
            for child in children {
                render_element(out, child, family);
            }
            out.push_str("</g>\n");
        }
    }
}

/// Spans as `tspan`s; scripts move the baseline with relative `dy`.
fn write_spans(out: &mut String, spans: &[Span], size: f64) {
    if let [only] = spans
        && only.shift == Shift::Normal
        && !only.italic
        && !only.bold
    {
        out.push_str(&escape(&only.text));
        return;
    }
    let mut offset = 0.0;
    for span in spans {
        let target = match span.shift {
            Shift::Normal => 0.0,
            Shift::Sub => 0.25 * size,
            Shift::Sup => -0.4 * size,
        };
        out.push_str("<tspan");
        let dy = target - offset;
        if dy.abs() > 1e-9 {
            let _ = write!(out, r#" dy="{dy:.2}""#);
        }
        offset = target;
        if span.shift != Shift::Normal {
            let _ = write!(out, r#" font-size="{:.1}""#, size * SCRIPT_SCALE);
        }
        if span.italic {
            out.push_str(r#" font-style="italic""#);
        }
        if span.bold {
            out.push_str(r#" font-weight="bold""#);
        }
        out.push('>');
        out.push_str(&escape(&span.text));
        out.push_str("</tspan>");
    }
}

fn write_style_attrs(out: &mut String, style: &Style) {
    match &style.fill {
        Some(fill) => {
            let _ = write!(out, r#" fill="{}""#, fill.to_svg_fill());
        }
        None => out.push_str(r#" fill="none""#),
    }
    if let Some(stroke) = &style.stroke {
        let _ = write!(out, r#" stroke="{}""#, stroke.to_svg_fill());
        let _ = write!(out, r#" stroke-width="{:.2}""#, style.stroke_width);
    }
    if (style.opacity - 1.0).abs() > 1e-4 {
        let _ = write!(out, r#" opacity="{:.3}""#, style.opacity);
    }
}

fn write_line_attrs(out: &mut String, style: &LineStyle) {
    let _ = write!(out, r#" stroke="{}""#, style.color.to_svg_fill());
    let _ = write!(out, r#" stroke-width="{:.2}""#, style.width);
    if let Some(dash) = &style.dash {
        let _ = write!(out, r#" stroke-dasharray="{dash}""#);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_canvas() {
        let c = Canvas::new(100.0, 50.0);
        let svg = c.finish_svg();
        assert!(svg.contains("width=\"100\""));
        assert!(svg.contains("height=\"50\""));
        assert!(svg.contains("</svg>"));
        assert!(!svg.contains("@font-face"));
    }

    #[test]
    fn rect_rendering() {
        let mut c = Canvas::new(200.0, 100.0);
        c.rect(10.0, 20.0, 50.0, 30.0, &Style::filled(Color::hex("#ff0000")));
        let svg = c.finish_svg();
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains("width=\"50.00\""));
    }

    #[test]
    fn latex_becomes_tspans() {
        let mut c = Canvas::new(200.0, 100.0);
        c.latex(10.0, 20.0, "#it{p}_{T} (GeV/#it{c})", &TextStyle::default());
        let svg = c.finish_svg();
        assert!(svg.contains(r#"<tspan font-style="italic">p</tspan>"#));
        assert!(svg.contains(r#"<tspan dy="2.50" font-size="7.0">T</tspan>"#));
        assert!(svg.contains(r#"<tspan dy="-2.50"> (GeV/</tspan>"#));
    }

    #[test]
    fn plain_text_is_escaped() {
        let mut c = Canvas::new(200.0, 100.0);
        c.text(10.0, 20.0, "a < b & c", &TextStyle::default());
        let svg = c.finish_svg();
        assert!(svg.contains(">a &lt; b &amp; c</text>"));
        assert!(svg.contains("font-family=\"Helvetica, Arial, sans-serif\""));
    }

    #[test]
    fn clip_groups_wrap_elements() {
        let mut c = Canvas::new(100.0, 100.0);
        let id = c.push_clip(10.0, 10.0, 50.0, 50.0);
        c.line(0.0, 0.0, 100.0, 100.0, &LineStyle::default());
        c.pop_clip();
        c.line(0.0, 100.0, 100.0, 0.0, &LineStyle::default());
        let svg = c.finish_svg();
        assert!(svg.contains(&format!(r#"<clipPath id="{id}">"#)));
        let g = svg.find(&format!(r#"<g clip-path="url(#{id})">"#)).unwrap();
        let end = svg.find("</g>").unwrap();
        assert!(svg[g..end].contains(r#"x2="100.00" y2="100.00""#));
        assert!(!svg[g..end].contains(r#"y1="100.00""#));
    }

    #[test]
    fn open_and_full_markers() {
        let mut c = Canvas::new(100.0, 100.0);
        c.marker(50.0, 50.0, &MarkerStyle::from_root(20, 1.0, Color::rgb(0, 0, 255)));
        c.marker(50.0, 50.0, &MarkerStyle::from_root(25, 1.0, Color::rgb(255, 0, 0)));
        let svg = c.finish_svg();
        assert!(svg.contains(r##"<circle cx="50.00" cy="50.00" r="4.00" fill="#0000ff""##));
        assert!(svg.contains(r##"<polygon points="46.60,46.60 53.40,46.60 53.40,53.40 46.60,53.40" fill="none" stroke="#ff0000""##));
    }

    #[test]
    fn hatch_patterns_are_shared() {
        let mut c = Canvas::new(100.0, 100.0);
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        c.hatched_polygon(&square, Color::rgb(0, 0, 255), 45.0, 4.0);
        c.hatched_polygon(&square, Color::rgb(0, 0, 255), 45.0, 4.0);
        let svg = c.finish_svg();
        assert_eq!(svg.matches("<pattern ").count(), 1);
        assert_eq!(svg.matches(r#"fill="url(#hatch0)""#).count(), 2);
    }
}
