//! Small plotting helpers shared by the analysis subcommands.

use hfv_core::{Axis, Hist1D, HistStyle};
use hfv_viz::{Frame, Margins, Pad, PointSeries};

/// Marker style with a line width.
pub fn style(color: &str, marker: i32, size: f64, line_width: f64) -> HistStyle {
    HistStyle::markers(color, marker, size).with_line_width(line_width)
}

/// `items[i]`, cycling when the palette is shorter than the number of objects.
pub fn cycle<T: Clone>(items: &[T], i: usize, fallback: T) -> T {
    if items.is_empty() { fallback } else { items[i % items.len()].clone() }
}

pub fn color_at(colors: &[String], i: usize) -> String {
    cycle(colors, i, "kBlack".to_string())
}

pub fn marker_at(markers: &[i32], i: usize) -> i32 {
    cycle(markers, i, hfv_core::style::marker::FULL_CIRCLE)
}

/// Draw `h` as markers; `overlay` adds the black open-marker outline on top.
pub fn push_points(pad: &mut Pad, h: &Hist1D, label: &str, overlay: bool) {
    pad.push(PointSeries::from_h1(h, label));
    if overlay {
        pad.push(PointSeries::from_h1(h, "").with_style(h.style.empty_overlay()));
    }
}

/// Restrict `axis` to the single bin containing `value`.
pub fn select_bin(axis: &mut Axis, value: f64) {
    let b = axis.find_bin(value) as i64;
    axis.set_range(b, b);
}

/// Frame over the x range of `h` with an explicit y range.
pub fn frame_for(h: &Hist1D, y_min: f64, y_max: f64, titles: &str) -> Frame {
    let first = h.x.first().max(1);
    let last = h.x.last().min(h.nbins());
    Frame::new(h.x.low_edge(first), y_min, h.x.up_edge(last), y_max, titles)
}

/// Frame of the first histogram widened to the y extent of all of `hs`.
pub fn frame_for_all(hs: &[&Hist1D], log_y: bool) -> Option<Frame> {
    let (first, rest) = hs.split_first()?;
    let mut frame = Frame::from_h1(first, log_y);
    for h in rest {
        let f = Frame::from_h1(h, log_y);
        frame.y_min = frame.y_min.min(f.y_min);
        frame.y_max = frame.y_max.max(f.y_max);
    }
    Some(frame)
}

pub fn margins(left: f64, right: f64, top: f64, bottom: f64) -> Option<Margins> {
    Some(Margins { left, right, top, bottom })
}

/// Edge formatted as in file and object names (`2`, `2.5`).
pub fn fmt_edge(v: f64) -> String {
    format!("{v}")
}

/// Integer with thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Class names such as `0_2000` as legend text (`0-2000`).
pub fn class_label(class: &str) -> String {
    class.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycling_palettes() {
        let colors = vec!["kRed".to_string(), "kBlue".to_string()];
        assert_eq!(color_at(&colors, 3), "kBlue");
        assert_eq!(color_at(&[], 3), "kBlack");
        assert_eq!(marker_at(&[], 0), 20);
    }

    #[test]
    fn bin_selection() {
        let mut a = Axis::variable(vec![0.0, 10.0, 30.0, 50.0]).unwrap();
        select_bin(&mut a, 20.0);
        assert_eq!(a.range(), Some((2, 2)));
        // a value on an edge selects the bin starting there
        select_bin(&mut a, 10.0);
        assert_eq!(a.range(), Some((2, 2)));
        select_bin(&mut a, 0.0);
        assert_eq!(a.range(), Some((1, 1)));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_edge(2.0), "2");
        assert_eq!(fmt_edge(2.5), "2.5");
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(class_label("2000_4000"), "2000-4000");
    }

    #[test]
    fn frame_follows_axis_range() {
        let mut h = Hist1D::new("h", "", Axis::uniform(10, 0.0, 10.0).unwrap());
        h.x.set_range(3, 5);
        let f = frame_for(&h, 0.1, 2.0, ";x;y");
        assert_eq!((f.x_min, f.x_max), (2.0, 5.0));
        assert_eq!((f.y_min, f.y_max), (0.1, 2.0));
        assert_eq!(f.y_title, "y");
    }

    #[test]
    fn overlay_frame_fits_every_histogram() {
        let axis = Axis::uniform(2, 0.0, 2.0).unwrap();
        let a = Hist1D::from_contents("a", axis.clone(), &[1.0, 2.0]).unwrap();
        let b = Hist1D::from_contents("b", axis, &[4.0, 1.0]).unwrap();
        let f = frame_for_all(&[&a, &b], false).unwrap();
        assert_eq!(f.y_min, 0.0);
        assert!(f.y_max >= 4.0);
        assert!(frame_for_all(&[], false).is_none());
    }
}
