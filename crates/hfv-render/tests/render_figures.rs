use hfv_core::{Axis, DivideMode, Hist1D, Hist2D, HistStyle};
use hfv_render::config::{VizConfig, resolve_config};
use hfv_render::{RenderError, render_json, render_svg, render_to_file};
use hfv_viz::{Figure, Frame, HeatmapSeries, Legend, PointSeries, RefLine};

fn efficiency() -> Hist1D {
    let axis = Axis::variable(vec![0.0, 1.0, 3.0, 5.0, 8.0]).unwrap().with_title("#it{p}_{T} (GeV/#it{c})");
    let num = Hist1D::from_contents("num", axis.clone(), &[1.0, 4.0, 6.0, 8.0]).unwrap();
    let den = Hist1D::from_contents("den", axis, &[10.0, 10.0, 10.0, 10.0]).unwrap();
    Hist1D::divide("eff", &num, &den, DivideMode::Binomial).unwrap()
}

#[test]
fn efficiency_grid_renders() {
    let mut fig = Figure::grid("eff_vs_pt", 1000.0, 500.0, 2, 1);
    for (i, label) in ["prompt", "non-prompt"].iter().enumerate() {
        let pad = fig.pad_mut(i).unwrap();
        pad.frame = Some(Frame::new(
            0.0,
            1e-3,
            8.0,
            2.5,
            ";#it{p}_{T} (GeV/#it{c});ratio to kHFStepMcInRapidity",
        ));
        pad.log_y = true;
        let style = HistStyle::markers("kAzure+4", 20, 1.0);
        let mut h = efficiency();
        h.style = style.clone();
        pad.push(PointSeries::from_h1(&h, "kHFStepTracks"));
        let mut leg = Legend::new(0.2, 0.2, 0.6, 0.4, 0.03).with_header(*label);
        leg.add("kHFStepTracks", &style, "p");
        pad.legend = Some(leg);
    }
    let svg = render_svg(&fig, &VizConfig::default()).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(">non-prompt</text>"));
    assert_eq!(svg.matches("<clipPath").count(), 2);
    // four efficiency points and one legend marker per pad
    assert_eq!(svg.matches("<circle").count(), 10);
}

#[test]
fn heatmap_with_palette() {
    let mut h = Hist2D::new("corr", "", Axis::uniform(4, 0.0, 4.0).unwrap(), Axis::uniform(4, 0.0, 4.0).unwrap());
    for i in 0..4 {
        h.fill(i as f64 + 0.5, i as f64 + 0.5, (i + 1) as f64);
    }
    let mut fig = Figure::new("map", 600.0, 600.0);
    let mut map = HeatmapSeries::from_h2(&h, "").with_values();
    map.z_title = "counts".into();
    fig.pads[0].push(map);
    let svg = render_svg(&fig, &VizConfig::default()).unwrap();
    assert!(svg.contains(">counts</text>"));
    assert!(svg.contains(">4</text>"));
}

#[test]
fn main_ratio_round_trip_through_json() {
    let mut fig = Figure::main_ratio("ratio", 600.0, 700.0, 0.3);
    fig.pads[0].push(PointSeries::from_h1(&efficiency(), "eff"));
    fig.pads[1].push(PointSeries::from_h1(&efficiency(), "ratio"));
    fig.pads[1].add_line(RefLine::horizontal(0.0, 8.0, 1.0, "kGray+1"));
    let json = fig.to_json().unwrap();
    let svg = render_json(&json, &VizConfig::default()).unwrap();
    assert!(svg.contains("</svg>"));
}

#[test]
fn file_output_and_format_check() {
    let dir = tempfile::tempdir().unwrap();
    let mut fig = Figure::new("c", 400.0, 300.0);
    fig.pads[0].push(PointSeries::from_h1(&efficiency(), "eff"));
    let cfg = resolve_config(Some("theme: minimal\n")).unwrap();

    let path = dir.path().join("c.svg");
    render_to_file(&fig, &path, &cfg).unwrap();
    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));

    let pdf = dir.path().join("c.pdf");
    assert!(matches!(render_to_file(&fig, &pdf, &cfg), Err(RenderError::Config(_))));
}
