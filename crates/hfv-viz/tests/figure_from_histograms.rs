use hfv_core::{Axis, DivideMode, Hist1D, HistStyle, style::marker};
use hfv_viz::{Figure, Frame, Legend, PointSeries, Series};

fn spectrum(name: &str, contents: &[f64]) -> Hist1D {
    let axis = Axis::variable(vec![0.0, 1.0, 3.0, 5.0, 8.0]).unwrap();
    Hist1D::from_contents(name, axis, contents).unwrap()
}

#[test]
fn efficiency_pad_round_trips_through_json() {
    let gen_ = spectrum("gen", &[100.0, 200.0, 100.0, 50.0]);
    let reco = spectrum("reco", &[10.0, 40.0, 30.0, 20.0]);
    let mut eff = Hist1D::divide("eff", &reco, &gen_, DivideMode::Binomial).unwrap();
    eff.style = HistStyle::markers("#0000ff", marker::FULL_CIRCLE, 1.0);

    let mut fig = Figure::grid("canv_effpt", 1000.0, 500.0, 2, 1);
    let pad = &mut fig.pads[0];
    pad.frame = Some(Frame::new(0.0, 1e-3, 8.0, 2.5, "prompt;#it{p}_{T} (GeV/#it{c});efficiency"));
    pad.log_y = true;
    pad.push(PointSeries::from_h1(&eff, "kHFStepTracked"));
    let mut leg = Legend::new(0.4, 0.15, 0.9, 0.35, 0.03);
    leg.add("kHFStepTracked", &eff.style, "pl");
    pad.legend = Some(leg);

    let back = Figure::from_json(&fig.to_json().unwrap()).unwrap();
    let Series::Points(p) = &back.pads[0].series[0] else {
        panic!("expected points");
    };
    assert_eq!(p.y, vec![0.1, 0.2, 0.3, 0.4]);
    assert_eq!(p.style.marker_color, "#0000ff");
    assert!(back.pads[1].series.is_empty());
    assert!(!back.is_empty());
}
