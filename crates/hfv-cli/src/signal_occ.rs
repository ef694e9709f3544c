//! `hfv signal-vs-occupancy`: D-meson signal extraction in data per
//! centrality, occupancy and pT bin, and its occupancy dependence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::style::marker;
use hfv_core::{Axis, DivideMode, Hist1D, HistBundle, HistStyle, SparseHist};
use hfv_fit::{MassFitResult, MassFitter, Measurement};
use hfv_viz::{CurveSeries, Figure, Frame, Label, Legend, PointSeries};

use crate::Ctx;
use crate::config::SignalOccupancyConfig;
use crate::io::{open_source, write_json};
use crate::plot::{self, class_label, color_at, fmt_edge, frame_for, marker_at, push_points};

/// Fit-derived quantity tracked versus pT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Mean,
    Sigma,
    Signal,
    Background,
    SOverB,
    Significance,
}

impl Quantity {
    const ALL: [Quantity; 6] = [
        Quantity::Mean,
        Quantity::Sigma,
        Quantity::Signal,
        Quantity::Background,
        Quantity::SOverB,
        Quantity::Significance,
    ];

    fn tag(self) -> &'static str {
        match self {
            Quantity::Mean => "mean",
            Quantity::Sigma => "sigma",
            Quantity::Signal => "s",
            Quantity::Background => "b",
            Quantity::SOverB => "soverb",
            Quantity::Significance => "signif",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Quantity::Mean => "#mu",
            Quantity::Sigma => "#sigma",
            Quantity::Signal => "#it{S}",
            Quantity::Background => "#it{B}",
            Quantity::SOverB => "#it{S/B}",
            Quantity::Significance => "Signif.",
        }
    }

    /// Peak position and width ratios stay close to one.
    fn log_y(self) -> bool {
        !matches!(self, Quantity::Mean | Quantity::Sigma)
    }

    fn of(self, r: &MassFitResult) -> Measurement {
        match self {
            Quantity::Mean => r.mean,
            Quantity::Sigma => r.sigma,
            Quantity::Signal => r.signal,
            Quantity::Background => r.background,
            Quantity::SOverB => r.s_over_b,
            Quantity::Significance => r.significance,
        }
    }
}

/// One mass spectrum to fit.
#[derive(Debug, Clone)]
struct Slice {
    cent: usize,
    occ: usize,
    pt: usize,
    title: String,
    mass: Hist1D,
}

fn windows(edges: &[f64]) -> Vec<(f64, f64)> {
    edges.windows(2).map(|w| (w[0], w[1])).collect()
}

fn range_tag(prefix: &str, (lo, hi): (f64, f64)) -> String {
    format!("{prefix}{}_{}", fmt_edge(lo), fmt_edge(hi))
}

pub fn cmd_signal_vs_occupancy(
    ctx: &Ctx,
    input: &Path,
    out_dir: Option<&Path>,
    ft0c: bool,
    centralities: Option<&[f64]>,
) -> Result<()> {
    let cfg = &ctx.config.signal_occupancy;
    let cent_edges = centralities.unwrap_or(&cfg.centrality_edges).to_vec();
    if cent_edges.len() < 2 || cfg.occupancy_edges.len() < 2 || cfg.pt_edges.len() < 2 {
        bail!("centrality, occupancy and pT need at least two edges each");
    }
    let scale = if ft0c { cfg.ft0c_occupancy_scale } else { 1.0 };
    let occ_edges: Vec<f64> = cfg.occupancy_edges.iter().map(|o| o * scale).collect();

    let task = if ft0c { &cfg.task_ft0c } else { &cfg.task };
    let object = format!("{task}/{}", cfg.sparse);
    let src = open_source(input)?;
    let mut thn = src
        .get_sparse(&object)
        .with_context(|| format!("reading {object} from {}", input.display()))?;

    let cent_tag = format!("{}{}", fmt_edge(cent_edges[0]), fmt_edge(cent_edges[cent_edges.len() - 1]));
    let out_dir: PathBuf = match out_dir {
        Some(d) => d.to_path_buf(),
        None if ft0c => PathBuf::from(format!("data_occupancy_ft0c_{cent_tag}")),
        None => PathBuf::from(format!("data_medium_occupancy_{cent_tag}")),
    };
    let out = ctx.output(&out_dir)?;

    let ax = cfg.axes;
    let mut bundle = HistBundle::new("hfv signal-vs-occupancy");
    let corr = thn.projection_2d(ax.centrality, ax.occupancy)?;
    bundle.insert("hcorr_cent_occ", corr.clone_named("hcorr_cent_occ"));

    let cents = windows(&cent_edges);
    let occs = windows(&occ_edges);
    let pts = windows(&cfg.pt_edges);
    let slices = project_slices(&mut thn, cfg, &cents, &occs, &pts, &mut bundle)?;

    let fitter = MassFitter::new(ctx.config.fit.clone());
    let masses: Vec<Hist1D> = slices.iter().map(|s| s.mass.clone()).collect();
    tracing::info!(n = masses.len(), "fitting mass spectra");
    let fits = fitter.fit_batch(&masses);

    let pt_axis = Axis::variable(cfg.pt_edges.clone())?.with_title("#it{p}_{T} (GeV/#it{c})");
    // trends[cent][occ][quantity]
    let mut trends: Vec<Vec<Vec<Hist1D>>> = cents
        .iter()
        .map(|&c| {
            occs.iter()
                .map(|&o| {
                    Quantity::ALL
                        .iter()
                        .map(|q| {
                            let name = format!(
                                "hist_{}_{}_{}",
                                q.tag(),
                                range_tag("cent", c),
                                range_tag("occ", o)
                            );
                            Hist1D::new(name, "", pt_axis.clone())
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    let mut fit_figures = Vec::new();
    let mut fit_json = Vec::new();
    for (slice, fit) in slices.iter().zip(&fits) {
        let fit = match fit {
            Ok(f) => f,
            Err(e) => {
                log::warn!("{}: {e}", slice.mass.name);
                continue;
            }
        };
        for (q, h) in Quantity::ALL.iter().zip(&mut trends[slice.cent][slice.occ]) {
            let m = q.of(fit);
            if m.value.is_finite() {
                h.set_bin_content(slice.pt + 1, m.value);
                h.set_bin_error(slice.pt + 1, m.error);
            } else {
                log::warn!("{}: {} is not finite", slice.mass.name, q.tag());
            }
        }
        fit_figures.push(fit_figure(
            format!("fit_result_{}", slice.mass.name),
            &slice.mass,
            fit,
            &slice.title,
        ));
        fit_json.push(fit);
    }
    write_json(Some(&out.path("fit_results.json")), &serde_json::to_value(&fit_json)?)?;

    for per_occ in &trends {
        for per_q in per_occ {
            for h in per_q {
                bundle.insert(h.name.clone(), h.clone());
            }
        }
    }

    let mut figures = fit_figures;
    for (ic, &cent) in cents.iter().enumerate() {
        for (iq, &q) in Quantity::ALL.iter().enumerate() {
            let ratios = occupancy_ratios(cfg, &trends[ic], iq, q, cent, &occs)?;
            figures.push(ratio_figure(cfg, q, cent, &occs, &ratios));
            for r in ratios {
                bundle.insert(r.name.clone(), r);
            }
        }
    }

    out.write_bundle(&bundle, &format!("projected_thn_dataocc{}_{cent_tag}", if ft0c { "_ft0c" } else { "" }))?;
    out.save_all(&figures)
}

/// Mass and scalar-product projections of every centrality × occupancy × pT bin.
fn project_slices(
    thn: &mut SparseHist,
    cfg: &SignalOccupancyConfig,
    cents: &[(f64, f64)],
    occs: &[(f64, f64)],
    pts: &[(f64, f64)],
    bundle: &mut HistBundle,
) -> Result<Vec<Slice>> {
    let ax = cfg.axes;
    let mut slices = Vec::with_capacity(cents.len() * occs.len() * pts.len());
    for (ic, &c) in cents.iter().enumerate() {
        for (io, &o) in occs.iter().enumerate() {
            for (ip, &p) in pts.iter().enumerate() {
                thn.axis_mut(ax.centrality)?.set_range_user(c.0, c.1);
                thn.axis_mut(ax.occupancy)?.set_range_user(o.0, o.1);
                thn.axis_mut(ax.pt)?.set_range_user(p.0, p.1);
                let tag = format!("{}_{}_{}", range_tag("cent", c), range_tag("occ", o), range_tag("pt", p));
                let mass = thn.projection_1d(ax.mass)?.clone_named(format!("hmass_{tag}"));
                let sp = thn.projection_1d(ax.sp)?.clone_named(format!("hsp_{tag}"));
                bundle.insert(sp.name.clone(), sp);
                bundle.insert(mass.name.clone(), mass.clone());
                let title = format!(
                    "Cent. {}-{}, Occ. {}-{}, #it{{p}}_{{T}} {}-{}",
                    fmt_edge(c.0),
                    fmt_edge(c.1),
                    fmt_edge(o.0),
                    fmt_edge(o.1),
                    fmt_edge(p.0),
                    fmt_edge(p.1)
                );
                slices.push(Slice { cent: ic, occ: io, pt: ip, title, mass });
            }
        }
    }
    thn.reset_ranges();
    Ok(slices)
}

/// Ratio of each occupancy class to the first one, styled per class.
fn occupancy_ratios(
    cfg: &SignalOccupancyConfig,
    per_occ: &[Vec<Hist1D>],
    iq: usize,
    q: Quantity,
    cent: (f64, f64),
    occs: &[(f64, f64)],
) -> Result<Vec<Hist1D>> {
    let den = &per_occ[0][iq];
    let mut out = Vec::with_capacity(occs.len());
    for (io, &o) in occs.iter().enumerate() {
        let name = format!("hist_ratio_{}_{}_{}", q.tag(), range_tag("cent", cent), range_tag("occ", o));
        let mut r = Hist1D::divide(name, &per_occ[io][iq], den, DivideMode::Binomial)?;
        r.style = plot::style(&color_at(&cfg.colors, io), marker_at(&cfg.markers, io), 1.5, 2.0);
        out.push(r);
    }
    Ok(out)
}

fn ratio_figure(
    cfg: &SignalOccupancyConfig,
    q: Quantity,
    cent: (f64, f64),
    occs: &[(f64, f64)],
    ratios: &[Hist1D],
) -> Figure {
    let first = class_label(&format!("{}_{}", fmt_edge(occs[0].0), fmt_edge(occs[0].1)));
    let y_title = format!("{sym}(Occ)/{sym}({first})", sym = q.symbol());
    let mut fig = Figure::new(format!("cratio_{}_{}", q.tag(), range_tag("cent", cent)), 600.0, 600.0);
    let pad = &mut fig.pads[0];
    pad.grid = true;
    pad.log_y = q.log_y();
    pad.margins = plot::margins(0.2, 0.1, 0.1, 0.1);
    let (y_lo, y_hi) = cfg.ratio_y_range;
    if let Some(r0) = ratios.first() {
        pad.frame = Some(frame_for(r0, y_lo, y_hi, &format!(";#it{{p}}_{{T}} (GeV/#it{{c}});{y_title}")));
    }
    let mut leg = Legend::new(0.35, 0.2, 0.8, 0.5, 0.035).with_header(format!(
        "{} {}-{}% centrality",
        cfg.hadron_label,
        fmt_edge(cent.0),
        fmt_edge(cent.1)
    ));
    for (r, &o) in ratios.iter().zip(occs) {
        let label = format!("Occupancy {}-{}", fmt_edge(o.0), fmt_edge(o.1));
        push_points(pad, r, &label, true);
        leg.add(label, &r.style, "p");
    }
    pad.legend = Some(leg);
    fig
}

/// Data with the fitted total, signal and background shapes, and the fit summary.
pub fn fit_figure(name: String, hist: &Hist1D, fit: &MassFitResult, title: &str) -> Figure {
    let (lo, hi) = fit.range;
    let mut data = hist.clone();
    data.x.set_range_user(lo, hi);
    data.style = HistStyle::markers("kBlack", marker::FULL_CIRCLE, 1.0);
    let points = PointSeries::from_h1(&data, "data");
    let curves = fit.curves(200);

    let y_max = points
        .y
        .iter()
        .zip(&points.yerr)
        .map(|(y, e)| y + e)
        .chain(curves.total.iter().copied())
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let x_title = if data.x.title.is_empty() { "#it{M} (KK#pi) (GeV/#it{c}^{2})" } else { data.x.title.as_str() };

    let mut fig = Figure::new(name, 800.0, 600.0);
    let pad = &mut fig.pads[0];
    pad.frame = Some(
        Frame::new(lo, 0.0, hi, if y_max > 0.0 { 1.1 * y_max } else { 1.0 }, "")
            .with_title(title)
            .with_x_title(x_title)
            .with_y_title(format!("Events / ( {:.4} )", fit.bin_width)),
    );
    pad.push(points);

    let background = HistStyle {
        line_color: "kOrange+1".into(),
        line_width: 2.0,
        line_style: 2,
        ..HistStyle::default()
    };
    let total = HistStyle { line_color: "kAzure+2".into(), line_width: 2.0, ..HistStyle::default() };
    let signal = HistStyle {
        line_color: "kAzure+2".into(),
        line_width: 1.0,
        fill_color: Some("kAzure+2".into()),
        fill_style: 3004,
        ..HistStyle::default()
    };
    pad.push(CurveSeries::new("background", curves.x.clone(), curves.background, background));
    pad.push(CurveSeries::new("total", curves.x.clone(), curves.total, total));
    pad.push(CurveSeries::new("signal", curves.x, curves.signal, signal));

    for label in fit_labels(fit) {
        pad.add_label(label);
    }
    fig
}

fn fit_labels(fit: &MassFitResult) -> Vec<Label> {
    let m = |x: Measurement, p: usize| format!("{:.p$}#pm{:.p$}", x.value, x.error);
    vec![
        Label::new(0.15, 0.84, format!("#mu=({}) GeV/#it{{c}}^{{2}}", m(fit.mean, 3)), 0.04),
        Label::new(0.15, 0.80, format!("#sigma=({}) GeV/#it{{c}}^{{2}}", m(fit.sigma, 3)), 0.04),
        Label::new(0.60, 0.84, format!("#it{{S}}={}", m(fit.signal, 2)), 0.04),
        Label::new(0.60, 0.80, format!("#it{{B}}={}", m(fit.background, 2)), 0.04),
        Label::new(0.60, 0.76, format!("#it{{S/B}}={}", m(fit.s_over_b, 2)), 0.04),
        Label::new(0.60, 0.72, format!("Signif.={}", m(fit.significance, 2)), 0.04),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flow_sparse() -> SparseHist {
        let axes = vec![
            Axis::uniform(4, 1.7, 2.1).unwrap(),
            Axis::variable(vec![2.0, 3.0, 4.0]).unwrap(),
            Axis::uniform(10, 0.0, 100.0).unwrap(),
            Axis::uniform(2, -1.0, 1.0).unwrap(),
            Axis::uniform(10, 0.0, 10000.0).unwrap(),
        ];
        let mut h = SparseHist::new("hSparseFlowCharm", "", axes);
        // mass, pt, cent, sp, occ
        h.fill(&[1.85, 2.5, 30.0, 0.5, 500.0], 4.0).unwrap();
        h.fill(&[1.95, 3.5, 30.0, -0.5, 500.0], 2.0).unwrap();
        h.fill(&[1.85, 2.5, 30.0, 0.5, 3000.0], 1.0).unwrap();
        h.fill(&[1.85, 2.5, 70.0, 0.5, 500.0], 8.0).unwrap();
        h
    }

    #[test]
    fn slices_follow_bin_windows() {
        let cfg = SignalOccupancyConfig { pt_edges: vec![2.0, 3.0, 4.0], ..Default::default() };
        let mut thn = flow_sparse();
        let mut bundle = HistBundle::new("test");
        let cents = windows(&[20.0, 50.0]);
        let occs = windows(&[0.0, 2000.0, 4000.0]);
        let pts = windows(&cfg.pt_edges);
        let slices = project_slices(&mut thn, &cfg, &cents, &occs, &pts, &mut bundle).unwrap();
        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0].mass.name, "hmass_cent20_50_occ0_2000_pt2_3");
        assert_relative_eq!(slices[0].mass.integral(), 4.0);
        assert_relative_eq!(slices[1].mass.integral(), 2.0);
        assert_relative_eq!(slices[2].mass.integral(), 1.0);
        assert_relative_eq!(slices[3].mass.integral(), 0.0);
        assert_eq!(slices[0].title, "Cent. 20-50, Occ. 0-2000, #it{p}_{T} 2-3");
        assert!(bundle.get("hsp_cent20_50_occ2000_4000_pt3_4").is_some());
        assert!(!thn.axes().iter().any(Axis::has_range));
    }

    #[test]
    fn ratios_to_first_occupancy_class() {
        let cfg = SignalOccupancyConfig::default();
        let axis = Axis::variable(vec![2.0, 3.0, 4.0]).unwrap();
        let per_occ: Vec<Vec<Hist1D>> = [[10.0, 20.0], [5.0, 5.0]]
            .iter()
            .map(|c| vec![Hist1D::from_contents("s", axis.clone(), c).unwrap()])
            .collect();
        let occs = windows(&[0.0, 2000.0, 4000.0]);
        let r = occupancy_ratios(&cfg, &per_occ, 0, Quantity::Signal, (20.0, 50.0), &occs).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r[1].name, "hist_ratio_s_cent20_50_occ2000_4000");
        assert_relative_eq!(r[0].bin_content(1), 1.0);
        assert_relative_eq!(r[1].bin_content(1), 0.5);
        assert_relative_eq!(r[1].bin_content(2), 0.25);
        assert_eq!(r[1].style.marker_style, 21);
        assert_eq!(r[1].style.marker_color, "#D84315");

        let fig = ratio_figure(&cfg, Quantity::Signal, (20.0, 50.0), &occs, &r);
        assert_eq!(fig.name, "cratio_s_cent20_50");
        let pad = &fig.pads[0];
        assert!(pad.log_y);
        // colored markers plus open overlays
        assert_eq!(pad.series.len(), 4);
        assert_eq!(pad.frame.as_ref().unwrap().y_title, "#it{S}(Occ)/#it{S}(0-2000)");
    }

    fn fake_fit() -> MassFitResult {
        let m = Measurement::new;
        MassFitResult {
            hist_name: "hmass".into(),
            range: (1.72, 2.04),
            mean: m(1.8694, 0.0012),
            sigma: m(0.011, 0.001),
            slope: m(-2.0, 0.1),
            sig_frac: m(0.3, 0.02),
            signal: m(300.0, 20.0),
            background: m(150.0, 12.0),
            s_over_b: m(2.0, 0.2),
            significance: m(14.14, 0.5),
            n_total: 1000.0,
            bin_width: 0.01,
            nll: 0.0,
            converged: true,
            covariance: None,
        }
    }

    #[test]
    fn labels_use_fixed_precision() {
        let fit = fake_fit();
        let labels = fit_labels(&fit);
        assert_eq!(labels[0].text, "#mu=(1.869#pm0.001) GeV/#it{c}^{2}");
        assert_eq!(labels[2].text, "#it{S}=300.00#pm20.00");
        assert_eq!(labels[5].text, "Signif.=14.14#pm0.50");

        let h = Hist1D::new("h", "", Axis::uniform(32, 1.72, 2.04).unwrap());
        let fig = fit_figure("fit_result_hmass".into(), &h, &fit, "t");
        assert_eq!(fig.pads[0].series.len(), 4);
        assert_eq!(fig.pads[0].labels.len(), 6);
        let frame = fig.pads[0].frame.as_ref().unwrap();
        assert_eq!(frame.x_title, "#it{M} (KK#pi) (GeV/#it{c}^{2})");
        assert!(frame.y_max > 0.0);
    }
}
