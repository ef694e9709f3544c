//! Single-track efficiencies: `hfv tracking-eff` and `hfv tracking-ratio-3d`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::{Axis, DivideMode, Hist1D, Hist2D, Hist3D, HistBundle, HistSource};
use hfv_viz::{Figure, Frame, Legend, Pad, PointSeries};

use crate::Ctx;
use crate::config::{TrackingEffConfig, TrackingRatio3dConfig};
use crate::io::open_source;
use crate::plot::{self, color_at, fmt_edge, marker_at};

/// Positive and negative ITS-TPC efficiency of one species.
#[derive(Debug, Clone)]
struct SpeciesEff {
    label: String,
    pos: Hist1D,
    neg: Hist1D,
}

fn track_eff(src: &dyn HistSource, folder: &str, pdg: i32, name: String) -> Result<Hist1D> {
    let base = format!("{folder}/MC/pdg{pdg}/pt/prm");
    let reco = src.get_h1(&format!("{base}/its_tpc")).with_context(|| format!("reading {base}/its_tpc"))?;
    let gen_ = src.get_h1(&format!("{base}/generated")).with_context(|| format!("reading {base}/generated"))?;
    Ok(Hist1D::divide(name, &reco, &gen_, DivideMode::Binomial)?)
}

fn load_species(
    cfg: &TrackingEffConfig,
    src: &dyn HistSource,
    folder: &str,
    ifile: usize,
) -> Result<Vec<SpeciesEff>> {
    let mut out = Vec::with_capacity(cfg.species.len());
    for (i, sp) in cfg.species.iter().enumerate() {
        let slot = i + 6 * ifile;
        let color = color_at(&cfg.colors, slot);
        let styled = |mut h: Hist1D, marker: i32| {
            h.title.clear();
            h.x.title = "track #it{p}_{T} (GeV/c)".into();
            h.style = plot::style(&color, marker, 1.0, 1.0).with_alpha(cfg.alpha);
            h
        };
        let pos = track_eff(src, folder, sp.pdg, format!("pdg{}_its_tpc_pos", sp.pdg))?;
        let neg = track_eff(src, folder, -sp.pdg, format!("pdg{}_its_tpc_neg", sp.pdg))?;
        let pos = styled(pos, marker_at(&cfg.markers, slot));
        let neg = styled(neg, marker_at(&cfg.markers, slot + 3));
        out.push(SpeciesEff { label: sp.label.clone(), pos, neg });
    }
    Ok(out)
}

fn species_pad(pad: &mut Pad, sp: &SpeciesEff, x_range: (f64, f64), y_range: (f64, f64)) {
    let titles = format!(";track #it{{p}}_{{T}} (GeV/c);ITS-TPC tracking #varepsilon ({}, primary)", sp.label);
    pad.frame = Some(Frame::new(x_range.0, y_range.0, x_range.1, y_range.1, &titles));
    pad.grid = true;
    pad.log_y = true;
    pad.margins = plot::margins(0.15, 0.05, 0.1, 0.15);
}

pub fn cmd_tracking_eff(
    ctx: &Ctx,
    inputs: &[PathBuf],
    labels: &[String],
    out_dir: &Path,
    tf_border_cut: bool,
) -> Result<()> {
    let cfg = &ctx.config.tracking_eff;
    if inputs.len() != labels.len() {
        bail!("{} inputs but {} labels", inputs.len(), labels.len());
    }
    let folder = if tf_border_cut {
        format!("{}{}", cfg.folder, cfg.tf_border_suffix)
    } else {
        cfg.folder.clone()
    };
    tracing::info!(folder = %folder, "reading single-track efficiencies");

    let out = ctx.output(out_dir)?;
    let mut bundle = HistBundle::new("hfv tracking-eff");
    let mut figures = Vec::new();
    let mut per_input = Vec::with_capacity(inputs.len());

    for (ifile, (input, label)) in inputs.iter().zip(labels).enumerate() {
        let src = open_source(input)?;
        let species = load_species(cfg, src.as_ref(), &folder, ifile)?;
        for (sp, cfg_sp) in species.iter().zip(&cfg.species) {
            bundle.insert_in(&format!("{label}/pdg{}", cfg_sp.pdg), sp.pos.clone());
            bundle.insert_in(&format!("{label}/pdg{}", -cfg_sp.pdg), sp.neg.clone());
        }
        figures.push(input_figure(cfg, label, &species));
        per_input.push(species);
    }

    figures.push(comparison_figure(cfg, labels, &per_input));
    out.write_bundle(&bundle, &format!("tracking_efficiency_{}", labels.join("_")))?;
    out.save_all(&figures)
}

/// One pad per species, both charges, log x and y.
fn input_figure(cfg: &TrackingEffConfig, label: &str, species: &[SpeciesEff]) -> Figure {
    let mut fig = Figure::grid(format!("tracking_efficiency_{label}"), 1800.0, 500.0, species.len().max(1), 1);
    let mut legend = Legend::new(0.45, 0.15, 0.85, 0.45, 0.04).with_header(label).with_columns(2);
    legend.border = true;
    for (pad, sp) in fig.pads.iter_mut().zip(species) {
        species_pad(pad, sp, cfg.x_range, cfg.y_range);
        pad.log_x = true;
        pad.push(PointSeries::from_h1(&sp.pos, format!("{}+", sp.label)));
        pad.push(PointSeries::from_h1(&sp.neg, format!("{}-", sp.label)));
        legend.add(format!("{}+", sp.label), &sp.pos.style, "p");
        legend.add(format!("{}-", sp.label), &sp.neg.style, "p");
    }
    if let Some(pad) = fig.pad_mut(0) {
        pad.legend = Some(legend);
    }
    fig
}

/// All inputs overlaid per species.
fn comparison_figure(cfg: &TrackingEffConfig, labels: &[String], per_input: &[Vec<SpeciesEff>]) -> Figure {
    let mut fig = Figure::grid(
        format!("tracking_efficiency_comparison_{}", labels.join("_")),
        1800.0,
        500.0,
        cfg.species.len().max(1),
        1,
    );
    let mut legend = Legend::new(0.25, 0.15, 0.85, 0.45, 0.03).with_header(labels.join(" vs ")).with_columns(2);
    legend.border = true;
    let x_range = (cfg.x_range.0, cfg.comparison_x_max);
    for (species, label) in per_input.iter().zip(labels) {
        for (pad, sp) in fig.pads.iter_mut().zip(species) {
            if pad.frame.is_none() {
                species_pad(pad, sp, x_range, cfg.y_range);
            }
            pad.push(PointSeries::from_h1(&sp.pos, format!("{}+ {label}", sp.label)));
            pad.push(PointSeries::from_h1(&sp.neg, format!("{}- {label}", sp.label)));
            legend.add(format!("{}+ {label}", sp.label), &sp.pos.style, "p");
            legend.add(format!("{}- {label}", sp.label), &sp.neg.style, "p");
        }
    }
    if let Some(pad) = fig.pad_mut(0) {
        pad.legend = Some(legend);
    }
    fig
}

/// Bins covering `[lo, hi]` in axis units.
fn value_bins(axis: &Axis, lo: f64, hi: f64) -> Option<(usize, usize)> {
    let mut a = axis.without_range();
    a.set_range_user(lo, hi);
    a.range()
}

/// Z projections of the reco/gen ratio in every X × Y window, plus its zy projection.
fn ratio_projections(cfg: &TrackingRatio3dConfig, ratio: &Hist3D) -> (Vec<Hist1D>, Hist2D) {
    let prefix = cfg.output_name.trim_end_matches("_pos").trim_end_matches("_neg");
    let mut projections = Vec::with_capacity(cfg.x_ranges.len() * cfg.y_ranges.len());
    for &(xlo, xhi) in &cfg.x_ranges {
        for &(ylo, yhi) in &cfg.y_ranges {
            let name = format!(
                "{prefix}_x{}_{}_y{}_{}",
                fmt_edge(xlo),
                fmt_edge(xhi),
                fmt_edge(ylo),
                fmt_edge(yhi)
            );
            let xb = value_bins(&ratio.x, xlo, xhi);
            let yb = value_bins(&ratio.y, ylo, yhi);
            if xb.is_none() || yb.is_none() {
                log::warn!("{name}: window outside the axis, projecting over all bins");
            }
            projections.push(ratio.projection_z(name, xb, yb));
        }
    }
    let zy = ratio.project_zy(format!("{}_zy", ratio.name));
    (projections, zy)
}

pub fn cmd_tracking_ratio_3d(ctx: &Ctx, input: &Path, out_dir: &Path) -> Result<()> {
    let cfg = &ctx.config.tracking_ratio_3d;
    let src = open_source(input)?;
    let num = src.get_h3(&cfg.numerator).with_context(|| format!("reading {}", cfg.numerator))?;
    let den = src.get_h3(&cfg.denominator).with_context(|| format!("reading {}", cfg.denominator))?;
    let ratio = Hist3D::ratio(cfg.output_name.clone(), &num, &den)?;
    let (projections, zy) = ratio_projections(cfg, &ratio);

    let out = ctx.output(out_dir)?;
    let mut ratio_bundle = HistBundle::new("hfv tracking-ratio-3d");
    ratio_bundle.insert(ratio.name.clone(), ratio);
    out.write_bundle(&ratio_bundle, "ratio_output")?;

    let prefix = cfg.output_name.trim_end_matches("_pos").trim_end_matches("_neg");
    let mut proj_bundle = HistBundle::new("hfv tracking-ratio-3d");
    for p in projections {
        proj_bundle.insert(p.name.clone(), p);
    }
    proj_bundle.insert(zy.name.clone(), zy);
    out.write_bundle(&proj_bundle, &format!("{prefix}_projections"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hfv_core::AnyHist;

    fn h(name: &str, c: &[f64]) -> Hist1D {
        Hist1D::from_contents(name, Axis::uniform(c.len(), 0.0, 10.0).unwrap(), c).unwrap()
    }

    fn tracking_bundle() -> HistBundle {
        let mut b = HistBundle::new("test");
        for pdg in [211, -211, 321, -321, 2212, -2212] {
            let dir = format!("qa-efficiency/MC/pdg{pdg}/pt/prm");
            let reco = if pdg > 0 { [8.0, 9.0] } else { [4.0, 9.0] };
            b.insert(format!("{dir}/its_tpc"), h("its_tpc", &reco));
            b.insert(format!("{dir}/generated"), h("generated", &[10.0, 10.0]));
        }
        b
    }

    #[test]
    fn species_efficiencies_per_charge() {
        let cfg = TrackingEffConfig::default();
        let species = load_species(&cfg, &tracking_bundle(), "qa-efficiency", 1).unwrap();
        assert_eq!(species.len(), 3);
        assert_eq!(species[0].pos.name, "pdg211_its_tpc_pos");
        assert_eq!(species[2].neg.name, "pdg2212_its_tpc_neg");
        assert_relative_eq!(species[0].pos.bin_content(1), 0.8);
        assert_relative_eq!(species[0].neg.bin_content(1), 0.4);
        // second input: palette slot 6, negative markers three further
        assert_eq!(species[0].pos.style.marker_color, "kOrange+1");
        assert_eq!(species[0].pos.style.marker_style, 29);
        assert_eq!(species[0].neg.style.marker_style, 30);
        assert_relative_eq!(species[0].pos.style.alpha, 0.6);
    }

    #[test]
    fn missing_folder_is_reported() {
        let cfg = TrackingEffConfig::default();
        let err = load_species(&cfg, &tracking_bundle(), "qa-efficiency_withTFBorderCut", 0).unwrap_err();
        assert!(format!("{err:#}").contains("withTFBorderCut"));
    }

    #[test]
    fn figures_have_one_pad_per_species() {
        let cfg = TrackingEffConfig::default();
        let a = load_species(&cfg, &tracking_bundle(), "qa-efficiency", 0).unwrap();
        let b = load_species(&cfg, &tracking_bundle(), "qa-efficiency", 1).unwrap();
        let fig = input_figure(&cfg, "LHC25g1", &a);
        assert_eq!(fig.pads.len(), 3);
        assert!(fig.pads[1].log_x);
        assert_eq!(fig.pads[0].legend.as_ref().unwrap().entries.len(), 6);

        let labels = vec!["A".to_string(), "B".to_string()];
        let cmp = comparison_figure(&cfg, &labels, &[a, b]);
        assert_eq!(cmp.name, "tracking_efficiency_comparison_A_B");
        assert_eq!(cmp.pads[2].series.len(), 4);
        assert_eq!(cmp.pads[0].frame.as_ref().unwrap().x_max, 20.0);
    }

    #[test]
    fn ratio_windows_in_axis_units() {
        let x = Axis::uniform(10, 0.0, 100.0).unwrap();
        let y = Axis::uniform(5, 0.0, 10000.0).unwrap();
        let z = Axis::uniform(2, 0.0, 10.0).unwrap();
        let mut num = Hist3D::new("num", "", x.clone(), y.clone(), z.clone());
        let mut den = Hist3D::new("den", "", x, y, z);
        num.fill(10.0, 1000.0, 1.0, 1.0);
        den.fill(10.0, 1000.0, 1.0, 2.0);
        num.fill(60.0, 5000.0, 6.0, 3.0);
        den.fill(60.0, 5000.0, 6.0, 4.0);
        let ratio = Hist3D::ratio("RatioHistogram_pos", &num, &den).unwrap();
        let cfg = TrackingRatio3dConfig::default();
        let (proj, zy) = ratio_projections(&cfg, &ratio);
        assert_eq!(proj.len(), 9);
        assert_eq!(proj[0].name, "RatioHistogram_x0_20_y0_2000");
        assert_relative_eq!(proj[0].bin_content(1), 0.5);
        assert_relative_eq!(proj[0].bin_content(2), 0.0);
        // (50, 100) x (4000, 99999999)
        assert_relative_eq!(proj[8].bin_content(2), 0.75);
        assert_eq!(AnyHist::from(zy).kind(), "TH2");
    }

    #[test]
    fn ratio_windows_past_the_axis() {
        let x = Axis::uniform(10, 0.0, 100.0).unwrap();
        let y = Axis::uniform(5, 0.0, 10000.0).unwrap();
        let z = Axis::uniform(2, 0.0, 10.0).unwrap();
        let mut num = Hist3D::new("num", "", x.clone(), y.clone(), z.clone());
        let mut den = Hist3D::new("den", "", x, y, z);
        num.fill(60.0, 5000.0, 6.0, 1.0);
        den.fill(60.0, 5000.0, 6.0, 4.0);
        // Occupancy overflow: outside the ratio.
        num.fill(60.0, 20000.0, 6.0, 2.0);
        den.fill(60.0, 20000.0, 6.0, 2.0);
        let ratio = Hist3D::ratio("RatioHistogram_pos", &num, &den).unwrap();

        let cfg = TrackingRatio3dConfig {
            x_ranges: vec![(50.0, 100.0)],
            y_ranges: vec![(4000.0, 99999999.0), (-50.0, -10.0)],
            ..TrackingRatio3dConfig::default()
        };
        let (proj, zy) = ratio_projections(&cfg, &ratio);
        assert_eq!(proj.len(), 2);
        // Upper edge past the axis: bins 3 up to the overflow.
        assert_relative_eq!(proj[0].bin_content(2), 0.25);
        // Window below the axis: no range, every bin enters.
        assert_eq!(proj[1].name, "RatioHistogram_x50_100_y-50_-10");
        assert_relative_eq!(proj[1].bin_content(2), 0.25);
        assert_relative_eq!(zy.integral(), 0.25);
    }
}
