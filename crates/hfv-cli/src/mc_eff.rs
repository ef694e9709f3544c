//! `hfv mc-eff`: efficiencies per selection step from the MC efficiency task.
//!
//! The task fills one sparse histogram per step (generated, in rapidity,
//! in acceptance, ..., tracked and selected, duplicates). For the chosen
//! hadron and its antiparticle, each step is projected onto pT and the
//! cosine of the pointing angle separately for prompt and non-prompt
//! origin, and, for reconstructed steps, for candidates associated to the
//! wrong collision.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::style::marker;
use hfv_core::{DivideMode, Hist1D, HistBundle, SparseHist};
use hfv_viz::{Figure, Frame, Label, Legend, PointSeries};

use crate::Ctx;
use crate::config::McEffConfig;
use crate::io::open_source;
use crate::plot::{self, color_at, frame_for, select_bin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Prompt,
    NonPrompt,
}

impl Origin {
    const ALL: [Origin; 2] = [Origin::Prompt, Origin::NonPrompt];

    /// Bin value on the origin axis.
    fn value(self) -> f64 {
        match self {
            Origin::Prompt => 1.0,
            Origin::NonPrompt => 2.0,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Origin::Prompt => "prompt",
            Origin::NonPrompt => "nonprompt",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Origin::Prompt => "prompt",
            Origin::NonPrompt => "non-prompt",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Projections per step, summed over files and over particle/antiparticle.
#[derive(Debug, Default)]
struct StepMap(BTreeMap<usize, Hist1D>);

impl StepMap {
    fn accumulate(&mut self, step: usize, h: Hist1D) -> Result<()> {
        match self.0.get_mut(&step) {
            Some(sum) => sum.add(&h, 1.0)?,
            None => {
                self.0.insert(step, h);
            }
        }
        Ok(())
    }

    fn get(&self, step: usize) -> Option<&Hist1D> {
        self.0.get(&step)
    }
}

#[derive(Debug, Default)]
struct Projections {
    pt: [StepMap; 2],
    cosp: [StepMap; 2],
    pt_badcoll: [StepMap; 2],
    cosp_badcoll: [StepMap; 2],
}

/// Derived histograms for one origin.
#[derive(Debug, Default)]
struct Derived {
    pt: BTreeMap<usize, Hist1D>,
    pt_badcoll: BTreeMap<usize, Hist1D>,
    eff: BTreeMap<usize, Hist1D>,
    ratio_badcoll: BTreeMap<usize, Hist1D>,
    tracked_over_trackable: Option<Hist1D>,
    duplicates_over_selected: Option<Hist1D>,
}

pub fn cmd_mc_eff(
    ctx: &Ctx,
    inputs: &[PathBuf],
    out_dir: &Path,
    particle: &str,
    iddir: Option<&str>,
    pt_max: f64,
) -> Result<()> {
    let cfg = &ctx.config.mc_eff;
    let Some(part) = cfg.particles.get(particle) else {
        let known: Vec<&str> = cfg.particles.keys().map(String::as_str).collect();
        bail!("unknown particle '{particle}' (known: {})", known.join(", "));
    };
    let object = match iddir {
        Some(id) => format!("{}_id{id}/{}", cfg.task, cfg.object),
        None => format!("{}/{}", cfg.task, cfg.object),
    };

    let mut proj = Projections::default();
    let mut sparses: BTreeMap<usize, SparseHist> = BTreeMap::new();
    for input in inputs {
        let src = open_source(input)?;
        let steps = src
            .get_steps(&object)
            .with_context(|| format!("reading {object} from {}", input.display()))?;
        for (step, sparse) in steps.steps.iter().enumerate() {
            let Some(sparse) = sparse else {
                tracing::debug!(step, "step not filled, skipping");
                continue;
            };
            match sparses.get_mut(&step) {
                Some(sum) => sum.add(sparse)?,
                None => {
                    sparses.insert(step, sparse.clone_named(format!("histSparse_{step}")));
                }
            }
            project_step(cfg, &mut proj, step, sparse, part.pdg)?;
        }
    }
    if proj.pt[0].0.is_empty() {
        bail!("no filled steps in {object}");
    }

    let derived = [derive(cfg, &proj, Origin::Prompt)?, derive(cfg, &proj, Origin::NonPrompt)?];

    let out = ctx.output(out_dir)?;
    let mut bundle = HistBundle::new("hfv mc-eff");
    for d in &derived {
        for h in d.pt.values() {
            bundle.insert_in("distr", h.clone());
        }
    }
    for d in &derived {
        for h in d.eff.values() {
            bundle.insert_in("efficiencies", h.clone());
        }
    }
    for d in &derived {
        for h in d.ratio_badcoll.values() {
            bundle.insert_in("ratios", h.clone());
        }
        for h in d.tracked_over_trackable.iter().chain(&d.duplicates_over_selected) {
            bundle.insert_in("ratios", h.clone());
        }
    }
    for sparse in sparses.into_values() {
        bundle.insert(sparse.name.clone(), sparse);
    }
    out.write_bundle(&bundle, "Eff_output")?;

    let figures = draw(cfg, &proj, &derived, particle, &part.label, pt_max)?;
    out.save_all(&figures)
}

fn project_step(
    cfg: &McEffConfig,
    proj: &mut Projections,
    step: usize,
    sparse: &SparseHist,
    pdg: i32,
) -> Result<()> {
    let ax = cfg.axes;
    let mut h = sparse.clone();
    for code in [pdg, -pdg] {
        let code = f64::from(code);
        h.axis_mut(ax.pdg)?.set_range_user(code - 0.5, code + 0.5);
        for origin in Origin::ALL {
            let o = origin.index();
            select_bin(h.axis_mut(ax.origin)?, origin.value());
            proj.pt[o].accumulate(step, h.projection_1d(ax.pt)?)?;
            proj.cosp[o].accumulate(step, h.projection_1d(ax.cos_pointing)?)?;
            if step >= cfg.first_reco_step {
                select_bin(h.axis_mut(ax.coll_assoc)?, 0.0);
                proj.pt_badcoll[o].accumulate(step, h.projection_1d(ax.pt)?)?;
                proj.cosp_badcoll[o].accumulate(step, h.projection_1d(ax.cos_pointing)?)?;
                h.axis_mut(ax.coll_assoc)?.reset_range();
            }
        }
    }
    Ok(())
}

fn step_style(cfg: &McEffConfig, step: usize, open: bool) -> hfv_core::HistStyle {
    let m = if open { marker::OPEN_CIRCLE } else { marker::FULL_CIRCLE };
    plot::style(&color_at(&cfg.step_colors, step), m, 1.0, 2.0)
}

fn step_name(cfg: &McEffConfig, step: usize) -> String {
    cfg.step_names.get(step).cloned().unwrap_or_else(|| format!("step {step}"))
}

fn binomial(name: String, num: &Hist1D, den: &Hist1D) -> Result<Hist1D> {
    Ok(Hist1D::divide(name, num, den, DivideMode::Binomial)?)
}

fn derive(cfg: &McEffConfig, proj: &Projections, origin: Origin) -> Result<Derived> {
    let o = origin.index();
    let tag = origin.tag();
    let mut d = Derived::default();
    for (&step, h) in &proj.pt[o].0 {
        let mut r = h
            .rebin(format!("hist_pt_{tag}_{step}"), &cfg.pt_rebin)
            .with_context(|| format!("rebinning pT of step {step}"))?;
        r.style = step_style(cfg, step, false);
        d.pt.insert(step, r);
    }
    for (&step, h) in &proj.pt_badcoll[o].0 {
        let mut r = h.rebin(format!("hist_pt_{tag}_badcoll_{step}"), &cfg.pt_rebin)?;
        r.style = step_style(cfg, step, true);
        d.pt_badcoll.insert(step, r);
    }

    match d.pt.get(&cfg.reference_step) {
        Some(den) => {
            for &step in &cfg.eff_steps {
                if let Some(num) = d.pt.get(&step) {
                    d.eff.insert(step, binomial(format!("h_pt_eff_{tag}_step{step}"), num, den)?);
                }
            }
        }
        None => log::warn!("reference step {} missing, no efficiencies", cfg.reference_step),
    }
    for (&step, bad) in &d.pt_badcoll {
        if let Some(all) = d.pt.get(&step) {
            let name = format!("hist_pt_ratio_{tag}_badcoll_step{step}");
            d.ratio_badcoll.insert(step, binomial(name, bad, all)?);
        }
    }
    // tracked / trackable with cuts, duplicates / selected
    let pair = |num: usize, den: usize, name: &str| -> Result<Option<Hist1D>> {
        match (d.pt.get(&num), d.pt.get(&den)) {
            (Some(n), Some(dd)) => Ok(Some(binomial(format!("{name}_{tag}"), n, dd)?)),
            _ => Ok(None),
        }
    };
    let tracked = pair(6, 5, "hist_pt_trackedovertrackable")?;
    let duplicates = pair(9, 8, "hist_pt_duplicatesoversel")?;
    d.tracked_over_trackable = tracked;
    d.duplicates_over_selected = duplicates;
    Ok(d)
}

fn with_mc_eff_margins(mut fig: Figure) -> Figure {
    for pad in &mut fig.pads {
        pad.margins = plot::margins(0.15, 0.035, 0.075, 0.1);
    }
    fig
}

fn draw(
    cfg: &McEffConfig,
    proj: &Projections,
    derived: &[Derived; 2],
    had: &str,
    had_label: &str,
    pt_max: f64,
) -> Result<Vec<Figure>> {
    let mut figures = Vec::new();
    let first_pt = derived[0].pt.values().next().context("no pT projections")?;
    let pt_min = first_pt.x.low_edge(1);
    let pt_max = first_pt.x.up_edge(first_pt.nbins()).min(pt_max);

    // wrong-collision fraction per reconstructed step
    for origin in Origin::ALL {
        let d = &derived[origin.index()];
        let mut fig = Figure::grid(format!("pt_ratio_badcoll_{}_{had}", origin.tag()), 1000.0, 1000.0, 2, 2);
        for (pad, (&step, h)) in fig.pads.iter_mut().zip(&d.ratio_badcoll) {
            pad.log_y = true;
            pad.frame = Some(
                frame_for(h, 1e-3, 1.0, "")
                    .with_title(step_name(cfg, step))
                    .with_x_title(h.x.title.clone())
                    .with_y_title("associated to wrong collision / all"),
            );
            pad.push(PointSeries::from_h1(h, step_name(cfg, step)));
        }
        figures.push(fig);
    }

    // cos(theta_P) per step
    let mut fig = Figure::grid(format!("cosp_distr_{had}"), 1000.0, 500.0, 2, 1);
    for origin in Origin::ALL {
        let o = origin.index();
        let steps = &proj.cosp[o].0;
        let (Some(first), Some(last)) = (steps.values().next(), steps.values().next_back()) else {
            continue;
        };
        let y_min = (last.minimum() / 2.0).max(0.1);
        let y_max = first.maximum() * 5.0;
        let pad = &mut fig.pads[o];
        pad.log_y = true;
        pad.frame = Some(Frame::new(
            first.x.low_edge(1),
            y_min,
            first.x.up_edge(first.nbins()),
            y_max.max(y_min * 10.0),
            &format!("{} {had_label};cos(#it{{#theta}}_{{P}});counts", origin.title()),
        ));
        let mut leg = Legend::new(0.2, 0.5, 0.6, 0.9, 0.03);
        for (&step, h) in steps {
            let mut h = h.clone();
            h.style = step_style(cfg, step, false);
            pad.push(PointSeries::from_h1(&h, step_name(cfg, step)));
            leg.add(step_name(cfg, step), &h.style, "pl");
        }
        if origin == Origin::Prompt {
            pad.legend = Some(leg);
        }
    }
    figures.push(fig);

    // cos(theta_P): all vs wrong collision
    for origin in Origin::ALL {
        let o = origin.index();
        let mut fig =
            Figure::grid(format!("cosp_distr_badcoll_{}_{had}", origin.tag()), 1000.0, 1000.0, 2, 2);
        let mut n_used: usize = 0;
        for (pad, (&step, bad)) in fig.pads.iter_mut().zip(&proj.cosp_badcoll[o].0) {
            let Some(all) = proj.cosp[o].get(step) else { continue };
            let mut all = all.clone();
            all.style = step_style(cfg, step, false);
            let mut bad = bad.clone();
            bad.style = step_style(cfg, step, true);
            pad.log_y = true;
            pad.frame = Some(
                Frame::from_h1(&all, true)
                    .with_title(step_name(cfg, step))
                    .with_x_title("cos(#it{#theta}_{P})"),
            );
            pad.push(PointSeries::from_h1(&all, "all"));
            pad.push(PointSeries::from_h1(&bad, "associated to wrong collision"));
            n_used += 1;
        }
        if let Some(pad) = n_used.checked_sub(1).and_then(|i| fig.pad_mut(i)) {
            pad.add_label(Label::new(0.2, 0.85, "full markers: all", 0.03));
            pad.add_label(Label::new(0.2, 0.8, "open markers: associated to wrong collision", 0.03));
        }
        figures.push(fig);
    }

    // efficiencies vs pT
    let mut fig = Figure::grid(format!("eff_vs_pt_{had}"), 1000.0, 500.0, 2, 1);
    for origin in Origin::ALL {
        let o = origin.index();
        let pad = &mut fig.pads[o];
        pad.log_y = true;
        pad.frame = Some(Frame::new(
            pt_min,
            1e-3,
            pt_max,
            2.5,
            &format!(
                "{} {had_label};#it{{p}}_{{T}} (GeV/#it{{c}});ratio to {}",
                origin.title(),
                step_name(cfg, cfg.reference_step)
            ),
        ));
        let mut leg = Legend::new(0.4, 0.15, 0.9, 0.35, 0.03);
        for (&step, h) in &derived[o].eff {
            pad.push(PointSeries::from_h1(h, step_name(cfg, step)));
            leg.add(step_name(cfg, step), &h.style, "pl");
        }
        if origin == Origin::Prompt {
            pad.legend = Some(leg);
        }
    }
    figures.push(fig);

    let ratio_figure = |name: String, y: (f64, f64), y_title: &str, log_y: bool, hists: [Option<&Hist1D>; 2]| {
        let mut fig = Figure::grid(name, 1000.0, 500.0, 2, 1);
        for (origin, h) in Origin::ALL.into_iter().zip(hists) {
            let pad = &mut fig.pads[origin.index()];
            pad.log_y = log_y;
            pad.frame = Some(Frame::new(
                pt_min,
                y.0,
                pt_max,
                y.1,
                &format!("{} {had_label};#it{{p}}_{{T}} (GeV/#it{{c}});{y_title}", origin.title()),
            ));
            if let Some(h) = h {
                pad.push(PointSeries::from_h1(h, ""));
            }
        }
        fig
    };
    figures.push(ratio_figure(
        format!("trackedovertrackable_{had}"),
        (0.5, 2.0),
        "kHFStepTracked / kHFStepTrackableCuts",
        false,
        [derived[0].tracked_over_trackable.as_ref(), derived[1].tracked_over_trackable.as_ref()],
    ));
    figures.push(ratio_figure(
        format!("duplicateoversel_{had}"),
        (1e-3, 1.0),
        "ratio to kHFStepTrackedDuplicates / kHFStepTrackedSelected",
        true,
        [derived[0].duplicates_over_selected.as_ref(), derived[1].duplicates_over_selected.as_ref()],
    ));

    Ok(figures.into_iter().map(with_mc_eff_margins).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hfv_core::Axis;

    /// pt, unused, pdg, cosp, coll. assoc., origin
    fn sparse() -> SparseHist {
        let axes = vec![
            Axis::uniform(50, 0.0, 50.0).unwrap(),
            Axis::uniform(1, 0.0, 1.0).unwrap(),
            Axis::uniform(2, -421.5, 421.5).unwrap(),
            Axis::uniform(10, 0.9, 1.0).unwrap(),
            Axis::uniform(2, -0.5, 1.5).unwrap(),
            Axis::uniform(3, -0.5, 2.5).unwrap(),
        ];
        let mut h = SparseHist::new("hCandidates", "", axes);
        // prompt D0, correct collision
        h.fill(&[2.5, 0.5, 421.0, 0.95, 1.0, 1.0], 3.0).unwrap();
        // prompt anti-D0, wrong collision
        h.fill(&[2.5, 0.5, -421.0, 0.95, 0.0, 1.0], 1.0).unwrap();
        // non-prompt D0
        h.fill(&[10.5, 0.5, 421.0, 0.99, 1.0, 2.0], 2.0).unwrap();
        h
    }

    #[test]
    fn particle_and_antiparticle_are_summed() {
        let cfg = McEffConfig::default();
        let mut proj = Projections::default();
        project_step(&cfg, &mut proj, 6, &sparse(), 421).unwrap();
        let prompt = proj.pt[0].get(6).unwrap();
        assert_relative_eq!(prompt.integral(), 4.0);
        let nonprompt = proj.pt[1].get(6).unwrap();
        assert_relative_eq!(nonprompt.integral(), 2.0);
        let bad = proj.pt_badcoll[0].get(6).unwrap();
        assert_relative_eq!(bad.integral(), 1.0);
        assert_relative_eq!(proj.pt_badcoll[1].get(6).unwrap().integral(), 0.0);
    }

    #[test]
    fn generator_steps_have_no_collision_split() {
        let cfg = McEffConfig::default();
        let mut proj = Projections::default();
        project_step(&cfg, &mut proj, 1, &sparse(), 421).unwrap();
        assert!(proj.pt_badcoll[0].get(1).is_none());
        assert_relative_eq!(proj.cosp[0].get(1).unwrap().integral(), 4.0);
    }

    #[test]
    fn efficiencies_are_ratios_to_the_reference_step() {
        let cfg = McEffConfig::default();
        let mut proj = Projections::default();
        let s = sparse();
        for step in [1, 6] {
            project_step(&cfg, &mut proj, step, &s, 421).unwrap();
        }
        // half of step 1 survives in step 8
        let mut scaled = SparseHist::new("h", "", s.axes().to_vec());
        for (k, c) in s.iter() {
            scaled.add_to_bin(k.to_vec(), c.sumw / 2.0, c.sumw2 / 4.0);
        }
        project_step(&cfg, &mut proj, 8, &scaled, 421).unwrap();

        let d = derive(&cfg, &proj, Origin::Prompt).unwrap();
        let eff8 = &d.eff[&8];
        assert_eq!(eff8.name, "h_pt_eff_prompt_step8");
        // pT 2.5 lands in the [1, 3) rebinned bin
        assert_relative_eq!(eff8.bin_content(2), 0.5);
        assert!(!d.eff.contains_key(&2));
        let ratio = &d.ratio_badcoll[&6];
        assert_relative_eq!(ratio.bin_content(2), 0.25);
        assert!(d.tracked_over_trackable.is_none());
    }
}
