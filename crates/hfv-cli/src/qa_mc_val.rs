//! `hfv qa-mc-val`: QA of the MC validation tasks.
//!
//! Reads the generator and reconstruction outputs of
//! `hf-task-mc-validation-{gen,rec}` and produces:
//!
//! - prompt and non-prompt charm hadron abundances per collision,
//! - generated pT, rapidity and decay length spectra per decay channel,
//! - efficiency × acceptance versus pT per centrality class,
//! - the collision reconstruction efficiency,
//! - track-to-collision association efficiencies per track origin,
//! - correlation maps of collisions sharing a bunch crossing.
//!
//! Everything lands in `QA_output<suffix>.json` under the directories
//! `gen-distr/`, `efficiencies/`, `pv/` and `pv-association/`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hfv_core::style::marker;
use hfv_core::{Axis, DivideMode, Hist1D, Hist2D, HistBundle, HistSource, HistStyle, SparseHist};
use hfv_viz::{Figure, Frame, HeatmapSeries, HistSeries, Label, Legend, Pad, PointSeries};

use crate::Ctx;
use crate::config::{Channel, CollisionSystem, QaMcValConfig};
use crate::io::open_source;
use crate::plot::{self, fmt_edge};

const PROMPT_COLOR: &str = "kRed+1";
const NONPROMPT_COLOR: &str = "kAzure+4";
const ORIGIN_COLORS: [&str; 4] = ["kGray+1", "kGreen+2", "kRed+1", "kAzure+4"];
const PT_TITLE: &str = "#it{p}_{T} (GeV/#it{c})";

/// Event selection the validation tasks ran with; selects the task names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EventType {
    #[default]
    All,
    /// Minimum bias.
    Mb,
    /// Events with a beauty quark.
    B,
    /// Events with a charm quark.
    C,
}

impl EventType {
    /// Suffix of the task names and of the output directory.
    pub fn tag(self) -> &'static str {
        match self {
            EventType::All => "",
            EventType::Mb => "_minimum_bias",
            EventType::B => "_beauty",
            EventType::C => "_charm",
        }
    }
}

pub struct QaMcValArgs<'a> {
    pub input: &'a Path,
    pub out_dir: &'a Path,
    pub suffix: &'a str,
    pub system: CollisionSystem,
    /// Restrict the association checks to tracks with a TOF hit.
    pub coll_ass_tof: bool,
    pub event_type: EventType,
    /// Also draw the generated spectra, efficiency ratios, association and
    /// same-BC figures.
    pub full: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Prompt,
    NonPrompt,
}

impl Origin {
    const BOTH: [Origin; 2] = [Origin::Prompt, Origin::NonPrompt];

    fn folder(self) -> &'static str {
        match self {
            Origin::Prompt => "Prompt",
            Origin::NonPrompt => "NonPrompt",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Origin::Prompt => "prompt",
            Origin::NonPrompt => "nonprompt",
        }
    }

    fn legend(self) -> &'static str {
        match self {
            Origin::Prompt => "prompt",
            Origin::NonPrompt => "non-prompt",
        }
    }

    fn style(self) -> HistStyle {
        match self {
            Origin::Prompt => plot::style(PROMPT_COLOR, marker::FULL_SQUARE, 1.0, 2.0),
            Origin::NonPrompt => plot::style(NONPROMPT_COLOR, marker::FULL_CIRCLE, 1.0, 2.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Meson,
    Baryon,
}

impl Family {
    fn folder(self) -> &'static str {
        match self {
            Family::Meson => "Meson",
            Family::Baryon => "Baryon",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Family::Meson => "meson",
            Family::Baryon => "baryon",
        }
    }

    /// Lower edge of the abundance axis.
    fn y_min(self) -> f64 {
        match self {
            Family::Meson => 1e-8,
            Family::Baryon => 1e-5,
        }
    }
}

/// Generator maps of one origin and hadron family; the X axis of each map
/// runs over the decay channels of the family.
struct GenMaps {
    pt: Hist2D,
    y: Hist2D,
    declen: Hist2D,
    /// Channel × pT × centrality.
    pt_cent: hfv_core::Hist3D,
}

impl GenMaps {
    fn load(src: &dyn HistSource, task: &str, origin: Origin, family: Family) -> Result<Self> {
        let (o, f) = (origin.folder(), family.folder());
        let path = |what: &str| format!("{task}/{o}Charm{f}s/h{o}{f}s{what}");
        let h2 = |what: &str| -> Result<Hist2D> {
            let p = path(what);
            src.get_h2(&p).with_context(|| format!("reading {p}"))
        };
        let pt_cent = path("PtCentDistr");
        Ok(Self {
            pt: h2("PtDistr")?,
            y: h2("YDistr")?,
            declen: h2("DecLenDistr")?,
            pt_cent: src.get_h3(&pt_cent).with_context(|| format!("reading {pt_cent}"))?,
        })
    }

    /// Generated particles of every channel per collision.
    fn abundance(&self, origin: Origin, family: Family, channels: &[Channel], n_events: f64) -> Hist1D {
        let mut h = self.pt.projection_x(format!("h_abundances_{}{}", origin.tag(), family.tag()), None);
        h.scale(1.0 / n_events);
        h.title.clear();
        h.x.title.clear();
        for (i, ch) in channels.iter().enumerate() {
            h.x.set_bin_label(i + 1, ch.label.clone());
        }
        h.style = HistStyle {
            line_color: origin.style().line_color,
            line_width: 2.0,
            ..HistStyle::default()
        };
        h
    }
}

/// Generated spectra of one channel and origin.
struct Spectra {
    /// Generator binning, for the distribution figures.
    pt_fine: Hist1D,
    /// pT in the efficiency binning.
    pt: Hist1D,
    y: Hist1D,
    declen: Hist1D,
    /// pT × centrality of the channel.
    pt_cent: Hist2D,
}

impl Spectra {
    fn project(maps: &GenMaps, origin: Origin, ch: &Channel, bin: usize, pt_bins: &[f64]) -> Result<Self> {
        let name = |what: &str| format!("h_{what}_gen_{}{}", origin.tag(), ch.name);
        let project = |map: &Hist2D, what: &str| {
            let mut h = map.projection_y(name(what), Some((bin, bin)));
            h.style = origin.style();
            h
        };
        let pt_fine = project(&maps.pt, "pt");
        let pt = pt_fine
            .rebin(pt_fine.name.clone(), pt_bins)
            .with_context(|| format!("rebinning generated pT of {}", ch.name))?;

        let mut cube = maps.pt_cent.clone();
        cube.x.set_range(bin as i64, bin as i64);
        let pt_cent = cube.project_zy(name("pt_vcent"));

        Ok(Self {
            pt_fine,
            pt,
            y: project(&maps.y, "y"),
            declen: project(&maps.declen, "declenen"),
            pt_cent,
        })
    }
}

/// Centrality windows the efficiencies are computed in.
fn centrality_classes(cfg: &QaMcValConfig, system: CollisionSystem) -> Vec<(f64, f64)> {
    let windows = |edges: &[f64]| edges.windows(2).map(|w| (w[0], w[1])).collect::<Vec<_>>();
    match system {
        CollisionSystem::Pp => windows(&cfg.centrality_bins_pp),
        CollisionSystem::PbPb => {
            let mut classes = vec![(0.0, 100.0)];
            for w in windows(&cfg.centrality_bins_pbpb) {
                if !classes.contains(&w) {
                    classes.push(w);
                }
            }
            classes
        }
    }
}

fn class_tag((lo, hi): (f64, f64)) -> String {
    format!("{}_{}", fmt_edge(lo), fmt_edge(hi))
}

/// Reconstructed over generated pT inside a centrality window; an empty
/// generated projection yields an empty efficiency.
fn eff_vcent(
    gen_: &Hist2D,
    reco: &Hist2D,
    window: (f64, f64),
    pt_bins: &[f64],
    name: String,
) -> Result<Hist1D> {
    let project = |h: &Hist2D, tag: &str| -> Result<Hist1D> {
        let mut y = h.y.clone();
        y.set_range_user(window.0, window.1);
        let bins = y.range().unwrap_or((1, y.nbins()));
        Ok(h.projection_x(tag, Some(bins)).rebin(tag, pt_bins)?)
    };
    let g = project(gen_, "gen")?;
    let r = project(reco, "reco")?;
    let mut eff = if g.entries != 0.0 {
        Hist1D::divide(name, &r, &g, DivideMode::Binomial)?
    } else {
        let mut h = r.clone_named(name);
        h.reset();
        h
    };
    eff.title.clear();
    eff.x.title = PT_TITLE.into();
    Ok(eff)
}

/// Prompt, non-prompt and their ratio for one channel and centrality class.
struct ClassEff {
    class: (f64, f64),
    prompt: Hist1D,
    nonprompt: Hist1D,
    ratio: Hist1D,
}

fn channel_efficiencies(
    src: &dyn HistSource,
    rec_task: &str,
    ch: &Channel,
    gen_: [&Hist2D; 2],
    classes: &[(f64, f64)],
    pt_bins: &[f64],
) -> Result<Vec<ClassEff>> {
    let reco = |what: &str| -> Result<Hist2D> {
        let p = format!("{rec_task}/{}/histPtCentReco{what}", ch.name);
        src.get_h2(&p).with_context(|| format!("reading {p}"))
    };
    let reco = [reco("Prompt")?, reco("NonPrompt")?];

    let mut out = Vec::with_capacity(classes.len());
    for &class in classes {
        let tag = class_tag(class);
        let [prompt, nonprompt] = [0, 1].map(|i| {
            let origin = Origin::BOTH[i];
            let name = format!("h_eff_{}{}vcent{tag}", origin.tag(), ch.name);
            eff_vcent(gen_[i], &reco[i], class, pt_bins, name).map(|mut h| {
                h.style = origin.style();
                h
            })
        });
        let (prompt, nonprompt) = (prompt?, nonprompt?);
        let mut ratio = Hist1D::divide(
            format!("h_eff_ratio{}vcent{tag}", ch.name),
            &nonprompt,
            &prompt,
            DivideMode::Plain,
        )?;
        ratio.style = plot::style("kBlack", marker::FULL_CIRCLE, 1.0, 2.0);
        out.push(ClassEff { class, prompt, nonprompt, ratio });
    }
    Ok(out)
}

fn abundance_figure(family: Family, hs: &[Hist1D; 2], suffix: &str) -> Figure {
    let mut fig = Figure::new(format!("particle_abundances_{}s{suffix}", family.tag()), 600.0, 600.0);
    let pad = &mut fig.pads[0];
    pad.log_y = true;
    pad.margins = plot::margins(0.12, 0.1, 0.05, 0.12);
    pad.frame = Some(
        Frame::from_h1(&hs[0], true)
            .with_y_range(family.y_min(), 1e2)
            .with_y_title("Generated particles per collision"),
    );
    let mut leg = Legend::new(0.5, 0.7, 0.8, 0.9, 0.045);
    for (h, origin) in hs.iter().zip(Origin::BOTH) {
        pad.push(HistSeries::from_h1(h, origin.legend()));
        leg.add(origin.legend(), &h.style, "l");
    }
    pad.legend = Some(leg);
    fig
}

fn origin_legend<'a>(hs: impl IntoIterator<Item = &'a Hist1D>, x0: f64, y0: f64, x1: f64, y1: f64) -> Legend {
    let mut leg = Legend::new(x0, y0, x1, y1, 0.045);
    for (h, origin) in hs.into_iter().zip(Origin::BOTH) {
        leg.add(origin.legend(), &h.style, "p");
    }
    leg
}

fn pt_of(s: &Spectra) -> &Hist1D {
    &s.pt_fine
}

fn y_of(s: &Spectra) -> &Hist1D {
    &s.y
}

fn declen_of(s: &Spectra) -> &Hist1D {
    &s.declen
}

/// pT, rapidity and decay length spectra of one channel.
fn spectra_figures(ch: &Channel, sp: &[Spectra; 2], pt_max: f64, suffix: &str) -> Vec<Figure> {
    type Get = fn(&Spectra) -> &Hist1D;
    let panels: [(&str, Get, (f64, f64), String); 3] = [
        ("ptgen", pt_of, (0.0, pt_max), format!(";{} {PT_TITLE};entries", ch.label)),
        ("ygen", y_of, (-1.5, 1.5), format!(";{} #it{{y}};entries", ch.label)),
        ("declengen", declen_of, (0.0, 1e4), format!(";{} decay length (#mum);entries", ch.label)),
    ];
    panels
        .into_iter()
        .map(|(what, get, (x0, x1), titles)| {
            let (p, np) = (get(&sp[0]), get(&sp[1]));
            let peak = p.maximum().max(np.maximum()) * 5.0;
            let mut fig = Figure::new(format!("{}_{what}_distr{suffix}", ch.name), 500.0, 500.0);
            let pad = &mut fig.pads[0];
            pad.log_y = true;
            pad.frame = Some(Frame::new(x0, 1.0, x1, peak.max(10.0), &titles));
            pad.push(PointSeries::from_h1(p, Origin::Prompt.legend()));
            pad.push(PointSeries::from_h1(np, Origin::NonPrompt.legend()));
            pad.legend = Some(origin_legend([p, np], 0.6, 0.75, 0.9, 0.9));
            fig
        })
        .collect()
}

fn centrality_label(pad: &mut Pad, system: CollisionSystem, (lo, hi): (f64, f64)) {
    if system == CollisionSystem::PbPb {
        pad.add_label(Label::new(0.2, 0.2, format!("Centrality {} - {}", fmt_edge(lo), fmt_edge(hi)), 0.04));
    }
}

fn efficiency_figure(ch: &Channel, eff: &ClassEff, pt_max: f64, system: CollisionSystem, suffix: &str) -> Figure {
    let y_min = eff.prompt.minimum().min(eff.nonprompt.minimum()).max(1e-5) * 0.5;
    let name = format!("{}_efficiency_vcent{}{suffix}", ch.name, class_tag(eff.class));
    let mut fig = Figure::new(name, 500.0, 500.0);
    let pad = &mut fig.pads[0];
    pad.grid = true;
    pad.log_y = true;
    pad.frame = Some(Frame::new(
        0.0,
        y_min,
        pt_max,
        1.5,
        &format!("Centrality interval ;{PT_TITLE};{} efficiency #times acceptance", ch.label),
    ));
    pad.push(PointSeries::from_h1(&eff.prompt, "prompt"));
    pad.push(PointSeries::from_h1(&eff.nonprompt, "non-prompt"));
    pad.legend = Some(origin_legend([&eff.prompt, &eff.nonprompt], 0.6, 0.3, 0.9, 0.4));
    centrality_label(pad, system, eff.class);
    fig
}

fn efficiency_ratio_figure(ch: &Channel, eff: &ClassEff, pt_max: f64, system: CollisionSystem, suffix: &str) -> Figure {
    let name = format!("{}_efficiency_ratio_vcent{}{suffix}", ch.name, class_tag(eff.class));
    let mut fig = Figure::new(name, 500.0, 500.0);
    let pad = &mut fig.pads[0];
    pad.frame = Some(Frame::new(0.0, 0.5, pt_max, 1.5, &format!(";{PT_TITLE};{} non-prompt / prompt", ch.label)));
    pad.push(PointSeries::from_h1(&eff.ratio, ""));
    centrality_label(pad, system, eff.class);
    fig
}

/// Association histograms of one track origin versus pT or pseudorapidity.
struct Association {
    ass: Hist1D,
    nonass: Hist1D,
    good: Hist1D,
    good_amb: Hist1D,
    /// Tracks without collision over tracks with collision.
    eff_ass: Hist1D,
    /// Tracks with the correct collision over tracks with collision.
    eff_good: Hist1D,
    /// As `eff_good`, counting all compatible collisions of ambiguous tracks.
    eff_good_amb: Hist1D,
}

impl Association {
    fn build(
        sparses: &[SparseHist; 4],
        dim: usize,
        tag: &str,
        origin: &str,
        color: &str,
    ) -> Result<Self> {
        let name = |what: &str| format!("h_{what}{tag}_{origin}");
        let style = plot::style(color, marker::FULL_CIRCLE, 1.0, 2.0);
        let project = |s: &SparseHist, what: &str| -> Result<Hist1D> {
            let mut h = s.projection_1d(dim)?.clone_named(name(what));
            h.style = style.clone();
            Ok(h)
        };
        let ass = project(&sparses[0], "ass")?;
        let nonass = project(&sparses[1], "nonass")?;
        let good = project(&sparses[2], "assgood")?;
        let mut good_amb = project(&sparses[3], "assgood_amb")?;
        good_amb.add(&good, 1.0)?;
        good_amb.style.marker_style = marker::OPEN_CIRCLE;

        let eff_ass = Hist1D::divide(name("eff_ass"), &nonass, &ass, DivideMode::Plain)?;
        let eff_good = Hist1D::divide(name("eff_assgood"), &good, &ass, DivideMode::Binomial)?;
        let eff_good_amb = Hist1D::divide(name("eff_assgood_wamb"), &good_amb, &ass, DivideMode::Binomial)?;
        Ok(Self { ass, nonass, good, good_amb, eff_ass, eff_good, eff_good_amb })
    }

    fn all(&self) -> [&Hist1D; 7] {
        [
            &self.ass,
            &self.nonass,
            &self.good,
            &self.good_amb,
            &self.eff_ass,
            &self.eff_good,
            &self.eff_good_amb,
        ]
    }
}

/// Association efficiencies of every configured track origin.
struct OriginChecks {
    origins: Vec<String>,
    pt: Vec<Association>,
    eta: Vec<Association>,
    zvtx: Vec<Hist1D>,
    ambiguous: Vec<Hist1D>,
}

fn association_checks(
    cfg: &QaMcValConfig,
    src: &dyn HistSource,
    rec_task: &str,
    coll_ass_tof: bool,
) -> Result<OriginChecks> {
    let dir = format!("{rec_task}/{}", cfg.track_to_coll_dir);
    let sparse = |what: &str| -> Result<SparseHist> {
        let p = format!("{dir}/histOrigin{what}Tracks");
        src.get_sparse(&p).with_context(|| format!("reading {p}"))
    };
    let mut sparses = [
        sparse("Associated")?,
        sparse("NonAssociated")?,
        sparse("GoodAssociated")?,
        sparse("GoodAssociatedAmbiguous")?,
    ];
    let zvtx_axis = sparses[2].axis(3)?;
    let zvtx_bins = (
        zvtx_axis.find_bin(-cfg.zvtx_cut * 0.999) as i64,
        zvtx_axis.find_bin(cfg.zvtx_cut * 0.999) as i64,
    );

    let mut checks = OriginChecks {
        origins: cfg.track_origins.clone(),
        pt: Vec::new(),
        eta: Vec::new(),
        zvtx: Vec::new(),
        ambiguous: Vec::new(),
    };
    for (i, origin) in cfg.track_origins.iter().enumerate() {
        let bin = i as i64 + 1;
        for s in &mut sparses {
            s.axis_mut(0)?.set_range(bin, bin);
            if coll_ass_tof {
                s.axis_mut(5)?.set_range(2, 2);
            }
        }
        sparses[2].axis_mut(3)?.set_range(zvtx_bins.0, zvtx_bins.1);

        let color = plot::cycle(&ORIGIN_COLORS, i, "kBlack");
        checks.pt.push(Association::build(&sparses, 1, "", origin, color)?);
        checks.eta.push(Association::build(&sparses, 2, "_eta", origin, color)?);

        let mut zvtx = sparses[2].projection_1d(3)?.clone_named(format!("h_zvtx_goodass_{origin}"));
        zvtx.title.clear();
        zvtx.x.title = "#it{Z}_{vtx}^{ reco} - #it{Z}_{vtx}^{ gen} (cm)".into();
        zvtx.style = HistStyle { line_color: color.into(), line_width: 2.0, ..HistStyle::default() };
        checks.zvtx.push(zvtx);
    }

    // The first origin (fakes) has no ambiguity entry.
    let tracks_path = format!("{rec_task}/histTracks");
    let amb_path = format!("{dir}/histAmbiguousTracks");
    let tracks = src.get_h2(&tracks_path).with_context(|| format!("reading {tracks_path}"))?;
    let ambiguous = src.get_h2(&amb_path).with_context(|| format!("reading {amb_path}"))?;
    for (i, origin) in cfg.track_origins.iter().enumerate().skip(1) {
        let bin = i + 1;
        let all = tracks.projection_y(format!("h_tr_per_origin_{origin}"), Some((bin, bin)));
        let amb = ambiguous.projection_y(format!("h_ambtr_per_origin_{origin}"), Some((bin, bin)));
        let mut frac =
            Hist1D::divide(format!("h_fracanv_amb_per_origin_{origin}"), &amb, &all, DivideMode::Binomial)?;
        frac.style = plot::style(plot::cycle(&ORIGIN_COLORS, i, "kBlack"), marker::FULL_CIRCLE, 1.0, 2.0);
        checks.ambiguous.push(frac);
    }
    Ok(checks)
}

fn association_figures(checks: &OriginChecks, suffix: &str) -> Vec<Figure> {
    let single = |name: &str, frame: Frame, log_y: bool| {
        let mut fig = Figure::new(format!("{name}{suffix}"), 500.0, 500.0);
        fig.pads[0].frame = Some(frame);
        fig.pads[0].log_y = log_y;
        fig
    };
    let legend = |skip_fakes: bool, y0: f64, y1: f64, hs: &[&Hist1D]| {
        let mut leg = if skip_fakes {
            Legend::new(0.2, y0, 0.4, y1, 0.045)
        } else {
            Legend::new(0.2, 0.7, 0.4, 0.95, 0.045)
        };
        for (i, (origin, h)) in checks.origins.iter().zip(hs).enumerate() {
            if !(skip_fakes && i == 0) {
                leg.add(origin.as_str(), &h.style, "pl");
            }
        }
        leg
    };
    let notes = [(0.25, "Full markers: only main collision"), (0.2, "Open markers: all compatible collisions")];

    let mut figs = Vec::new();
    for (sets, var, x_title, (x0, x1)) in [
        (&checks.pt, "", PT_TITLE, (0.0, 10.0)),
        (&checks.eta, "_vseta", "#it{#eta}", (-1.0, 1.0)),
    ] {
        let mut fig = single(
            &format!("collision_association_efficiency{var}"),
            Frame::new(x0, 1e-5, x1, 1.0, &format!(";{x_title}; tracks w/o collision / tracks w/ collision")),
            true,
        );
        let effs: Vec<&Hist1D> = sets.iter().map(|a| &a.eff_ass).collect();
        effs.iter().for_each(|h| fig.pads[0].push(PointSeries::from_h1(h, "")));
        fig.pads[0].legend = Some(legend(false, 0.7, 0.95, &effs));
        figs.push(fig);

        let mut fig = single(
            &format!("collision_good_association_efficiency{var}"),
            Frame::new(x0, 0.0, x1, 1.2, &format!(";{x_title}; tracks w/ correct collision / tracks w/ collision")),
            false,
        );
        for a in sets {
            fig.pads[0].push(PointSeries::from_h1(&a.eff_good, ""));
            fig.pads[0].push(PointSeries::from_h1(&a.eff_good_amb, ""));
        }
        let goods: Vec<&Hist1D> = sets.iter().map(|a| &a.eff_good).collect();
        fig.pads[0].legend = Some(legend(true, 0.3, 0.5, &goods));
        for (y, text) in notes {
            fig.pads[0].add_label(Label::new(0.2, y, text, 0.04));
        }
        figs.push(fig);
    }

    let mut fig = Figure::new(format!("Zvtx_residual_matchedcoll{suffix}"), 600.0, 600.0);
    fig.pads[0].log_y = true;
    let zvtx: Vec<&Hist1D> = checks.zvtx.iter().collect();
    fig.pads[0].frame = plot::frame_for_all(&zvtx[1.min(zvtx.len())..], true).map(|f| f.with_y_title("entries"));
    for h in zvtx.iter().skip(1) {
        fig.pads[0].push(HistSeries::from_h1(h, ""));
    }
    fig.pads[0].legend = Some(legend(true, 0.7, 0.9, &zvtx));
    figs.push(fig);

    let mut fig = Figure::new(format!("fraction_ambiguous_tracks{suffix}"), 800.0, 800.0);
    fig.pads[0].frame = Some(Frame::new(0.0, 0.0, 10.0, 1.0, &format!(";{PT_TITLE};fraction of ambiguous tracks")));
    let mut leg = Legend::new(0.2, 0.3, 0.4, 0.5, 0.045);
    for (h, origin) in checks.ambiguous.iter().zip(checks.origins.iter().skip(1)) {
        fig.pads[0].push(PointSeries::from_h1(h, origin.as_str()));
        leg.add(origin.as_str(), &h.style, "pl");
    }
    fig.pads[0].legend = Some(leg);
    figs.push(fig);
    figs
}

/// Generated and reconstructed collision counters and their ratio.
fn collision_counters(n_gen: f64, n_reco: f64) -> Result<(Hist1D, Hist1D)> {
    let line = HistStyle { line_color: "kBlack".into(), line_width: 2.0, ..HistStyle::default() };

    let mut counts = Hist1D::from_contents("h_collisions", Axis::uniform(2, 0.5, 2.5)?, &[n_gen, n_reco])?;
    counts.x.set_bin_label(1, "generated collisions");
    counts.x.set_bin_label(2, "reconstructed collisions");
    counts.style = line.clone();

    let ratio = if n_gen > 0.0 { n_reco / n_gen } else { 0.0 };
    let mut eff = Hist1D::from_contents("h_collisions_eff", Axis::uniform(1, 0.5, 1.5)?, &[ratio])?;
    eff.x.set_bin_label(1, "collision reco. efficiency");
    eff.style = line;
    Ok((counts, eff))
}

fn counter_figure(name: String, h: &Hist1D, y_title: &str) -> Figure {
    let mut fig = Figure::new(name, 800.0, 800.0);
    let pad = &mut fig.pads[0];
    pad.margins = plot::margins(0.12, 0.05, 0.05, 0.1);
    pad.frame = Some(Frame::from_h1(h, false).with_y_title(y_title));
    pad.push(HistSeries::from_h1(h, ""));
    fig
}

/// Correlations between collisions reconstructed in the same bunch crossing.
///
/// Sparse axes: contributors of the two collisions (0, 1), their radii
/// (2, 3) and their contributors from beauty decays (4, 5).
fn same_bc_maps(mut sbc: SparseHist) -> Result<(Hist1D, Vec<Hist2D>)> {
    let sum1 = |s: &SparseHist, a: usize, b: usize, name: &str| -> Result<Hist1D> {
        let mut h = s.projection_1d(a)?.clone_named(name);
        h.add(&s.projection_1d(b)?, 1.0)?;
        Ok(h)
    };
    let proj = |s: &SparseHist, y: usize, x: usize, name: &str| -> Result<Hist2D> {
        Ok(s.projection_2d(y, x)?.clone_named(name))
    };
    let sum2 = |s: &SparseHist, (y1, x1): (usize, usize), (y2, x2): (usize, usize), name: &str| -> Result<Hist2D> {
        let mut h = proj(s, y1, x1, name)?;
        h.add(&s.projection_2d(y2, x2)?, 1.0)?;
        Ok(h)
    };
    let titled = |mut h: Hist2D, x: &str, y: &str| {
        h.x.title = x.into();
        h.y.title = y.into();
        h
    };

    sbc.reset_ranges();
    let ncontr = sum1(&sbc, 0, 1, "h_ncontr")?;
    let mut maps = vec![proj(&sbc, 1, 0, "h_corr_ncontr")?];
    sbc.axis_mut(4)?.set_range(2, 100);
    maps.push(proj(&sbc, 1, 0, "h_corr_ncontr_withb1")?);
    sbc.axis_mut(4)?.reset_range();
    sbc.axis_mut(5)?.set_range(2, 100);
    maps.push(proj(&sbc, 1, 0, "h_corr_ncontr_withb2")?);
    sbc.axis_mut(5)?.reset_range();

    maps.push(proj(&sbc, 5, 4, "h_corr_nbeauty")?);
    let mut nbeauty = titled(
        sum2(&sbc, (4, 0), (5, 1), "h_corr_ncontr_nbeauty")?,
        "number of contributors",
        "number of contributors from beauty",
    );
    nbeauty.x.set_range_user(0.0, 100.0);
    maps.push(nbeauty);
    maps.push(proj(&sbc, 3, 2, "h_corr_radius")?);
    maps.push(titled(
        sum2(&sbc, (0, 2), (1, 3), "h_corr_ncontr_radius")?,
        "#it{R}_{xy} (cm)",
        "number of contributors",
    ));

    sbc.axis_mut(4)?.set_range(1, 1);
    sbc.axis_mut(5)?.set_range(1, 1);
    maps.push(titled(
        sum2(&sbc, (0, 2), (1, 3), "h_corr_ncontr_radius_nobeauty")?,
        "#it{R}_{xy} (cm)",
        "number of contributors",
    ));
    sbc.reset_ranges();
    maps.push(sum2(&sbc, (4, 2), (5, 3), "h_corr_nbeauty_radius")?);
    Ok((ncontr, maps))
}

fn heatmap_pad(pad: &mut Pad, h: &Hist2D, log_z: bool) {
    pad.frame = Some(Frame::from_h2(h));
    pad.margins = plot::margins(0.12, 0.12, 0.05, 0.12);
    pad.log_z = log_z;
    pad.push(HeatmapSeries::from_h2(h, ""));
}

fn same_bc_figures(maps: &[Hist2D], suffix: &str) -> Vec<Figure> {
    let mut figs = Vec::new();
    let mut contributors = Figure::grid(
        format!("correlation_number_contributors_collisions_samebc{suffix}"),
        1200.0,
        400.0,
        3,
        1,
    );
    for (pad, h) in contributors.pads.iter_mut().zip(maps.iter().take(3)) {
        heatmap_pad(pad, h, true);
    }
    figs.push(contributors);

    let singles = [
        ("h_corr_nbeauty", "correlation_number_beauty_collisions_samebc"),
        ("h_corr_ncontr_nbeauty", "correlation_number_contributors_number_beauty_collisions_samebc"),
        ("h_corr_radius", "correlation_radius_collisions_samebc"),
        ("h_corr_ncontr_radius", "correlation_number_contributors_radius_collisions_samebc"),
        ("h_corr_ncontr_radius_nobeauty", "correlation_number_contributors_radius_collisions_samebc_nobeauty"),
        ("h_corr_nbeauty_radius", "correlation_number_beauty_radius_collisions_samebc"),
    ];
    for (hist, fig_name) in singles {
        if let Some(h) = maps.iter().find(|h| h.name == hist) {
            let mut fig = Figure::new(format!("{fig_name}{suffix}"), 800.0, 800.0);
            heatmap_pad(&mut fig.pads[0], h, false);
            figs.push(fig);
        }
    }
    figs
}

/// `path` with `tag` appended to its last component.
fn tagged_dir(path: &Path, tag: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(tag);
    PathBuf::from(s)
}

/// Warn and continue without an object the QA can do without.
fn optional<T>(what: &str, r: Result<T>) -> Option<T> {
    match r {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("skipping {what}: {e:#}");
            None
        }
    }
}

pub fn cmd_qa_mc_val(ctx: &Ctx, args: &QaMcValArgs<'_>) -> Result<()> {
    let cfg = &ctx.config.qa_mc_val;
    let tag = args.event_type.tag();
    let suffix = args.suffix;
    let gen_task = format!("{}{tag}", cfg.gen_task);
    let rec_task = format!("{}{tag}", cfg.rec_task);
    let pt_max = cfg.pt_bins.last().copied().unwrap_or(50.0);

    let src = open_source(args.input)?;
    let src = src.as_ref();
    let n_gen = src
        .get_h1(&format!("{gen_task}/hNevGen"))
        .with_context(|| format!("reading {gen_task}/hNevGen"))?
        .entries;
    let mut n_reco = src
        .get_h1(&format!("{rec_task}/histXvtxReco"))
        .with_context(|| format!("reading {rec_task}/histXvtxReco"))?
        .entries;
    tracing::info!(generated = n_gen, reconstructed = n_reco, "collisions");
    if n_reco == 0.0 {
        tracing::warn!("no reconstructed collisions, abundances are not normalized");
        n_reco = 1.0;
    }

    let mut bundle = HistBundle::new("hfv qa-mc-val");
    let mut figs = Vec::new();
    let classes = centrality_classes(cfg, args.system);

    let split = cfg.n_mesons.min(cfg.channels.len());
    let (mesons, baryons) = cfg.channels.split_at(split);
    for (family, channels) in [(Family::Meson, mesons), (Family::Baryon, baryons)] {
        if channels.is_empty() {
            continue;
        }
        let maps = [
            GenMaps::load(src, &gen_task, Origin::Prompt, family)?,
            GenMaps::load(src, &gen_task, Origin::NonPrompt, family)?,
        ];
        let abundances = [
            maps[0].abundance(Origin::Prompt, family, channels, n_reco),
            maps[1].abundance(Origin::NonPrompt, family, channels, n_reco),
        ];
        figs.push(abundance_figure(family, &abundances, suffix));
        for h in abundances {
            bundle.insert_in("gen-distr", h);
        }

        for (i, ch) in channels.iter().enumerate() {
            tracing::info!(channel = %ch.name, "processing");
            let spectra = [
                Spectra::project(&maps[0], Origin::Prompt, ch, i + 1, &cfg.pt_bins)?,
                Spectra::project(&maps[1], Origin::NonPrompt, ch, i + 1, &cfg.pt_bins)?,
            ];
            if args.full {
                figs.extend(spectra_figures(ch, &spectra, pt_max, suffix));
            }
            let effs = channel_efficiencies(
                src,
                &rec_task,
                ch,
                [&spectra[0].pt_cent, &spectra[1].pt_cent],
                &classes,
                &cfg.pt_bins,
            )?;
            for eff in &effs {
                if eff.prompt.entries == 0.0 || eff.nonprompt.entries == 0.0 {
                    tracing::warn!(channel = %ch.name, class = %class_tag(eff.class), "empty efficiency, not drawn");
                    continue;
                }
                figs.push(efficiency_figure(ch, eff, pt_max, args.system, suffix));
                if args.full {
                    figs.push(efficiency_ratio_figure(ch, eff, pt_max, args.system, suffix));
                }
            }

            for sp in spectra {
                bundle.insert_in("gen-distr", sp.pt);
                bundle.insert_in("gen-distr", sp.y);
                bundle.insert_in("gen-distr", sp.declen);
                bundle.insert_in("efficiencies", sp.pt_cent);
            }
            for eff in effs {
                bundle.insert_in("efficiencies", eff.prompt);
                bundle.insert_in("efficiencies", eff.nonprompt);
                bundle.insert_in("efficiencies", eff.ratio);
            }
        }
    }

    let (counts, coll_eff) = collision_counters(n_gen, n_reco)?;
    figs.push(counter_figure(format!("collision_counter{suffix}"), &counts, "counts"));
    figs.push(counter_figure(format!("collision_reco_eff{suffix}"), &coll_eff, "reco. efficiency"));
    bundle.insert_in("pv", counts);
    bundle.insert_in("pv", coll_eff);

    let checks_dir = format!("{rec_task}/{}", cfg.track_to_coll_dir);
    if let Some(h) = optional("track multiplicity", src.get_any(&format!("{rec_task}/histNtracks")).map_err(Into::into)) {
        bundle.insert("pv/h_ntracks", h);
    }
    if let Some(h) = optional(
        "fraction of good contributors",
        src.get_any(&format!("{checks_dir}/histFracGoodContributors")).map_err(Into::into),
    ) {
        bundle.insert("pv/h_frac_good_contr", h);
    }
    let same_bc = src
        .get_sparse(&format!("{checks_dir}/histCollisionsSameBC"))
        .map_err(anyhow::Error::from)
        .and_then(same_bc_maps);
    if let Some((ncontr, maps)) = optional("same-BC correlations", same_bc) {
        if args.full {
            figs.extend(same_bc_figures(&maps, suffix));
        }
        bundle.insert_in("pv", ncontr);
        for h in maps {
            bundle.insert_in("pv", h);
        }
    }

    if !cfg.track_origins.is_empty() {
        let checks = association_checks(cfg, src, &rec_task, args.coll_ass_tof)?;
        if args.full {
            figs.extend(association_figures(&checks, suffix));
        }
        for a in checks.pt.iter().chain(&checks.eta) {
            for h in a.all() {
                bundle.insert_in("pv-association", h.clone());
            }
        }
        for h in checks.zvtx.into_iter().chain(checks.ambiguous) {
            bundle.insert_in("pv-association", h);
        }
    }

    let out = ctx.output(&tagged_dir(args.out_dir, tag))?;
    out.save_all(&figs)?;
    out.write_bundle(&bundle, &format!("QA_output{suffix}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfv_core::{AnyHist, Hist3D};

    const GEN: &str = "hf-task-mc-validation-gen";
    const REC: &str = "hf-task-mc-validation-rec";

    fn test_config() -> QaMcValConfig {
        QaMcValConfig {
            channels: vec![
                Channel { name: "DzeroToKPi".into(), label: "D^{0}".into() },
                Channel { name: "DplusToPiKPi".into(), label: "D^{+}".into() },
                Channel { name: "LcToPKPi".into(), label: "#Lambda_{c}^{+}".into() },
            ],
            n_mesons: 2,
            pt_bins: vec![0.0, 2.0, 4.0],
            ..QaMcValConfig::default()
        }
    }

    fn species(n: usize) -> Axis {
        Axis::uniform(n, -0.5, n as f64 - 0.5).unwrap()
    }

    fn pt() -> Axis {
        Axis::uniform(4, 0.0, 4.0).unwrap()
    }

    fn cent() -> Axis {
        Axis::uniform(10, 0.0, 100.0).unwrap()
    }

    /// Generator and reconstruction outputs with `per_channel` generated
    /// particles of each channel at pT 0.5 and 2.5, centrality 5, and a
    /// quarter of them reconstructed.
    fn fixture(cfg: &QaMcValConfig) -> HistBundle {
        let mut b = HistBundle::new("fixture");
        let mut nev = Hist1D::new("hNevGen", "", Axis::uniform(1, 0.0, 1.0).unwrap());
        for _ in 0..200 {
            nev.fill(0.5, 1.0);
        }
        b.insert(format!("{GEN}/hNevGen"), nev);
        let mut xvtx = Hist1D::new("histXvtxReco", "", Axis::uniform(1, -1.0, 1.0).unwrap());
        for _ in 0..100 {
            xvtx.fill(0.0, 1.0);
        }
        b.insert(format!("{REC}/histXvtxReco"), xvtx);

        let (mesons, baryons) = cfg.channels.split_at(cfg.n_mesons);
        for (family, channels) in [(Family::Meson, mesons), (Family::Baryon, baryons)] {
            for origin in Origin::BOTH {
                let per_channel = if origin == Origin::Prompt { 40.0 } else { 20.0 };
                let (o, f) = (origin.folder(), family.folder());
                let n = channels.len();
                let mut pt_map = Hist2D::new("pt", "", species(n), pt());
                let mut y_map = Hist2D::new("y", "", species(n), Axis::uniform(6, -1.5, 1.5).unwrap());
                let mut dl_map = Hist2D::new("dl", "", species(n), Axis::uniform(10, 0.0, 1e4).unwrap());
                let mut cube = Hist3D::new("ptcent", "", species(n), pt(), cent());
                for i in 0..n {
                    let s = i as f64;
                    for p in [0.5, 2.5] {
                        pt_map.fill(s, p, per_channel / 2.0);
                        cube.fill(s, p, 5.0, per_channel / 2.0);
                    }
                    y_map.fill(s, 0.1, per_channel);
                    dl_map.fill(s, 150.0, per_channel);
                }
                let dir = format!("{GEN}/{o}Charm{f}s");
                b.insert(format!("{dir}/h{o}{f}sPtDistr"), pt_map);
                b.insert(format!("{dir}/h{o}{f}sYDistr"), y_map);
                b.insert(format!("{dir}/h{o}{f}sDecLenDistr"), dl_map);
                b.insert(format!("{dir}/h{o}{f}sPtCentDistr"), cube);

                for ch in channels {
                    let mut reco = Hist2D::new("reco", "", pt(), cent());
                    for p in [0.5, 2.5] {
                        reco.fill(p, 5.0, per_channel / 8.0);
                    }
                    b.insert(format!("{REC}/{}/histPtCentReco{o}", ch.name), reco);
                }
            }
        }
        b
    }

    fn load_maps(b: &HistBundle, origin: Origin) -> GenMaps {
        GenMaps::load(b, GEN, origin, Family::Meson).unwrap()
    }

    #[test]
    fn abundances_are_per_collision_with_channel_labels() {
        let cfg = test_config();
        let b = fixture(&cfg);
        let maps = load_maps(&b, Origin::Prompt);
        let h = maps.abundance(Origin::Prompt, Family::Meson, &cfg.channels[..2], 100.0);
        assert_eq!(h.name, "h_abundances_promptmeson");
        approx::assert_relative_eq!(h.bin_content(1), 0.4, epsilon = 1e-12);
        approx::assert_relative_eq!(h.bin_content(2), 0.4, epsilon = 1e-12);
        assert_eq!(h.x.bin_label(2), Some("D^{+}"));
    }

    #[test]
    fn spectra_select_the_channel_bin() {
        let cfg = test_config();
        let b = fixture(&cfg);
        let maps = load_maps(&b, Origin::NonPrompt);
        let sp = Spectra::project(&maps, Origin::NonPrompt, &cfg.channels[1], 2, &cfg.pt_bins).unwrap();
        assert_eq!(sp.pt.name, "h_pt_gen_nonpromptDplusToPiKPi");
        assert_eq!(sp.pt.contents(), vec![10.0, 10.0]);
        assert_eq!(sp.pt_fine.nbins(), 4);
        assert_eq!(sp.declen.name, "h_declenen_gen_nonpromptDplusToPiKPi");
        assert_eq!(sp.y.integral(), 20.0);
        assert_eq!(sp.pt_cent.name, "h_pt_vcent_gen_nonpromptDplusToPiKPi");
        assert_eq!(sp.pt_cent.integral(), 20.0);
    }

    #[test]
    fn efficiencies_per_centrality_class() {
        let cfg = test_config();
        let b = fixture(&cfg);
        let maps = [load_maps(&b, Origin::Prompt), load_maps(&b, Origin::NonPrompt)];
        let ch = &cfg.channels[0];
        let sp: Vec<Spectra> = Origin::BOTH
            .iter()
            .zip(&maps)
            .map(|(&o, m)| Spectra::project(m, o, ch, 1, &cfg.pt_bins).unwrap())
            .collect();
        let classes = centrality_classes(&cfg, CollisionSystem::PbPb);
        assert_eq!(classes[0], (0.0, 100.0));
        assert_eq!(classes[1], (0.0, 10.0));

        let effs =
            channel_efficiencies(&b, REC, ch, [&sp[0].pt_cent, &sp[1].pt_cent], &classes, &cfg.pt_bins).unwrap();
        assert_eq!(effs.len(), classes.len());
        let central = &effs[1];
        assert_eq!(central.prompt.name, "h_eff_promptDzeroToKPivcent0_10");
        approx::assert_relative_eq!(central.prompt.bin_content(1), 0.25, epsilon = 1e-12);
        approx::assert_relative_eq!(central.ratio.bin_content(2), 1.0, epsilon = 1e-12);
        // No collisions between 10 and 30 %.
        assert_eq!(effs[2].prompt.entries, 0.0);
        assert_eq!(effs[2].prompt.integral(), 0.0);
    }

    #[test]
    fn pp_uses_the_configured_class() {
        let cfg = test_config();
        let classes = centrality_classes(&cfg, CollisionSystem::Pp);
        assert_eq!(classes, vec![(0.0, 110.0)]);
        assert_eq!(class_tag(classes[0]), "0_110");
    }

    #[test]
    fn collision_counters_and_efficiency() {
        let (counts, eff) = collision_counters(200.0, 150.0).unwrap();
        assert_eq!(counts.contents(), vec![200.0, 150.0]);
        assert_eq!(counts.x.bin_label(1), Some("generated collisions"));
        approx::assert_relative_eq!(eff.bin_content(1), 0.75);
    }

    #[test]
    fn same_bc_maps_sum_both_collisions() {
        let axes = vec![
            Axis::uniform(10, 0.0, 10.0).unwrap(),
            Axis::uniform(10, 0.0, 10.0).unwrap(),
            Axis::uniform(5, 0.0, 5.0).unwrap(),
            Axis::uniform(5, 0.0, 5.0).unwrap(),
            Axis::uniform(3, -0.5, 2.5).unwrap(),
            Axis::uniform(3, -0.5, 2.5).unwrap(),
        ];
        let mut s = SparseHist::new("histCollisionsSameBC", "", axes);
        s.fill(&[2.5, 3.5, 0.5, 1.5, 0.0, 1.0], 1.0).unwrap();
        s.fill(&[4.5, 1.5, 2.5, 0.5, 0.0, 0.0], 1.0).unwrap();

        let (ncontr, maps) = same_bc_maps(s).unwrap();
        assert_eq!(ncontr.name, "h_ncontr");
        assert_eq!(ncontr.integral(), 4.0);

        let get = |name: &str| maps.iter().find(|h| h.name == name).unwrap();
        assert_eq!(get("h_corr_ncontr").integral(), 2.0);
        assert_eq!(get("h_corr_ncontr_withb1").integral(), 0.0);
        assert_eq!(get("h_corr_ncontr_withb2").integral(), 1.0);
        assert_eq!(get("h_corr_ncontr_radius").integral(), 4.0);
        assert_eq!(get("h_corr_ncontr_radius_nobeauty").integral(), 2.0);
        assert_eq!(get("h_corr_ncontr_radius").x.title, "#it{R}_{xy} (cm)");
        assert_eq!(same_bc_figures(&maps, "").len(), 7);
    }

    #[test]
    fn association_efficiencies_per_origin() {
        let axes = || {
            vec![
                Axis::uniform(2, -0.5, 1.5).unwrap(),
                Axis::uniform(2, 0.0, 2.0).unwrap(),
                Axis::uniform(2, -1.0, 1.0).unwrap(),
                Axis::uniform(4, -20.0, 20.0).unwrap(),
            ]
        };
        let mut b = HistBundle::new("fixture");
        let dir = format!("{REC}/TrackToCollChecks");
        let fills: [(&str, &[[f64; 4]]); 4] = [
            ("Associated", &[[1.0, 0.5, 0.5, 0.0], [1.0, 0.5, 0.5, 0.0], [1.0, 1.5, -0.5, 0.0], [1.0, 1.5, -0.5, 0.0]]),
            ("NonAssociated", &[[1.0, 0.5, 0.5, 0.0]]),
            ("GoodAssociated", &[[1.0, 0.5, 0.5, 1.0], [1.0, 1.5, -0.5, 15.0]]),
            ("GoodAssociatedAmbiguous", &[[1.0, 1.5, -0.5, 0.0]]),
        ];
        for (what, points) in fills {
            let mut s = SparseHist::new(what, "", axes());
            for p in points {
                s.fill(p, 1.0).unwrap();
            }
            b.insert(format!("{dir}/histOrigin{what}Tracks"), s);
        }
        let mut tracks = Hist2D::new("histTracks", "", Axis::uniform(2, -0.5, 1.5).unwrap(), pt());
        tracks.fill(1.0, 0.5, 4.0);
        let mut amb = Hist2D::new("histAmbiguousTracks", "", Axis::uniform(2, -0.5, 1.5).unwrap(), pt());
        amb.fill(1.0, 0.5, 1.0);
        b.insert(format!("{REC}/histTracks"), tracks);
        b.insert(format!("{dir}/histAmbiguousTracks"), amb);

        let cfg = QaMcValConfig { track_origins: vec!["fake".into(), "light".into()], ..test_config() };
        let checks = association_checks(&cfg, &b, REC, false).unwrap();
        assert_eq!(checks.pt.len(), 2);
        let light = &checks.pt[1];
        assert_eq!(light.eff_ass.name, "h_eff_ass_light");
        approx::assert_relative_eq!(light.eff_ass.bin_content(1), 0.5);
        // The track at 15 cm is outside the vertex window.
        approx::assert_relative_eq!(light.eff_good.bin_content(2), 0.0);
        approx::assert_relative_eq!(light.eff_good_amb.bin_content(2), 0.5);
        assert_eq!(checks.eta[1].eff_good.name, "h_eff_assgood_eta_light");
        assert_eq!(checks.ambiguous.len(), 1);
        approx::assert_relative_eq!(checks.ambiguous[0].bin_content(1), 0.25);
        assert_eq!(checks.pt[0].ass.integral(), 0.0);
        assert_eq!(association_figures(&checks, "_x").len(), 6);
    }

    #[test]
    fn output_dir_carries_event_tag() {
        assert_eq!(tagged_dir(Path::new("out/qa"), EventType::B.tag()), PathBuf::from("out/qa_beauty"));
        assert_eq!(tagged_dir(Path::new("out/qa"), EventType::All.tag()), PathBuf::from("out/qa"));
    }

    #[test]
    fn abundance_figure_uses_family_range() {
        let cfg = test_config();
        let b = fixture(&cfg);
        let hs = [Origin::Prompt, Origin::NonPrompt]
            .map(|o| load_maps(&b, o).abundance(o, Family::Meson, &cfg.channels[..2], 100.0));
        let fig = abundance_figure(Family::Meson, &hs, "_test");
        assert_eq!(fig.name, "particle_abundances_mesons_test");
        let frame = fig.pads[0].frame.as_ref().unwrap();
        assert_eq!(frame.y_min, 1e-8);
        assert_eq!(frame.x_bin_labels.len(), 2);
        assert!(matches!(b.get(&format!("{GEN}/hNevGen")), Some(AnyHist::H1(_))));
    }
}
