//! `hfv compare-qa-mc-val`: overlay several `qa-mc-val` outputs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::{Axis, DivideMode, Hist1D, HistBundle, HistSource, HistStyle};
use hfv_viz::{Figure, Frame, HistSeries, Legend, PointSeries, RefLine};

use crate::Ctx;
use crate::config::{Channel, CompareQaMcValConfig};
use crate::io::open_source;
use crate::plot::{self, color_at, marker_at};

const PT_TITLE: &str = "#it{p}_{T} (GeV/#it{c})";

/// One comparison page: the quantity per hadron on top, ratios to the first
/// input below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    PromptEff,
    NonPromptEff,
    EffRatio,
    PromptDeclen,
    NonPromptDeclen,
    PromptPt,
    NonPromptPt,
    PromptY,
    NonPromptY,
}

impl Page {
    const ALL: [Page; 9] = [
        Page::PromptEff,
        Page::NonPromptEff,
        Page::EffRatio,
        Page::PromptDeclen,
        Page::NonPromptDeclen,
        Page::PromptPt,
        Page::NonPromptPt,
        Page::PromptY,
        Page::NonPromptY,
    ];

    /// Object path inside a `qa-mc-val` bundle.
    fn path(self, had: &str, centrality: &str) -> String {
        match self {
            Page::PromptEff => format!("efficiencies/h_eff_prompt{had}vcent{centrality}"),
            Page::NonPromptEff => format!("efficiencies/h_eff_nonprompt{had}vcent{centrality}"),
            Page::EffRatio => format!("efficiencies/h_eff_ratio{had}vcent{centrality}"),
            Page::PromptDeclen => format!("gen-distr/h_declenen_gen_prompt{had}"),
            Page::NonPromptDeclen => format!("gen-distr/h_declenen_gen_nonprompt{had}"),
            Page::PromptPt => format!("gen-distr/h_pt_gen_prompt{had}"),
            Page::NonPromptPt => format!("gen-distr/h_pt_gen_nonprompt{had}"),
            Page::PromptY => format!("gen-distr/h_y_gen_prompt{had}"),
            Page::NonPromptY => format!("gen-distr/h_y_gen_nonprompt{had}"),
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Page::PromptEff => "prompt_efficiencies",
            Page::NonPromptEff => "nonprompt_efficiencies",
            Page::EffRatio => "ratio_efficiencies",
            Page::PromptDeclen => "prompt_gen_declen_distr",
            Page::NonPromptDeclen => "nonprompt_gen_declen_distr",
            Page::PromptPt => "prompt_gen_pt_distr",
            Page::NonPromptPt => "nonprompt_gen_pt_distr",
            Page::PromptY => "prompt_gen_y_distr",
            Page::NonPromptY => "nonprompt_gen_y_distr",
        }
    }

    /// Generated spectra are compared in shape.
    fn normalized(self) -> bool {
        !matches!(self, Page::PromptEff | Page::NonPromptEff | Page::EffRatio)
    }

    fn is_rapidity(self) -> bool {
        matches!(self, Page::PromptY | Page::NonPromptY)
    }

    fn x_title(self) -> &'static str {
        match self {
            Page::PromptDeclen | Page::NonPromptDeclen => "#it{L}_{gen} (#mum)",
            Page::PromptY | Page::NonPromptY => "#it{y}_{gen}",
            _ => PT_TITLE,
        }
    }

    fn y_title(self, had: &str) -> String {
        match self {
            Page::PromptEff => format!("prompt {had} efficiency"),
            Page::NonPromptEff => format!("non-prompt {had} efficiency"),
            Page::EffRatio => format!("non-prompt/prompt {had} efficiency ratio"),
            Page::PromptDeclen | Page::PromptPt | Page::PromptY => format!("prompt {had}"),
            _ => format!("nonprompt {had}"),
        }
    }

    fn y_range(self) -> (f64, f64) {
        match self {
            Page::PromptEff | Page::NonPromptEff => (5e-2, 1.6),
            Page::EffRatio => (0.0, 2.0),
            Page::PromptDeclen => (5e-5, 1.016),
            _ => (5e-6, 1.16),
        }
    }

    fn ratio_range(self) -> (f64, f64) {
        match self {
            Page::PromptEff => (0.86, 1.14),
            Page::NonPromptEff | Page::EffRatio => (0.8, 1.2),
            _ => (0.86, 1.16),
        }
    }

    fn log_y(self) -> bool {
        self != Page::EffRatio
    }
}

/// Objects read from one `qa-mc-val` output.
struct QaInput {
    label: String,
    /// Reconstructed over generated collisions with its binomial error.
    coll_eff: (f64, f64),
    /// `pages[page][hadron]`.
    pages: Vec<Vec<Hist1D>>,
    /// Prompt and non-prompt mesons, then prompt and non-prompt baryons.
    abundances: Vec<Hist1D>,
    ntracks: Option<Hist1D>,
}

fn load_input(
    cfg: &CompareQaMcValConfig,
    src: &dyn HistSource,
    label: String,
    hadrons: &[Channel],
    style: &HistStyle,
) -> Result<QaInput> {
    let get = |path: &str| -> Result<Hist1D> {
        let mut h = src.get_h1(path).with_context(|| format!("reading {path}"))?;
        h.style = style.clone();
        Ok(h)
    };

    let counts = get("pv/h_collisions")?;
    let (n_gen, n_reco) = (counts.bin_content(1), counts.bin_content(2));
    if n_gen <= 0.0 {
        bail!("no generated collisions in pv/h_collisions");
    }
    let eff = n_reco / n_gen;
    let coll_eff = (eff, (n_reco * (1.0 - eff)).max(0.0).sqrt() / n_gen);

    let mut pages = Vec::with_capacity(Page::ALL.len());
    for page in Page::ALL {
        let mut hs = Vec::with_capacity(hadrons.len());
        for had in hadrons {
            let mut h = get(&page.path(&had.name, &cfg.centrality))?;
            if page.normalized() {
                let integral = h.integral();
                if integral != 0.0 {
                    h.scale(1.0 / integral);
                }
            }
            hs.push(h);
        }
        pages.push(hs);
    }

    let abundances = ["promptmeson", "nonpromptmeson", "promptbaryon", "nonpromptbaryon"]
        .iter()
        .map(|k| get(&format!("gen-distr/h_abundances_{k}")))
        .collect::<Result<Vec<_>>>()?;

    let ntracks = match src.get_h1("pv/h_ntracks") {
        Ok(mut h) => {
            let integral = h.integral();
            if integral != 0.0 {
                h.scale(1.0 / integral);
            }
            h.style = style.clone();
            Some(h)
        }
        Err(e) => {
            log::debug!("no track multiplicity: {e}");
            None
        }
    };

    Ok(QaInput { label, coll_eff, pages, abundances, ntracks })
}

fn inputs_legend(inputs: &[QaInput], pick: impl Fn(&QaInput) -> &HistStyle) -> Legend {
    let mut leg = Legend::new(0.2, 0.18, 0.5, 0.45, 0.03);
    for input in inputs {
        leg.add(input.label.as_str(), pick(input), "pl");
    }
    leg
}

fn unity_line(x0: f64, x1: f64) -> RefLine {
    let mut line = RefLine::horizontal(x0, x1, 1.0, "kGray+1");
    line.width = 2.0;
    line.line_style = 9;
    line
}

/// Comparison page of one quantity, together with the ratios it draws.
fn page_figure(
    page: Page,
    inputs: &[QaInput],
    hadrons: &[Channel],
    name: String,
) -> Result<(Figure, Vec<Hist1D>)> {
    let (Some(first), Some(last)) = (inputs.first(), inputs.last()) else {
        bail!("{name}: nothing to compare");
    };
    let p = page as usize;
    let nx = hadrons.len().max(1);
    let mut fig = Figure::grid(name, 1800.0, 1200.0, nx, 2);
    let mut ratios = Vec::new();

    for (ih, had) in hadrons.iter().enumerate() {
        let ref_h = &last.pages[p][ih];
        let x_max = ref_h.x.up_edge(ref_h.nbins());
        let x_min = if page.is_rapidity() { -x_max } else { 0.0 };

        let (y0, y1) = page.y_range();
        let top = &mut fig.pads[ih];
        top.frame = Some(Frame::new(x_min, y0, x_max, y1, &format!(";{};{}", page.x_title(), page.y_title(&had.label))));
        top.log_y = page.log_y();
        top.grid = page.normalized();
        for input in inputs {
            top.push(PointSeries::from_h1(&input.pages[p][ih], input.label.as_str()));
        }
        if ih == 0 {
            top.legend = Some(inputs_legend(inputs, |i| &i.pages[p][0].style));
        }
        if page == Page::EffRatio {
            top.add_line(unity_line(x_min, x_max));
        }

        let (r0, r1) = page.ratio_range();
        let bottom = &mut fig.pads[ih + nx];
        bottom.frame = Some(Frame::new(
            x_min,
            r0,
            x_max,
            r1,
            &format!(";{};ratio to {}", page.x_title(), first.label),
        ));
        bottom.grid = page.normalized();
        let den = &first.pages[p][ih];
        for (i, input) in inputs.iter().enumerate().skip(1) {
            let num = &input.pages[p][ih];
            let r = Hist1D::divide(format!("h_{}_{}_{i}", page.tag(), had.name), num, den, DivideMode::Plain)
                .with_context(|| format!("dividing {} by {}", num.name, den.name))?;
            bottom.push(PointSeries::from_h1(&r, ""));
            ratios.push(r);
        }
        if !page.is_rapidity() {
            bottom.add_line(unity_line(x_min, x_max));
        }
    }
    Ok((fig, ratios))
}

fn abundance_figure(inputs: &[QaInput], name: String) -> Figure {
    let mut fig = Figure::grid(name, 1600.0, 1600.0, 2, 2);
    for (k, pad) in fig.pads.iter_mut().enumerate() {
        pad.log_y = true;
        let hs: Vec<&Hist1D> = inputs.iter().filter_map(|i| i.abundances.get(k)).collect();
        pad.frame = plot::frame_for_all(&hs, true);
        for (h, input) in hs.iter().zip(inputs) {
            pad.push(HistSeries::from_h1(h, input.label.as_str()));
            pad.push(PointSeries::from_h1(h, ""));
        }
    }
    fig.pads[0].legend = Some(inputs_legend(inputs, |i| &i.abundances[0].style));
    fig
}

/// Collision reconstruction efficiency, one bin per input.
fn collision_eff_hist(inputs: &[QaInput]) -> Result<Hist1D> {
    let n = inputs.len();
    let axis = Axis::uniform(n, -0.5, n as f64 - 0.5)?;
    let mut h = Hist1D::new("hist_reco_coll_eff", "", axis);
    for (i, input) in inputs.iter().enumerate() {
        h.set_bin_content(i + 1, input.coll_eff.0);
        h.set_bin_error(i + 1, input.coll_eff.1);
        h.x.set_bin_label(i + 1, input.label.clone());
    }
    h.style = plot::style("kBlack", hfv_core::style::marker::FULL_CIRCLE, 1.2, 2.0);
    Ok(h)
}

fn collision_eff_figure(h: &Hist1D, name: String) -> Figure {
    let mut fig = Figure::new(name, 1200.0, 800.0);
    let pad = &mut fig.pads[0];
    pad.margins = plot::margins(0.15, 0.1, 0.035, 0.15);
    pad.frame = Some(Frame::from_h1(h, false).with_y_range(0.0, 1.1).with_y_title("reco collisions / gen collisions"));
    pad.push(HistSeries::from_h1(h, ""));
    pad.push(PointSeries::from_h1(h, ""));
    fig
}

fn multiplicity_figure(inputs: &[QaInput], name: String) -> Figure {
    let mut fig = Figure::new(name, 800.0, 800.0);
    let pad = &mut fig.pads[0];
    pad.log_y = true;
    pad.frame = Some(Frame::new(0.0, 1e-6, 100.0, 1.0, ";number of global tracks;normalised counts"));
    let mut leg = Legend::new(0.2, 0.18, 0.5, 0.45, 0.03);
    for input in inputs {
        if let Some(h) = &input.ntracks {
            pad.push(PointSeries::from_h1(h, input.label.as_str()));
            leg.add(input.label.as_str(), &h.style, "pl");
        }
    }
    pad.legend = Some(leg);
    fig
}

pub fn cmd_compare_qa_mc_val(
    ctx: &Ctx,
    inputs: &[PathBuf],
    labels: &[String],
    out_dir: &Path,
    baryons: bool,
) -> Result<()> {
    let cfg = &ctx.config.compare_qa_mc_val;
    if inputs.is_empty() {
        bail!("no inputs to compare");
    }
    let labels: Vec<String> = if labels.len() < inputs.len() {
        if !labels.is_empty() {
            log::warn!("fewer labels than inputs, legends are left empty");
        }
        vec![String::new(); inputs.len()]
    } else {
        labels.to_vec()
    };
    let (hadrons, family) = if baryons { (&cfg.baryons, "baryons") } else { (&cfg.mesons, "mesons") };
    let prefix = format!("comparison_qa_mc_{}", labels.concat());
    tracing::info!(inputs = inputs.len(), ?labels, "comparing qa-mc-val outputs");

    let mut loaded = Vec::with_capacity(inputs.len());
    for (i, (input, label)) in inputs.iter().zip(&labels).enumerate() {
        let style = plot::style(&color_at(&cfg.colors, i), marker_at(&cfg.markers, i), 1.2, 2.0).with_alpha(cfg.alpha);
        let src = open_source(input)?;
        loaded.push(
            load_input(cfg, src.as_ref(), label.clone(), hadrons, &style)
                .with_context(|| format!("{}", input.display()))?,
        );
    }

    let coll_eff = collision_eff_hist(&loaded)?;
    let mut figures = vec![
        abundance_figure(&loaded, format!("{prefix}_abundancy_{family}")),
        collision_eff_figure(&coll_eff, format!("{prefix}_reco_collision_eff_{family}")),
        multiplicity_figure(&loaded, format!("{prefix}_mult_distr_{family}")),
    ];
    let mut bundle = HistBundle::new("hfv compare-qa-mc-val");
    for page in Page::ALL {
        let (fig, ratios) = page_figure(page, &loaded, hadrons, format!("{prefix}_{}_{family}", page.tag()))?;
        figures.push(fig);
        for r in ratios {
            bundle.insert_in("ratios", r);
        }
    }

    bundle.insert("hist_reco_coll_eff", coll_eff);
    for (i, input) in loaded.into_iter().enumerate() {
        let dir = if input.label.is_empty() { format!("input{i}") } else { input.label.clone() };
        for h in input.pages.into_iter().flatten().chain(input.ntracks) {
            bundle.insert_in(&dir, h);
        }
    }

    let out = ctx.output(out_dir)?;
    out.write_bundle(&bundle, &format!("QA_{prefix}_{family}"))?;
    out.save_all(&figures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eff_hist(name: &str, values: &[f64]) -> Hist1D {
        Hist1D::from_contents(name, Axis::variable(vec![0.0, 2.0, 5.0]).unwrap(), values).unwrap()
    }

    fn input(label: &str, scale: f64) -> QaInput {
        let pages = Page::ALL
            .iter()
            .map(|p| vec![eff_hist(p.tag(), &[0.2 * scale, 0.4 * scale])])
            .collect();
        QaInput {
            label: label.into(),
            coll_eff: (0.8, 0.01),
            pages,
            abundances: vec![eff_hist("a", &[1.0, 2.0]); 4],
            ntracks: None,
        }
    }

    fn dzero() -> Vec<Channel> {
        vec![Channel { name: "DzeroToKPi".into(), label: "D^{0}".into() }]
    }

    #[test]
    fn page_ratios_to_first_input() {
        let inputs = [input("ref", 1.0), input("new", 1.5)];
        let (fig, ratios) = page_figure(Page::PromptEff, &inputs, &dzero(), "page".into()).unwrap();
        assert_eq!(fig.pads.len(), 2);
        assert_eq!(ratios.len(), 1);
        assert_eq!(ratios[0].name, "h_prompt_efficiencies_DzeroToKPi_1");
        assert_relative_eq!(ratios[0].bin_content(1), 1.5, epsilon = 1e-12);
        let bottom = fig.pads[1].frame.as_ref().unwrap();
        assert_eq!(bottom.y_title, "ratio to ref");
        assert_eq!(bottom.x_max, 5.0);
    }

    #[test]
    fn rapidity_pages_are_symmetric() {
        let inputs = [input("a", 1.0)];
        let (fig, ratios) = page_figure(Page::NonPromptY, &inputs, &dzero(), "y".into()).unwrap();
        assert!(ratios.is_empty());
        let top = fig.pads[0].frame.as_ref().unwrap();
        assert_eq!((top.x_min, top.x_max), (-5.0, 5.0));
        assert!(fig.pads[1].lines.is_empty());
    }

    #[test]
    fn collision_efficiency_per_input() {
        let inputs = [input("a", 1.0), input("b", 1.0)];
        let h = collision_eff_hist(&inputs).unwrap();
        assert_eq!(h.nbins(), 2);
        assert_eq!(h.x.bin_label(2), Some("b"));
        assert_relative_eq!(h.bin_content(1), 0.8);
        assert_relative_eq!(h.bin_error(1), 0.01);
    }

    #[test]
    fn objects_are_read_from_qa_output_paths() {
        assert_eq!(Page::EffRatio.path("LcToPKPi", "0_110"), "efficiencies/h_eff_ratioLcToPKPivcent0_110");
        assert_eq!(Page::PromptDeclen.path("DzeroToKPi", ""), "gen-distr/h_declenen_gen_promptDzeroToKPi");
        assert!(Page::PromptPt.normalized());
        assert!(!Page::EffRatio.log_y());
    }
}
