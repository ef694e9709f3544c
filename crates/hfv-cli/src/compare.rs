//! Comparisons of analysis outputs: `hfv compare-mc-eff` and `hfv compare-qa`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::{DivideMode, Hist1D, HistBundle, HistSource, HistStyle};
use hfv_viz::{Figure, Frame, Legend, PointSeries, RefLine};

use crate::Ctx;
use crate::config::{CompareMcEffConfig, ComparePlot, CompareQaConfig};
use crate::io::open_source;
use crate::plot::{self, color_at, frame_for_all, marker_at};

const PT_TITLE: &str = "#it{p}_{T} (GeV/#it{c})";

/// Efficiency curves of one `mc-eff` output, in the order of [`PLOT_NAMES`].
type EffSet = [Hist1D; 7];

/// Plot names matched against the configured plots, one per [`EffSet`] entry.
const PLOT_NAMES: [&str; 7] = [
    "prompt_efficiencies",
    "nonprompt_efficiencies",
    "ratio_efficiencies",
    "prompt_dupl_efficiencies",
    "nonprompt_dupl_efficiencies",
    "prompt_efficiencies_no_dupl",
    "nonprompt_efficiencies_no_dupl",
];

fn load_eff_set(cfg: &CompareMcEffConfig, src: &dyn HistSource, style: &HistStyle) -> Result<EffSet> {
    let get = |origin: &str, step: usize| {
        let path = format!("efficiencies/h_pt_eff_{origin}_step{step}");
        src.get_h1(&path).with_context(|| format!("reading {path}"))
    };
    let (sel, dup) = (cfg.selected_step, cfg.duplicates_step);
    let prompt = get("prompt", sel)?;
    let nonprompt = get("nonprompt", sel)?;
    let ratio = Hist1D::divide(format!("h_eff_ratio_step{sel}"), &nonprompt, &prompt, DivideMode::Plain)?;
    let prompt_dupl = get("prompt", dup)?;
    let nonprompt_dupl = get("nonprompt", dup)?;
    let mut prompt_no_dupl = prompt.clone_named("h_pt_eff_prompt_no_dupl");
    prompt_no_dupl.add(&prompt_dupl, -1.0)?;
    let mut nonprompt_no_dupl = nonprompt.clone_named("h_pt_eff_nonprompt_no_dupl");
    nonprompt_no_dupl.add(&nonprompt_dupl, -1.0)?;

    let mut set = [prompt, nonprompt, ratio, prompt_dupl, nonprompt_dupl, prompt_no_dupl, nonprompt_no_dupl];
    for h in &mut set {
        h.style = style.clone();
    }
    Ok(set)
}

/// Quantity on the left, ratios to the first input on the right.
fn efficiency_figure(plot: &ComparePlot, had: &str, hists: &[&Hist1D], labels: &[String]) -> Result<Figure> {
    let Some(&first) = hists.first() else {
        bail!("{}: nothing to compare", plot.name);
    };
    let x_max = first.x.up_edge(first.nbins());
    let mut fig = Figure::grid(plot.name.clone(), 1800.0, 900.0, 2, 1);
    for pad in &mut fig.pads {
        pad.margins = plot::margins(0.15, 0.035, 0.035, 0.15);
    }

    let y_title = plot.y_title.replace("{had}", had);
    let mut legend = Legend::new(0.2, 0.18, 0.5, 0.45, 0.03);
    let main = &mut fig.pads[0];
    main.frame = Some(Frame::new(0.0, plot.y_range.0, x_max, plot.y_range.1, &format!(";{PT_TITLE};{y_title}")));
    main.log_y = plot.log_y;
    for (h, label) in hists.iter().zip(labels) {
        main.push(PointSeries::from_h1(h, label.as_str()));
        legend.add(label.as_str(), &h.style, "pl");
    }
    main.legend = Some(legend);

    let ratio_pad = &mut fig.pads[1];
    let first_label = labels.first().map(String::as_str).unwrap_or_default();
    ratio_pad.frame = Some(Frame::new(
        0.0,
        plot.ratio_y_range.0,
        x_max,
        plot.ratio_y_range.1,
        &format!(";{PT_TITLE};Ratio to {first_label}"),
    ));
    for (i, h) in hists.iter().enumerate().skip(1) {
        let r = Hist1D::divide(format!("h_{}_{}", plot.name, i - 1), h, first, DivideMode::Plain)?;
        ratio_pad.push(PointSeries::from_h1(&r, ""));
    }
    let mut unity = RefLine::horizontal(0.0, x_max, 1.0, "kGray+1");
    unity.width = 2.0;
    unity.line_style = 9;
    ratio_pad.add_line(unity);
    Ok(fig)
}

pub fn cmd_compare_mc_eff(ctx: &Ctx, inputs: &[PathBuf], labels: &[String], out_dir: &Path) -> Result<()> {
    let cfg = &ctx.config.compare_mc_eff;
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

    let mut sets = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        let style = plot::style(&color_at(&cfg.colors, i), marker_at(&cfg.markers, i), 1.2, 2.0).with_alpha(cfg.alpha);
        let src = open_source(input)?;
        sets.push(load_eff_set(cfg, src.as_ref(), &style).with_context(|| format!("{}", input.display()))?);
    }

    let mut figures = Vec::with_capacity(cfg.plots.len());
    for plot in &cfg.plots {
        let Some(k) = PLOT_NAMES.iter().position(|n| *n == plot.name) else {
            log::warn!("unknown comparison plot '{}', known: {}", plot.name, PLOT_NAMES.join(", "));
            continue;
        };
        let hists: Vec<&Hist1D> = sets.iter().map(|s| &s[k]).collect();
        figures.push(efficiency_figure(plot, &cfg.hadron_label, &hists, &labels)?);
    }

    let out = ctx.output(out_dir)?;
    let mut bundle = HistBundle::new("hfv compare-mc-eff");
    for (i, (set, label)) in sets.into_iter().zip(&labels).enumerate() {
        let dir = if label.is_empty() { format!("input{i}") } else { label.clone() };
        for h in set {
            bundle.insert_in(&dir, h);
        }
    }
    out.write_bundle(&bundle, "QA_comparison")?;
    out.save_all(&figures)
}

/// Two-input overlay in a grid of pads; empty pairs are skipped.
fn overlay_figure(
    name: &str,
    size: (f64, f64),
    grid: (usize, usize),
    pairs: Vec<(Hist1D, Hist1D)>,
    colors: &(String, String),
    normalize: bool,
) -> Figure {
    let mut fig = Figure::grid(name, size.0, size.1, grid.0, grid.1);
    for (pad, (mut a, mut b)) in fig.pads.iter_mut().zip(pairs) {
        if a.entries == 0.0 || b.entries == 0.0 {
            log::warn!("{}: no entries, skipped", a.name);
            continue;
        }
        if normalize {
            a.scale(1.0 / a.entries);
            b.scale(1.0 / b.entries);
        }
        a.style = HistStyle::markers(colors.0.as_str(), a.style.marker_style, a.style.marker_size);
        b.style = HistStyle::markers(colors.1.as_str(), b.style.marker_style, b.style.marker_size);
        pad.frame = frame_for_all(&[&a, &b], false).map(|f| f.with_title(a.name.clone()));
        pad.push(PointSeries::from_h1(&a, "first"));
        pad.push(PointSeries::from_h1(&b, "second"));
    }
    fig
}

fn read_pairs(a: &dyn HistSource, b: &dyn HistSource, paths: &[String]) -> Result<Vec<(Hist1D, Hist1D)>> {
    paths
        .iter()
        .map(|p| {
            let ha = a.get_h1(p).with_context(|| format!("reading {p} from the first input"))?;
            let hb = b.get_h1(p).with_context(|| format!("reading {p} from the second input"))?;
            Ok((ha, hb))
        })
        .collect()
}

/// Generated distributions, efficiencies and reconstruction-level histograms
/// of two QA outputs.
fn compare_qa_figures(cfg: &CompareQaConfig, a: &dyn HistSource, b: &dyn HistSource) -> Result<Vec<Figure>> {
    let ch = &cfg.channel;
    let gen_paths: Vec<String> = ["pt", "y", "declenen"]
        .iter()
        .flat_map(|var| ["prompt", "nonprompt"].map(|o| format!("gen-distr/h_{var}_gen_{o}{ch}")))
        .collect();
    let eff_paths: Vec<String> = ["prompt", "nonprompt", "ratio"]
        .iter()
        .map(|k| format!("efficiencies/h_eff_{k}{ch}vcent{}", cfg.centrality))
        .collect();

    let mut figures = vec![
        overlay_figure("comparison_gen", (1200.0, 800.0), (3, 2), read_pairs(a, b, &gen_paths)?, &cfg.colors, true),
        overlay_figure(
            "comparison_efficiencies",
            (1200.0, 400.0),
            (3, 1),
            read_pairs(a, b, &eff_paths)?,
            &cfg.colors,
            false,
        ),
    ];

    let rec_paths: Vec<String> = cfg.rec_histograms.iter().map(|h| format!("{}/{ch}/{h}", cfg.rec_task)).collect();
    let per_page = cfg.rec_per_page.max(1);
    for (page, chunk) in rec_paths.chunks(per_page).enumerate() {
        let nx = per_page.min(4);
        let ny = per_page.div_ceil(nx);
        figures.push(overlay_figure(
            &format!("comparison_rec_{}", page + 1),
            (1200.0, 800.0),
            (nx, ny),
            read_pairs(a, b, chunk)?,
            &cfg.colors,
            true,
        ));
    }
    Ok(figures)
}

pub fn cmd_compare_qa(ctx: &Ctx, first: &Path, second: &Path, out_dir: Option<&Path>) -> Result<()> {
    let a = open_source(first)?;
    let b = open_source(second)?;
    let figures = compare_qa_figures(&ctx.config.compare_qa, a.as_ref(), b.as_ref())?;
    let dir = match out_dir {
        Some(d) => d.to_path_buf(),
        None => first.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
    };
    ctx.output(&dir)?.save_all(&figures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hfv_core::Axis;

    fn h(name: &str, c: &[f64]) -> Hist1D {
        let mut h = Hist1D::from_contents(name, Axis::uniform(c.len(), 0.0, 10.0).unwrap(), c).unwrap();
        h.entries = c.iter().sum();
        h
    }

    fn mc_eff_output(scale: f64) -> HistBundle {
        let mut b = HistBundle::new("test");
        for (origin, step, c) in [
            ("prompt", 8, [0.4, 0.6]),
            ("nonprompt", 8, [0.2, 0.6]),
            ("prompt", 9, [0.1, 0.1]),
            ("nonprompt", 9, [0.05, 0.2]),
        ] {
            let name = format!("h_pt_eff_{origin}_step{step}");
            b.insert(format!("efficiencies/{name}"), h(&name, &c.map(|v| v * scale)));
        }
        b
    }

    #[test]
    fn derived_efficiencies() {
        let cfg = CompareMcEffConfig::default();
        let set = load_eff_set(&cfg, &mc_eff_output(1.0), &HistStyle::default()).unwrap();
        assert_eq!(set[2].name, "h_eff_ratio_step8");
        assert_relative_eq!(set[2].bin_content(1), 0.5);
        assert_relative_eq!(set[2].bin_content(2), 1.0);
        assert_eq!(set[5].name, "h_pt_eff_prompt_no_dupl");
        assert_relative_eq!(set[5].bin_content(1), 0.3, epsilon = 1e-12);
        assert_relative_eq!(set[6].bin_content(2), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn efficiency_figure_has_ratio_pad() {
        let cfg = CompareMcEffConfig::default();
        let a = load_eff_set(&cfg, &mc_eff_output(1.0), &HistStyle::default()).unwrap();
        let b = load_eff_set(&cfg, &mc_eff_output(0.5), &HistStyle::default()).unwrap();
        let labels = vec!["ref".to_string(), "new".to_string()];
        let fig = efficiency_figure(&cfg.plots[0], "D^{0}", &[&a[0], &b[0]], &labels).unwrap();
        assert_eq!(fig.name, "prompt_efficiencies");
        assert_eq!(fig.pads.len(), 2);
        assert_eq!(fig.pads[0].frame.as_ref().unwrap().y_title, "Prompt D^{0} eff.");
        assert_eq!(fig.pads[1].frame.as_ref().unwrap().y_title, "Ratio to ref");
        let hfv_viz::Series::Points(r) = &fig.pads[1].series[0] else {
            panic!("ratio should be drawn as points");
        };
        assert_relative_eq!(r.y[0], 0.5);
        assert_eq!(fig.pads[1].lines.len(), 1);
    }

    #[test]
    fn qa_comparison_pages() {
        let mut cfg = CompareQaConfig::default();
        cfg.rec_histograms.truncate(14);
        let mut src = HistBundle::new("test");
        let ch = &cfg.channel;
        for var in ["pt", "y", "declenen"] {
            for o in ["prompt", "nonprompt"] {
                src.insert(format!("gen-distr/h_{var}_gen_{o}{ch}"), h("g", &[2.0, 2.0]));
            }
        }
        for k in ["prompt", "nonprompt", "ratio"] {
            src.insert(format!("efficiencies/h_eff_{k}{ch}vcent0_110"), h("e", &[0.0, 0.0]));
        }
        for r in &cfg.rec_histograms {
            src.insert(format!("hf-task-mc-validation-rec/{ch}/{r}"), h(r, &[1.0, 3.0]));
        }
        let figs = compare_qa_figures(&cfg, &src, &src).unwrap();
        let names: Vec<&str> = figs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["comparison_gen", "comparison_efficiencies", "comparison_rec_1", "comparison_rec_2"]);
        let hfv_viz::Series::Points(p) = &figs[0].pads[0].series[0] else {
            panic!("expected points");
        };
        assert_relative_eq!(p.y[0], 0.5);
        // efficiencies without entries are not drawn
        assert!(figs[1].pads[0].series.is_empty());
        assert_eq!(figs[3].pads.iter().filter(|p| !p.series.is_empty()).count(), 2);
    }
}
