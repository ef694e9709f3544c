//! `hfv eff-vs-occupancy` and `hfv eff-vs-centrality`: prompt and non-prompt
//! efficiencies of several classes drawn on one canvas, with ratios to the
//! first class and the non-prompt/prompt ratio.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::{DivideMode, Hist1D, HistBundle, HistSource};
use hfv_viz::{Figure, Legend, Pad};

use crate::Ctx;
use crate::io::open_source;
use crate::plot::{self, class_label, color_at, frame_for, marker_at, push_points};

/// Prompt / non-prompt, in drawing order.
const CATEGORIES: [&str; 2] = ["prompt", "nonprompt"];

/// Efficiencies of one class (occupancy or centrality interval).
#[derive(Debug, Clone)]
struct ClassEff {
    class: String,
    /// Prompt and non-prompt efficiency.
    eff: [Hist1D; 2],
    np_over_p: Option<Hist1D>,
}

/// Presentation of one comparison.
#[derive(Debug, Clone)]
struct Layout {
    channel: String,
    label: String,
    /// Appended to the legend header.
    header_suffix: String,
    /// Appended to legend entries.
    entry_suffix: &'static str,
    /// Variable named in the ratio y title (`Occ`, `cent`).
    ratio_var: &'static str,
    /// Figure name stems: `{cat}{channel}meson_{stem}_comparison{suffix}`.
    stem: &'static str,
    ratio_stem: &'static str,
    name_suffix: String,
    legend_box: (f64, f64, f64, f64),
    legend_columns: usize,
    legend_on_np_ratio: bool,
    overlay: bool,
    line_width: f64,
    x_max: f64,
    eff_y_range: (f64, f64),
    ratio_y_max: f64,
    np_ratio_y_range: (f64, f64),
    prompt_colors: Vec<String>,
    nonprompt_colors: Vec<String>,
    markers: Vec<i32>,
}

impl Layout {
    fn color(&self, cat: usize, i: usize) -> String {
        color_at(if cat == 0 { &self.prompt_colors } else { &self.nonprompt_colors }, i)
    }

    fn figure(&self, name: String, log_y: bool) -> Figure {
        let mut fig = Figure::new(name, 600.0, 600.0);
        let pad = &mut fig.pads[0];
        pad.grid = true;
        pad.log_y = log_y;
        pad.margins = plot::margins(0.2, 0.1, 0.1, 0.12);
        fig
    }

    fn legend(&self, header: String) -> Legend {
        let (x0, y0, x1, y1) = self.legend_box;
        let mut leg = Legend::new(x0, y0, x1, y1, 0.035).with_header(header);
        if self.legend_columns > 1 {
            leg = leg.with_columns(self.legend_columns);
        }
        leg
    }

    fn draw(&self, pad: &mut Pad, h: &Hist1D, label: &str) {
        push_points(pad, h, label, self.overlay);
    }
}

const PT_TITLE: &str = "#it{p}_{T} (GeV/#it{c})";

fn prepare(h: &mut Hist1D, layout: &Layout, color: &str, marker: i32) {
    h.title.clear();
    h.x.set_range_user(0.0, layout.x_max);
    h.x.title = PT_TITLE.into();
    h.style = plot::style(color, marker, 1.5, layout.line_width);
}

/// Draw and store the comparison of `classes` for one channel.
fn compare_channel(
    layout: &Layout,
    mut classes: Vec<ClassEff>,
    dir: &str,
    bundle: &mut HistBundle,
    figures: &mut Vec<Figure>,
) -> Result<()> {
    let Some(first_class) = classes.first().map(|c| c.class.clone()) else {
        bail!("{}: no classes to compare", layout.channel);
    };
    let ch = &layout.channel;
    let mut np_fig = layout.figure(format!("{ch}meson_{}_comparison{}", layout.ratio_stem, layout.name_suffix), false);
    let mut np_legend = layout.legend(format!("{} {}", CATEGORIES[1], layout.label));
    let mut np_frame = None;

    for (cat, cat_name) in CATEGORIES.iter().enumerate() {
        let mut eff_fig = layout.figure(
            format!("{cat_name}{ch}meson_{}_comparison{}", layout.stem, layout.name_suffix),
            true,
        );
        let mut ratio_fig = layout.figure(
            format!("{cat_name}{ch}meson_{}_comparison{}", layout.ratio_stem, layout.name_suffix),
            false,
        );
        let mut legend = layout.legend(format!("{cat_name} {}{}", layout.label, layout.header_suffix));
        let eff_y_title = format!("{cat_name} {} Acc.#times#varepsilon", layout.label);

        for (i, c) in classes.iter_mut().enumerate() {
            let color = layout.color(cat, i);
            let marker = marker_at(&layout.markers, i);
            let entry = format!("{}{}", class_label(&c.class), layout.entry_suffix);
            let eff = &mut c.eff[cat];
            prepare(eff, layout, &color, marker);
            let pad = &mut eff_fig.pads[0];
            if pad.frame.is_none() {
                let (lo, hi) = layout.eff_y_range;
                pad.frame = Some(frame_for(eff, lo, hi, &format!(";{PT_TITLE};{eff_y_title}")));
            }
            layout.draw(pad, eff, &entry);
            legend.add(entry.clone(), &eff.style, "p");
            bundle.insert_in(dir, eff.clone());

            if cat == 1 {
                if let Some(np) = c.np_over_p.as_mut() {
                    prepare(np, layout, &color, marker);
                    let pad = &mut np_fig.pads[0];
                    if np_frame.is_none() {
                        let (lo, hi) = layout.np_ratio_y_range;
                        np_frame = Some(frame_for(
                            np,
                            lo,
                            hi,
                            &format!(";{PT_TITLE};non-prompt/prompt {} ratio", layout.label),
                        ));
                    }
                    layout.draw(pad, np, &entry);
                    np_legend.add(entry, &np.style, "p");
                    bundle.insert_in(dir, np.clone());
                }
            }
        }

        let den = classes[0].eff[cat].clone();
        let ratio_y_title = format!(
            "Acc.#times#varepsilon({}) / Acc.#times#varepsilon({}{})",
            layout.ratio_var,
            class_label(&first_class),
            layout.entry_suffix
        );
        for c in &classes {
            let name = format!("h_ratio_{cat_name}{ch}_{}_over_{first_class}", c.class);
            let mut r = Hist1D::divide(name, &c.eff[cat], &den, DivideMode::Binomial)
                .with_context(|| format!("{ch}: dividing {} by {first_class}", c.class))?;
            r.style = c.eff[cat].style.clone();
            let pad = &mut ratio_fig.pads[0];
            if pad.frame.is_none() {
                pad.frame = Some(frame_for(&r, 0.0, layout.ratio_y_max, &format!(";{PT_TITLE};{ratio_y_title}")));
            }
            layout.draw(pad, &r, &c.class);
            bundle.insert_in(dir, r);
        }

        eff_fig.pads[0].legend = Some(legend);
        figures.push(eff_fig);
        figures.push(ratio_fig);
    }

    if np_frame.is_some() {
        let pad = &mut np_fig.pads[0];
        pad.frame = np_frame;
        if layout.legend_on_np_ratio {
            pad.legend = Some(np_legend);
        }
        figures.push(np_fig);
    }
    Ok(())
}

fn get_eff(src: &dyn HistSource, path: &str) -> Result<Hist1D> {
    Ok(src.get_h1(path).with_context(|| format!("reading {path}"))?)
}

/// One input per centrality interval, classes are occupancy intervals.
pub fn cmd_eff_vs_occupancy(ctx: &Ctx, inputs: &[PathBuf], out_dir: &Path) -> Result<()> {
    let cfg = &ctx.config.eff_occupancy;
    if inputs.len() > cfg.centralities.len() {
        bail!(
            "{} inputs given but only {} centrality intervals are configured",
            inputs.len(),
            cfg.centralities.len()
        );
    }
    let out = ctx.output(out_dir)?;
    let mut bundle = HistBundle::new("hfv eff-vs-occupancy");
    let mut figures = Vec::new();

    for (input, cent) in inputs.iter().zip(&cfg.centralities) {
        let src = open_source(input)?;
        for channel in &cfg.channels {
            tracing::info!(channel = %channel.name, centrality = %cent.suffix, "comparing occupancy classes");
            let mes = &channel.name;
            let mut classes = Vec::with_capacity(cfg.occupancies.len());
            for occ in &cfg.occupancies {
                let eff = [0, 1].map(|cat| {
                    get_eff(src.as_ref(), &format!("efficiencies/h_effocc_{}{mes}vcent{occ}", CATEGORIES[cat]))
                });
                let [p, np] = eff;
                let ratio_path = format!("efficiencies/h_effocc_ratio{mes}vcent{occ}");
                classes.push(ClassEff {
                    class: occ.clone(),
                    eff: [p?, np?],
                    np_over_p: src.get_h1(&ratio_path).ok(),
                });
            }
            let layout = Layout {
                channel: mes.clone(),
                label: channel.label.clone(),
                header_suffix: format!(" {}", cent.title),
                entry_suffix: "",
                ratio_var: "Occ",
                stem: "efficiency_occ",
                ratio_stem: "efficiency_occ_ratio",
                name_suffix: cent.suffix.clone(),
                legend_box: (0.35, 0.3, 0.8, 0.6),
                legend_columns: 1,
                legend_on_np_ratio: false,
                overlay: true,
                line_width: 2.0,
                x_max: cfg.x_max,
                eff_y_range: (channel.eff_y_min, 2.0),
                ratio_y_max: channel.ratio_y_max,
                np_ratio_y_range: (5e-6, channel.np_ratio_y_max),
                prompt_colors: cfg.prompt_colors.clone(),
                nonprompt_colors: cfg.nonprompt_colors.clone(),
                markers: cfg.markers.clone(),
            };
            let dir = format!("{mes}/{}", cent.suffix.trim_start_matches('_'));
            compare_channel(&layout, classes, &dir, &mut bundle, &mut figures)?;
        }
    }

    out.write_bundle(&bundle, "eff_vocc")?;
    out.save_all(&figures)
}

/// Classes are centrality intervals spread over up to three inputs.
pub fn cmd_eff_vs_centrality(ctx: &Ctx, inputs: &[PathBuf], out_dir: &Path) -> Result<()> {
    let cfg = &ctx.config.eff_centrality;
    if cfg.file_of_class.len() < cfg.centralities.len() {
        bail!("every centrality class needs an input file index");
    }
    if let Some(&needed) = cfg.file_of_class.iter().max() {
        if needed >= inputs.len() {
            bail!("centrality classes refer to input {} but only {} given", needed + 1, inputs.len());
        }
    }
    let sources = inputs.iter().map(|p| open_source(p)).collect::<Result<Vec<_>>>()?;
    let out = ctx.output(out_dir)?;
    let mut bundle = HistBundle::new("hfv eff-vs-centrality");
    let mut figures = Vec::new();

    for channel in &cfg.channels {
        tracing::info!(channel = %channel.name, "comparing centrality classes");
        let mes = &channel.name;
        let mut classes = Vec::with_capacity(cfg.centralities.len());
        for (cent, &ifile) in cfg.centralities.iter().zip(&cfg.file_of_class) {
            let src = sources[ifile].as_ref();
            let p = get_eff(src, &format!("efficiencies/h_eff_prompt{mes}vcent{cent}"))?;
            let np = get_eff(src, &format!("efficiencies/h_eff_nonprompt{mes}vcent{cent}"))?;
            classes.push(ClassEff {
                class: cent.clone(),
                eff: [p, np],
                np_over_p: src.get_h1(&format!("efficiencies/h_eff_ratio{mes}vcent{cent}")).ok(),
            });
        }
        let layout = Layout {
            channel: mes.clone(),
            label: channel.label.clone(),
            header_suffix: String::new(),
            entry_suffix: "%",
            ratio_var: "cent",
            stem: "efficiency",
            ratio_stem: "efficiencyratio",
            name_suffix: String::new(),
            legend_box: (0.6, 0.3, 0.85, 0.6),
            legend_columns: 2,
            legend_on_np_ratio: true,
            overlay: false,
            line_width: 1.0,
            x_max: cfg.x_max,
            eff_y_range: cfg.eff_y_range,
            ratio_y_max: cfg.ratio_y_max,
            np_ratio_y_range: cfg.np_ratio_y_range,
            prompt_colors: cfg.prompt_colors.clone(),
            nonprompt_colors: cfg.nonprompt_colors.clone(),
            markers: cfg.markers.clone(),
        };
        compare_channel(&layout, classes, mes, &mut bundle, &mut figures)?;
    }

    out.write_bundle(&bundle, "eff_vcent")?;
    out.save_all(&figures)
}
