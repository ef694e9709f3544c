//! Run bookkeeping: `hfv nev-per-run` and `hfv store-hist`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hfv_core::{Axis, Hist1D, HistBundle, HistStyle};
use hfv_viz::{Figure, Frame, HistSeries, Label};

use crate::Ctx;
use crate::config::NevPerRunConfig;
use crate::io::open_source;
use crate::plot::thousands;

/// Inputs of a run directory, sorted by file name.
fn run_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if path.is_file() && (ext.eq_ignore_ascii_case("root") || ext.eq_ignore_ascii_case("json")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run label of a file: the last six characters of its stem, mapped to a
/// run number when the mapping knows them.
fn run_label(cfg: &NevPerRunConfig, path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let chars: Vec<char> = stem.chars().collect();
    let tag: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    match cfg.run_mapping.get(&tag) {
        Some(run) => run.clone(),
        None => {
            log::warn!("no run mapped to production tag '{tag}' of {}", path.display());
            tag
        }
    }
}

/// One bin per input file holding the entries of `hist_name`.
fn events_per_run(cfg: &NevPerRunConfig, files: &[PathBuf], hist_name: &str) -> Result<Hist1D> {
    let nbins = cfg.min_bins.max(files.len()).max(1);
    let axis = Axis::uniform(nbins, 0.0, nbins as f64)?;
    let mut h = Hist1D::new("output_hist", "N_{ev}^{gen} vs  run", axis);
    h.style = HistStyle { line_color: "kAzure+2".into(), line_width: 2.0, ..HistStyle::default() };

    for (i, path) in files.iter().enumerate() {
        let bin = i + 1;
        let src = match open_source(path) {
            Ok(src) => src,
            Err(e) => {
                log::warn!("skipping {}: {e:#}", path.display());
                continue;
            }
        };
        let entries = match src.get_any(hist_name) {
            Ok(obj) => obj.entries(),
            Err(e) => {
                log::warn!("histogram '{hist_name}' not found in {}: {e}", path.display());
                continue;
            }
        };
        tracing::info!(file = %path.display(), entries, "events");
        h.set_bin_content(bin, entries);
        h.set_bin_error(bin, 0.0);
        h.x.set_bin_label(bin, run_label(cfg, path));
    }
    Ok(h)
}

fn events_figure(h: &Hist1D) -> Figure {
    let total = h.integral();
    let mut fig = Figure::new("nev_per_run", 3200.0, 400.0);
    let pad = &mut fig.pads[0];
    pad.grid = true;
    pad.log_y = true;
    pad.frame = Some(Frame::from_h1(h, true).with_y_title("N_{ev}^{gen}"));
    pad.push(HistSeries::from_h1(h, ""));
    pad.add_label(
        Label::new(
            0.15,
            0.85,
            format!("#splitline{{Total generated events:}}{{{}}}", thousands(total.round() as u64)),
            0.03,
        )
        .with_align(13),
    );
    fig
}

pub fn cmd_nev_per_run(ctx: &Ctx, input_dir: &Path, output_file: &Path, hist_name: Option<&str>) -> Result<()> {
    let cfg = &ctx.config.nev_per_run;
    let hist_name = hist_name.unwrap_or(&cfg.hist_name);
    let files = run_files(input_dir)?;
    if files.is_empty() {
        bail!("no .root or .json files in {}", input_dir.display());
    }
    let h = events_per_run(cfg, &files, hist_name)?;
    tracing::info!(total = h.integral(), "generated events");

    let out_dir = output_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let out = ctx.output(out_dir)?;
    out.save(&events_figure(&h))?;

    let mut bundle = HistBundle::new("hfv nev-per-run");
    bundle.insert("output_hist", h);
    bundle.write_json(output_file).with_context(|| format!("writing {}", output_file.display()))?;
    tracing::info!(path = %output_file.display(), "saved histogram");
    Ok(())
}

/// Number of generated events of a validation output, stored as `hGenEv`.
pub fn cmd_store_hist(ctx: &Ctx, input: &Path, out_dir: &Path) -> Result<()> {
    const SOURCE: &str = "hf-task-mc-validation-gen/hNevGen";
    let src = open_source(input)?;
    let h = src.get_h1(SOURCE).with_context(|| format!("reading {SOURCE}"))?;
    let mut bundle = HistBundle::new("hfv store-hist");
    bundle.insert("hGenEv", h.clone_named("hGenEv"));
    ctx.output(out_dir)?.write_bundle(&bundle, "hGenEv")?;
    Ok(())
}
