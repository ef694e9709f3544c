//! Input sources and output directories.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hfv_core::{HistBundle, HistSource};
use hfv_render::config::VizConfig;
use hfv_root::RootFile;
use hfv_viz::Figure;
use rayon::prelude::*;

/// Open a ROOT file, or a JSON bundle when the extension is `.json`.
pub fn open_source(path: &Path) -> Result<Box<dyn HistSource>> {
    tracing::info!(path = %path.display(), "opening input");
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        let bundle = HistBundle::read_json(path)
            .with_context(|| format!("reading bundle {}", path.display()))?;
        Ok(Box::new(bundle))
    } else {
        let file = RootFile::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(file))
    }
}

/// An output directory receiving figures and histogram bundles.
pub struct Output {
    dir: PathBuf,
    viz: VizConfig,
    figure_json: bool,
}

impl Output {
    pub fn create(dir: &Path, viz: VizConfig, figure_json: bool) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf(), viz, figure_json })
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Render `fig` to `<name>.svg`, plus `<name>.figure.json` when requested.
    pub fn save(&self, fig: &Figure) -> Result<PathBuf> {
        let svg = self.path(&format!("{}.svg", fig.name));
        hfv_render::render_to_file(fig, &svg, &self.viz)
            .with_context(|| format!("rendering {}", svg.display()))?;
        if self.figure_json {
            let json = self.path(&format!("{}.figure.json", fig.name));
            std::fs::write(&json, fig.to_json()?)
                .with_context(|| format!("writing {}", json.display()))?;
        }
        tracing::info!(path = %svg.display(), "saved figure");
        Ok(svg)
    }

    /// Render independent figures in parallel.
    pub fn save_all(&self, figs: &[Figure]) -> Result<()> {
        figs.par_iter().map(|f| self.save(f).map(|_| ())).collect()
    }

    /// Write `bundle` as `<name>.json`.
    pub fn write_bundle(&self, bundle: &HistBundle, name: &str) -> Result<PathBuf> {
        let path = self.path(&format!("{name}.json"));
        bundle.write_json(&path).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), objects = bundle.len(), "saved histograms");
        Ok(path)
    }
}

/// Pretty JSON to `output`, or to stdout.
pub fn write_json(output: Option<&PathBuf>, value: &serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Plain text to `output`, or to stdout.
pub fn write_text(output: Option<&PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfv_core::{Axis, Hist1D};

    #[test]
    fn json_inputs_open_as_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.json");
        let mut b = HistBundle::new("test");
        b.insert("d/h", Hist1D::new("h", "", Axis::uniform(2, 0.0, 1.0).unwrap()));
        b.write_json(&path).unwrap();

        let src = open_source(&path).unwrap();
        assert!(src.contains("d/h"));
        assert!(!src.contains("d/missing"));
    }

    #[test]
    fn missing_root_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_source(&dir.path().join("nope.root")).is_err());
    }

    #[test]
    fn save_writes_svg_and_figure_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = Output::create(&dir.path().join("plots"), VizConfig::default(), true).unwrap();
        let fig = Figure::new("empty_canvas", 400.0, 300.0);
        let svg = out.save(&fig).unwrap();
        assert!(svg.exists());
        assert!(out.path("empty_canvas.figure.json").exists());
    }
}
