//! # hfv-render
//!
//! SVG rendering of [`hfv_viz::Figure`] artifacts with ROOT drawing
//! conventions: inward ticks on all four sides, TLatex labels, ROOT color
//! names and marker codes.

#![warn(clippy::all)]

pub mod canvas;
pub mod color;
pub mod config;
pub mod font;
pub mod layout;
pub mod plots;
pub mod primitives;
pub mod style;
pub mod text;
pub mod theme;

use std::path::Path;

use config::VizConfig;
use hfv_viz::{FIGURE_SCHEMA_VERSION, Figure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("figure error: {0}")]
    Figure(#[from] hfv_core::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render a figure to an SVG document.
pub fn render_svg(fig: &Figure, config: &VizConfig) -> Result<String> {
    if fig.schema_version != FIGURE_SCHEMA_VERSION {
        return Err(RenderError::Layout(format!("unsupported figure schema '{}'", fig.schema_version)));
    }
    let boxes = layout::multi_panel::pad_boxes(fig)?;
    let fonts = font::FontHandle::from_config(&config.font)?;
    let mut canvas = canvas::Canvas::with_fonts(fig.width, fig.height, fonts);
    canvas.set_background(Some(config.figure.background));
    for (i, (pad, pad_box)) in fig.pads.iter().zip(&boxes).enumerate() {
        plots::pad::render_pad(&mut canvas, &fig.layout, i, pad, pad_box, config);
    }
    log::debug!("rendered figure '{}' with {} pads", fig.name, fig.pads.len());
    Ok(canvas.finish_svg())
}

/// Render a figure JSON document (as written by `Figure::to_json`).
pub fn render_json(json: &str, config: &VizConfig) -> Result<String> {
    let fig = Figure::from_json(json)?;
    render_svg(&fig, config)
}

/// Render a figure to an SVG file.
pub fn render_to_file(fig: &Figure, path: &Path, config: &VizConfig) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        None | Some("svg") => {}
        Some(other) => {
            return Err(RenderError::Config(format!("unsupported output format '{other}' (only svg)")));
        }
    }
    let svg = render_svg(fig, config)?;
    std::fs::write(path, svg)?;
    Ok(())
}
