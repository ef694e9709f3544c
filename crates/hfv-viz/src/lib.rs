//! # hfv-viz
//!
//! Plot-friendly figure artifacts for the hfv analyses.
//!
//! Analyses describe what to draw (pads, frames, histogram series, legends,
//! TLatex labels) as plain serializable data; `hfv-render` turns a
//! [`Figure`] into SVG.

#![warn(clippy::all)]

pub mod builders;
pub mod figure;
pub mod latex;

pub use figure::{
    CurveSeries, FIGURE_SCHEMA_VERSION, Figure, Frame, HeatmapSeries, HistSeries, Label, Layout,
    Legend, LegendDraw, LegendEntry, Margins, Pad, PadRect, PointSeries, RefLine, Series,
};
