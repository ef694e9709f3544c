pub mod axes_draw;
pub mod pad;
pub mod series;
