//! Pie charts of climbing routes, one printable A4 page per relay.
//!
//! Rows of a route table are grouped by relay ([`routes`]), their colour
//! tokens resolved against a palette ([`color`], [`palette`]), laid out as
//! equal slices ([`geometry`]) and drawn ([`chart`], [`svg`]). [`document`]
//! turns the pages into a PDF or PNGs.

pub mod chart;
pub mod color;
pub mod document;
pub mod geometry;
pub mod options;
pub mod palette;
pub mod routes;
pub mod svg;

pub use chart::{PageDrawing, RelayRenderError, RenderError, render, render_relays};
pub use color::{ColorResolver, Fill, FillColor, LabelColor};
pub use options::{ChartOptions, Config};
pub use palette::ColorTable;
pub use routes::{RelayGroup, Route, load_routes};
