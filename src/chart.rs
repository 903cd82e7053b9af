//! One A4 page per relay: a title and a pie (or a single disc) with grade and
//! setter labels on each route.

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::color::{Fill, FillColor, LabelColor};
use crate::geometry::{self, Layout, Point, SliceGeometry};
use crate::options::{ChartOptions, InvalidOption};
use crate::routes::{RelayGroup, Route};

/// Page size in millimetres.
pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;

const TITLE_Y: f64 = 30.0;
const CHART_CENTER: Point = Point::new(PAGE_WIDTH / 2.0, 150.0);
const SETTER_OFFSET_Y: f64 = 12.0;
pub const STROKE_WIDTH: f64 = 1.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidOption(#[from] InvalidOption),
}

/// A page that could not be built, labelled with its relay.
#[derive(Debug, Error)]
#[error("relay {relay}: {source}")]
pub struct RelayRenderError {
    pub relay: String,
    #[source]
    pub source: RenderError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: FillColor,
}

/// Gradient in page coordinates running from `start` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

impl LinearGradient {
    /// Stops evenly spaced at `i / (k - 1)`, in colour order.
    pub fn evenly_spaced(start: Point, end: Point, colors: &[FillColor]) -> Self {
        let last = colors.len().saturating_sub(1).max(1) as f64;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, color)| GradientStop {
                offset: i as f64 / last,
                color: *color,
            })
            .collect();
        Self { start, end, stops }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(FillColor),
    Gradient(LinearGradient),
}

impl Paint {
    fn for_fill(fill: &Fill, start: Point, end: Point) -> Self {
        match fill {
            Fill::Solid(color) => Paint::Solid(*color),
            Fill::Gradient(colors) => {
                Paint::Gradient(LinearGradient::evenly_spaced(start, end, colors))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Disc {
        center: Point,
        radius: f64,
        paint: Paint,
    },
    Slice {
        center: Point,
        radius: f64,
        geometry: SliceGeometry,
        paint: Paint,
    },
}

impl Shape {
    pub fn paint(&self) -> &Paint {
        match self {
            Shape::Disc { paint, .. } | Shape::Slice { paint, .. } => paint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// Text hangs below its anchor.
    Hanging,
    /// Text is vertically centred on its anchor.
    Central,
}

/// Text horizontally centred on `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Point,
    pub font_size: f64,
    pub color: LabelColor,
    pub baseline: Baseline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageDrawing {
    pub relay: String,
    pub width: f64,
    pub height: f64,
    pub title: Label,
    pub shapes: Vec<Shape>,
    /// Grade then setter for each shape, in shape order.
    pub labels: Vec<Label>,
}

impl PageDrawing {
    pub fn gradient_count(&self) -> usize {
        self.shapes
            .iter()
            .filter(|shape| matches!(shape.paint(), Paint::Gradient(_)))
            .count()
    }
}

/// Builds the page for one relay. Routes are drawn clockwise from +x in the
/// order given.
pub fn render(
    relay: &str,
    routes: &[Route],
    options: &ChartOptions,
) -> Result<PageDrawing, RenderError> {
    options.validate()?;

    let title = Label {
        text: format!("Relais {relay}"),
        position: Point::new(CHART_CENTER.x, TITLE_Y),
        font_size: options.title_font_size,
        color: LabelColor::Black,
        baseline: Baseline::Hanging,
    };

    let mut shapes = Vec::with_capacity(routes.len());
    let mut labels = Vec::with_capacity(routes.len() * 2);
    let radius = options.radius;

    match geometry::layout(routes.len(), CHART_CENTER, radius) {
        Layout::Empty => {}
        Layout::Disc(disc) => {
            let route = &routes[0];
            shapes.push(Shape::Disc {
                center: disc.center,
                radius: disc.radius,
                paint: Paint::for_fill(&route.fill, disc.gradient_start, disc.gradient_end),
            });
            push_route_labels(&mut labels, route, disc.label, options);
        }
        Layout::Slices(slices) => {
            for (route, slice) in routes.iter().zip(slices) {
                shapes.push(Shape::Slice {
                    center: CHART_CENTER,
                    radius,
                    geometry: slice,
                    paint: Paint::for_fill(&route.fill, slice.arc_start, slice.arc_end),
                });
                push_route_labels(&mut labels, route, slice.label, options);
            }
        }
    }

    debug!(relay, routes = routes.len(), "rendered relay page");

    Ok(PageDrawing {
        relay: relay.to_string(),
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        title,
        shapes,
        labels,
    })
}

fn push_route_labels(labels: &mut Vec<Label>, route: &Route, anchor: Point, options: &ChartOptions) {
    let color = route.fill.label_color();
    labels.push(Label {
        text: route.grade.clone(),
        position: anchor,
        font_size: options.grade_font_size,
        color,
        baseline: Baseline::Central,
    });
    labels.push(Label {
        text: route.setter.clone(),
        position: Point::new(anchor.x, anchor.y + SETTER_OFFSET_Y),
        font_size: options.setter_font_size,
        color,
        baseline: Baseline::Central,
    });
}

/// Renders every relay in parallel. Results come back in `groups` order.
pub fn render_relays(
    groups: &[RelayGroup],
    options: &ChartOptions,
) -> Vec<Result<PageDrawing, RelayRenderError>> {
    groups
        .par_iter()
        .map(|group| {
            render(&group.relay, &group.routes, options).map_err(|source| RelayRenderError {
                relay: group.relay.clone(),
                source,
            })
        })
        .collect()
}
