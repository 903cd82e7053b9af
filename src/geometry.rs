//! Pie layout for one relay.
//!
//! Angles are in degrees, measured from +x and growing clockwise because the
//! y axis points down on the page.

/// Slice labels sit this far along the bisector, as a fraction of the radius.
pub const SLICE_LABEL_RATIO: f64 = 0.6;
/// A lone disc has no bisector, so its label sits this far above the centre.
pub const DISC_LABEL_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn on_circle(center: Point, radius: f64, angle_deg: f64) -> Self {
        let theta = angle_deg.to_radians();
        Self {
            x: center.x + radius * theta.cos(),
            y: center.y + radius * theta.sin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceGeometry {
    pub start_angle_deg: f64,
    pub end_angle_deg: f64,
    pub arc_start: Point,
    pub arc_end: Point,
    pub label: Point,
}

impl SliceGeometry {
    pub fn sweep_deg(&self) -> f64 {
        self.end_angle_deg - self.start_angle_deg
    }

    pub fn mid_angle_deg(&self) -> f64 {
        (self.start_angle_deg + self.end_angle_deg) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscGeometry {
    pub center: Point,
    pub radius: f64,
    pub label: Point,
    /// Marbled discs blend left to right across the full diameter.
    pub gradient_start: Point,
    pub gradient_end: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Empty,
    Disc(DiscGeometry),
    Slices(Vec<SliceGeometry>),
}

pub fn layout(total: usize, center: Point, radius: f64) -> Layout {
    match total {
        0 => Layout::Empty,
        1 => Layout::Disc(disc(center, radius)),
        _ => Layout::Slices(
            (0..total)
                .map(|index| slice(index, total, center, radius))
                .collect(),
        ),
    }
}

/// Geometry of slice `index` out of `total` equal slices.
///
/// Both bounds use the same `i * 360 / total` expression, so neighbouring
/// slices share their boundary exactly and the last slice ends on 360.
pub fn slice(index: usize, total: usize, center: Point, radius: f64) -> SliceGeometry {
    let boundary = |i: usize| (i as f64) * 360.0 / (total as f64);
    let start_angle_deg = boundary(index);
    let end_angle_deg = boundary(index + 1);
    let mid = (start_angle_deg + end_angle_deg) / 2.0;

    SliceGeometry {
        start_angle_deg,
        end_angle_deg,
        arc_start: Point::on_circle(center, radius, start_angle_deg),
        arc_end: Point::on_circle(center, radius, end_angle_deg),
        label: Point::on_circle(center, radius * SLICE_LABEL_RATIO, mid),
    }
}

fn disc(center: Point, radius: f64) -> DiscGeometry {
    DiscGeometry {
        center,
        radius,
        label: Point::new(center.x, center.y - radius * DISC_LABEL_RATIO),
        gradient_start: Point::new(center.x - radius, center.y),
        gradient_end: Point::new(center.x + radius, center.y),
    }
}
