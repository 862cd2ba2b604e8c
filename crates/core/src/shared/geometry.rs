use serde::{Deserialize, Serialize};

/// A point in view coordinates (origin top-left, y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle in view coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn mid_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.origin.y + self.size.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    /// Shrinks the rectangle by `dx` on the left and right and `dy` on the
    /// top and bottom. Negative insets grow it.
    ///
    /// An axis whose inset exceeds half its extent collapses to zero length
    /// at its midpoint rather than going negative.
    pub fn inset_by(&self, dx: f64, dy: f64) -> Rect {
        let (x, width) = inset_axis(self.origin.x, self.size.width, dx);
        let (y, height) = inset_axis(self.origin.y, self.size.height, dy);
        Rect::new(x, y, width, height)
    }

    /// Half-open containment: the max edges are outside.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x < self.max_x() && p.y >= self.min_y() && p.y < self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.min_y() >= self.min_y()
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }
}

fn inset_axis(origin: f64, extent: f64, inset: f64) -> (f64, f64) {
    let shrunk = extent - 2.0 * inset;
    if shrunk < 0.0 {
        (origin + extent / 2.0, 0.0)
    } else {
        (origin + inset, shrunk)
    }
}
