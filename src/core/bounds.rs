use crate::core::constants::DEFAULT_FRAME_MARGIN;
use crate::core::geo::{Location, Point};
use serde::{Deserialize, Serialize};

/// Represents an axis-aligned bounding box in viewer or world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

/// Growth factor applied to a box before it is re-shaped by [`Bounds::frame`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Margin {
    /// Same factor on both axes
    Uniform(f64),
    /// Separate factors for width (`x`) and height (`y`)
    PerAxis(Point),
}

impl Margin {
    fn factors(&self) -> Point {
        match *self {
            Margin::Uniform(f) => Point::new(f, f),
            Margin::PerAxis(p) => p,
        }
    }
}

impl Default for Margin {
    fn default() -> Self {
        Margin::Uniform(DEFAULT_FRAME_MARGIN)
    }
}

impl From<f64> for Margin {
    fn from(factor: f64) -> Self {
        Margin::Uniform(factor)
    }
}

impl From<Point> for Margin {
    fn from(factors: Point) -> Self {
        Margin::PerAxis(factors)
    }
}

impl Bounds {
    /// Creates new bounds from two points
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Smallest bounds containing every point, `None` for an empty set
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Bounds::new(first, first);
        for point in points {
            bounds.extend(&point);
        }
        Some(bounds)
    }

    /// Gets the width of the bounds
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Gets the height of the bounds
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Gets the size as a Point
    pub fn size(&self) -> Point {
        Point::new(self.width(), self.height())
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> Point {
        (self.min + self.max).scale(0.5)
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &Point) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Gets the four corner points of the bounds
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    /// Aspect ratio (width / height) of these bounds, 1.0 when degenerate
    pub fn aspect_ratio(&self) -> f64 {
        let ratio = self.width() / self.height();
        if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        }
    }

    /// Returns a box with the requested aspect ratio (width / height) that
    /// contains these bounds scaled by `margin`.
    ///
    /// The smaller dimension is grown to reach the aspect ratio; the box is
    /// never cropped. The result shares the center of `self`. Without an
    /// aspect ratio the bounds' own ratio is kept.
    pub fn frame(&self, aspect_ratio: Option<f64>, margin: impl Into<Margin>) -> Bounds {
        let aspect_ratio = aspect_ratio
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or_else(|| self.aspect_ratio());
        let factors = margin.into().factors();

        let initial = Point::new(self.width() * factors.x, self.height() * factors.y);
        let width_from_height = initial.y * aspect_ratio;

        let size = if initial.x > width_from_height {
            Point::new(initial.x, initial.x / aspect_ratio)
        } else {
            Point::new(width_from_height, initial.y)
        };

        let half = size.scale(0.5);
        let center = self.center();
        Bounds::new(center - half, center + half)
    }

    /// Camera location showing [`Bounds::frame`] of these bounds
    pub fn location(&self, aspect_ratio: Option<f64>, margin: impl Into<Margin>) -> Location {
        let frame = self.frame(aspect_ratio, margin);
        let center = frame.center();
        Location::new(center.x, center.y, frame.width())
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0))
    }
}
