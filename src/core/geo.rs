use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Represents a point in viewer (pixel) or world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Multiply both components by `factor`
    pub fn scale(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    /// Elementwise minimum
    pub fn min(&self, other: &Point) -> Point {
        Point::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Elementwise maximum
    pub fn max(&self, other: &Point) -> Point {
        Point::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (*self - *other).norm()
    }

    /// Euclidean length
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, factor: f64) -> Point {
        self.scale(factor)
    }
}

impl Mul<Point> for f64 {
    type Output = Point;

    fn mul(self, point: Point) -> Point {
        point.scale(self)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Point) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, other: Point) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

impl TryFrom<&[f64]> for Point {
    type Error = MapError;

    fn try_from(values: &[f64]) -> Result<Self> {
        match values {
            [x, y] => Ok(Point::new(*x, *y)),
            _ => Err(MapError::InvalidCoordinates(format!(
                "expected 2 components, got {}",
                values.len()
            ))),
        }
    }
}

/// Accepts `[x, y]` arrays and objects carrying numeric `x` and `y` members.
impl TryFrom<&serde_json::Value> for Point {
    type Error = MapError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        let invalid = || MapError::InvalidCoordinates(format!("not a point: {}", value));
        let (x, y) = match value {
            serde_json::Value::Array(items) if items.len() == 2 => (&items[0], &items[1]),
            serde_json::Value::Object(fields) => (
                fields.get("x").ok_or_else(invalid)?,
                fields.get("y").ok_or_else(invalid)?,
            ),
            _ => return Err(invalid()),
        };
        match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Point::new(x, y)),
            _ => Err(invalid()),
        }
    }
}

/// Camera location in world units: the center of the horizontal middle line
/// of the canvas, and the world length of that line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Validates that the location can be installed on a transform
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }
}

impl Default for Location {
    /// The whole tile pyramid, centered.
    fn default() -> Self {
        Self::new(0.5, 0.5, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_eq!(a + b, Point::new(5.0, 8.0));
        assert_eq!(b - a, Point::new(3.0, 4.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(0.5 * b, Point::new(2.0, 3.0));
        assert_eq!(-a, Point::new(-1.0, -2.0));
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!((b - a).norm(), 5.0);
    }

    #[test]
    fn test_point_min_max() {
        let a = Point::new(1.0, 7.0);
        let b = Point::new(3.0, -2.0);
        assert_eq!(a.min(&b), Point::new(1.0, -2.0));
        assert_eq!(a.max(&b), Point::new(3.0, 7.0));
    }

    #[test]
    fn test_point_from_json() {
        assert_eq!(
            Point::try_from(&json!([0.5, 0.25])).unwrap(),
            Point::new(0.5, 0.25)
        );
        assert_eq!(
            Point::try_from(&json!({"x": 3, "y": -1.5, "name": "Lyon"})).unwrap(),
            Point::new(3.0, -1.5)
        );
    }

    #[test]
    fn test_malformed_point_is_rejected() {
        for value in [
            json!("0.5,0.5"),
            json!([1.0]),
            json!([1.0, 2.0, 3.0]),
            json!({"x": 1.0}),
            json!({"x": "1", "y": 2}),
            json!(null),
        ] {
            let err = Point::try_from(&value).unwrap_err();
            assert!(matches!(err, MapError::InvalidCoordinates(_)), "{value}");
        }
        assert!(Point::try_from(&[1.0, 2.0, 3.0][..]).is_err());
        assert_eq!(Point::try_from(&[1.0, 2.0][..]).unwrap(), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_location_validity() {
        assert!(Location::default().is_valid());
        assert!(!Location::new(0.5, 0.5, 0.0).is_valid());
        assert!(!Location::new(f64::NAN, 0.5, 1.0).is_valid());
    }
}
