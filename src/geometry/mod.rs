//! Planar geometry for splitting buildings by a reference line.
//!
//! Coordinates are treated as planar `(x, y)` with `x = longitude` and
//! `y = latitude`, the GeoJSON axis order.
//!
//! # Examples
//!
//! ```rust
//! use geocluster::{Point, ReferenceLine, Side};
//!
//! // A river flowing east along y = 0.
//! let river = ReferenceLine::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]).unwrap();
//!
//! assert_eq!(river.side_of(Point::new(5.0, 1.0)), Side::Left);
//! assert_eq!(river.side_of(Point::new(5.0, -1.0)), Side::Right);
//! ```

mod line;

pub use line::ReferenceLine;

use geo::{Coord, Point as GeoPoint};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for Coord<f64> {
    fn from(p: Point) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

impl From<Point> for GeoPoint<f64> {
    fn from(p: Point) -> Self {
        GeoPoint::new(p.x, p.y)
    }
}

impl From<Coord<f64>> for Point {
    fn from(c: Coord<f64>) -> Self {
        Point::new(c.x, c.y)
    }
}

impl From<GeoPoint<f64>> for Point {
    fn from(p: GeoPoint<f64>) -> Self {
        Point::new(p.x(), p.y())
    }
}

/// Side of a directed line, looking along its direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}
