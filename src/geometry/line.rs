use super::{Point, Side};
use crate::error::{Error, Result};
use geo::{Coord, EuclideanLength, LineInterpolatePoint, LineLocatePoint, LineString, Point as GeoPoint};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Step used to sample the local direction, as a fraction of line length.
const DIRECTION_STEP_FRACTION: f64 = 1e-6;

/// An ordered polyline such as a river centerline.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceLine {
    line: LineString<f64>,
    // Arc length at each vertex; cumulative[0] == 0.
    cumulative: Vec<f64>,
}

impl ReferenceLine {
    /// Builds a line, dropping consecutive duplicate vertices. Fails when
    /// fewer than two distinct vertices remain or a coordinate is not finite.
    pub fn new(vertices: Vec<Point>) -> Result<Self> {
        if let Some(bad) = vertices.iter().find(|p| !p.is_finite()) {
            return Err(Error::geometry(format!(
                "reference line has a non-finite vertex ({}, {})",
                bad.x, bad.y
            )));
        }

        let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
        for p in vertices {
            let c = Coord::from(p);
            if distinct.last() != Some(&c) {
                distinct.push(c);
            }
        }

        if distinct.len() < 2 {
            return Err(Error::geometry(format!(
                "reference line needs at least two distinct vertices, got {}",
                distinct.len()
            )));
        }

        Self::from_line_string(LineString::new(distinct))
    }

    fn from_line_string(line: LineString<f64>) -> Result<Self> {
        let mut cumulative = Vec::with_capacity(line.0.len());
        let mut total = 0.0;
        cumulative.push(total);
        for segment in line.lines() {
            total += segment.euclidean_length();
            cumulative.push(total);
        }

        if total <= 0.0 {
            return Err(Error::geometry("reference line has zero length"));
        }

        Ok(Self { line, cumulative })
    }

    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)?;
        Self::from_geojson_str(&text)
    }

    /// Reads the first line found in a GeoJSON document: a `LineString`,
    /// the first part of a `MultiLineString`, or the first such geometry
    /// inside a `Feature`, `FeatureCollection` or `GeometryCollection`.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let coords = find_line_coordinates(&value)
            .ok_or_else(|| Error::geometry("no LineString found in GeoJSON"))?;

        let vertices = coords
            .iter()
            .map(|c| {
                let pair = c.as_array()?;
                Some(Point::new(pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::geometry("LineString has a malformed coordinate"))?;

        Self::new(vertices)
    }

    pub fn line_string(&self) -> &LineString<f64> {
        &self.line
    }

    pub fn vertices(&self) -> Vec<Point> {
        self.line.0.iter().copied().map(Point::from).collect()
    }

    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    pub fn reversed(&self) -> Self {
        let mut coords = self.line.0.clone();
        coords.reverse();

        let total = self.length();
        Self {
            line: LineString::new(coords),
            cumulative: self.cumulative.iter().rev().map(|c| total - c).collect(),
        }
    }

    /// Arc length of the point on the line nearest to `p`. The first
    /// segment wins ties.
    pub fn project(&self, p: Point) -> f64 {
        self.line
            .line_locate_point(&GeoPoint::from(p))
            .map_or(0.0, |fraction| fraction * self.length())
    }

    /// Point at arc length `s`, clamped to the line's extent.
    pub fn interpolate(&self, s: f64) -> Point {
        let fraction = (s / self.length()).clamp(0.0, 1.0);
        self.line
            .line_interpolate_point(fraction)
            .map_or_else(|| Point::from(self.line.0[0]), Point::from)
    }

    /// Cross product of the local line direction and the offset from the
    /// nearest line point to `p`. Positive on the left.
    pub fn signed_offset(&self, p: Point) -> f64 {
        let s = self.project(p);
        let q = self.interpolate(s);
        let (dx, dy) = self.direction_at(s, q);

        let (vx, vy) = (p.x - q.x, p.y - q.y);
        dx * vy - dy * vx
    }

    /// Points exactly on the line resolve to `Right`.
    pub fn side_of(&self, p: Point) -> Side {
        if self.signed_offset(p) > 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    // Direction of travel at arc length `s`, whose line point is `q`.
    fn direction_at(&self, s: f64, q: Point) -> (f64, f64) {
        let step = DIRECTION_STEP_FRACTION * self.length();
        let coords = &self.line.0;

        // At an interior vertex the turn is bisected, so the outer wedge
        // reads the same from either end of the line.
        let last = coords.len() - 1;
        if let Some(i) = (1..last).find(|&i| (self.cumulative[i] - s).abs() <= step) {
            let (ix, iy) = unit(coords[i - 1], coords[i]);
            let (ox, oy) = unit(coords[i], coords[i + 1]);
            let (bx, by) = (ix + ox, iy + oy);
            if bx.hypot(by) > f64::EPSILON {
                return (bx, by);
            }
            return (ox, oy);
        }

        // Always along the line, also near its end.
        if s + step <= self.length() {
            let ahead = self.interpolate(s + step);
            (ahead.x - q.x, ahead.y - q.y)
        } else {
            let behind = self.interpolate(s - step);
            (q.x - behind.x, q.y - behind.y)
        }
    }
}

fn unit(from: Coord<f64>, to: Coord<f64>) -> (f64, f64) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let len = dx.hypot(dy);
    (dx / len, dy / len)
}

fn find_line_coordinates(value: &Value) -> Option<&Vec<Value>> {
    match value.get("type")?.as_str()? {
        "LineString" => value.get("coordinates")?.as_array(),
        "MultiLineString" => value.get("coordinates")?.as_array()?.first()?.as_array(),
        "Feature" => find_line_coordinates(value.get("geometry")?),
        "FeatureCollection" => value
            .get("features")?
            .as_array()?
            .iter()
            .find_map(find_line_coordinates),
        "GeometryCollection" => value
            .get("geometries")?
            .as_array()?
            .iter()
            .find_map(find_line_coordinates),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Uniform;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn line(coords: &[(f64, f64)]) -> ReferenceLine {
        ReferenceLine::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()).unwrap()
    }

    fn assert_point_eq(actual: Point, expected: (f64, f64)) {
        assert_relative_eq!(actual.x, expected.0, epsilon = 1e-9);
        assert_relative_eq!(actual.y, expected.1, epsilon = 1e-9);
    }

    #[test]
    fn test_length_and_interpolate() {
        let l = line(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert_relative_eq!(l.length(), 11.0);
        assert_relative_eq!(l.line_string().euclidean_length(), 11.0);
        assert_point_eq(l.interpolate(0.0), (0.0, 0.0));
        assert_point_eq(l.interpolate(5.0), (3.0, 4.0));
        assert_point_eq(l.interpolate(8.0), (3.0, 7.0));
        assert_point_eq(l.interpolate(100.0), (3.0, 10.0));
        assert_point_eq(l.interpolate(-1.0), (0.0, 0.0));
    }

    #[test]
    fn test_project() {
        let l = line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert_relative_eq!(l.project(Point::new(4.0, -3.0)), 4.0, epsilon = 1e-9);
        assert_relative_eq!(l.project(Point::new(12.0, 6.0)), 16.0, epsilon = 1e-9);
        assert_relative_eq!(l.project(Point::new(-5.0, 0.0)), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_side_of_straight_line() {
        let l = line(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(l.side_of(Point::new(5.0, 2.0)), Side::Left);
        assert_eq!(l.side_of(Point::new(5.0, -2.0)), Side::Right);
    }

    #[test]
    fn test_collinear_point_is_right() {
        let l = line(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_relative_eq!(l.signed_offset(Point::new(5.0, 0.0)), 0.0);
        assert_eq!(l.side_of(Point::new(5.0, 0.0)), Side::Right);
    }

    #[test]
    fn test_side_past_line_end_keeps_orientation() {
        let l = line(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(l.side_of(Point::new(12.0, 1.0)), Side::Left);
        assert_eq!(l.side_of(Point::new(12.0, -1.0)), Side::Right);
        assert_eq!(l.side_of(Point::new(-2.0, 1.0)), Side::Left);
    }

    #[test]
    fn test_sharp_turn_outer_wedge() {
        // The turn at the peak is sharper than 90 degrees.
        let l = line(&[(6.0, -1.0), (9.0, 3.0), (12.0, 0.0)]);
        let r = l.reversed();

        for p in [Point::new(9.0, 5.0), Point::new(5.3037, 6.6853), Point::new(12.5, 6.0)] {
            assert_eq!(l.side_of(p), Side::Left, "point {:?}", p);
            assert_eq!(r.side_of(p), Side::Right, "point {:?}", p);
        }
        assert_eq!(l.side_of(Point::new(9.0, 1.0)), Side::Right);
        assert_eq!(r.side_of(Point::new(9.0, 1.0)), Side::Left);
    }

    #[test]
    fn test_reversal_flips_every_side() {
        let l = line(&[(0.0, 0.0), (3.0, 2.0), (6.0, -1.0), (9.0, 3.0), (12.0, 0.0)]);
        let r = l.reversed();
        assert_relative_eq!(l.length(), r.length(), epsilon = 1e-12);

        let mut rng = StdRng::seed_from_u64(42);
        let points = Array2::random_using((500, 2), Uniform::new(-4.0, 16.0), &mut rng);

        let mut checked = 0;
        for row in points.rows() {
            let p = Point::new(row[0], row[1]);
            if l.signed_offset(p).abs() < 1e-9 {
                continue;
            }
            assert_eq!(l.side_of(p), r.side_of(p).opposite(), "point {:?}", p);
            checked += 1;
        }
        assert!(checked > 400);
    }

    #[test]
    fn test_degenerate_lines_are_rejected() {
        assert!(matches!(
            ReferenceLine::new(vec![Point::new(1.0, 1.0)]),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            ReferenceLine::new(vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)]),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            ReferenceLine::new(vec![Point::new(0.0, 0.0), Point::new(f64::NAN, 1.0)]),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(ReferenceLine::new(Vec::new()).is_err());
    }

    #[test]
    fn test_duplicate_vertices_are_dropped() {
        let l = line(&[(0.0, 0.0), (0.0, 0.0), (5.0, 0.0), (5.0, 0.0), (5.0, 5.0)]);
        assert_eq!(l.vertices().len(), 3);
        assert_relative_eq!(l.length(), 10.0);
    }

    #[test]
    fn test_from_geojson_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"type": "Feature", "properties": {"name": "river"},
                 "geometry": {"type": "MultiLineString", "coordinates": [[[37.0, 55.0], [37.5, 55.2], [38.0, 55.1]]]}}
            ]
        }"#;

        let l = ReferenceLine::from_geojson_str(text).unwrap();
        assert_eq!(l.vertices().len(), 3);
        assert_eq!(l.vertices()[0], Point::new(37.0, 55.0));
    }

    #[test]
    fn test_from_geojson_without_line() {
        let text = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(
            ReferenceLine::from_geojson_str(text),
            Err(Error::InvalidGeometry(_))
        ));

        let text = r#"{"type": "LineString", "coordinates": [[0, 0], ["a", 1]]}"#;
        assert!(matches!(
            ReferenceLine::from_geojson_str(text),
            Err(Error::InvalidGeometry(_))
        ));
    }
}
