//! Distances between buildings.
//!
//! A [`DistanceMetric`] compares two records; [`distance_matrix`] turns any
//! metric into the dense matrix the cluster engine consumes.

use crate::Matrix;
use crate::record::BuildingRecord;
use geo::{HaversineDistance, Point};
use log::debug;
use rayon::prelude::*;

/// Mean Earth radius in meters (IUGG), the sphere `geo` measures on.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub trait DistanceMetric: Sync {
    fn distance(&self, a: &BuildingRecord, b: &BuildingRecord) -> f64;
}

/// Great-circle distance in meters.
#[derive(Clone, Copy, Debug, Default)]
pub struct Geodesic;

impl DistanceMetric for Geodesic {
    fn distance(&self, a: &BuildingRecord, b: &BuildingRecord) -> f64 {
        haversine_distance(a.latitude(), a.longitude(), b.latitude(), b.longitude())
    }
}

/// Great-circle distance stretched by `street_multiplier` when the two
/// buildings stand on different streets.
#[derive(Clone, Copy, Debug)]
pub struct StreetAwareGeodesic {
    pub street_multiplier: f64,
}

impl StreetAwareGeodesic {
    pub fn new(street_multiplier: f64) -> Self {
        if street_multiplier.is_nan() || street_multiplier < 1.0 {
            panic!("street_multiplier must be >= 1.0, got {}", street_multiplier);
        }
        Self { street_multiplier }
    }
}

impl DistanceMetric for StreetAwareGeodesic {
    fn distance(&self, a: &BuildingRecord, b: &BuildingRecord) -> f64 {
        let d = Geodesic.distance(a, b);
        if a.street() == b.street() {
            d
        } else {
            d * self.street_multiplier
        }
    }
}

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2))
}

/// Dense symmetric matrix of pairwise distances with a zero diagonal.
///
/// Rows of the upper triangle are evaluated in parallel.
pub fn distance_matrix<M: DistanceMetric + ?Sized>(records: &[BuildingRecord], metric: &M) -> Matrix {
    let n = records.len();
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            records[i + 1..]
                .iter()
                .map(|other| metric.distance(&records[i], other))
                .collect()
        })
        .collect();

    let mut matrix = Matrix::zeros((n, n));
    for (i, row) in upper.into_iter().enumerate() {
        for (offset, d) in row.into_iter().enumerate() {
            let j = i + 1 + offset;
            matrix[[i, j]] = d;
            matrix[[j, i]] = d;
        }
    }

    debug!("Built {}x{} distance matrix", n, n);
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn building(street: &str, lat: f64, lon: f64) -> BuildingRecord {
        BuildingRecord::new(street, "1", lat, lon).unwrap()
    }

    #[test]
    fn test_haversine_known_distances() {
        assert_eq!(haversine_distance(55.75, 37.61, 55.75, 37.61), 0.0);

        // One degree of latitude is ~111.2 km on the mean sphere.
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(d, 111_195.08, max_relative = 1e-5);

        // Antipodes.
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert_relative_eq!(d, std::f64::consts::PI * EARTH_RADIUS_M, max_relative = 1e-9);
    }

    #[test]
    fn test_street_multiplier_applies_across_streets_only() {
        let a = building("Mira", 55.750, 37.610);
        let b = building("Mira", 55.751, 37.610);
        let c = building("Lenina", 55.751, 37.610);

        let metric = StreetAwareGeodesic::new(3.0);
        let plain = Geodesic.distance(&a, &b);

        assert_relative_eq!(metric.distance(&a, &b), plain);
        assert_relative_eq!(metric.distance(&a, &c), plain * 3.0);
    }

    #[test]
    fn test_distance_matrix_shape() {
        let records = vec![
            building("Mira", 55.750, 37.610),
            building("Mira", 55.752, 37.612),
            building("Lenina", 55.760, 37.600),
            building("Lenina", 55.761, 37.601),
        ];

        let m = distance_matrix(&records, &StreetAwareGeodesic::new(2.0));
        assert_eq!(m.shape(), &[4, 4]);
        for i in 0..4 {
            assert_eq!(m[[i, i]], 0.0);
            for j in 0..4 {
                assert_eq!(m[[i, j]], m[[j, i]]);
                assert!(m[[i, j]] >= 0.0);
            }
        }
        assert_relative_eq!(m[[0, 2]], 2.0 * Geodesic.distance(&records[0], &records[2]));
    }

    #[test]
    fn test_distance_matrix_empty() {
        let m = distance_matrix(&[], &Geodesic);
        assert_eq!(m.shape(), &[0, 0]);
    }

    #[test]
    fn test_invalid_multiplier() {
        std::panic::catch_unwind(|| {
            StreetAwareGeodesic::new(0.5);
        })
        .expect_err("Should panic on multiplier below 1");

        std::panic::catch_unwind(|| {
            StreetAwareGeodesic::new(f64::NAN);
        })
        .expect_err("Should panic on NaN multiplier");
    }
}
