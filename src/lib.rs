//! Street-aware spatial clustering of geocoded buildings.
//!
//! Records are normalized from loosely shaped rows, optionally split by the
//! side of a reference line (a river), clustered with DBSCAN and written
//! back out as a delimited table.

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod cluster;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod record;

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

pub use cluster::{ClusterAssignment, DBSCAN, Neighborhood, SpatialIndex};
pub use config::{ClusterConfig, DistanceMode, ExportOptions};
pub use error::{Error, Result};
pub use geometry::{Point, ReferenceLine, Side};
pub use metrics::{DistanceMetric, Geodesic, StreetAwareGeodesic, distance_matrix};
pub use pipeline::{ClusterJob, ClusteredTable, SubsetSummary};
pub use preprocessing::StandardScaler;
pub use record::{BuildingRecord, RawRow};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_types_work() {
        let vec = Vector::zeros(5);
        let mat = Matrix::zeros((3, 4));
        assert_eq!(vec.len(), 5);
        assert_eq!(mat.shape(), &[3, 4]);
    }
}
