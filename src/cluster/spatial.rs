use super::Neighborhood;
use crate::Matrix;
use crate::error::{Error, Result};
use rstar::RTree;
use rstar::primitives::GeomWithData;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Planar points bulk-loaded into an R-tree and searched by Euclidean
/// distance.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    points: Vec<[f64; 2]>,
}

impl SpatialIndex {
    /// Indexes the rows of a two-column matrix.
    pub fn new(points: &Matrix) -> Result<Self> {
        if points.ncols() != 2 {
            return Err(Error::parameter(format!(
                "Spatial index needs 2 columns, got {}",
                points.ncols()
            )));
        }

        let points: Vec<[f64; 2]> = points.rows().into_iter().map(|r| [r[0], r[1]]).collect();
        let tree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, &p)| IndexedPoint::new(p, i))
                .collect(),
        );

        Ok(Self { tree, points })
    }
}

impl Neighborhood for SpatialIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn neighbors(&self, idx: usize, eps: f64) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(self.points[idx], eps * eps)
            .map(|p| p.data)
            .collect();
        // Same order as a brute-force scan.
        found.sort_unstable();
        found
    }
}
