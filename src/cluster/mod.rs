//! Density-based clustering.
//!
//! This module provides:
//! - `DBSCAN`: density-based clustering over coordinates or a precomputed
//!   distance matrix
//! - `ClusterAssignment`: the per-point labels it produces, `-1` for noise
//! - `Neighborhood`: the neighbor search DBSCAN runs on, either a
//!   brute-force scan or the R-tree backed `SpatialIndex`
//!
//! # Examples
//!
//! ## Coordinates
//! ```rust
//! use geocluster::DBSCAN;
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 1.0],
//!     [1.2, 1.1],
//!     [1.1, 1.2],
//!     [8.0, 8.0],
//!     [8.1, 8.1],
//!     [8.2, 7.9],
//!     [15.0, 1.0] // Outlier
//! ];
//!
//! let mut dbscan = DBSCAN::new(1.0, 2); // eps=1.0, min_samples=2
//! let labels = dbscan.fit_predict(&x).unwrap();
//!
//! assert_eq!(labels.n_clusters(), 2);
//! assert_eq!(labels.n_noise(), 1);
//! ```
//!
//! ## Precomputed distances
//! ```rust
//! use geocluster::DBSCAN;
//! use ndarray::array;
//!
//! let d = array![
//!     [0.0, 1.0, 9.0],
//!     [1.0, 0.0, 9.0],
//!     [9.0, 9.0, 0.0]
//! ];
//!
//! let mut dbscan = DBSCAN::new(2.0, 2);
//! let labels = dbscan.fit_predict_precomputed(&d).unwrap();
//! assert_eq!(labels.labels(), &[0, 0, -1]);
//! ```

mod dbscan;
mod spatial;

pub use dbscan::DBSCAN;
pub use spatial::SpatialIndex;

use crate::Matrix;
use ndarray::ArrayView1;
use std::collections::{BTreeMap, HashSet};

pub const NOISE: i32 = -1;

/// Cluster label per input index. Label numbers carry no meaning across
/// runs; compare assignments with [`ClusterAssignment::same_membership`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterAssignment {
    labels: Vec<i32>,
}

impl ClusterAssignment {
    pub fn new(labels: Vec<i32>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn label(&self, idx: usize) -> i32 {
        self.labels[idx]
    }

    pub fn is_noise(&self, idx: usize) -> bool {
        self.labels[idx] == NOISE
    }

    pub fn n_clusters(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&l| l != NOISE)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Member indices of every cluster, ordered by their first member.
    pub fn partition(&self) -> Vec<Vec<usize>> {
        let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, &label) in self.labels.iter().enumerate() {
            if label != NOISE {
                groups.entry(label).or_default().push(i);
            }
        }
        let mut partition: Vec<Vec<usize>> = groups.into_values().collect();
        partition.sort();
        partition
    }

    /// Same clusters and same noise, whatever the label numbers.
    pub fn same_membership(&self, other: &ClusterAssignment) -> bool {
        self.len() == other.len()
            && (0..self.len()).all(|i| self.is_noise(i) == other.is_noise(i))
            && self.partition() == other.partition()
    }

    pub fn into_labels(self) -> Vec<i32> {
        self.labels
    }
}

/// Neighbor search over `len()` indexed points.
pub trait Neighborhood {
    fn len(&self) -> usize;

    /// Indices within `eps` of `idx`, `idx` itself included.
    fn neighbors(&self, idx: usize, eps: f64) -> Vec<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows of a square distance matrix.
pub struct Precomputed<'a> {
    distances: &'a Matrix,
}

impl<'a> Precomputed<'a> {
    pub fn new(distances: &'a Matrix) -> Self {
        Self { distances }
    }
}

impl Neighborhood for Precomputed<'_> {
    fn len(&self) -> usize {
        self.distances.nrows()
    }

    fn neighbors(&self, idx: usize, eps: f64) -> Vec<usize> {
        self.distances
            .row(idx)
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d <= eps)
            .map(|(j, _)| j)
            .collect()
    }
}

/// Coordinate rows compared with a pairwise metric, scanned brute force.
pub struct PointCloud<'a, F> {
    points: &'a Matrix,
    metric: F,
}

impl<'a, F> PointCloud<'a, F>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
{
    pub fn new(points: &'a Matrix, metric: F) -> Self {
        Self { points, metric }
    }
}

impl<F> Neighborhood for PointCloud<'_, F>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
{
    fn len(&self) -> usize {
        self.points.nrows()
    }

    fn neighbors(&self, idx: usize, eps: f64) -> Vec<usize> {
        let p = self.points.row(idx);
        self.points
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, q)| (self.metric)(p, *q) <= eps)
            .map(|(j, _)| j)
            .collect()
    }
}

pub fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
