use super::{
    ClusterAssignment, NOISE, Neighborhood, PointCloud, Precomputed, SpatialIndex, euclidean_distance,
};
use crate::Matrix;
use crate::error::{Error, Result};
use log::debug;
use ndarray::ArrayView1;
use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub struct DBSCAN {
    pub labels: Option<ClusterAssignment>,
    pub core_sample_indices: Option<Vec<usize>>,
    eps: f64,
    min_samples: usize,
}

impl DBSCAN {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        if eps.is_nan() || eps <= 0.0 {
            panic!("eps must be > 0, got {}", eps);
        }
        if min_samples == 0 {
            panic!("min_samples must be > 0, got {}", min_samples);
        }

        Self {
            labels: None,
            core_sample_indices: None,
            eps,
            min_samples,
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Clusters coordinate rows by Euclidean distance.
    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        self.fit_with_metric(x, euclidean_distance)
    }

    /// Clusters coordinate rows with a caller-supplied pairwise distance.
    pub fn fit_with_metric<F>(&mut self, x: &Matrix, metric: F) -> Result<()>
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
    {
        if x.nrows() > 0 && x.ncols() == 0 {
            return Err(Error::parameter("Input matrix must have at least one feature"));
        }

        self.fit_neighborhood(&PointCloud::new(x, metric))
    }

    /// Clusters two-column coordinates by Euclidean distance through an
    /// R-tree instead of a full scan per point.
    pub fn fit_indexed(&mut self, x: &Matrix) -> Result<()> {
        self.fit_neighborhood(&SpatialIndex::new(x)?)
    }

    /// Clusters from a square matrix of pairwise distances.
    pub fn fit_precomputed(&mut self, distances: &Matrix) -> Result<()> {
        if distances.nrows() != distances.ncols() {
            return Err(Error::parameter(format!(
                "Precomputed distance matrix must be square, got {}x{}",
                distances.nrows(),
                distances.ncols()
            )));
        }
        if distances.iter().any(|d| d.is_nan() || *d < 0.0) {
            return Err(Error::parameter(
                "Precomputed distances must be non-negative numbers",
            ));
        }

        self.fit_neighborhood(&Precomputed::new(distances))
    }

    pub fn fit_neighborhood<N: Neighborhood + ?Sized>(&mut self, points: &N) -> Result<()> {
        let n_samples = points.len();
        if n_samples == 0 {
            self.labels = Some(ClusterAssignment::default());
            self.core_sample_indices = Some(Vec::new());
            return Ok(());
        }

        let neighborhoods: Vec<Vec<usize>> = (0..n_samples)
            .map(|i| points.neighbors(i, self.eps))
            .collect();
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|neighbors| neighbors.len() >= self.min_samples)
            .collect();

        let mut labels = vec![NOISE; n_samples];
        let mut current_cluster = 0;

        for seed in 0..n_samples {
            if !is_core[seed] || labels[seed] != NOISE {
                continue;
            }

            labels[seed] = current_cluster;

            // Expand cluster using BFS; only core points spread it further.
            let mut queue = VecDeque::from([seed]);
            while let Some(idx) = queue.pop_front() {
                for &neighbor in &neighborhoods[idx] {
                    if labels[neighbor] == NOISE {
                        labels[neighbor] = current_cluster;
                        if is_core[neighbor] {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }

            current_cluster += 1;
        }

        let core_samples: Vec<usize> = (0..n_samples).filter(|&i| is_core[i]).collect();
        debug!(
            "DBSCAN(eps={}, min_samples={}): {} points, {} core, {} clusters",
            self.eps,
            self.min_samples,
            n_samples,
            core_samples.len(),
            current_cluster
        );

        self.labels = Some(ClusterAssignment::new(labels));
        self.core_sample_indices = Some(core_samples);

        Ok(())
    }

    pub fn fit_predict(&mut self, x: &Matrix) -> Result<ClusterAssignment> {
        self.fit(x)?;
        Ok(self.labels.clone().unwrap_or_default())
    }

    pub fn fit_predict_with_metric<F>(&mut self, x: &Matrix, metric: F) -> Result<ClusterAssignment>
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
    {
        self.fit_with_metric(x, metric)?;
        Ok(self.labels.clone().unwrap_or_default())
    }

    pub fn fit_predict_indexed(&mut self, x: &Matrix) -> Result<ClusterAssignment> {
        self.fit_indexed(x)?;
        Ok(self.labels.clone().unwrap_or_default())
    }

    pub fn fit_predict_precomputed(&mut self, distances: &Matrix) -> Result<ClusterAssignment> {
        self.fit_precomputed(distances)?;
        Ok(self.labels.clone().unwrap_or_default())
    }

    pub fn get_n_clusters(&self) -> Option<usize> {
        self.labels.as_ref().map(ClusterAssignment::n_clusters)
    }

    pub fn get_n_noise_points(&self) -> Option<usize> {
        self.labels.as_ref().map(ClusterAssignment::n_noise)
    }

    pub fn is_core_sample(&self, sample_idx: usize) -> Option<bool> {
        self.core_sample_indices
            .as_ref()
            .map(|core_indices| core_indices.binary_search(&sample_idx).is_ok())
    }
}
