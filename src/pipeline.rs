//! End-to-end clustering of a building dataset.
//!
//! A [`ClusterJob`] filters records by street, optionally splits them by the
//! side of a reference line, clusters every part on its own and stitches the
//! labels back together in input order.
//!
//! # Examples
//!
//! ```rust
//! use geocluster::{BuildingRecord, ClusterConfig, ClusterJob, DistanceMode};
//!
//! let records = vec![
//!     BuildingRecord::new("Mira", "1", 55.7500, 37.6000).unwrap(),
//!     BuildingRecord::new("Mira", "3", 55.7501, 37.6000).unwrap(),
//!     BuildingRecord::new("Mira", "5", 55.7502, 37.6000).unwrap(),
//!     BuildingRecord::new("Mira", "90", 55.7700, 37.6000).unwrap(),
//! ];
//!
//! let config = ClusterConfig::default()
//!     .mode(DistanceMode::Geodesic)
//!     .eps(50.0)
//!     .min_samples(2);
//!
//! let table = ClusterJob::new(&config).run(&records).unwrap();
//! assert_eq!(table.n_clusters(), 1);
//! assert_eq!(table.records[3].cluster(), Some(-1));
//! ```

use crate::cluster::{ClusterAssignment, DBSCAN, NOISE};
use crate::config::{ClusterConfig, DistanceMode, ExportOptions};
use crate::error::{Error, Result};
use crate::export;
use crate::geometry::{ReferenceLine, Side};
use crate::metrics::{DistanceMetric, StreetAwareGeodesic, distance_matrix};
use crate::preprocessing::{StandardScaler, coordinate_matrix};
use crate::record::{BuildingRecord, filter_streets};
use log::{debug, info};
use std::path::Path;

/// One independently clustered part of the input.
#[derive(Clone, Debug, PartialEq)]
pub struct SubsetSummary {
    /// `None` when the input was not split.
    pub side: Option<Side>,
    pub n_records: usize,
    pub n_clusters: usize,
    pub n_noise: usize,
}

/// Labeled records in input order.
#[derive(Clone, Debug, Default)]
pub struct ClusteredTable {
    pub records: Vec<BuildingRecord>,
    pub subsets: Vec<SubsetSummary>,
}

impl ClusteredTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn assignment(&self) -> ClusterAssignment {
        ClusterAssignment::new(
            self.records
                .iter()
                .map(|r| r.cluster().unwrap_or(NOISE))
                .collect(),
        )
    }

    pub fn n_clusters(&self) -> usize {
        self.assignment().n_clusters()
    }

    pub fn n_noise(&self) -> usize {
        self.assignment().n_noise()
    }
}

pub struct ClusterJob<'a> {
    config: &'a ClusterConfig,
    line: Option<&'a ReferenceLine>,
}

impl<'a> ClusterJob<'a> {
    pub fn new(config: &'a ClusterConfig) -> Self {
        Self { config, line: None }
    }

    pub fn with_line(mut self, line: &'a ReferenceLine) -> Self {
        self.line = Some(line);
        self
    }

    pub fn run(&self, records: &[BuildingRecord]) -> Result<ClusteredTable> {
        self.config.validate()?;

        if records.is_empty() {
            return Err(Error::empty("no building records to cluster"));
        }

        let working = filter_streets(records, &self.config.selected_streets);
        if working.is_empty() {
            return Err(Error::empty(format!(
                "no valid streets matched {:?}",
                self.config.selected_streets
            )));
        }
        info!(
            "Clustering {} of {} buildings ({:?} mode, eps={}, min_samples={})",
            working.len(),
            records.len(),
            self.config.mode,
            self.config.effective_eps(),
            self.config.min_samples
        );

        let mut labeled: Vec<(usize, BuildingRecord)> = Vec::with_capacity(working.len());
        let mut subsets = Vec::new();
        let mut label_offset = 0;

        for (side, indices) in self.split(&working)? {
            let subset: Vec<BuildingRecord> = indices.iter().map(|&i| working[i].clone()).collect();
            let assignment = cluster_records(&subset, self.config)?;

            for (record_idx, (&original_idx, mut record)) in indices.iter().zip(subset).enumerate() {
                let label = assignment.label(record_idx);
                record.set_cluster(if label == NOISE { NOISE } else { label + label_offset });
                labeled.push((original_idx, record));
            }

            let summary = SubsetSummary {
                side,
                n_records: assignment.len(),
                n_clusters: assignment.n_clusters(),
                n_noise: assignment.n_noise(),
            };
            debug!("Subset {:?}", summary);

            // Later subsets continue the numbering so labels stay unique.
            label_offset += summary.n_clusters as i32;
            subsets.push(summary);
        }

        labeled.sort_by_key(|(idx, _)| *idx);
        let table = ClusteredTable {
            records: labeled.into_iter().map(|(_, record)| record).collect(),
            subsets,
        };

        info!(
            "Found {} clusters, {} noise buildings",
            table.n_clusters(),
            table.n_noise()
        );
        Ok(table)
    }

    /// Runs the job and writes the table. Nothing is written on failure.
    pub fn run_to_file<P: AsRef<Path>>(
        &self,
        records: &[BuildingRecord],
        path: P,
        options: &ExportOptions,
    ) -> Result<ClusteredTable> {
        let table = self.run(records)?;
        export::write_table(path, &table, options)?;
        Ok(table)
    }

    fn split(&self, records: &[BuildingRecord]) -> Result<Vec<(Option<Side>, Vec<usize>)>> {
        if !self.config.split_by_line {
            return Ok(vec![(None, (0..records.len()).collect())]);
        }

        let line = self.line.ok_or_else(|| {
            Error::geometry("splitting by reference line requested but no line was given")
        })?;

        let (mut left, mut right) = (Vec::new(), Vec::new());
        for (i, record) in records.iter().enumerate() {
            match line.side_of(record.point()) {
                Side::Left => left.push(i),
                Side::Right => right.push(i),
            }
        }
        info!("Reference line split: {} left, {} right", left.len(), right.len());

        Ok(vec![(Some(Side::Left), left), (Some(Side::Right), right)])
    }
}

/// Clusters one working set with the configured distance mode. An empty set
/// yields an empty assignment.
pub fn cluster_records(records: &[BuildingRecord], config: &ClusterConfig) -> Result<ClusterAssignment> {
    config.validate()?;
    if records.is_empty() {
        return Ok(ClusterAssignment::default());
    }

    match config.mode {
        DistanceMode::Scaled => {
            let scaled = StandardScaler::new().fit_transform(&coordinate_matrix(records))?;
            DBSCAN::new(config.effective_eps(), config.min_samples).fit_predict_indexed(&scaled)
        }
        DistanceMode::Geodesic => cluster_with_metric(
            records,
            &StreetAwareGeodesic::new(config.street_multiplier),
            config.effective_eps(),
            config.min_samples,
        ),
    }
}

/// Clusters records under any pairwise metric through a precomputed matrix.
pub fn cluster_with_metric<M: DistanceMetric + ?Sized>(
    records: &[BuildingRecord],
    metric: &M,
    eps: f64,
    min_samples: usize,
) -> Result<ClusterAssignment> {
    if records.is_empty() {
        return Ok(ClusterAssignment::default());
    }

    let distances = distance_matrix(records, metric);
    DBSCAN::new(eps, min_samples).fit_predict_precomputed(&distances)
}
