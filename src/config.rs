use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How buildings are compared before clustering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Standardized `[lon, lat]`, Euclidean distance. `eps` is in
    /// standard deviations.
    #[default]
    Scaled,
    /// Great-circle meters, stretched across streets. `eps` is in meters.
    Geodesic,
}

impl DistanceMode {
    /// Neighborhood radius used when none is configured, in this mode's units.
    pub fn default_eps(self) -> f64 {
        match self {
            DistanceMode::Scaled => 0.2,
            DistanceMode::Geodesic => 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// `None` uses [`DistanceMode::default_eps`] for the chosen mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    pub min_samples: usize,
    pub mode: DistanceMode,
    pub street_multiplier: f64,
    /// Streets to keep; empty keeps every street.
    pub selected_streets: Vec<String>,
    /// Cluster each side of the reference line separately.
    pub split_by_line: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eps: None,
            min_samples: 5,
            mode: DistanceMode::Scaled,
            street_multiplier: 2.0,
            selected_streets: Vec::new(),
            split_by_line: false,
        }
    }
}

impl ClusterConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)?;
        let config: ClusterConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = Some(eps);
        self
    }

    /// The configured `eps`, or the mode's default.
    pub fn effective_eps(&self) -> f64 {
        self.eps.unwrap_or_else(|| self.mode.default_eps())
    }

    pub fn min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn mode(mut self, mode: DistanceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn street_multiplier(mut self, street_multiplier: f64) -> Self {
        self.street_multiplier = street_multiplier;
        self
    }

    pub fn selected_streets<I, S>(mut self, streets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_streets = streets.into_iter().map(Into::into).collect();
        self
    }

    pub fn split_by_line(mut self, split: bool) -> Self {
        self.split_by_line = split;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let eps = self.effective_eps();
        if !eps.is_finite() || eps <= 0.0 {
            return Err(Error::parameter(format!("eps must be > 0, got {}", eps)));
        }
        if self.min_samples == 0 {
            return Err(Error::parameter("min_samples must be >= 1"));
        }
        if !self.street_multiplier.is_finite() || self.street_multiplier < 1.0 {
            return Err(Error::parameter(format!(
                "street_multiplier must be >= 1.0, got {}",
                self.street_multiplier
            )));
        }
        Ok(())
    }
}

/// Layout of the exported table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    pub has_header: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            has_header: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClusterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, DistanceMode::Scaled);
        assert!(config.selected_streets.is_empty());
    }

    #[test]
    fn test_default_eps_follows_mode() {
        let scaled = ClusterConfig::default();
        assert_eq!(scaled.effective_eps(), 0.2);

        let geodesic = ClusterConfig::default().mode(DistanceMode::Geodesic);
        assert_eq!(geodesic.effective_eps(), 50.0);

        let explicit = ClusterConfig::default().eps(7.5).mode(DistanceMode::Geodesic);
        assert_eq!(explicit.effective_eps(), 7.5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ClusterConfig::default().eps(0.0).validate().is_err());
        assert!(ClusterConfig::default().eps(f64::NAN).validate().is_err());
        assert!(ClusterConfig::default().min_samples(0).validate().is_err());
        assert!(ClusterConfig::default().street_multiplier(0.9).validate().is_err());
        assert!(ClusterConfig::default().street_multiplier(1.0).validate().is_ok());
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"eps": 150.0, "mode": "geodesic", "selected_streets": ["Mira"]}}"#
        )
        .unwrap();

        let config = ClusterConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.eps, Some(150.0));
        assert_eq!(config.effective_eps(), 150.0);
        assert_eq!(config.mode, DistanceMode::Geodesic);
        assert_eq!(config.selected_streets, vec!["Mira"]);
        assert_eq!(config.min_samples, 5);
    }

    #[test]
    fn test_from_json_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"street_multiplier": 0.5}}"#).unwrap();

        assert!(matches!(
            ClusterConfig::from_json_file(file.path()),
            Err(Error::InvalidParameter(_))
        ));
    }
}
