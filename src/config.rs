//! Configuration structures for the rememe placement pipeline.
//!
//! All tunable parameters live here, grouped by the stage they affect.
//! Every section has defaults matching the behaviour the acceptance
//! thresholds were tuned against, so an empty JSON object is a valid config.
//!
//! ```no_run
//! use rememe::config::RememeConfig;
//! use std::path::Path;
//!
//! let config = RememeConfig::from_json_file(Path::new("rememe.json"))?;
//! # Ok::<(), rememe::SubstitutionError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`ClusteringConfig`]: dominant color extraction
//! - [`LocatorConfig`]: region scan similarity
//! - [`ValidationThresholds`]: coverage acceptance window
//! - [`SearchConfig`]: parameter space of the retry search
//! - [`CompositingConfig`]: resize filter used for the overlay

use crate::core_modules::color_cluster::ClusterCount;
use crate::core_modules::compositor::ResizeFilter;
use crate::core_modules::region_locator::DEFAULT_SIMILARITY_THRESHOLD;
use crate::core_modules::validator::ValidationThresholds;
use crate::error::{Result, SubstitutionError};
use crate::retry_search::{ClusterRange, SearchSpace};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one engine or batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RememeConfig {
    pub clustering: ClusteringConfig,
    pub locator: LocatorConfig,
    pub validation: ValidationThresholds,
    pub search: SearchConfig,
    pub compositing: CompositingConfig,
}

/// Dominant color extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Cluster count used by a single substitution when none is given
    pub default_clusters: ClusterCount,

    /// Upper bound on k-means rounds
    pub max_iterations: u32,

    /// Stop once the centroids move by less than this between rounds
    pub convergence: f64,

    /// Fixed RNG seed; `None` draws from OS entropy on every engine
    pub seed: Option<u64>,

    /// Stretch the template to this size before clustering
    pub sample_size: Option<(u32, u32)>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            default_clusters: 6,
            max_iterations: 20,
            convergence: 1e-5,
            seed: None,
            sample_size: None,
        }
    }
}

/// Region locator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Channel-sum difference below which a pixel is background
    pub similarity_threshold: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Retry search parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Smallest cluster count tried (inclusive)
    pub min_clusters: ClusterCount,

    /// Largest cluster count tried (inclusive)
    pub max_clusters: ClusterCount,

    /// Sweep both clustering toggles instead of a single cluster range
    pub toggle: bool,

    /// Toggle value tried first when `toggle` is set
    pub initial_clustering: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_clusters: 0,
            max_clusters: 10,
            toggle: false,
            initial_clustering: true,
        }
    }
}

impl SearchConfig {
    /// The search space this section describes.
    pub fn space(&self) -> Result<SearchSpace> {
        let range = ClusterRange::new(self.min_clusters, self.max_clusters)?;
        Ok(if self.toggle {
            SearchSpace::Toggled {
                initial_clustering: self.initial_clustering,
                range,
            }
        } else {
            SearchSpace::ClusterAmounts(range)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositingConfig {
    pub filter: ResizeFilter,
}

impl RememeConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubstitutionError::config(format!("cannot read {}", path.display()), e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| SubstitutionError::config(format!("cannot parse {}", path.display()), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SubstitutionError::config("cannot serialize configuration", e))?;
        std::fs::write(path, json)
            .map_err(|e| SubstitutionError::config(format!("cannot write {}", path.display()), e))?;
        Ok(())
    }

    /// Rejects values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        if self.clustering.default_clusters < 0 {
            return Err(SubstitutionError::invalid_parameter(
                "clustering.default_clusters",
                self.clustering.default_clusters,
            ));
        }
        if let Some((w, h)) = self.clustering.sample_size {
            if w == 0 || h == 0 {
                return Err(SubstitutionError::invalid_parameter(
                    "clustering.sample_size",
                    format!("{w}x{h}"),
                ));
            }
        }
        ValidationThresholds::new(self.validation.min, self.validation.max)?;
        self.search.space()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: RememeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RememeConfig::default());
        assert_eq!(config.clustering.default_clusters, 6);
        assert_eq!(config.locator.similarity_threshold, 30);
        assert_eq!(config.validation.min, 0.1);
        assert_eq!(config.validation.max, 0.9);
        assert_eq!(config.search.max_clusters, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: RememeConfig =
            serde_json::from_str(r#"{ "clustering": { "seed": 9 }, "search": { "toggle": true } }"#).unwrap();
        assert_eq!(config.clustering.seed, Some(9));
        assert_eq!(config.clustering.max_iterations, 20);
        assert!(matches!(
            config.search.space().unwrap(),
            SearchSpace::Toggled { initial_clustering: true, .. }
        ));
    }

    #[test]
    fn inverted_range_fails_validation() {
        let mut config = RememeConfig::default();
        config.search.min_clusters = 5;
        config.search.max_clusters = 2;
        assert!(matches!(
            config.validate(),
            Err(SubstitutionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rememe.json");
        let mut config = RememeConfig::default();
        config.clustering.seed = Some(123);
        config.compositing.filter = ResizeFilter::Nearest;

        config.to_json_file(&path).unwrap();
        assert_eq!(RememeConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = RememeConfig::from_json_file(Path::new("/nonexistent/rememe.json")).unwrap_err();
        assert!(matches!(err, SubstitutionError::Config { .. }));
    }
}
