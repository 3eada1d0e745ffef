// THEORY:
// The `retry_search` module turns a single-shot heuristic into something usable
// without manual tuning. The locator's output depends heavily on which color is
// assumed to be background, and the right cluster count differs per template. So
// instead of guessing once, the search walks a small parameter space in a fixed
// order and stops at the first placement the validator accepts.
//
// Two spaces are supported:
// 1.  **Cluster amounts**: a single inclusive range of cluster counts, where zero
//     means the white fallback.
// 2.  **Toggled**: the product of a "use clustering" toggle (initial value first,
//     then its negation) and a cluster range. Pairs that mean the same computation
//     (a disabled toggle with any count, an enabled toggle with count zero: all
//     white fallback) are evaluated only once.
//
// Each candidate runs `substitute` then `validate_last` on the same substitutor, one
// after another. A candidate that finds no placement simply loses; parameter and
// state errors end the search immediately. Such a losing candidate never reaches
// the engine's state, so the attempt held afterwards (and anything `validate_last`
// would report) still belongs to the previous candidate.

use crate::core_modules::color_cluster::ClusterCount;
use crate::engine::{SubstitutionParams, Substitutor};
use crate::error::{Result, SubstitutionError};
use image::DynamicImage;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// An inclusive, non-empty range of cluster counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRange {
    min: ClusterCount,
    max: ClusterCount,
}

impl ClusterRange {
    pub fn new(min: ClusterCount, max: ClusterCount) -> Result<Self> {
        if min > max {
            return Err(SubstitutionError::invalid_parameter(
                "cluster_range",
                format!("{min}..={max}"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> ClusterCount {
        self.min
    }

    pub fn max(&self) -> ClusterCount {
        self.max
    }

    pub fn iter(&self) -> RangeInclusive<ClusterCount> {
        self.min..=self.max
    }
}

impl Default for ClusterRange {
    fn default() -> Self {
        Self { min: 0, max: 10 }
    }
}

/// The parameter space a search walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSpace {
    ClusterAmounts(ClusterRange),
    Toggled {
        initial_clustering: bool,
        range: ClusterRange,
    },
}

impl SearchSpace {
    /// Every distinct candidate, in the order it will be tried.
    pub fn candidates(&self) -> Vec<SubstitutionParams> {
        match *self {
            SearchSpace::ClusterAmounts(range) => {
                range.iter().map(SubstitutionParams::from_cluster_amount).collect()
            }
            SearchSpace::Toggled {
                initial_clustering,
                range,
            } => {
                let mut seen = HashSet::new();
                [initial_clustering, !initial_clustering]
                    .into_iter()
                    .flat_map(|toggle| {
                        range.iter().map(move |clusters| SubstitutionParams::from_toggle(toggle, clusters))
                    })
                    .filter(|params| seen.insert(*params))
                    .collect()
            }
        }
    }
}

/// The first accepted placement.
#[derive(Debug, Clone)]
pub struct FoundPlacement {
    pub image: DynamicImage,
    pub params: SubstitutionParams,
    /// Every candidate tried, the accepted one last.
    pub attempted: Vec<SubstitutionParams>,
}

#[derive(Debug, Clone)]
pub enum SearchReport {
    Found(FoundPlacement),
    NotFound { attempted: Vec<SubstitutionParams> },
}

impl SearchReport {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchReport::Found(_))
    }

    pub fn attempted(&self) -> &[SubstitutionParams] {
        match self {
            SearchReport::Found(found) => &found.attempted,
            SearchReport::NotFound { attempted } => attempted,
        }
    }

    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            SearchReport::Found(found) => Some(found.image),
            SearchReport::NotFound { .. } => None,
        }
    }
}

/// Tries every candidate of `space` in order until one validates.
pub fn search<S: Substitutor + ?Sized>(
    substitutor: &mut S,
    template: &DynamicImage,
    substitute: &DynamicImage,
    space: &SearchSpace,
) -> Result<SearchReport> {
    let mut attempted = Vec::new();

    for params in space.candidates() {
        attempted.push(params);
        let image = match substitutor.substitute(template, substitute, params) {
            Ok(image) => image,
            Err(err) if err.is_recoverable() => {
                debug!(%params, %err, "candidate produced no placement");
                continue;
            }
            Err(err) => return Err(err),
        };

        if substitutor.validate_last()? {
            info!(%params, attempts = attempted.len(), "placement accepted");
            return Ok(SearchReport::Found(FoundPlacement {
                image,
                params,
                attempted,
            }));
        }
        debug!(%params, "placement failed validation");
    }

    info!(attempts = attempted.len(), "parameter space exhausted");
    Ok(SearchReport::NotFound { attempted })
}

/// Variant A: a single cluster-count range, zero meaning white.
pub fn search_cluster_amounts<S: Substitutor + ?Sized>(
    substitutor: &mut S,
    template: &DynamicImage,
    substitute: &DynamicImage,
    min: ClusterCount,
    max: ClusterCount,
) -> Result<SearchReport> {
    let space = SearchSpace::ClusterAmounts(ClusterRange::new(min, max)?);
    search(substitutor, template, substitute, &space)
}

/// Variant B: both clustering toggles over a cluster-count range.
pub fn search_toggled<S: Substitutor + ?Sized>(
    substitutor: &mut S,
    template: &DynamicImage,
    substitute: &DynamicImage,
    initial_clustering: bool,
    min: ClusterCount,
    max: ClusterCount,
) -> Result<SearchReport> {
    let space = SearchSpace::Toggled {
        initial_clustering,
        range: ClusterRange::new(min, max)?,
    };
    search(substitutor, template, substitute, &space)
}
