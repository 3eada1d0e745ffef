// THEORY:
// The `engine` module is the top-level API for a single substitution. It wires the
// leaf modules together into one attempt:
//
//     dominant color (clusterer or white) -> region locator -> compositor
//
// and remembers the result so it can be validated afterwards.
//
// Key architectural principles:
// 1.  **Explicit two-state machine**: an engine is either `Idle` (nothing attempted)
//     or `Substituted` (exactly one attempt held). `substitute` is the only way into
//     `Substituted` and always replaces the held attempt, it never stacks. Validation
//     is read-only and only legal once an attempt exists.
// 2.  **Failures do not clobber**: an attempt that errors (bad parameters, no
//     placement found) leaves the previously held attempt untouched.
// 3.  **Owned, unshared state**: the attempt belongs to this engine instance alone.
//     Parallel work uses one engine per job (see `batch`), never a shared one.

use crate::config::RememeConfig;
use crate::core_modules::color::Color;
use crate::core_modules::color_cluster::{ClusterCount, ColorClusterer};
use crate::core_modules::compositor::{Compositor, ImageOpsCompositor, Placement, composite};
use crate::core_modules::region_locator::{Position, Rectangle, locate};
use crate::core_modules::validator::{self, PlacedArea, ValidationThresholds};
use crate::error::{Result, SubstitutionError};
use crate::image_io;
use image::DynamicImage;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// How a single substitution picks its target area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstitutionParams {
    /// Skip detection: stretch the substitute to this size and paste at the origin.
    ResizeTo { width: u32, height: u32 },
    /// Treat white as the background color.
    WhiteFallback,
    /// Cluster the template's colors and treat the most common one as background.
    Clustered { clusters: ClusterCount },
}

impl SubstitutionParams {
    /// Zero maps to the white fallback, anything else to clustering.
    pub fn from_cluster_amount(clusters: ClusterCount) -> Self {
        if clusters == 0 {
            Self::WhiteFallback
        } else {
            Self::Clustered { clusters }
        }
    }

    /// A disabled toggle means white, whatever the count.
    pub fn from_toggle(use_clustering: bool, clusters: ClusterCount) -> Self {
        if use_clustering {
            Self::from_cluster_amount(clusters)
        } else {
            Self::WhiteFallback
        }
    }
}

impl fmt::Display for SubstitutionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResizeTo { width, height } => write!(f, "resize-to {width}x{height}"),
            Self::WhiteFallback => write!(f, "white fallback"),
            Self::Clustered { clusters } => write!(f, "{clusters} clusters"),
        }
    }
}

/// Everything produced by one call to `substitute`.
#[derive(Debug, Clone)]
pub struct SubstitutionAttempt {
    pub params: SubstitutionParams,
    /// The background color used, absent for explicit resizes.
    pub dominant_color: Option<Color>,
    /// The located rectangle, absent for explicit resizes.
    pub rectangle: Option<Rectangle>,
    pub position: Position,
    pub resized_substitute: DynamicImage,
    pub composed: DynamicImage,
}

impl SubstitutionAttempt {
    pub fn placed_area(&self) -> PlacedArea {
        PlacedArea {
            position: self.position,
            substitute_size: (self.resized_substitute.width(), self.resized_substitute.height()),
            template_size: (self.composed.width(), self.composed.height()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Substituted(Box<SubstitutionAttempt>),
}

/// Anything a retry search can drive: one substitution at a time, then a verdict.
pub trait Substitutor {
    fn substitute(
        &mut self,
        template: &DynamicImage,
        substitute: &DynamicImage,
        params: SubstitutionParams,
    ) -> Result<DynamicImage>;

    /// Validates the most recent attempt against the configured thresholds.
    fn validate_last(&self) -> Result<bool>;
}

/// Runs substitutions and holds the most recent attempt for validation.
pub struct SubstitutionEngine<C: Compositor = ImageOpsCompositor> {
    config: RememeConfig,
    clusterer: ColorClusterer,
    compositor: C,
    state: EngineState,
}

impl SubstitutionEngine<ImageOpsCompositor> {
    pub fn new(config: RememeConfig) -> Self {
        let compositor = ImageOpsCompositor::new(config.compositing.filter);
        Self::with_compositor(config, compositor)
    }
}

impl Default for SubstitutionEngine<ImageOpsCompositor> {
    fn default() -> Self {
        Self::new(RememeConfig::default())
    }
}

impl<C: Compositor> SubstitutionEngine<C> {
    pub fn with_compositor(config: RememeConfig, compositor: C) -> Self {
        Self {
            clusterer: ColorClusterer::new(config.clustering.clone()),
            config,
            compositor,
            state: EngineState::Idle,
        }
    }

    pub fn config(&self) -> &RememeConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn last_attempt(&self) -> Option<&SubstitutionAttempt> {
        match &self.state {
            EngineState::Idle => None,
            EngineState::Substituted(attempt) => Some(&**attempt),
        }
    }

    /// Places `substitute` into `template` and returns the composed image.
    pub fn substitute(
        &mut self,
        template: &DynamicImage,
        substitute: &DynamicImage,
        params: SubstitutionParams,
    ) -> Result<DynamicImage> {
        let (placement, dominant_color, rectangle) = match params {
            SubstitutionParams::ResizeTo { width, height } => {
                (Placement::Explicit { width, height }, None, None)
            }
            SubstitutionParams::WhiteFallback => {
                let rect = self.locate(template, Color::WHITE);
                (Placement::Located(rect), Some(Color::WHITE), Some(rect))
            }
            SubstitutionParams::Clustered { clusters } => {
                let dominant = self.dominant_color(template, clusters)?;
                let rect = self.locate(template, dominant);
                (Placement::Located(rect), Some(dominant), Some(rect))
            }
        };
        debug!(%params, ?dominant_color, ?rectangle, "substitution attempt");

        let composition = composite(&self.compositor, template, substitute, placement)?;
        let composed = composition.image.clone();
        self.state = EngineState::Substituted(Box::new(SubstitutionAttempt {
            params,
            dominant_color,
            rectangle,
            position: composition.position,
            resized_substitute: composition.resized_substitute,
            composed: composition.image,
        }));
        Ok(composed)
    }

    /// Substitution with the configured default cluster count.
    pub fn substitute_default(
        &mut self,
        template: &DynamicImage,
        substitute: &DynamicImage,
    ) -> Result<DynamicImage> {
        let params = SubstitutionParams::from_cluster_amount(self.config.clustering.default_clusters);
        self.substitute(template, substitute, params)
    }

    /// Loads both images from disk, then substitutes.
    pub fn substitute_paths(
        &mut self,
        template_path: &Path,
        substitute_path: &Path,
        params: SubstitutionParams,
    ) -> Result<DynamicImage> {
        let template = image_io::load(template_path)?;
        let substitute = image_io::load(substitute_path)?;
        self.substitute(&template, &substitute, params)
    }

    /// Checks the held attempt against an explicit coverage window.
    pub fn validate(&self, threshold_min: f64, threshold_max: f64) -> Result<bool> {
        let attempt = self.last_attempt().ok_or(SubstitutionError::NoAttempt)?;
        let thresholds = ValidationThresholds::new(threshold_min, threshold_max)?;
        Ok(validator::validate(&attempt.placed_area(), thresholds))
    }

    pub fn validate_with(&self, thresholds: ValidationThresholds) -> Result<bool> {
        self.validate(thresholds.min, thresholds.max)
    }

    fn dominant_color(&mut self, template: &DynamicImage, clusters: ClusterCount) -> Result<Color> {
        match self.config.clustering.sample_size {
            Some((width, height)) if clusters > 0 => {
                let sample = self.compositor.resize(template, width, height);
                self.clusterer.dominant_color(&sample, clusters)
            }
            _ => self.clusterer.dominant_color(template, clusters),
        }
    }

    fn locate(&self, template: &DynamicImage, dominant: Color) -> Rectangle {
        locate(template, dominant, self.config.locator.similarity_threshold)
    }
}

impl<C: Compositor> Substitutor for SubstitutionEngine<C> {
    fn substitute(
        &mut self,
        template: &DynamicImage,
        substitute: &DynamicImage,
        params: SubstitutionParams,
    ) -> Result<DynamicImage> {
        SubstitutionEngine::substitute(self, template, substitute, params)
    }

    fn validate_last(&self) -> Result<bool> {
        self.validate_with(self.config.validation)
    }
}
