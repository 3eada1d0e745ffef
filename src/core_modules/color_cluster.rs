// THEORY:
// The `ColorClusterer` answers one question about a template: "which color covers
// most of it?" That color is treated as the background that the region locator
// tries to avoid.
//
// Key architectural principles:
// 1.  **Fixed-cost fallback**: A cluster count of zero short-circuits to white
//     without touching a single pixel. Meme templates are overwhelmingly white
//     backed, so this is also the first thing a search tries.
// 2.  **k-means over sRGB**: Every pixel becomes a normalized `palette::Srgb<f32>`
//     and `kmeans_colors` runs k-means++ seeding followed by Lloyd rounds until the
//     score stops improving or the iteration cap hits. `k` is capped at the number
//     of distinct colors: extra clusters could only ever stay empty.
// 3.  **Population vote**: Every pixel's final cluster index is counted. The centroid
//     with the largest bucket wins, the lowest index on ties. Empty buckets are
//     never eligible.
// 4.  **Reproducibility on demand**: Each run is seeded from the clusterer's own RNG.
//     Unseeded clusterers draw that RNG from OS entropy, so two runs can disagree.
//     Configuring a seed pins it for tests and batch jobs.

use crate::config::ClusteringConfig;
use crate::core_modules::color::Color;
use crate::core_modules::pixel_grid::{PixelGrid, flatten_srgb};
use crate::error::{Result, SubstitutionError};
use kmeans_colors::get_kmeans;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::debug;

/// Cluster count requested by callers; zero selects the white fallback.
pub type ClusterCount = i32;

/// Cluster indices are stored as `u8` by `kmeans_colors`.
pub const MAX_CLUSTERS: ClusterCount = u8::MAX as ClusterCount;

/// Groups pixel colors and reports the centroid of the most populous group.
pub struct ColorClusterer {
    config: ClusteringConfig,
    rng: StdRng,
}

impl ColorClusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Finds the color that covers most of the image.
    ///
    /// `clusters == 0` returns [`Color::WHITE`] without reading pixels; a negative
    /// count or one above [`MAX_CLUSTERS`] is rejected.
    pub fn dominant_color<G: PixelGrid + ?Sized>(
        &mut self,
        grid: &G,
        clusters: ClusterCount,
    ) -> Result<Color> {
        if clusters == 0 {
            return Ok(Color::WHITE);
        }
        if !(1..=MAX_CLUSTERS).contains(&clusters) {
            return Err(SubstitutionError::invalid_parameter("clusters", clusters));
        }
        if grid.pixel_count() == 0 {
            let (width, height) = grid.dimensions();
            return Err(SubstitutionError::invalid_parameter(
                "image",
                format!("{width}x{height}"),
            ));
        }

        let pixels = flatten_srgb(grid);
        let distinct = pixels
            .iter()
            .map(|&srgb| Color::from_srgb(srgb))
            .collect::<HashSet<_>>()
            .len();
        let k = (clusters as usize).min(distinct);

        let seed: u64 = self.rng.r#gen();
        let result = get_kmeans(
            k,
            self.config.max_iterations as usize,
            self.config.convergence as f32,
            false,
            &pixels,
            seed,
        );

        let mut populations = vec![0usize; result.centroids.len()];
        for &index in &result.indices {
            populations[index as usize] += 1;
        }
        let (index, count) = most_populous(&populations).ok_or_else(|| {
            SubstitutionError::invalid_parameter("image", "no pixel was assigned a cluster")
        })?;

        let dominant = Color::from_srgb(result.centroids[index]);
        debug!(clusters, k, score = result.score, population = count, ?dominant, "dominant color resolved");
        Ok(dominant)
    }
}

/// Index and size of the largest non-empty bucket; ties go to the lowest index.
fn most_populous(populations: &[usize]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for (index, &count) in populations.iter().enumerate() {
        if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((index, count));
        }
    }
    best
}
