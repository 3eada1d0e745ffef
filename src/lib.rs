// THEORY:
// This file is the main entry point for the `rememe` library crate. It exposes the
// substitution engine, the retry search and the batch runner as the public API, and
// keeps the leaf algorithms (`core_modules`) available for callers that want to run
// a single stage on its own.
//
// Data flows strictly downward:
//
//     batch -> retry_search -> engine -> { color_cluster, region_locator, compositor }
//                                     -> validator (reads the engine's last attempt)

pub mod batch;
pub mod config;
pub mod core_modules;
pub mod engine;
pub mod error;
pub mod image_io;
pub mod retry_search;

pub use config::RememeConfig;
pub use core_modules::color::Color;
pub use core_modules::region_locator::{Position, Rectangle};
pub use core_modules::validator::ValidationThresholds;
pub use engine::{SubstitutionEngine, SubstitutionParams, Substitutor};
pub use error::{Result, SubstitutionError};
pub use retry_search::{ClusterRange, SearchReport, SearchSpace};
