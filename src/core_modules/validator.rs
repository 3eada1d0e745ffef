// THEORY:
// The `SubstitutionValidator` is the acceptance test of the placement layer. The locator
// always produces *something*; this module decides whether that something is plausible.
//
// A placement is accepted when both hold:
// 1.  **Coverage**: the pasted substitute covers between `min` and `max` of the
//     template's area, both bounds inclusive. Tiny slivers and near-full-frame pastes
//     are what a failed detection usually looks like.
// 2.  **Containment**: the pasted rectangle lies fully inside the template.
//
// The validator is stateless and read-only. Asking it twice about the same attempt
// gives the same answer.

use crate::core_modules::region_locator::Position;
use crate::error::{Result, SubstitutionError};
use serde::{Deserialize, Serialize};

/// Inclusive coverage ratio window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub min: f64,
    pub max: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self { min: 0.1, max: 0.9 }
    }
}

impl ValidationThresholds {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(SubstitutionError::invalid_parameter(
                "validation thresholds",
                format!("{min}..={max}"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, ratio: f64) -> bool {
        self.min <= ratio && ratio <= self.max
    }
}

/// What the validator needs to know about a composited placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedArea {
    pub position: Position,
    pub substitute_size: (u32, u32),
    pub template_size: (u32, u32),
}

/// Substitute area divided by template area.
pub fn coverage_ratio(substitute_size: (u32, u32), template_size: (u32, u32)) -> f64 {
    let substitute_area = substitute_size.0 as f64 * substitute_size.1 as f64;
    let template_area = template_size.0 as f64 * template_size.1 as f64;
    substitute_area / template_area
}

/// Whether the placed substitute is fully inside the template.
pub fn is_contained(area: &PlacedArea) -> bool {
    let (x, y) = (area.position.x as u64, area.position.y as u64);
    let (w, h) = (area.substitute_size.0 as u64, area.substitute_size.1 as u64);
    x + w <= area.template_size.0 as u64 && y + h <= area.template_size.1 as u64
}

pub fn validate(area: &PlacedArea, thresholds: ValidationThresholds) -> bool {
    thresholds.contains(coverage_ratio(area.substitute_size, area.template_size))
        && is_contained(area)
}
