//! # Compliance Calculations
//!
//! Each metric follows the same pattern:
//!
//! - a per-window function over a [`NormalizedWindow`](crate::room::NormalizedWindow)
//!   returning the window's effective area plus its formula trace
//! - a room-level `compute_*` function that sums the windows, derives the
//!   required area from the floor area, and returns a [`MetricResult`]
//!
//! All functions are pure: the same room and settings always give the same
//! result, and nothing here reads the clock or mutates its inputs.
//!
//! ## Available Calculations
//!
//! - [`lighting`] - Effective daylight area (採光)
//! - [`ventilation`] - Effective ventilation opening area (換気)
//! - [`smoke`] - Effective smoke exhaust opening area within the ceiling band (排煙)
//! - [`report`] - All three metrics in one pass

pub mod lighting;
pub mod report;
pub mod smoke;
pub mod summary;
pub mod ventilation;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::{NormalizedRoom, Window};
use crate::trace::{fixed, FormulaTrace};

// Re-export commonly used items
pub use lighting::compute_lighting;
pub use report::{compute_compliance_report, ComplianceReport};
pub use smoke::compute_smoke_exhaust;
pub use ventilation::compute_ventilation;

/// The three regulated opening metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Lighting,
    Ventilation,
    SmokeExhaust,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Lighting, Metric::Ventilation, Metric::SmokeExhaust];

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Lighting => "採光",
            Metric::Ventilation => "換気",
            Metric::SmokeExhaust => "排煙",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Effective area ≥ required area
    Compliant,
    /// Effective area < required area
    Deficient,
    /// Floor area missing or non-positive; no numeric comparison was made
    MissingFloorArea,
}

/// One window's share of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowContribution {
    pub window_id: Uuid,

    /// Window name as entered
    pub name: String,

    /// Credited area (m²)
    pub effective_area: f64,

    /// One-line formula, e.g. `(1.65m × 1.10m) × 0.50 = 0.907 m²`
    pub simple_formula: String,

    /// Segment-by-segment derivation for styled display
    pub formula_trace: FormulaTrace,
}

impl WindowContribution {
    pub(crate) fn new(window: &Window, effective_area: f64, simple_formula: String, formula_trace: FormulaTrace) -> Self {
        WindowContribution {
            window_id: window.id,
            name: window.name.clone(),
            effective_area,
            simple_formula,
            formula_trace,
        }
    }

    /// Effective area rounded for display (3 decimals)
    pub fn area_display(&self) -> String {
        fixed(self.effective_area, 3)
    }
}

/// Room-level result for one metric.
///
/// ## JSON Example
///
/// ```json
/// {
///   "metric": "Lighting",
///   "required_area": 1.8914,
///   "effective_area": 1.815,
///   "passes": false,
///   "verdict": "Deficient",
///   "contributing_window_count": 1,
///   "per_window_details": [ ... ],
///   "summary_text": "有効採光面積が不足しています。..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric: Metric,

    /// Area the room must provide (m²)
    pub required_area: f64,

    /// Sum of all window contributions (m²)
    pub effective_area: f64,

    pub passes: bool,

    pub verdict: Verdict,

    /// Number of windows with a positive contribution
    pub contributing_window_count: usize,

    /// One entry per window, in window order
    pub per_window_details: Vec<WindowContribution>,

    pub summary_text: String,
}

impl MetricResult {
    /// Result reported for every metric when the floor area is missing.
    pub fn missing_floor_area(metric: Metric) -> Self {
        MetricResult {
            metric,
            required_area: 0.0,
            effective_area: 0.0,
            passes: false,
            verdict: Verdict::MissingFloorArea,
            contributing_window_count: 0,
            per_window_details: Vec::new(),
            summary_text: summary::MISSING_FLOOR_AREA.to_string(),
        }
    }

    /// Sum the window contributions and derive the verdict and summary.
    pub(crate) fn assemble(
        metric: Metric,
        room: &NormalizedRoom,
        required_area: f64,
        per_window_details: Vec<WindowContribution>,
    ) -> Self {
        if room.missing_floor_area() {
            return MetricResult::missing_floor_area(metric);
        }

        let effective_area = ordered_sum(per_window_details.iter().map(|d| d.effective_area));
        let contributing_window_count = per_window_details
            .iter()
            .filter(|d| d.effective_area > 0.0)
            .count();
        let passes = effective_area >= required_area;
        let summary_text = summary::summary_text(
            metric,
            passes,
            effective_area,
            required_area,
            per_window_details.len(),
            contributing_window_count,
        );

        MetricResult {
            metric,
            required_area,
            effective_area,
            passes,
            verdict: if passes { Verdict::Compliant } else { Verdict::Deficient },
            contributing_window_count,
            per_window_details,
            summary_text,
        }
    }

    /// Effective minus required area (m²); negative when deficient.
    pub fn margin(&self) -> f64 {
        self.effective_area - self.required_area
    }
}

/// Sum in ascending order so the total does not depend on window order.
pub(crate) fn ordered_sum(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_sum_is_permutation_invariant() {
        let a = ordered_sum([0.1, 0.2, 0.3, 1e-9, 7.5].into_iter());
        let b = ordered_sum([7.5, 0.3, 1e-9, 0.1, 0.2].into_iter());
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(ordered_sum(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_missing_floor_area_result() {
        let result = MetricResult::missing_floor_area(Metric::SmokeExhaust);
        assert_eq!(result.required_area, 0.0);
        assert_eq!(result.effective_area, 0.0);
        assert!(!result.passes);
        assert_eq!(result.verdict, Verdict::MissingFloorArea);
        assert_eq!(result.summary_text, "床面積を入力してください。");
    }

    #[test]
    fn test_metric_serialization() {
        let json = serde_json::to_string(&Metric::SmokeExhaust).unwrap();
        assert_eq!(json, "\"SmokeExhaust\"");
        assert_eq!(Metric::Lighting.to_string(), "採光");
    }
}
