//! # Ventilation (換気)
//!
//! ```text
//! A_e      = W × H × ventilation ratio (by window type)
//! required = floor area / 20
//! ```
//!
//! No geometric correction: toplight, eaves and frontage settings do not
//! affect ventilation credit.

use tracing::debug;

use super::{Metric, MetricResult, WindowContribution};
use crate::room::{NormalizedWindow, Room, Window};
use crate::settings::{WindowTypeProfile, WindowTypeTable};
use crate::trace::{fixed, FormulaTrace};

/// Required ventilation area is 1/20 of the floor area
pub const VENTILATION_DIVISOR: f64 = 20.0;

/// Effective ventilation area of one window, with its formula strings.
pub fn window_ventilation(window: &NormalizedWindow, profile: &WindowTypeProfile) -> (f64, String, FormulaTrace) {
    let window_area = window.area_m2();
    let ratio = profile.ventilation_ratio;
    let effective = window_area * ratio;

    let simple_formula = format!(
        "({}m × {}m) × {} = {} m²",
        fixed(window.width_m, 2),
        fixed(window.height_m, 2),
        fixed(ratio, 2),
        fixed(effective, 3)
    );
    let trace = FormulaTrace::new()
        .text("(窓面積: ")
        .distance(format!("{}m²", fixed(window_area, 2)))
        .text(") × (換気有効率: ")
        .coefficient(fixed(ratio, 2))
        .text(") = ")
        .number(format!("{}m²", fixed(effective, 3)));

    (effective, simple_formula, trace)
}

pub(crate) fn ventilation_contribution(window: &Window, profile: &WindowTypeProfile) -> WindowContribution {
    let (effective, simple_formula, trace) = window_ventilation(&window.normalized(), profile);
    WindowContribution::new(window, effective, simple_formula, trace)
}

/// Ventilation result for a room. Unknown window types credit nothing.
pub fn compute_ventilation(room: &Room, windows: &[Window], window_types: &WindowTypeTable) -> MetricResult {
    let dims = room.normalized();
    if dims.missing_floor_area() {
        return MetricResult::missing_floor_area(Metric::Ventilation);
    }

    let details = windows
        .iter()
        .map(|window| ventilation_contribution(window, &window_types.resolve(&window.window_type)))
        .collect();
    let result = MetricResult::assemble(
        Metric::Ventilation,
        &dims,
        dims.floor_area_m2 / VENTILATION_DIVISOR,
        details,
    );
    debug!(
        room = %room.name,
        required = result.required_area,
        effective = result.effective_area,
        passes = result.passes,
        "ventilation computed"
    );
    result
}
