//! # Smoke Exhaust (排煙)
//!
//! Only the part of a window inside the smoke accumulation zone, the top
//! 800 mm below the ceiling, counts toward the exhaust opening.
//!
//! ```text
//! zone     = [max(0, CH − 0.8), CH]
//! overlap  = max(0, min(top, CH) − max(top − H, zone bottom))
//! A_e      = W × overlap × opening factor
//! required = floor area / 50
//! ```
//!
//! The opening factor is the type's smoke ratio, except for the
//! smoke-dedicated type (排煙専用窓), which gets 1.0 when it opens to at
//! least 60° and nothing below that.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Metric, MetricResult, WindowContribution};
use crate::room::{NormalizedWindow, Room, Window};
use crate::settings::{is_smoke_exhaust_type, WindowTypeProfile, WindowTypeTable};
use crate::trace::{fixed, FormulaTrace};

/// Depth of the smoke accumulation zone below the ceiling (m)
pub const SMOKE_ZONE_DEPTH_M: f64 = 0.8;

/// Required smoke exhaust area is 1/50 of the floor area
pub const SMOKE_EXHAUST_DIVISOR: f64 = 50.0;

/// Minimum opening angle for a smoke-dedicated window (degrees)
pub const OPENING_ANGLE_THRESHOLD_DEG: f64 = 60.0;

/// Lower bound of the smoke zone above the floor (m).
pub fn smoke_zone_bottom(ceiling_height_m: f64) -> f64 {
    (ceiling_height_m - SMOKE_ZONE_DEPTH_M).max(0.0)
}

/// Height of the window's vertical extent inside the smoke zone (m).
///
/// The window top is capped at the ceiling. Never negative.
pub fn overlap_height(window: &NormalizedWindow, ceiling_height_m: f64) -> f64 {
    let top = window.top_edge_height_m.min(ceiling_height_m);
    let bottom = window.bottom_edge_height_m().max(smoke_zone_bottom(ceiling_height_m));
    (top - bottom).max(0.0)
}

/// Opening factor for a window type.
pub fn opening_factor(window_type: &str, profile: &WindowTypeProfile, opening_angle_deg: f64) -> f64 {
    if is_smoke_exhaust_type(window_type) {
        if opening_angle_deg >= OPENING_ANGLE_THRESHOLD_DEG {
            1.0
        } else {
            0.0
        }
    } else {
        profile.smoke_ratio
    }
}

/// Smoke exhaust figures for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSmoke {
    /// Window height inside the smoke zone (m)
    pub overlap_height_m: f64,

    /// W × overlap, before the opening factor (m²)
    pub zone_area_m2: f64,

    pub opening_factor: f64,

    /// Opening angle shown in the trace; only set for smoke-dedicated windows
    pub opening_angle_deg: Option<f64>,

    pub effective_area_m2: f64,

    pub simple_formula: String,

    pub formula_trace: FormulaTrace,
}

/// Effective smoke exhaust area of one window.
pub fn window_smoke(
    window: &NormalizedWindow,
    window_type: &str,
    ceiling_height_m: f64,
    profile: &WindowTypeProfile,
) -> WindowSmoke {
    let factor = opening_factor(window_type, profile, window.opening_angle_deg);
    let overlap_height_m = overlap_height(window, ceiling_height_m);
    let zone_area_m2 = window.width_m * overlap_height_m;
    let effective_area_m2 = zone_area_m2 * factor;
    let opening_angle_deg = is_smoke_exhaust_type(window_type).then_some(window.opening_angle_deg);

    let simple_formula = format!(
        "({}m × {}m) × {} = {} m²",
        fixed(window.width_m, 2),
        fixed(overlap_height_m, 2),
        fixed(factor, 2),
        fixed(effective_area_m2, 3)
    );

    let mut formula_trace = FormulaTrace::new()
        .text("(排煙有効面積: ")
        .distance(format!("{}m²", fixed(zone_area_m2, 2)))
        .text(") × (排煙有効率: ")
        .coefficient(fixed(factor, 2));
    if let Some(angle) = opening_angle_deg {
        formula_trace = formula_trace.text(format!(" @{}°", angle));
    }
    let formula_trace = formula_trace
        .text(") = ")
        .number(format!("{}m²", fixed(effective_area_m2, 3)));

    WindowSmoke {
        overlap_height_m,
        zone_area_m2,
        opening_factor: factor,
        opening_angle_deg,
        effective_area_m2,
        simple_formula,
        formula_trace,
    }
}

pub(crate) fn smoke_contribution(window: &Window, ceiling_height_m: f64, profile: &WindowTypeProfile) -> WindowContribution {
    let smoke = window_smoke(&window.normalized(), &window.window_type, ceiling_height_m, profile);
    WindowContribution::new(window, smoke.effective_area_m2, smoke.simple_formula, smoke.formula_trace)
}

/// Smoke exhaust result for a room.
pub fn compute_smoke_exhaust(room: &Room, windows: &[Window], window_types: &WindowTypeTable) -> MetricResult {
    let dims = room.normalized();
    if dims.missing_floor_area() {
        return MetricResult::missing_floor_area(Metric::SmokeExhaust);
    }

    let details = windows
        .iter()
        .map(|window| smoke_contribution(window, dims.ceiling_height_m, &window_types.resolve(&window.window_type)))
        .collect();
    let result = MetricResult::assemble(
        Metric::SmokeExhaust,
        &dims,
        dims.floor_area_m2 / SMOKE_EXHAUST_DIVISOR,
        details,
    );
    debug!(
        room = %room.name,
        required = result.required_area,
        effective = result.effective_area,
        contributing = result.contributing_window_count,
        passes = result.passes,
        "smoke exhaust computed"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::Verdict;
    use crate::settings::{Settings, SMOKE_EXHAUST_WINDOW_TYPE};
    use crate::units::FieldValue;

    fn window_m(width: f64, height: f64, top_edge: f64, angle: f64) -> NormalizedWindow {
        NormalizedWindow {
            width_m: width,
            height_m: height,
            top_edge_height_m: top_edge,
            opening_angle_deg: angle,
            ..NormalizedWindow::default()
        }
    }

    #[test]
    fn test_default_window_overlap() {
        let settings = Settings::default();
        let room = Room::new("LDK")
            .with_floor_area("13.24")
            .with_window(Window::with_defaults(0));
        let result = compute_smoke_exhaust(&room, &room.windows, &settings.window_types);

        // Zone [1.6, 2.4], window [0.9, 2.0] → overlap 0.4; 1.65 × 0.4 × 0.5 = 0.33
        assert!((result.effective_area - 0.33).abs() < 1e-9);
        assert!((result.required_area - 0.2648).abs() < 1e-9);
        assert!(result.passes);
        assert_eq!(result.contributing_window_count, 1);
        assert_eq!(
            result.summary_text,
            "排煙ゾーンにかかる窓が1箇所あり、有効排煙面積0.330㎡を確保できています。"
        );

        let detail = &result.per_window_details[0];
        assert_eq!(detail.simple_formula, "(1.65m × 0.40m) × 0.50 = 0.330 m²");
        assert_eq!(
            detail.formula_trace.to_plain_text(),
            "(排煙有効面積: 0.66m²) × (排煙有効率: 0.50) = 0.330m²"
        );
    }

    #[test]
    fn test_overlap_monotone_in_height() {
        let ceiling = 2.4;
        for top_edge in [1.0, 1.6, 1.9, 2.4, 2.8] {
            let mut previous = 0.0;
            for step in 0..=30 {
                let height = step as f64 * 0.1;
                let overlap = overlap_height(&window_m(1.0, height, top_edge, 0.0), ceiling);
                assert!(overlap >= previous, "top {} height {}: {} < {}", top_edge, height, overlap, previous);
                previous = overlap;
            }
        }
    }

    #[test]
    fn test_zero_below_zone() {
        let profile = WindowTypeProfile::operable(1.0, 1.0);
        for top_edge in [0.5, 1.2, 1.5] {
            let smoke = window_smoke(&window_m(1.8, 1.2, top_edge, 90.0), "片開き窓", 2.4, &profile);
            assert_eq!(smoke.overlap_height_m, 0.0);
            assert_eq!(smoke.effective_area_m2, 0.0);
        }
    }

    #[test]
    fn test_window_above_ceiling_is_capped() {
        // Window [2.0, 3.0] with ceiling 2.4 → only [2.0, 2.4] counts
        let overlap = overlap_height(&window_m(1.0, 1.0, 3.0, 0.0), 2.4);
        assert!((overlap - 0.4).abs() < 1e-9);

        // Window spanning the whole zone
        let full = overlap_height(&window_m(1.0, 2.0, 2.4, 0.0), 2.4);
        assert!((full - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_low_ceiling_zone_starts_at_floor() {
        assert_eq!(smoke_zone_bottom(0.5), 0.0);
        assert_eq!(smoke_zone_bottom(0.0), 0.0);
        // Zero ceiling height leaves no zone at all
        let overlap = overlap_height(&window_m(1.0, 1.0, 1.0, 0.0), 0.0);
        assert_eq!(overlap, 0.0);
    }

    #[test]
    fn test_smoke_dedicated_angle_gate() {
        // The table ratio is ignored for the dedicated type
        let profile = WindowTypeProfile::operable(1.0, 0.25);
        let window = window_m(1.0, 0.5, 2.4, 0.0);
        let ungated = window.width_m * overlap_height(&window, 2.4);

        for angle in [0.0, 30.0, 59.9] {
            let mut w = window;
            w.opening_angle_deg = angle;
            let smoke = window_smoke(&w, SMOKE_EXHAUST_WINDOW_TYPE, 2.4, &profile);
            assert_eq!(smoke.effective_area_m2, 0.0);
        }
        for angle in [60.0, 75.0, 90.0] {
            let mut w = window;
            w.opening_angle_deg = angle;
            let smoke = window_smoke(&w, SMOKE_EXHAUST_WINDOW_TYPE, 2.4, &profile);
            assert_eq!(smoke.opening_factor, 1.0);
            assert_eq!(smoke.effective_area_m2, ungated);
        }

        // Other types use the ratio whatever the angle
        let other = window_smoke(&window_m(1.0, 0.5, 2.4, 10.0), "すべり出し窓", 2.4, &profile);
        assert_eq!(other.opening_factor, 0.25);
        assert_eq!(other.opening_angle_deg, None);
    }

    #[test]
    fn test_dedicated_window_trace_shows_angle() {
        let mut room = Room::new("廊下").with_floor_area("10");
        let window = room.add_window();
        window.window_type = SMOKE_EXHAUST_WINDOW_TYPE.to_string();
        window.height = FieldValue::from("500");
        window.top_edge_height = FieldValue::from("2400");
        window.width = FieldValue::from("1000");
        window.opening_angle = FieldValue::from("45");

        let result = compute_smoke_exhaust(&room, &room.windows, &Settings::default().window_types);
        assert!(!result.passes);
        assert_eq!(result.contributing_window_count, 0);
        assert_eq!(
            result.per_window_details[0].formula_trace.to_plain_text(),
            "(排煙有効面積: 0.50m²) × (排煙有効率: 0.00 @45°) = 0.000m²"
        );
        assert!(result.summary_text.contains("80cm以内"));
    }

    #[test]
    fn test_blank_angle_counts_as_closed() {
        let mut room = Room::new("階段").with_floor_area("5");
        let window = room.add_window();
        window.window_type = SMOKE_EXHAUST_WINDOW_TYPE.to_string();
        window.opening_angle = FieldValue::Empty;
        let result = compute_smoke_exhaust(&room, &room.windows, &Settings::default().window_types);
        assert_eq!(result.effective_area, 0.0);
    }

    #[test]
    fn test_zero_floor_area() {
        let room = Room::new("LDK").with_floor_area(0.0).with_window(Window::with_defaults(0));
        let result = compute_smoke_exhaust(&room, &room.windows, &Settings::default().window_types);
        assert_eq!(result.verdict, Verdict::MissingFloorArea);
        assert_eq!(result.required_area, 0.0);
        assert!(!result.passes);
        assert_eq!(result.contributing_window_count, 0);
    }
}
