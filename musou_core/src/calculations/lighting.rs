//! # Lighting (採光)
//!
//! Effective daylight area of each window and the room's required area.
//!
//! ## Formula
//!
//! ```text
//! A_w  = W × H
//! h    = ceiling height − top edge height           (daylight height)
//!
//! k    = 1.0                                        if d > D
//!      = clamp(α × d / h − β, 0, 1)                 if h > 0 and d > 0
//!      = 0.0                                        otherwise
//! k    = k × eaves factor                           if eaves reduction applies
//!
//! A_e  = A_w × k
//! A_e  = A_w × 3.0                                  for toplights (no k)
//!
//! required = floor area / N                         (N by room use, default 7)
//! ```
//!
//! The eaves factor multiplies the already-clamped `k`, so it can lower a
//! full 1.0 credit but never lifts a zero one.
//!
//! ## Example
//!
//! ```rust
//! use musou_core::calculations::lighting::compute_lighting;
//! use musou_core::room::{Room, Window};
//! use musou_core::settings::Settings;
//!
//! let settings = Settings::default();
//! let room = Room::new("1F 寝室")
//!     .with_floor_area("13.24")
//!     .with_window(Window::with_defaults(0));
//!
//! let result = compute_lighting(
//!     &room,
//!     &room.windows,
//!     &settings.zoning_coefficients,
//!     &settings.room_use_divisors,
//!     &settings.window_types,
//!     settings.eaves_reduction_factor,
//! );
//! assert!((result.effective_area - 1.815).abs() < 1e-9);
//! assert!(!result.passes);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Metric, MetricResult, WindowContribution};
use crate::room::{NormalizedRoom, NormalizedWindow, Room, Window};
use crate::settings::{RoomUseTable, WindowTypeProfile, WindowTypeTable, ZoningCoefficients, ZoningTable};
use crate::trace::{fixed, FormulaTrace};

/// Fixed lighting coefficient for toplights
pub const TOPLIGHT_COEFFICIENT: f64 = 3.0;

/// Which branch produced the correction factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionCase {
    /// Toplight: fixed coefficient, no correction factor
    Toplight,
    /// Frontage distance beyond the district threshold: k = 1
    BeyondThreshold,
    /// Formula α·d/h − β, clamped to [0, 1]
    Formula,
    /// Window at or above the ceiling, or no frontage distance: k = 0
    NoCredit,
}

/// Correction factor for a non-toplight window, before any eaves reduction.
///
/// Always in `[0, 1]`. A NaN from a corrupted coefficient clamps to 0.
pub fn correction_factor(
    coefficients: &ZoningCoefficients,
    front_distance_m: f64,
    daylight_height_m: f64,
) -> (CorrectionCase, f64) {
    if front_distance_m > coefficients.threshold_distance {
        (CorrectionCase::BeyondThreshold, 1.0)
    } else if daylight_height_m > 0.0 && front_distance_m > 0.0 {
        let raw = coefficients.alpha * front_distance_m / daylight_height_m - coefficients.beta;
        (CorrectionCase::Formula, raw.max(0.0).min(1.0))
    } else {
        (CorrectionCase::NoCredit, 0.0)
    }
}

/// Lighting figures for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowLighting {
    /// Physical area W × H (m²)
    pub window_area_m2: f64,

    pub case: CorrectionCase,

    /// Ceiling height minus top edge height (m); 0 for toplights
    pub daylight_height_m: f64,

    /// Clamped correction factor before eaves reduction (the fixed
    /// coefficient for toplights)
    pub correction_factor: f64,

    /// Eaves multiplier, when applied
    pub eaves_factor: Option<f64>,

    /// Credited daylight area (m²)
    pub effective_area_m2: f64,

    pub simple_formula: String,

    pub formula_trace: FormulaTrace,
}

/// Effective lighting area of one window.
///
/// # Arguments
///
/// * `window` - Window geometry in meters
/// * `ceiling_height_m` - Room ceiling height (m)
/// * `coefficients` - The room's zoning district coefficients
/// * `profile` - The window's type profile (only `is_toplight` is read)
/// * `eaves_reduction_factor` - Multiplier used when the eaves flag is set
pub fn window_lighting(
    window: &NormalizedWindow,
    ceiling_height_m: f64,
    coefficients: &ZoningCoefficients,
    profile: &WindowTypeProfile,
    eaves_reduction_factor: f64,
) -> WindowLighting {
    let w = fixed(window.width_m, 2);
    let h = fixed(window.height_m, 2);
    let window_area_m2 = window.area_m2();

    if profile.is_toplight {
        let effective_area_m2 = window_area_m2 * TOPLIGHT_COEFFICIENT;
        let simple_formula = format!(
            "({}m × {}m) × {} = {} m²",
            w,
            h,
            fixed(TOPLIGHT_COEFFICIENT, 2),
            fixed(effective_area_m2, 3)
        );
        let formula_trace = FormulaTrace::new()
            .text("(")
            .distance(w)
            .text(" × ")
            .distance(h)
            .text(") × ")
            .number(fixed(TOPLIGHT_COEFFICIENT, 1))
            .text(format!(" (トップライト) = {} m²", fixed(effective_area_m2, 3)));

        return WindowLighting {
            window_area_m2,
            case: CorrectionCase::Toplight,
            daylight_height_m: 0.0,
            correction_factor: TOPLIGHT_COEFFICIENT,
            eaves_factor: None,
            effective_area_m2,
            simple_formula,
            formula_trace,
        };
    }

    let daylight_height_m = ceiling_height_m - window.top_edge_height_m;
    let d = window.front_distance_m;
    let (case, factor) = correction_factor(coefficients, d, daylight_height_m);

    let factor_trace = match case {
        CorrectionCase::BeyondThreshold => FormulaTrace::new()
            .text("d(")
            .distance(fixed(d, 2))
            .text(") > D(")
            .coefficient(fixed(coefficients.threshold_distance, 2))
            .text(") ⇒ ")
            .number("1.0"),
        CorrectionCase::Formula => FormulaTrace::new()
            .text("min(1, max(0, ")
            .coefficient(coefficients.alpha.to_string())
            .text(" × ")
            .distance(fixed(d, 2))
            .text(" / ")
            .distance(fixed(daylight_height_m, 2))
            .text(" - ")
            .coefficient(coefficients.beta.to_string())
            .text(")) = ")
            .number(fixed(factor, 2)),
        CorrectionCase::NoCredit | CorrectionCase::Toplight => FormulaTrace::new().text("0.00"),
    };

    let eaves_factor = window.apply_eaves_reduction.then_some(eaves_reduction_factor);
    let reduced_factor = factor * eaves_factor.unwrap_or(1.0);
    let effective_area_m2 = window_area_m2 * reduced_factor;

    let eaves_text = eaves_factor
        .map(|f| format!(" × {}(軒)", f))
        .unwrap_or_default();
    let simple_formula = format!(
        "({}m × {}m) × {}{} = {} m²",
        w,
        h,
        fixed(factor, 2),
        eaves_text,
        fixed(effective_area_m2, 3)
    );

    let mut formula_trace = FormulaTrace::new()
        .text("(")
        .distance(w)
        .text(" × ")
        .distance(h)
        .text(") × [")
        .extend(factor_trace)
        .text("]");
    if !eaves_text.is_empty() {
        formula_trace = formula_trace.eaves(eaves_text);
    }
    let formula_trace = formula_trace.text(format!(" = {} m²", fixed(effective_area_m2, 3)));

    WindowLighting {
        window_area_m2,
        case,
        daylight_height_m,
        correction_factor: factor,
        eaves_factor,
        effective_area_m2,
        simple_formula,
        formula_trace,
    }
}

pub(crate) fn lighting_contribution(
    window: &Window,
    room: &NormalizedRoom,
    coefficients: &ZoningCoefficients,
    profile: &WindowTypeProfile,
    eaves_reduction_factor: f64,
) -> WindowContribution {
    let lighting = window_lighting(
        &window.normalized(),
        room.ceiling_height_m,
        coefficients,
        profile,
        eaves_reduction_factor,
    );
    WindowContribution::new(
        window,
        lighting.effective_area_m2,
        lighting.simple_formula,
        lighting.formula_trace,
    )
}

/// Required lighting area: floor area / room use divisor.
pub fn required_area(floor_area_m2: f64, room_use: &str, room_use_divisors: &RoomUseTable) -> f64 {
    floor_area_m2 / room_use_divisors.resolve(room_use)
}

/// Lighting result for a room.
///
/// Unknown districts credit no window (see
/// [`ZoningCoefficients::UNRESOLVED`]); unknown room uses divide by 7.
pub fn compute_lighting(
    room: &Room,
    windows: &[Window],
    zoning_coefficients: &ZoningTable,
    room_use_divisors: &RoomUseTable,
    window_types: &WindowTypeTable,
    eaves_reduction_factor: f64,
) -> MetricResult {
    let dims = room.normalized();
    if dims.missing_floor_area() {
        return MetricResult::missing_floor_area(Metric::Lighting);
    }

    let coefficients = zoning_coefficients.resolve(&room.zoning_district);
    let required = required_area(dims.floor_area_m2, &room.room_use, room_use_divisors);
    let details = windows
        .iter()
        .map(|window| {
            let profile = window_types.resolve(&window.window_type);
            lighting_contribution(window, &dims, &coefficients, &profile, eaves_reduction_factor)
        })
        .collect();

    let result = MetricResult::assemble(Metric::Lighting, &dims, required, details);
    debug!(
        room = %room.name,
        required = result.required_area,
        effective = result.effective_area,
        passes = result.passes,
        "lighting computed"
    );
    result
}
