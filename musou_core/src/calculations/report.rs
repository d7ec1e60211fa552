//! # Compliance Report
//!
//! Runs all three metrics over a room in one pass. Zoning coefficients are
//! resolved once per room and each window's type profile once per window, so
//! a missing table entry logs a single warning rather than one per metric.
//!
//! ## Example
//!
//! ```rust
//! use musou_core::calculations::compute_compliance_report;
//! use musou_core::room::{Room, Window};
//! use musou_core::settings::Settings;
//!
//! let room = Room::new("1F 寝室")
//!     .with_floor_area("13.24")
//!     .with_window(Window::with_defaults(0))
//!     .with_window(Window::with_defaults(1));
//!
//! let report = compute_compliance_report(&room, &Settings::default());
//! assert!(report.lighting.passes);
//! assert!(report.ventilation.passes);
//! assert!(report.smoke.passes);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::lighting::{lighting_contribution, required_area};
use super::smoke::{smoke_contribution, SMOKE_EXHAUST_DIVISOR};
use super::ventilation::{ventilation_contribution, VENTILATION_DIVISOR};
use super::{Metric, MetricResult};
use crate::room::Room;
use crate::settings::Settings;

/// All three metric results for one room.
///
/// Derived data: recomputed from the room and settings, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub room_id: Uuid,
    pub room_name: String,
    pub lighting: MetricResult,
    pub ventilation: MetricResult,
    pub smoke: MetricResult,
}

impl ComplianceReport {
    /// Every metric is compliant
    pub fn passes_all(&self) -> bool {
        self.lighting.passes && self.ventilation.passes && self.smoke.passes
    }

    /// Results in display order: lighting, ventilation, smoke exhaust
    pub fn metrics(&self) -> [&MetricResult; 3] {
        [&self.lighting, &self.ventilation, &self.smoke]
    }

    pub fn metric(&self, metric: Metric) -> &MetricResult {
        match metric {
            Metric::Lighting => &self.lighting,
            Metric::Ventilation => &self.ventilation,
            Metric::SmokeExhaust => &self.smoke,
        }
    }
}

/// Compute the full report for `room` under `settings`.
pub fn compute_compliance_report(room: &Room, settings: &Settings) -> ComplianceReport {
    let dims = room.normalized();

    if dims.missing_floor_area() {
        debug!(room = %room.name, "floor area missing, skipping window calculations");
        return ComplianceReport {
            room_id: room.id,
            room_name: room.name.clone(),
            lighting: MetricResult::missing_floor_area(Metric::Lighting),
            ventilation: MetricResult::missing_floor_area(Metric::Ventilation),
            smoke: MetricResult::missing_floor_area(Metric::SmokeExhaust),
        };
    }

    let coefficients = settings.zoning_coefficients.resolve(&room.zoning_district);

    let window_count = room.windows.len();
    let mut lighting = Vec::with_capacity(window_count);
    let mut ventilation = Vec::with_capacity(window_count);
    let mut smoke = Vec::with_capacity(window_count);

    for window in &room.windows {
        let profile = settings.window_types.resolve(&window.window_type);
        lighting.push(lighting_contribution(
            window,
            &dims,
            &coefficients,
            &profile,
            settings.eaves_reduction_factor,
        ));
        ventilation.push(ventilation_contribution(window, &profile));
        smoke.push(smoke_contribution(window, dims.ceiling_height_m, &profile));
    }

    let report = ComplianceReport {
        room_id: room.id,
        room_name: room.name.clone(),
        lighting: MetricResult::assemble(
            Metric::Lighting,
            &dims,
            required_area(dims.floor_area_m2, &room.room_use, &settings.room_use_divisors),
            lighting,
        ),
        ventilation: MetricResult::assemble(
            Metric::Ventilation,
            &dims,
            dims.floor_area_m2 / VENTILATION_DIVISOR,
            ventilation,
        ),
        smoke: MetricResult::assemble(
            Metric::SmokeExhaust,
            &dims,
            dims.floor_area_m2 / SMOKE_EXHAUST_DIVISOR,
            smoke,
        ),
    };

    debug!(
        room = %room.name,
        windows = window_count,
        lighting = report.lighting.passes,
        ventilation = report.ventilation.passes,
        smoke = report.smoke.passes,
        "compliance report computed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::{compute_lighting, compute_smoke_exhaust, compute_ventilation, Verdict};
    use crate::room::Window;
    use crate::settings::WindowTypeProfile;
    use crate::units::FieldValue;

    fn window(name: &str, window_type: &str, width: &str, height: &str, top_edge: &str, front: &str) -> Window {
        let mut window = Window::with_defaults(0);
        window.name = name.to_string();
        window.window_type = window_type.to_string();
        window.width = FieldValue::from(width);
        window.height = FieldValue::from(height);
        window.top_edge_height = FieldValue::from(top_edge);
        window.front_distance = FieldValue::from(front);
        window
    }

    fn mixed_room() -> Room {
        let mut eaves = window("南", "引違い窓", "1650", "1100", "2000", "2500");
        eaves.apply_eaves_reduction = true;
        let mut dedicated = window("排煙", "排煙専用窓", "600", "400", "2400", "900");
        dedicated.opening_angle = FieldValue::from("75");

        Room::new("2F 洋室")
            .with_floor_area("16.5")
            .with_window(eaves)
            .with_window(window("東", "すべり出し窓", "740", "970", "2000", "1200"))
            .with_window(window("FIX", "FIX窓", "1690", "500", "2300", "8000"))
            .with_window(window("天窓", "トップライト", "780", "780", "2400", "0"))
            .with_window(dedicated)
    }

    #[test]
    fn test_bedroom_scenario() {
        let room = Room::new("1F 寝室")
            .with_floor_area("13.24")
            .with_ceiling_height("2400")
            .with_window(Window::with_defaults(0));
        let report = compute_compliance_report(&room, &Settings::default());

        assert!((report.lighting.effective_area - 1.815).abs() < 1e-9);
        assert!((report.lighting.required_area - 1.891).abs() < 1e-3);
        assert!(!report.lighting.passes);
        assert!(report.ventilation.passes);
        assert!(report.smoke.passes);
        assert!(!report.passes_all());
        assert_eq!(report.room_name, "1F 寝室");
        assert_eq!(report.room_id, room.id);
    }

    #[test]
    fn test_matches_individual_metrics() {
        let settings = Settings::default();
        let room = mixed_room();
        let report = compute_compliance_report(&room, &settings);

        let lighting = compute_lighting(
            &room,
            &room.windows,
            &settings.zoning_coefficients,
            &settings.room_use_divisors,
            &settings.window_types,
            settings.eaves_reduction_factor,
        );
        let ventilation = compute_ventilation(&room, &room.windows, &settings.window_types);
        let smoke = compute_smoke_exhaust(&room, &room.windows, &settings.window_types);

        assert_eq!(report.lighting, lighting);
        assert_eq!(report.ventilation, ventilation);
        assert_eq!(report.smoke, smoke);
    }

    #[test]
    fn test_details_follow_window_order() {
        let room = mixed_room();
        let report = compute_compliance_report(&room, &Settings::default());
        for metric in report.metrics() {
            let names: Vec<&str> = metric.per_window_details.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, ["南", "東", "FIX", "天窓", "排煙"]);
        }
        // Toplight: 0.78 × 0.78 × 3
        let toplight = &report.lighting.per_window_details[3];
        assert!((toplight.effective_area - 0.78 * 0.78 * 3.0).abs() < 1e-9);
        // FIX windows never ventilate or exhaust smoke
        assert_eq!(report.ventilation.per_window_details[2].effective_area, 0.0);
        assert_eq!(report.smoke.per_window_details[2].effective_area, 0.0);
    }

    #[test]
    fn test_window_order_independence() {
        let settings = Settings::default();
        let room = mixed_room();
        let baseline = compute_compliance_report(&room, &settings);

        let permutations: [[usize; 5]; 4] = [[4, 3, 2, 1, 0], [1, 0, 3, 4, 2], [2, 4, 0, 3, 1], [3, 1, 4, 0, 2]];
        for order in permutations {
            let mut shuffled = room.clone();
            shuffled.windows = order.iter().map(|&i| room.windows[i].clone()).collect();
            let report = compute_compliance_report(&shuffled, &settings);
            for metric in Metric::ALL {
                let (a, b) = (baseline.metric(metric), report.metric(metric));
                assert_eq!(a.effective_area.to_bits(), b.effective_area.to_bits(), "{} {:?}", metric, order);
                assert_eq!(a.passes, b.passes);
                assert_eq!(a.contributing_window_count, b.contributing_window_count);
            }
        }
    }

    #[test]
    fn test_zero_floor_area_for_all_metrics() {
        let room = mixed_room().with_floor_area("0");
        let report = compute_compliance_report(&room, &Settings::default());
        for metric in report.metrics() {
            assert_eq!(metric.required_area, 0.0);
            assert_eq!(metric.effective_area, 0.0);
            assert!(!metric.passes);
            assert_eq!(metric.verdict, Verdict::MissingFloorArea);
            assert_eq!(metric.summary_text, "床面積を入力してください。");
        }
    }

    #[test]
    fn test_deterministic_output() {
        let settings = Settings::default();
        let room = mixed_room();
        let first = serde_json::to_string(&compute_compliance_report(&room, &settings)).unwrap();
        let second = serde_json::to_string(&compute_compliance_report(&room, &settings)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_configuration_fails_closed() {
        let mut room = mixed_room();
        room.zoning_district = "存在しない地域".to_string();
        room.room_use = "存在しない用途".to_string();
        for window in &mut room.windows {
            window.window_type = "存在しない窓".to_string();
        }
        let report = compute_compliance_report(&room, &Settings::default());

        // Unknown types have no ratios and are not toplights; unknown
        // districts give k = 0
        for metric in report.metrics() {
            assert_eq!(metric.effective_area, 0.0);
            assert!(!metric.passes);
            assert_eq!(metric.verdict, Verdict::Deficient);
        }
        assert!((report.lighting.required_area - 16.5 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_profile_is_used_by_every_metric() {
        let mut settings = Settings::default();
        settings
            .set_window_type("ガラリ", WindowTypeProfile::operable(0.3, 0.2))
            .unwrap();
        let room = Room::new("納戸")
            .with_floor_area("3")
            .with_window(window("ガラリ", "ガラリ", "1000", "1000", "2400", "8000"));
        let report = compute_compliance_report(&room, &settings);

        // Beyond D = 7 m, so k = 1
        assert!((report.lighting.effective_area - 1.0).abs() < 1e-9);
        assert!((report.ventilation.effective_area - 0.3).abs() < 1e-9);
        // Overlap [1.6, 2.4] = 0.8 m → 1.0 × 0.8 × 0.2
        assert!((report.smoke.effective_area - 0.16).abs() < 1e-9);
    }
}
