//! Summary texts shown under each metric.
//!
//! A failing metric names the concrete remedy: larger openings or more
//! frontage clearance for lighting, more operable openings for ventilation,
//! openings within the 800 mm ceiling band for smoke exhaust.

use super::Metric;
use crate::trace::fixed;

pub const MISSING_FLOOR_AREA: &str = "床面積を入力してください。";

pub const LIGHTING_DEFICIENT: &str =
    "有効採光面積が不足しています。窓を大きくするか、前面の空地を広く確保する必要があります。";

pub const VENTILATION_DEFICIENT: &str =
    "換気に有効な開口面積が不足しています。開放できる窓を追加または変更してください。";

pub const SMOKE_EXHAUST_DEFICIENT: &str =
    "有効な排煙開口が不足しています。天井から80cm以内のゾーンに開放できる窓を設置してください。";

/// Pick the template for `metric` and fill in the numbers.
pub fn summary_text(
    metric: Metric,
    passes: bool,
    effective_area: f64,
    required_area: f64,
    window_count: usize,
    contributing_window_count: usize,
) -> String {
    match (metric, passes) {
        (Metric::Lighting, true) => format!(
            "有効採光面積{}㎡で、必要面積{}㎡を満たしています。",
            fixed(effective_area, 3),
            fixed(required_area, 3)
        ),
        (Metric::Lighting, false) => LIGHTING_DEFICIENT.to_string(),
        (Metric::Ventilation, true) => format!("{}つの窓で十分な開口が確保できています。", window_count),
        (Metric::Ventilation, false) => VENTILATION_DEFICIENT.to_string(),
        (Metric::SmokeExhaust, true) => format!(
            "排煙ゾーンにかかる窓が{}箇所あり、有効排煙面積{}㎡を確保できています。",
            contributing_window_count,
            fixed(effective_area, 3)
        ),
        (Metric::SmokeExhaust, false) => SMOKE_EXHAUST_DEFICIENT.to_string(),
    }
}
