//! Text and compact JSON rendering of compliance reports.

use std::fmt::Write;

use musou_core::trace::fixed;
use musou_core::{ComplianceReport, Metric, MetricResult, Verdict};
use serde::Serialize;
use uuid::Uuid;

fn status_icon(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Compliant => "[OK]",
        Verdict::Deficient => "[NG]",
        Verdict::MissingFloorArea => "[--]",
    }
}

/// One mark per metric, e.g. `採光[NG] 換気[OK] 排煙[OK]`
pub fn verdict_marks(report: &ComplianceReport) -> String {
    report
        .metrics()
        .into_iter()
        .map(|m| format!("{}{}", m.metric.display_name(), status_icon(m.verdict)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable report.
///
/// Each window shows its one-line formula; `detailed` adds the full trace.
pub fn report_text(report: &ComplianceReport, detailed: bool) -> String {
    let mut out = String::new();
    let name = if report.room_name.trim().is_empty() {
        "(名称未設定)"
    } else {
        report.room_name.as_str()
    };
    let _ = writeln!(out, "■ {}", name);
    for metric in report.metrics() {
        write_metric(&mut out, metric, detailed);
    }
    let _ = writeln!(out);
    out
}

fn write_metric(out: &mut String, result: &MetricResult, detailed: bool) {
    let _ = write!(out, "  {}  {}", result.metric.display_name(), status_icon(result.verdict));
    if result.verdict != Verdict::MissingFloorArea {
        let _ = write!(
            out,
            "  有効 {}㎡ / 必要 {}㎡",
            fixed(result.effective_area, 3),
            fixed(result.required_area, 3)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "      {}", result.summary_text);

    for detail in &result.per_window_details {
        let _ = writeln!(out, "      - {}: {}", detail.name, detail.simple_formula);
        if detailed {
            let _ = writeln!(out, "          {}", detail.formula_trace);
        }
    }
}

#[derive(Serialize)]
pub struct CompactReport<'a> {
    room_id: Uuid,
    room_name: &'a str,
    passes_all: bool,
    metrics: Vec<CompactMetric<'a>>,
}

#[derive(Serialize)]
struct CompactMetric<'a> {
    metric: Metric,
    verdict: Verdict,
    required_area: f64,
    effective_area: f64,
    contributing_window_count: usize,
    summary_text: &'a str,
}

/// Reports without the per-window breakdown.
pub fn compact_json(reports: &[ComplianceReport]) -> Vec<CompactReport<'_>> {
    reports
        .iter()
        .map(|report| CompactReport {
            room_id: report.room_id,
            room_name: &report.room_name,
            passes_all: report.passes_all(),
            metrics: report
                .metrics()
                .into_iter()
                .map(|m| CompactMetric {
                    metric: m.metric,
                    verdict: m.verdict,
                    required_area: m.required_area,
                    effective_area: m.effective_area,
                    contributing_window_count: m.contributing_window_count,
                    summary_text: &m.summary_text,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use musou_core::{compute_compliance_report, Room, Settings, Window};

    fn bedroom_report() -> ComplianceReport {
        let room = Room::new("1F 寝室")
            .with_floor_area("13.24")
            .with_window(Window::with_defaults(0));
        compute_compliance_report(&room, &Settings::default())
    }

    #[test]
    fn test_verdict_marks() {
        assert_eq!(verdict_marks(&bedroom_report()), "採光[NG] 換気[OK] 排煙[OK]");
    }

    #[test]
    fn test_report_text() {
        let text = report_text(&bedroom_report(), false);
        assert!(text.starts_with("■ 1F 寝室\n"));
        assert!(text.contains("  採光  [NG]  有効 1.815㎡ / 必要 1.891㎡"));
        assert!(text.contains("      - 窓 1: (1.65m × 1.10m) × 1.00 = 1.815 m²"));
        assert!(!text.contains("min(1, max(0,"));

        let detailed = report_text(&bedroom_report(), true);
        assert!(detailed.contains("min(1, max(0, 6 × 2.50 / 0.40 - 1.4)) = 1.00"));
    }

    #[test]
    fn test_missing_floor_area_text() {
        let room = Room::new("").with_window(Window::with_defaults(0));
        let text = report_text(&compute_compliance_report(&room, &Settings::default()), false);
        assert!(text.starts_with("■ (名称未設定)\n"));
        assert!(text.contains("  換気  [--]\n      床面積を入力してください。"));
    }

    #[test]
    fn test_compact_json_drops_details() {
        let reports = vec![bedroom_report()];
        let json = serde_json::to_string(&compact_json(&reports)).unwrap();
        assert!(json.contains("\"passes_all\":false"));
        assert!(json.contains("\"verdict\":\"Deficient\""));
        assert!(!json.contains("per_window_details"));
    }
}
