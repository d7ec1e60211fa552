//! # Formula Trace
//!
//! Each per-window contribution carries the arithmetic that produced it as a
//! sequence of typed segments. A renderer styles segments by kind (a
//! coefficient from the settings table, a measured distance, a computed
//! number) without re-deriving any value.
//!
//! ## JSON Shape
//!
//! ```json
//! [
//!   { "type": "text", "value": "min(1, max(0, " },
//!   { "type": "coefficient", "value": "6" },
//!   { "type": "text", "value": " × " },
//!   { "type": "distance", "value": "2.50" }
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// One display fragment of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FormulaSegment {
    /// Literal text and operators
    Text(String),
    /// A coefficient taken from the settings tables (α, β, ratios)
    Coefficient(String),
    /// A measured length or area
    Distance(String),
    /// A computed result
    Number(String),
    /// The eaves reduction multiplier
    Eaves(String),
}

impl FormulaSegment {
    /// The display string carried by this segment
    pub fn value(&self) -> &str {
        match self {
            FormulaSegment::Text(s)
            | FormulaSegment::Coefficient(s)
            | FormulaSegment::Distance(s)
            | FormulaSegment::Number(s)
            | FormulaSegment::Eaves(s) => s,
        }
    }
}

/// Ordered sequence of formula segments for one window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaTrace {
    pub segments: Vec<FormulaSegment>,
}

impl FormulaTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append literal text
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.segments.push(FormulaSegment::Text(value.into()));
        self
    }

    /// Builder: append a coefficient
    pub fn coefficient(mut self, value: impl Into<String>) -> Self {
        self.segments.push(FormulaSegment::Coefficient(value.into()));
        self
    }

    /// Builder: append a distance or measured area
    pub fn distance(mut self, value: impl Into<String>) -> Self {
        self.segments.push(FormulaSegment::Distance(value.into()));
        self
    }

    /// Builder: append a computed number
    pub fn number(mut self, value: impl Into<String>) -> Self {
        self.segments.push(FormulaSegment::Number(value.into()));
        self
    }

    /// Builder: append the eaves multiplier
    pub fn eaves(mut self, value: impl Into<String>) -> Self {
        self.segments.push(FormulaSegment::Eaves(value.into()));
        self
    }

    /// Append all segments of another trace
    pub fn extend(mut self, other: FormulaTrace) -> Self {
        self.segments.extend(other.segments);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenate all segment values with no styling.
    pub fn to_plain_text(&self) -> String {
        self.segments.iter().map(FormulaSegment::value).collect()
    }
}

/// Format `value` with a fixed number of decimals.
///
/// Negative zero prints as zero, so a clamped `-0.0` never shows up as `-0.00`.
pub fn fixed(value: f64, decimals: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.*}", decimals, value)
}

impl std::fmt::Display for FormulaTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            f.write_str(segment.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_plain_text() {
        let trace = FormulaTrace::new()
            .text("(")
            .distance("1.82m²")
            .text(") × ")
            .coefficient("0.50")
            .text(" = ")
            .number("0.908m²");
        assert_eq!(trace.segments.len(), 6);
        assert_eq!(trace.to_plain_text(), "(1.82m²) × 0.50 = 0.908m²");
        assert_eq!(trace.to_string(), trace.to_plain_text());
    }

    #[test]
    fn test_fixed_formatting() {
        assert_eq!(fixed(1.815, 3), "1.815");
        assert_eq!(fixed(1.1, 2), "1.10");
        assert_eq!(fixed(-0.0, 2), "0.00");
        assert_eq!(fixed(13.24 / 7.0, 3), "1.891");
    }

    #[test]
    fn test_segment_json_shape() {
        let trace = FormulaTrace::new().coefficient("6").eaves(" × 0.9(軒)");
        let json = serde_json::to_string(&trace).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"coefficient","value":"6"},{"type":"eaves","value":" × 0.9(軒)"}]"#
        );
        let roundtrip: FormulaTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, trace);
    }
}
