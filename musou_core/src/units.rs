//! # Units and Field Normalization
//!
//! Form fields arrive as whatever the user typed: a number, a string, or
//! nothing at all. This module turns them into meter-based `f64` values.
//!
//! ## Conventions
//!
//! - Lengths are entered in millimeters (mm) and computed in meters (m)
//! - Floor area is entered directly in square meters (m²)
//! - Opening angles are in degrees and pass through unconverted
//! - Anything empty, unparseable or non-finite normalizes to `0.0`
//!
//! ## Example
//!
//! ```rust
//! use musou_core::units::{FieldValue, Meters, Millimeters};
//!
//! let width = FieldValue::from("1650");
//! assert_eq!(width.to_f64(), 1650.0);
//! assert_eq!(width.mm_to_m(), 1.65);
//!
//! let m: Meters = Millimeters(2400.0).into();
//! assert_eq!(m.0, 2.4);
//!
//! // Partially filled forms still produce numbers
//! assert_eq!(FieldValue::from("").to_f64(), 0.0);
//! assert_eq!(FieldValue::from("2400mm").to_f64(), 2400.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Mul;

// ============================================================================
// Raw Field Values
// ============================================================================

/// A numeric field as entered in a form.
///
/// Serializes as a bare JSON number, string or `null`, so records saved from a
/// half-filled form round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A number typed directly (e.g., from a JSON API)
    Number(f64),
    /// Text from an input box, possibly empty or malformed
    Text(String),
    /// Field left blank
    #[default]
    Empty,
}

impl FieldValue {
    /// Parse the field as a plain number; invalid input yields `0.0`.
    pub fn to_f64(&self) -> f64 {
        let value = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(text) => parse_leading_number(text).unwrap_or(0.0),
            FieldValue::Empty => 0.0,
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Interpret the field as millimeters and convert to meters.
    pub fn mm_to_m(&self) -> f64 {
        Meters::from(Millimeters(self.to_f64())).0
    }

    /// True when nothing usable was entered.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Number(n) => !n.is_finite(),
            FieldValue::Text(text) => parse_leading_number(text).is_none(),
            FieldValue::Empty => true,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Empty => Ok(()),
        }
    }
}

/// Parse the longest decimal literal at the start of `text`.
///
/// Leading whitespace is skipped and trailing garbage ignored, so `" 2400mm"`
/// reads as 2400. Returns `None` when no digits are found.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits + (frac_end - frac_start) > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}

// ============================================================================
// Length and Area Units
// ============================================================================

/// Length in millimeters (as entered on drawings and forms)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Millimeters(pub f64);

/// Length in meters (used by every formula)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Meters(pub f64);

/// Area in square meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SquareMeters(pub f64);

impl From<Millimeters> for Meters {
    fn from(mm: Millimeters) -> Self {
        Meters(mm.0 / 1000.0)
    }
}

impl Mul for Meters {
    type Output = SquareMeters;
    fn mul(self, rhs: Meters) -> SquareMeters {
        SquareMeters(self.0 * rhs.0)
    }
}

impl SquareMeters {
    pub fn value(self) -> f64 {
        self.0
    }
}
