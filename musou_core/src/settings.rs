//! # Settings
//!
//! Coefficient tables consumed by the compliance engine.
//!
//! ```text
//! Settings
//! ├── zoning_coefficients: district  → { alpha, beta, threshold_distance }
//! ├── window_types:        type name → { ventilation_ratio, smoke_ratio, is_operable, is_toplight }
//! ├── room_use_divisors:   room use  → N   (required lighting area = floor area / N)
//! └── eaves_reduction_factor
//! ```
//!
//! ## Fallbacks
//!
//! A lookup that misses never fails. Each table documents the profile it
//! returns instead, and every fallback under-credits the window so a stale
//! settings record reports non-compliance rather than a false pass:
//!
//! | Table | Fallback |
//! |-------|----------|
//! | `room_use_divisors` | [`DEFAULT_ROOM_USE_DIVISOR`] (7) |
//! | `window_types` | [`WindowTypeProfile::UNRESOLVED`] (all ratios 0) |
//! | `zoning_coefficients` | [`ZoningCoefficients::UNRESOLVED`] (correction factor always 0) |
//!
//! ## Example
//!
//! ```rust
//! use musou_core::settings::Settings;
//!
//! let settings = Settings::default();
//! assert_eq!(settings.room_use_divisors.resolve("学校の教室"), 5.0);
//! assert_eq!(settings.room_use_divisors.resolve("倉庫"), 7.0);
//! assert!(settings.window_types.resolve("トップライト").is_toplight);
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{CalcError, CalcResult};

/// Divisor used when a room use is not in the table (the common 1/7 rule)
pub const DEFAULT_ROOM_USE_DIVISOR: f64 = 7.0;

/// Window type that is gated by opening angle instead of its table ratio
pub const SMOKE_EXHAUST_WINDOW_TYPE: &str = "排煙専用窓";

/// Window type that receives the fixed toplight lighting coefficient by default
pub const TOPLIGHT_WINDOW_TYPE: &str = "トップライト";

/// District assigned to newly created rooms
pub const DEFAULT_ZONING_DISTRICT: &str = "第1種/第2種住居地域";

/// Room use assigned to newly created rooms
pub const DEFAULT_ROOM_USE: &str = "住宅の居室";

/// Window type assigned to newly created windows
pub const DEFAULT_WINDOW_TYPE: &str = "引違い窓";

/// Is `window_type` the smoke-dedicated type?
pub fn is_smoke_exhaust_type(window_type: &str) -> bool {
    window_type == SMOKE_EXHAUST_WINDOW_TYPE
}

// ============================================================================
// Zoning
// ============================================================================

/// Lighting correction coefficients for one zoning district.
///
/// The correction factor is `alpha × d / h − beta`, clamped to `[0, 1]`,
/// unless the frontage distance `d` exceeds `threshold_distance` (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoningCoefficients {
    pub alpha: f64,
    pub beta: f64,
    #[serde(alias = "D")]
    pub threshold_distance: f64,
}

impl ZoningCoefficients {
    /// Profile for an unknown district. The infinite threshold means no window
    /// takes the unconstrained shortcut, and `alpha = 0` drives the clamped
    /// factor to zero.
    pub const UNRESOLVED: ZoningCoefficients = ZoningCoefficients {
        alpha: 0.0,
        beta: 0.0,
        threshold_distance: f64::INFINITY,
    };

    pub const fn new(alpha: f64, beta: f64, threshold_distance: f64) -> Self {
        ZoningCoefficients {
            alpha,
            beta,
            threshold_distance,
        }
    }

    /// Check the ranges `alpha > 0`, `beta ≥ 0`, `threshold_distance > 0`.
    pub fn validate(&self, district: &str) -> CalcResult<()> {
        if !is_positive(self.alpha) {
            return Err(CalcError::invalid_input(
                format!("zoning_coefficients.{}.alpha", district),
                self.alpha.to_string(),
                "Alpha must be positive",
            ));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(CalcError::invalid_input(
                format!("zoning_coefficients.{}.beta", district),
                self.beta.to_string(),
                "Beta cannot be negative",
            ));
        }
        if !is_positive(self.threshold_distance) {
            return Err(CalcError::invalid_input(
                format!("zoning_coefficients.{}.threshold_distance", district),
                self.threshold_distance.to_string(),
                "Threshold distance must be positive",
            ));
        }
        Ok(())
    }
}

/// District name → coefficients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoningTable(pub BTreeMap<String, ZoningCoefficients>);

impl ZoningTable {
    /// Look up a district, falling back to [`ZoningCoefficients::UNRESOLVED`].
    pub fn resolve(&self, district: &str) -> ZoningCoefficients {
        match self.0.get(district) {
            Some(coefficients) => *coefficients,
            None => {
                warn!(district, "unknown zoning district, lighting correction falls back to 0");
                ZoningCoefficients::UNRESOLVED
            }
        }
    }

    pub fn get(&self, district: &str) -> Option<&ZoningCoefficients> {
        self.0.get(district)
    }

    pub fn insert(&mut self, district: impl Into<String>, coefficients: ZoningCoefficients) {
        self.0.insert(district.into(), coefficients);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// Window Types
// ============================================================================

/// Opening ratios and flags for one window type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowTypeProfile {
    /// Share of the window area credited for ventilation
    #[serde(alias = "ventilation")]
    pub ventilation_ratio: f64,

    /// Share of the in-zone area credited for smoke exhaust
    #[serde(alias = "smoke")]
    pub smoke_ratio: f64,

    /// Whether the window can be opened (informational)
    #[serde(default, alias = "isOpening")]
    pub is_operable: bool,

    /// Ceiling-mounted window using the fixed lighting coefficient
    #[serde(default, alias = "isToplight")]
    pub is_toplight: bool,
}

impl WindowTypeProfile {
    /// Profile for an unknown window type. Credits nothing.
    pub const UNRESOLVED: WindowTypeProfile = WindowTypeProfile {
        ventilation_ratio: 0.0,
        smoke_ratio: 0.0,
        is_operable: false,
        is_toplight: false,
    };

    pub const fn operable(ventilation_ratio: f64, smoke_ratio: f64) -> Self {
        WindowTypeProfile {
            ventilation_ratio,
            smoke_ratio,
            is_operable: true,
            is_toplight: false,
        }
    }

    pub const fn fixed() -> Self {
        WindowTypeProfile::UNRESOLVED
    }

    pub const fn toplight() -> Self {
        WindowTypeProfile {
            is_toplight: true,
            ..WindowTypeProfile::UNRESOLVED
        }
    }

    /// Check that both ratios lie in `[0, 1]`.
    pub fn validate(&self, type_name: &str) -> CalcResult<()> {
        for (field, ratio) in [
            ("ventilation_ratio", self.ventilation_ratio),
            ("smoke_ratio", self.smoke_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(CalcError::invalid_input(
                    format!("window_types.{}.{}", type_name, field),
                    ratio.to_string(),
                    "Ratio must be between 0 and 1",
                ));
            }
        }
        Ok(())
    }
}

/// Window type name → profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowTypeTable(pub BTreeMap<String, WindowTypeProfile>);

impl WindowTypeTable {
    /// Look up a window type, falling back to [`WindowTypeProfile::UNRESOLVED`].
    pub fn resolve(&self, window_type: &str) -> WindowTypeProfile {
        match self.0.get(window_type) {
            Some(profile) => *profile,
            None => {
                warn!(window_type, "unknown window type, all opening ratios fall back to 0");
                WindowTypeProfile::UNRESOLVED
            }
        }
    }

    pub fn get(&self, window_type: &str) -> Option<&WindowTypeProfile> {
        self.0.get(window_type)
    }

    pub fn insert(&mut self, window_type: impl Into<String>, profile: WindowTypeProfile) {
        self.0.insert(window_type.into(), profile);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// Room Uses
// ============================================================================

/// Room use → lighting divisor N.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomUseTable(pub BTreeMap<String, f64>);

impl RoomUseTable {
    /// Look up a room use, falling back to [`DEFAULT_ROOM_USE_DIVISOR`].
    ///
    /// Non-positive stored divisors are treated as missing.
    pub fn resolve(&self, room_use: &str) -> f64 {
        match self.0.get(room_use) {
            Some(divisor) if is_positive(*divisor) => *divisor,
            _ => {
                warn!(room_use, "unknown room use, lighting divisor falls back to 7");
                DEFAULT_ROOM_USE_DIVISOR
            }
        }
    }

    pub fn get(&self, room_use: &str) -> Option<f64> {
        self.0.get(room_use).copied()
    }

    pub fn insert(&mut self, room_use: impl Into<String>, divisor: f64) {
        self.0.insert(room_use.into(), divisor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// Settings
// ============================================================================

static DEFAULT_SETTINGS: Lazy<Settings> = Lazy::new(|| {
    let mut zoning = ZoningTable::default();
    zoning.insert("第1種/第2種低層住居専用地域", ZoningCoefficients::new(6.0, 1.4, 7.0));
    zoning.insert("第1種/第2種中高層住居専用地域", ZoningCoefficients::new(6.0, 1.4, 7.0));
    zoning.insert("第1種/第2種住居地域", ZoningCoefficients::new(6.0, 1.4, 7.0));
    zoning.insert("準住居地域", ZoningCoefficients::new(6.0, 1.4, 7.0));
    zoning.insert("近隣商業／商業地域", ZoningCoefficients::new(6.0, 1.2, 8.0));
    zoning.insert("準工業・工業・工業専用地域", ZoningCoefficients::new(8.0, 1.0, 5.0));
    zoning.insert("用途地域なし（無指定地域）", ZoningCoefficients::new(10.0, 1.0, 4.0));

    let mut window_types = WindowTypeTable::default();
    window_types.insert("引違い窓", WindowTypeProfile::operable(0.5, 0.5));
    window_types.insert("片開き窓", WindowTypeProfile::operable(1.0, 1.0));
    window_types.insert("すべり出し窓", WindowTypeProfile::operable(0.5, 0.5));
    window_types.insert("FIX窓", WindowTypeProfile::fixed());
    window_types.insert(TOPLIGHT_WINDOW_TYPE, WindowTypeProfile::toplight());
    window_types.insert(SMOKE_EXHAUST_WINDOW_TYPE, WindowTypeProfile::operable(1.0, 1.0));

    let mut room_uses = RoomUseTable::default();
    room_uses.insert("住宅の居室", 7.0);
    room_uses.insert("学校の教室", 5.0);
    room_uses.insert("病院の病室", 7.0);
    room_uses.insert("その他の居室", 10.0);

    Settings {
        zoning_coefficients: zoning,
        window_types,
        room_use_divisors: room_uses,
        eaves_reduction_factor: 0.9,
    }
});

/// Coefficient tables for one compliance computation.
///
/// The engine reads a `Settings` value as an immutable snapshot; the only way
/// to change it is through the validated setters or
/// [`RoomBook::update_settings`](crate::project::RoomBook::update_settings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(alias = "zoningData")]
    pub zoning_coefficients: ZoningTable,

    #[serde(alias = "windowTypes")]
    pub window_types: WindowTypeTable,

    #[serde(alias = "roomUses")]
    pub room_use_divisors: RoomUseTable,

    #[serde(alias = "eavesReductionFactor")]
    pub eaves_reduction_factor: f64,
}

impl Default for Settings {
    fn default() -> Self {
        DEFAULT_SETTINGS.clone()
    }
}

impl Settings {
    /// Validate every table entry and the eaves factor.
    pub fn validate(&self) -> CalcResult<()> {
        for (district, coefficients) in &self.zoning_coefficients.0 {
            coefficients.validate(district)?;
        }
        for (type_name, profile) in &self.window_types.0 {
            profile.validate(type_name)?;
        }
        for (room_use, divisor) in &self.room_use_divisors.0 {
            validate_divisor(room_use, *divisor)?;
        }
        validate_eaves_factor(self.eaves_reduction_factor)
    }

    /// Replace one district's coefficients after validating them.
    pub fn set_zoning(&mut self, district: impl Into<String>, coefficients: ZoningCoefficients) -> CalcResult<()> {
        let district = district.into();
        coefficients.validate(&district)?;
        self.zoning_coefficients.insert(district, coefficients);
        Ok(())
    }

    /// Replace one window type's profile after validating it.
    pub fn set_window_type(&mut self, type_name: impl Into<String>, profile: WindowTypeProfile) -> CalcResult<()> {
        let type_name = type_name.into();
        profile.validate(&type_name)?;
        self.window_types.insert(type_name, profile);
        Ok(())
    }

    /// Replace one room use divisor after validating it.
    pub fn set_room_use_divisor(&mut self, room_use: impl Into<String>, divisor: f64) -> CalcResult<()> {
        let room_use = room_use.into();
        validate_divisor(&room_use, divisor)?;
        self.room_use_divisors.insert(room_use, divisor);
        Ok(())
    }

    /// Replace the eaves reduction factor after validating it.
    pub fn set_eaves_reduction_factor(&mut self, factor: f64) -> CalcResult<()> {
        validate_eaves_factor(factor)?;
        self.eaves_reduction_factor = factor;
        Ok(())
    }

    /// Overlay a stored partial record on these settings.
    ///
    /// Top-level fields present in `stored` replace ours. The zoning table
    /// is merged per district, so built-in districts survive a record that
    /// predates them.
    pub fn merged_with(mut self, stored: StoredSettings) -> Self {
        if let Some(zoning) = stored.zoning_coefficients {
            self.zoning_coefficients.0.extend(zoning.0);
        }
        if let Some(window_types) = stored.window_types {
            self.window_types = window_types;
        }
        if let Some(room_uses) = stored.room_use_divisors {
            self.room_use_divisors = room_uses;
        }
        if let Some(factor) = stored.eaves_reduction_factor {
            self.eaves_reduction_factor = factor;
        }
        self
    }
}

/// A settings record as found in storage; any field may be absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default, alias = "zoningData")]
    pub zoning_coefficients: Option<ZoningTable>,

    #[serde(default, alias = "windowTypes")]
    pub window_types: Option<WindowTypeTable>,

    #[serde(default, alias = "roomUses")]
    pub room_use_divisors: Option<RoomUseTable>,

    #[serde(default, alias = "eavesReductionFactor")]
    pub eaves_reduction_factor: Option<f64>,
}

impl From<Settings> for StoredSettings {
    fn from(settings: Settings) -> Self {
        StoredSettings {
            zoning_coefficients: Some(settings.zoning_coefficients),
            window_types: Some(settings.window_types),
            room_use_divisors: Some(settings.room_use_divisors),
            eaves_reduction_factor: Some(settings.eaves_reduction_factor),
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate_divisor(room_use: &str, divisor: f64) -> CalcResult<()> {
    if !is_positive(divisor) {
        return Err(CalcError::invalid_input(
            format!("room_use_divisors.{}", room_use),
            divisor.to_string(),
            "Divisor must be positive",
        ));
    }
    Ok(())
}

fn validate_eaves_factor(factor: f64) -> CalcResult<()> {
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(CalcError::invalid_input(
            "eaves_reduction_factor",
            factor.to_string(),
            "Eaves reduction factor must be in (0, 1]",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let settings = Settings::default();
        assert_eq!(settings.zoning_coefficients.0.len(), 7);
        assert_eq!(settings.window_types.0.len(), 6);
        assert_eq!(settings.room_use_divisors.0.len(), 4);
        assert_eq!(settings.eaves_reduction_factor, 0.9);

        let commercial = settings.zoning_coefficients.resolve("近隣商業／商業地域");
        assert_eq!(commercial, ZoningCoefficients::new(6.0, 1.2, 8.0));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_room_use_falls_back_to_seven() {
        let settings = Settings::default();
        assert_eq!(settings.room_use_divisors.resolve("倉庫"), DEFAULT_ROOM_USE_DIVISOR);

        let mut broken = RoomUseTable::default();
        broken.insert("住宅の居室", 0.0);
        assert_eq!(broken.resolve("住宅の居室"), DEFAULT_ROOM_USE_DIVISOR);
    }

    #[test]
    fn test_unknown_window_type_credits_nothing() {
        let profile = Settings::default().window_types.resolve("回転窓");
        assert_eq!(profile, WindowTypeProfile::UNRESOLVED);
        assert_eq!(profile.ventilation_ratio, 0.0);
        assert_eq!(profile.smoke_ratio, 0.0);
        assert!(!profile.is_toplight);
    }

    #[test]
    fn test_unknown_district_is_unresolved() {
        let coefficients = Settings::default().zoning_coefficients.resolve("市街化調整区域");
        assert_eq!(coefficients.alpha, 0.0);
        assert_eq!(coefficients.beta, 0.0);
        assert!(coefficients.threshold_distance.is_infinite());
    }

    #[test]
    fn test_validated_setters() {
        let mut settings = Settings::default();
        assert!(settings.set_eaves_reduction_factor(0.8).is_ok());
        assert_eq!(settings.eaves_reduction_factor, 0.8);

        let err = settings.set_eaves_reduction_factor(0.0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(settings.set_eaves_reduction_factor(1.2).is_err());
        assert!(settings.set_eaves_reduction_factor(f64::NAN).is_err());
        assert_eq!(settings.eaves_reduction_factor, 0.8);

        assert!(settings.set_zoning("特別区域", ZoningCoefficients::new(0.0, 1.0, 7.0)).is_err());
        assert!(settings.set_zoning("特別区域", ZoningCoefficients::new(6.0, -0.1, 7.0)).is_err());
        assert!(settings.set_zoning("特別区域", ZoningCoefficients::new(6.0, 1.0, 0.0)).is_err());
        assert!(settings.zoning_coefficients.get("特別区域").is_none());
        assert!(settings.set_zoning("特別区域", ZoningCoefficients::new(6.0, 1.0, 7.0)).is_ok());

        assert!(settings.set_window_type("網戸付き窓", WindowTypeProfile::operable(1.5, 0.5)).is_err());
        assert!(settings.set_room_use_divisor("事務室", -1.0).is_err());
        assert!(settings.set_room_use_divisor("事務室", 10.0).is_ok());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_offending_key() {
        let mut settings = Settings::default();
        settings
            .zoning_coefficients
            .insert("準住居地域", ZoningCoefficients::new(f64::NAN, 1.4, 7.0));
        match settings.validate() {
            Err(CalcError::InvalidInput { field, .. }) => {
                assert_eq!(field, "zoning_coefficients.準住居地域.alpha");
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_keeps_builtin_districts() {
        let stored: StoredSettings = serde_json::from_str(
            r#"{
                "zoningData": { "準住居地域": { "alpha": 7.0, "beta": 1.0, "D": 6.0 } },
                "eavesReductionFactor": 0.85
            }"#,
        )
        .unwrap();

        let merged = Settings::default().merged_with(stored);
        assert_eq!(merged.zoning_coefficients.0.len(), 7);
        assert_eq!(
            merged.zoning_coefficients.resolve("準住居地域"),
            ZoningCoefficients::new(7.0, 1.0, 6.0)
        );
        assert_eq!(merged.eaves_reduction_factor, 0.85);
        // Untouched tables keep their defaults
        assert_eq!(merged.window_types, Settings::default().window_types);
    }

    #[test]
    fn test_legacy_profile_keys() {
        let profile: WindowTypeProfile =
            serde_json::from_str(r#"{ "ventilation": 0, "smoke": 0, "isOpening": false, "isToplight": true }"#)
                .unwrap();
        assert_eq!(profile, WindowTypeProfile::toplight());

        let without_flag: WindowTypeProfile =
            serde_json::from_str(r#"{ "ventilation_ratio": 0.5, "smoke_ratio": 0.5, "is_operable": true }"#).unwrap();
        assert!(!without_flag.is_toplight);
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = Settings::default();
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert!(json.contains("\"eaves_reduction_factor\": 0.9"));
        let roundtrip: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, settings);
    }

    #[test]
    fn test_smoke_exhaust_type() {
        assert!(is_smoke_exhaust_type("排煙専用窓"));
        assert!(!is_smoke_exhaust_type("引違い窓"));
    }
}
