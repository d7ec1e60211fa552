//! # Rooms and Windows
//!
//! Input records for the compliance engine. Numeric fields are kept exactly as
//! entered ([`FieldValue`]); [`Room::normalized`] and [`Window::normalized`]
//! convert them to meters once, before any formula runs.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "id": "6f1c2a9e-3d0b-4a8e-9d7b-1f2e3a4b5c6d",
//!   "name": "1F 寝室",
//!   "room_use": "住宅の居室",
//!   "zoning_district": "第1種/第2種住居地域",
//!   "floor_area": "13.24",
//!   "ceiling_height": "2400",
//!   "windows": [
//!     {
//!       "id": "0b6e4c1d-5a2f-4e7b-8c9d-2a3b4c5d6e7f",
//!       "name": "窓 1",
//!       "window_type": "引違い窓",
//!       "frontage_type": "AdjacentLot",
//!       "width": "1650",
//!       "height": "1100",
//!       "top_edge_height": "2000",
//!       "eaves_depth": "900",
//!       "apply_eaves_reduction": false,
//!       "front_distance": "2500",
//!       "opening_angle": "60"
//!     }
//!   ]
//! }
//! ```
//!
//! Records written by the earlier browser tool (`roomName`, `d_distance`,
//! `type`, ...) deserialize through field aliases.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::{DEFAULT_ROOM_USE, DEFAULT_WINDOW_TYPE, DEFAULT_ZONING_DISTRICT};
use crate::units::{FieldValue, Meters};

/// Default ceiling height for a new room (mm)
pub const DEFAULT_CEILING_HEIGHT_MM: f64 = 2400.0;

/// What the frontage distance of a window is measured to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrontageType {
    /// Opposite boundary of a road
    #[serde(alias = "🚗 道路")]
    Road,
    /// Boundary with the neighboring lot
    #[default]
    #[serde(alias = "🧱 隣地")]
    AdjacentLot,
    /// Open space or garden on the same lot
    #[serde(alias = "🪴 自宅の空地・庭")]
    OwnOpenSpace,
}

impl FrontageType {
    pub const ALL: [FrontageType; 3] = [FrontageType::Road, FrontageType::AdjacentLot, FrontageType::OwnOpenSpace];

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            FrontageType::Road => "🚗 道路",
            FrontageType::AdjacentLot => "🧱 隣地",
            FrontageType::OwnOpenSpace => "🪴 自宅の空地・庭",
        }
    }

    /// What to enter as the frontage distance
    pub fn help_text(&self) -> &'static str {
        match self {
            FrontageType::Road => "向かい側の道路境界線までの距離を入力します（通常は道路幅員）。",
            FrontageType::AdjacentLot => "隣地境界線までの水平距離を入力します。",
            FrontageType::OwnOpenSpace => "採光計算上有効と見なせる、建物からの水平距離を入力します。",
        }
    }
}

impl std::fmt::Display for FrontageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A window opening as entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    #[serde(default = "Uuid::new_v4", deserialize_with = "deserialize_id")]
    pub id: Uuid,

    #[serde(default)]
    pub name: String,

    /// Key into the window type table
    #[serde(default, alias = "type")]
    pub window_type: String,

    #[serde(default, alias = "frontageType")]
    pub frontage_type: FrontageType,

    /// Width (mm)
    #[serde(default)]
    pub width: FieldValue,

    /// Height (mm)
    #[serde(default)]
    pub height: FieldValue,

    /// Height of the window's top edge above the floor (mm)
    #[serde(default, alias = "topEdgeHeight")]
    pub top_edge_height: FieldValue,

    /// Eaves projection (mm); informational, the reduction is the flag below
    #[serde(default, alias = "eavesDepth")]
    pub eaves_depth: FieldValue,

    #[serde(default, alias = "applyEavesReduction")]
    pub apply_eaves_reduction: bool,

    /// Horizontal distance to the facing boundary (mm)
    #[serde(default, alias = "d_distance")]
    pub front_distance: FieldValue,

    /// Opening angle (degrees); only read for the smoke-dedicated type
    #[serde(default, alias = "openingAngle")]
    pub opening_angle: FieldValue,
}

impl Window {
    /// A new window with the form defaults, named after its position.
    ///
    /// ```rust
    /// use musou_core::room::Window;
    ///
    /// let window = Window::with_defaults(0);
    /// assert_eq!(window.name, "窓 1");
    /// assert_eq!(window.normalized().width_m, 1.65);
    /// ```
    pub fn with_defaults(index: usize) -> Self {
        Window {
            id: Uuid::new_v4(),
            name: format!("窓 {}", index + 1),
            window_type: DEFAULT_WINDOW_TYPE.to_string(),
            frontage_type: FrontageType::AdjacentLot,
            width: FieldValue::from("1650"),
            height: FieldValue::from("1100"),
            top_edge_height: FieldValue::from("2000"),
            eaves_depth: FieldValue::from("900"),
            apply_eaves_reduction: false,
            front_distance: FieldValue::from("2500"),
            opening_angle: FieldValue::from("60"),
        }
    }

    /// Convert all geometry fields to meters.
    pub fn normalized(&self) -> NormalizedWindow {
        NormalizedWindow {
            width_m: self.width.mm_to_m(),
            height_m: self.height.mm_to_m(),
            top_edge_height_m: self.top_edge_height.mm_to_m(),
            eaves_depth_m: self.eaves_depth.mm_to_m(),
            front_distance_m: self.front_distance.mm_to_m(),
            opening_angle_deg: self.opening_angle.to_f64(),
            apply_eaves_reduction: self.apply_eaves_reduction,
        }
    }
}

/// Window geometry in meters, ready for the calculators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedWindow {
    pub width_m: f64,
    pub height_m: f64,
    pub top_edge_height_m: f64,
    pub eaves_depth_m: f64,
    pub front_distance_m: f64,
    pub opening_angle_deg: f64,
    pub apply_eaves_reduction: bool,
}

impl NormalizedWindow {
    /// Physical window area W × H (m²)
    pub fn area_m2(&self) -> f64 {
        (Meters(self.width_m) * Meters(self.height_m)).value()
    }

    /// Height of the window's bottom edge above the floor (m)
    pub fn bottom_edge_height_m(&self) -> f64 {
        self.top_edge_height_m - self.height_m
    }
}

/// A room and its windows as entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default = "Uuid::new_v4", deserialize_with = "deserialize_id")]
    pub id: Uuid,

    #[serde(default, alias = "roomName")]
    pub name: String,

    /// Key into the room use divisor table
    #[serde(default = "default_room_use", alias = "roomUse")]
    pub room_use: String,

    /// Key into the zoning coefficient table
    #[serde(default = "default_zoning_district", alias = "zoningDistrict")]
    pub zoning_district: String,

    /// Floor area (m²)
    #[serde(default, alias = "floorArea")]
    pub floor_area: FieldValue,

    /// Floor-to-ceiling height (mm)
    #[serde(default, alias = "ceilingHeight")]
    pub ceiling_height: FieldValue,

    /// Windows in display order
    #[serde(default)]
    pub windows: Vec<Window>,
}

impl Default for Room {
    fn default() -> Self {
        Room::new("")
    }
}

impl Room {
    /// A new empty room with the form defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Room {
            id: Uuid::new_v4(),
            name: name.into(),
            room_use: DEFAULT_ROOM_USE.to_string(),
            zoning_district: DEFAULT_ZONING_DISTRICT.to_string(),
            floor_area: FieldValue::Text(String::new()),
            ceiling_height: FieldValue::from(format!("{}", DEFAULT_CEILING_HEIGHT_MM)),
            windows: Vec::new(),
        }
    }

    /// Builder: set the floor area (m²)
    pub fn with_floor_area(mut self, floor_area: impl Into<FieldValue>) -> Self {
        self.floor_area = floor_area.into();
        self
    }

    /// Builder: set the ceiling height (mm)
    pub fn with_ceiling_height(mut self, ceiling_height: impl Into<FieldValue>) -> Self {
        self.ceiling_height = ceiling_height.into();
        self
    }

    /// Builder: append a window
    pub fn with_window(mut self, window: Window) -> Self {
        self.windows.push(window);
        self
    }

    /// Append a window with the form defaults and return a handle to it.
    pub fn add_window(&mut self) -> &mut Window {
        let window = Window::with_defaults(self.windows.len());
        self.windows.push(window);
        let last = self.windows.len() - 1;
        &mut self.windows[last]
    }

    /// Remove the window at `index`, if present.
    pub fn remove_window(&mut self, index: usize) -> Option<Window> {
        if index < self.windows.len() {
            Some(self.windows.remove(index))
        } else {
            None
        }
    }

    /// Room-level dimensions in engine units.
    pub fn normalized(&self) -> NormalizedRoom {
        NormalizedRoom {
            floor_area_m2: self.floor_area.to_f64(),
            ceiling_height_m: self.ceiling_height.mm_to_m(),
        }
    }

    /// One-line listing, e.g. `1F 寝室 (床面積: 13.24m² / 窓: 2箇所)`
    pub fn summary_line(&self) -> String {
        let name = if self.name.trim().is_empty() {
            "(名称未設定)"
        } else {
            self.name.as_str()
        };
        format!("{} (床面積: {}m² / 窓: {}箇所)", name, self.floor_area, self.windows.len())
    }
}

/// Room dimensions in engine units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRoom {
    pub floor_area_m2: f64,
    pub ceiling_height_m: f64,
}

impl NormalizedRoom {
    /// Floor area is missing or non-positive; no numeric verdict is possible.
    pub fn missing_floor_area(&self) -> bool {
        self.floor_area_m2 <= 0.0
    }
}

fn default_room_use() -> String {
    DEFAULT_ROOM_USE.to_string()
}

fn default_zoning_district() -> String {
    DEFAULT_ZONING_DISTRICT.to_string()
}

/// Accept a UUID, or any other legacy id (timestamps as strings or numbers)
/// mapped deterministically onto a name-based (v5) UUID.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
        Missing(()),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => Uuid::parse_str(&text).unwrap_or_else(|_| legacy_id(&text)),
        RawId::Number(number) => legacy_id(&number.to_string()),
        RawId::Missing(()) => Uuid::new_v4(),
    })
}

fn legacy_id(raw: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes())
}
