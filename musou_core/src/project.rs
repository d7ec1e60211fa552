//! # Room Book
//!
//! The `RoomBook` is the root container the CLI works on: the settings
//! snapshot plus every room the user has entered, in entry order.
//!
//! ## Structure
//!
//! ```text
//! RoomBook
//! ├── meta: BookMetadata (schema version, timestamps)
//! ├── settings: Settings (coefficient tables)
//! └── rooms: Vec<Room> (display order)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use musou_core::project::RoomBook;
//! use musou_core::room::{Room, Window};
//!
//! let mut book = RoomBook::new();
//! let room = Room::new("1F 寝室")
//!     .with_floor_area("13.24")
//!     .with_window(Window::with_defaults(0));
//! let id = book.save_room(room);
//!
//! let report = book.report_for(&id).unwrap();
//! assert!(!report.lighting.passes);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::calculations::{compute_compliance_report, ComplianceReport};
use crate::errors::{CalcError, CalcResult};
use crate::room::Room;
use crate::settings::Settings;

/// Current schema version for stored records
pub const SCHEMA_VERSION: &str = "0.2.0";

/// Rooms and settings loaded from one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomBook {
    pub meta: BookMetadata,

    pub settings: Settings,

    /// Rooms in the order they were first saved
    pub rooms: Vec<Room>,
}

impl RoomBook {
    /// An empty book with the default settings.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let now = Utc::now();
        RoomBook {
            meta: BookMetadata {
                version: SCHEMA_VERSION.to_string(),
                created: now,
                modified: now,
            },
            settings,
            rooms: Vec::new(),
        }
    }

    /// Insert a room, or replace the room with the same id in place.
    ///
    /// Returns the room's id.
    pub fn save_room(&mut self, room: Room) -> Uuid {
        let id = room.id;
        match self.rooms.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                debug!(room = %room.name, %id, "room replaced");
                *existing = room;
            }
            None => {
                debug!(room = %room.name, %id, "room added");
                self.rooms.push(room);
            }
        }
        self.touch();
        id
    }

    /// Remove a room by id.
    pub fn remove_room(&mut self, id: &Uuid) -> CalcResult<Room> {
        let index = self
            .rooms
            .iter()
            .position(|r| r.id == *id)
            .ok_or_else(|| CalcError::room_not_found(id.to_string()))?;
        let room = self.rooms.remove(index);
        self.touch();
        Ok(room)
    }

    pub fn room(&self, id: &Uuid) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == *id)
    }

    /// Get a mutable reference to a room by id.
    ///
    /// Marks the book as modified when the room exists.
    pub fn room_mut(&mut self, id: &Uuid) -> Option<&mut Room> {
        if self.room(id).is_some() {
            self.meta.modified = Utc::now();
        }
        self.rooms.iter_mut().find(|r| r.id == *id)
    }

    /// First room whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }

    /// Look a room up by id string or, failing that, by name.
    pub fn resolve_room(&self, key: &str) -> CalcResult<&Room> {
        Uuid::parse_str(key)
            .ok()
            .and_then(|id| self.room(&id))
            .or_else(|| self.find_by_name(key))
            .ok_or_else(|| CalcError::room_not_found(key))
    }

    /// Replace the settings snapshot. Invalid settings leave the book unchanged.
    pub fn update_settings(&mut self, settings: Settings) -> CalcResult<()> {
        settings.validate()?;
        self.settings = settings;
        self.touch();
        Ok(())
    }

    /// Compliance report for one room under the book's settings.
    pub fn report_for(&self, id: &Uuid) -> CalcResult<ComplianceReport> {
        let room = self
            .room(id)
            .ok_or_else(|| CalcError::room_not_found(id.to_string()))?;
        Ok(compute_compliance_report(room, &self.settings))
    }

    /// Reports for every room, in room order.
    pub fn reports(&self) -> Vec<ComplianceReport> {
        self.rooms
            .iter()
            .map(|room| compute_compliance_report(room, &self.settings))
            .collect()
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomBook {
    fn default() -> Self {
        RoomBook::new()
    }
}

/// Book metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}
