//! # Record Store
//!
//! Rooms and settings persist as two JSON records in a store directory:
//!
//! ```text
//! <store>/
//! ├── musou_rooms_v2.json       Record<Vec<Room>>
//! ├── musou_settings_v2.json    Record<StoredSettings>
//! └── .musou.lock               held by writers
//! ```
//!
//! Safety features:
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the record
//! - **Writer lock**: an OS-level exclusive lock (fs2) on `.musou.lock`
//! - **Version validation**: records from an incompatible schema are refused
//!
//! Each record is wrapped in an envelope `{version, saved_at, data}`. A bare
//! record (just the data, as older builds wrote it) also loads. A JSON object
//! with a `version` key is always read as an envelope, and its version is
//! checked before the data is decoded. A missing record loads as no rooms or
//! the default settings.
//!
//! ## Example
//!
//! ```rust,no_run
//! use musou_core::file_io::Store;
//! use musou_core::room::Room;
//!
//! let store = Store::new("./.musou");
//! let id = store.edit_book(|book| Ok(book.save_room(Room::new("1F 寝室").with_floor_area("13.24"))))?;
//! println!("saved {}", id);
//! # Ok::<(), musou_core::errors::CalcError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{CalcError, CalcResult};
use crate::project::{RoomBook, SCHEMA_VERSION};
use crate::room::Room;
use crate::settings::{Settings, StoredSettings};

/// Storage key of the rooms record
pub const ROOMS_KEY: &str = "musou_rooms_v2";

/// Storage key of the settings record
pub const SETTINGS_KEY: &str = "musou_settings_v2";

/// Lock file held while writing
pub const LOCK_FILE_NAME: &str = ".musou.lock";

// ============================================================================
// Record Envelope
// ============================================================================

/// Versioned wrapper around a stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<T> {
    /// Schema version the record was written with
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(data: T) -> Self {
        Record {
            version: SCHEMA_VERSION.to_string(),
            saved_at: Utc::now(),
            data,
        }
    }
}

/// A record read back from the store.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub data: T,
    /// `None` for bare records, which carry no timestamp
    pub saved_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Writer Lock
// ============================================================================

/// Lock file metadata, for reporting who holds the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Machine name where the lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn current() -> Self {
        LockInfo {
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive writer lock on a store. Released when dropped.
pub struct StoreLock {
    lock_path: PathBuf,
    /// Keeps the OS lock
    file: File,
    pub info: LockInfo,
}

impl StoreLock {
    /// Acquire the writer lock without blocking.
    ///
    /// # Returns
    ///
    /// * `Ok(StoreLock)` - Lock acquired
    /// * `Err(CalcError::FileLocked)` - Another process is writing
    pub fn acquire(root: &Path) -> CalcResult<Self> {
        let lock_path = root.join(LOCK_FILE_NAME);

        // No truncate here: the holder's info must survive a failed attempt
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&lock_path)
            .map_err(|e| CalcError::file_error("open lock", lock_path.display().to_string(), e.to_string()))?;

        if file.try_lock_exclusive().is_err() {
            let holder = read_lock_info(&mut file)
                .map(|info| format!("held by pid {} on {} since {}", info.pid, info.machine, info.locked_at.to_rfc3339()))
                .unwrap_or_else(|| "held by another process".to_string());
            return Err(CalcError::file_locked(root.display().to_string(), holder));
        }

        let info = LockInfo::current();
        let json = serde_json::to_string_pretty(&info).map_err(CalcError::serialization)?;
        write_lock_info(&mut file, &json)
            .map_err(|e| CalcError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        debug!(path = %lock_path.display(), "store lock acquired");
        Ok(StoreLock { lock_path, file, info })
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // The lock file itself stays; removing it would race a waiting writer
        let _ = self.file.unlock();
    }
}

fn write_lock_info(file: &mut File, json: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()
}

fn read_lock_info(file: &mut File) -> Option<LockInfo> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut contents).ok()?;
    serde_json::from_str(&contents).ok()
}

// ============================================================================
// Store
// ============================================================================

/// A directory holding the rooms and settings records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Store { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record stored under `key`
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Take the writer lock, creating the store directory if needed.
    pub fn lock(&self) -> CalcResult<StoreLock> {
        fs::create_dir_all(&self.root)
            .map_err(|e| CalcError::file_error("create store", self.root.display().to_string(), e.to_string()))?;
        StoreLock::acquire(&self.root)
    }

    /// All saved rooms; an empty list when none were saved yet.
    pub fn load_rooms(&self) -> CalcResult<Loaded<Vec<Room>>> {
        Ok(read_record(&self.record_path(ROOMS_KEY))?.unwrap_or(Loaded {
            data: Vec::new(),
            saved_at: None,
        }))
    }

    /// Saved settings overlaid on the defaults.
    ///
    /// A stored value out of range is an error here rather than at the next
    /// save; `reset_settings` clears it.
    pub fn load_settings(&self) -> CalcResult<Settings> {
        let stored: Option<Loaded<StoredSettings>> = read_record(&self.record_path(SETTINGS_KEY))?;
        let settings = match stored {
            Some(loaded) => Settings::default().merged_with(loaded.data),
            None => return Ok(Settings::default()),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_rooms(&self, rooms: &[Room]) -> CalcResult<()> {
        let _lock = self.lock()?;
        self.write_rooms(rooms)
    }

    /// Validate and save the full settings record.
    pub fn save_settings(&self, settings: &Settings) -> CalcResult<()> {
        settings.validate()?;
        let _lock = self.lock()?;
        self.write_settings(settings)
    }

    /// Remove the settings record so the defaults apply again.
    pub fn reset_settings(&self) -> CalcResult<()> {
        let _lock = self.lock()?;
        let path = self.record_path(SETTINGS_KEY);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "settings reset to defaults");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CalcError::file_error("remove", path.display().to_string(), e.to_string())),
        }
    }

    /// Rooms and settings as one book.
    pub fn load_book(&self) -> CalcResult<RoomBook> {
        let settings = self.load_settings()?;
        let rooms = self.load_rooms()?;
        let mut book = RoomBook::with_settings(settings);
        book.rooms = rooms.data;
        if let Some(saved_at) = rooms.saved_at {
            book.meta.modified = saved_at;
        }
        Ok(book)
    }

    /// Save both records under a single lock.
    pub fn save_book(&self, book: &RoomBook) -> CalcResult<()> {
        book.settings.validate()?;
        let _lock = self.lock()?;
        self.write_settings(&book.settings)?;
        self.write_rooms(&book.rooms)
    }

    /// Load the book, apply `edit` and save the result, holding the writer
    /// lock from the load through the save.
    ///
    /// Nothing is written when `edit` fails. The settings record is only
    /// rewritten when `edit` changed the settings.
    pub fn edit_book<R>(&self, edit: impl FnOnce(&mut RoomBook) -> CalcResult<R>) -> CalcResult<R> {
        let _lock = self.lock()?;
        let mut book = self.load_book()?;
        let settings_before = book.settings.clone();

        let result = edit(&mut book)?;

        if book.settings != settings_before {
            book.settings.validate()?;
            self.write_settings(&book.settings)?;
        }
        self.write_rooms(&book.rooms)?;
        Ok(result)
    }

    fn write_rooms(&self, rooms: &[Room]) -> CalcResult<()> {
        write_record(&self.record_path(ROOMS_KEY), &Record::new(rooms))?;
        info!(store = %self.root.display(), rooms = rooms.len(), "rooms saved");
        Ok(())
    }

    fn write_settings(&self, settings: &Settings) -> CalcResult<()> {
        write_record(&self.record_path(SETTINGS_KEY), &Record::new(settings))?;
        info!(store = %self.root.display(), "settings saved");
        Ok(())
    }
}

/// Write a record with atomic write semantics.
///
/// The save process:
/// 1. Serialize to JSON
/// 2. Write to a temporary file (.tmp)
/// 3. Sync to disk (fsync)
/// 4. Rename .tmp over the record
fn write_record<T: Serialize>(path: &Path, record: &Record<T>) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(record).map_err(CalcError::serialization)?;
    let tmp_path = path.with_extension("json.tmp");

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), bytes = json.len(), "record written");
    Ok(())
}

/// Read a record. `Ok(None)` when the file does not exist.
fn read_record<T: DeserializeOwned>(path: &Path) -> CalcResult<Option<Loaded<T>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "record missing, using defaults");
            return Ok(None);
        }
        Err(e) => return Err(CalcError::file_error("read", path.display().to_string(), e.to_string())),
    };

    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| CalcError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;
    let invalid = |e: serde_json::Error| CalcError::serialization(format!("Invalid record in {}: {}", path.display(), e));

    let version = match value.as_object().and_then(|obj| obj.get("version")) {
        Some(version) => version.as_str().unwrap_or_default().to_string(),
        None => {
            let data = serde_json::from_value(value).map_err(invalid)?;
            debug!(path = %path.display(), "loaded bare record");
            return Ok(Some(Loaded { data, saved_at: None }));
        }
    };

    validate_version(&version)?;
    let record: Record<T> = serde_json::from_value(value).map_err(invalid)?;
    Ok(Some(Loaded {
        data: record.data,
        saved_at: Some(record.saved_at),
    }))
}

/// Validate that a record version is compatible with the current schema.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions a newer minor may carry breaking changes
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}
