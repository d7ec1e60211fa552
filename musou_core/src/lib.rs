//! # musou_core - Window Opening Compliance Engine
//!
//! `musou_core` checks a room's windows against the building code opening
//! requirements for lighting (採光), ventilation (換気) and smoke exhaust
//! (排煙). All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: The engine is pure functions from room and settings to results
//! - **Never fails on numbers**: Blank or malformed fields count as zero
//! - **Fails closed on configuration**: Unknown table keys credit nothing
//! - **Traceable**: Every window contribution carries its formula
//!
//! ## Quick Start
//!
//! ```rust
//! use musou_core::calculations::compute_compliance_report;
//! use musou_core::room::{Room, Window};
//! use musou_core::settings::Settings;
//!
//! let room = Room::new("1F 寝室")
//!     .with_floor_area("13.24")
//!     .with_window(Window::with_defaults(0));
//!
//! let report = compute_compliance_report(&room, &Settings::default());
//! assert!(!report.lighting.passes);
//! println!("{}", report.lighting.summary_text);
//! ```
//!
//! ## Modules
//!
//! - [`room`] - Room and window records as entered
//! - [`settings`] - Coefficient tables and their fallbacks
//! - [`calculations`] - Lighting, ventilation, smoke exhaust and the combined report
//! - [`trace`] - Typed formula segments for display
//! - [`units`] - Form field parsing and unit wrappers
//! - [`project`] - Room book container
//! - [`file_io`] - Record store with atomic saves and locking
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod errors;
pub mod file_io;
pub mod project;
pub mod room;
pub mod settings;
pub mod trace;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use calculations::{
    compute_compliance_report, compute_lighting, compute_smoke_exhaust, compute_ventilation, ComplianceReport,
    Metric, MetricResult, Verdict, WindowContribution,
};
pub use errors::{CalcError, CalcResult};
pub use file_io::Store;
pub use project::RoomBook;
pub use room::{Room, Window};
pub use settings::Settings;
