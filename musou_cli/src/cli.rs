//! Subcommand definitions and their implementations.
//!
//! - `report`: reports for rooms in the store
//! - `check`: reports for rooms in a JSON file, without touching the store
//! - `rooms`: list, add and remove stored rooms
//! - `settings`: show or reset the stored settings

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use musou_core::settings::StoredSettings;
use musou_core::{compute_compliance_report, ComplianceReport, Room, Settings, Store};
use serde::Deserialize;
use tracing::{info, warn};

use crate::render;

#[derive(Subcommand)]
pub enum Commands {
    /// Compliance report for stored rooms
    Report {
        /// Room id or name (default: every room)
        #[arg(long)]
        room: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compliance report for rooms in a JSON file
    Check {
        /// Room record, or an array of room records
        file: PathBuf,

        /// Settings record overlaid on the defaults
        #[arg(long)]
        settings: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage stored rooms
    #[command(subcommand)]
    Rooms(RoomsCommand),

    /// Manage stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
pub enum RoomsCommand {
    /// List stored rooms with their verdicts
    List,

    /// Add rooms from a JSON file (replacing rooms with the same id)
    Add { file: PathBuf },

    /// Remove a room by id or name
    Remove { room: String },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the effective settings as JSON
    Show,

    /// Discard stored settings and use the defaults
    Reset,
}

#[derive(clap::Args)]
pub struct OutputArgs {
    /// Print the reports as JSON
    #[arg(long)]
    json: bool,

    /// Include the per-window formula breakdown
    #[arg(long)]
    detailed: bool,
}

/// Overall result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every reported room meets every requirement (or nothing was checked)
    Compliant,
    /// At least one reported metric is not met
    Deficient,
}

impl Outcome {
    fn of(reports: &[ComplianceReport]) -> Self {
        if reports.iter().all(ComplianceReport::passes_all) {
            Outcome::Compliant
        } else {
            Outcome::Deficient
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoomInput {
    Many(Vec<Room>),
    One(Box<Room>),
}

impl RoomInput {
    fn into_rooms(self) -> Vec<Room> {
        match self {
            RoomInput::Many(rooms) => rooms,
            RoomInput::One(room) => vec![*room],
        }
    }
}

pub fn run(command: Commands, store_root: &Path) -> Result<Outcome> {
    let store = Store::new(store_root);
    match command {
        Commands::Report { room, output } => cmd_report(&store, room.as_deref(), &output),
        Commands::Check { file, settings, output } => cmd_check(&file, settings.as_deref(), &output),
        Commands::Rooms(RoomsCommand::List) => cmd_rooms_list(&store),
        Commands::Rooms(RoomsCommand::Add { file }) => cmd_rooms_add(&store, &file),
        Commands::Rooms(RoomsCommand::Remove { room }) => cmd_rooms_remove(&store, &room),
        Commands::Settings(SettingsCommand::Show) => cmd_settings_show(&store),
        Commands::Settings(SettingsCommand::Reset) => cmd_settings_reset(&store),
    }
}

fn cmd_report(store: &Store, room: Option<&str>, output: &OutputArgs) -> Result<Outcome> {
    let book = store
        .load_book()
        .with_context(|| format!("loading store {}", store.root().display()))?;

    let reports = match room {
        Some(key) => {
            let room = book.resolve_room(key)?;
            vec![compute_compliance_report(room, &book.settings)]
        }
        None => {
            if book.rooms.is_empty() {
                warn!(store = %store.root().display(), "store has no rooms");
            }
            book.reports()
        }
    };

    print_reports(&reports, output)?;
    Ok(Outcome::of(&reports))
}

fn cmd_check(file: &Path, settings: Option<&Path>, output: &OutputArgs) -> Result<Outcome> {
    let rooms = read_rooms(file)?;
    let settings = match settings {
        Some(path) => read_settings(path)?,
        None => Settings::default(),
    };
    info!(file = %file.display(), rooms = rooms.len(), "checking rooms");

    let reports: Vec<ComplianceReport> = rooms
        .iter()
        .map(|room| compute_compliance_report(room, &settings))
        .collect();
    print_reports(&reports, output)?;
    Ok(Outcome::of(&reports))
}

fn cmd_rooms_list(store: &Store) -> Result<Outcome> {
    let book = store.load_book()?;
    if book.rooms.is_empty() {
        println!("(部屋がありません)");
    }
    for room in &book.rooms {
        let report = compute_compliance_report(room, &book.settings);
        println!("{}  {}  {}", room.id, render::verdict_marks(&report), room.summary_line());
    }
    Ok(Outcome::Compliant)
}

fn cmd_rooms_add(store: &Store, file: &Path) -> Result<Outcome> {
    let rooms = read_rooms(file)?;
    let saved = store.edit_book(|book| {
        Ok(rooms
            .into_iter()
            .map(|room| {
                let name = room.summary_line();
                (book.save_room(room), name)
            })
            .collect::<Vec<_>>())
    })?;
    for (id, name) in saved {
        println!("{}  {}", id, name);
    }
    Ok(Outcome::Compliant)
}

fn cmd_rooms_remove(store: &Store, key: &str) -> Result<Outcome> {
    let removed = store.edit_book(|book| {
        let id = book.resolve_room(key)?.id;
        book.remove_room(&id)
    })?;
    println!("削除しました: {}", removed.summary_line());
    Ok(Outcome::Compliant)
}

fn cmd_settings_show(store: &Store) -> Result<Outcome> {
    let settings = store.load_settings()?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(Outcome::Compliant)
}

fn cmd_settings_reset(store: &Store) -> Result<Outcome> {
    store.reset_settings()?;
    println!("設定を初期値に戻しました。");
    Ok(Outcome::Compliant)
}

fn print_reports(reports: &[ComplianceReport], output: &OutputArgs) -> Result<()> {
    if output.json {
        let json = if output.detailed {
            serde_json::to_string_pretty(reports)?
        } else {
            serde_json::to_string_pretty(&render::compact_json(reports))?
        };
        println!("{}", json);
    } else {
        for report in reports {
            print!("{}", render::report_text(report, output.detailed));
        }
    }
    Ok(())
}

fn read_rooms(path: &Path) -> Result<Vec<Room>> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let input: RoomInput =
        serde_json::from_str(&contents).with_context(|| format!("parsing rooms from {}", path.display()))?;
    let rooms = input.into_rooms();
    if rooms.is_empty() {
        bail!("{} contains no rooms", path.display());
    }
    Ok(rooms)
}

fn read_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let stored: StoredSettings =
        serde_json::from_str(&contents).with_context(|| format!("parsing settings from {}", path.display()))?;
    let settings = Settings::default().merged_with(stored);
    settings
        .validate()
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use musou_core::room::Window;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("musou_cli_test_{}_{}", name, std::process::id()))
    }

    fn bedroom() -> Room {
        Room::new("1F 寝室")
            .with_floor_area("13.24")
            .with_window(Window::with_defaults(0))
    }

    #[test]
    fn test_read_single_room() {
        let path = temp_path("one.json");
        fs::write(&path, serde_json::to_string(&bedroom()).unwrap()).unwrap();

        let rooms = read_rooms(&path).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "1F 寝室");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_room_array() {
        let path = temp_path("many.json");
        let rooms = vec![bedroom(), Room::new("2F 洋室")];
        fs::write(&path, serde_json::to_string(&rooms).unwrap()).unwrap();

        assert_eq!(read_rooms(&path).unwrap(), rooms);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_rooms_rejects_empty_and_invalid() {
        let path = temp_path("empty.json");
        fs::write(&path, "[]").unwrap();
        assert!(read_rooms(&path).unwrap_err().to_string().contains("contains no rooms"));

        fs::write(&path, "{not json").unwrap();
        assert!(read_rooms(&path).unwrap_err().to_string().starts_with("parsing rooms from"));
        let _ = fs::remove_file(&path);

        assert!(read_rooms(&temp_path("missing.json")).is_err());
    }

    #[test]
    fn test_read_settings_overlays_defaults() {
        let path = temp_path("settings.json");
        fs::write(&path, r#"{"eavesReductionFactor": 0.7}"#).unwrap();
        let settings = read_settings(&path).unwrap();
        assert_eq!(settings.eaves_reduction_factor, 0.7);
        assert_eq!(settings.window_types, Settings::default().window_types);

        fs::write(&path, r#"{"eavesReductionFactor": 1.5}"#).unwrap();
        assert!(read_settings(&path).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_outcome_of_reports() {
        let settings = Settings::default();
        let deficient = compute_compliance_report(&bedroom(), &settings);
        let mut wide = bedroom();
        wide.windows[0].width = "2000".into();
        let compliant = compute_compliance_report(&wide, &settings);

        assert_eq!(Outcome::of(&[]), Outcome::Compliant);
        assert_eq!(Outcome::of(&[compliant.clone()]), Outcome::Compliant);
        assert_eq!(Outcome::of(&[compliant, deficient]), Outcome::Deficient);
    }

    #[test]
    fn test_rooms_add_and_remove_through_store() {
        let root = temp_path("store");
        let _ = fs::remove_dir_all(&root);
        let store = Store::new(&root);
        let file = temp_path("add.json");
        fs::write(&file, serde_json::to_string(&vec![bedroom(), Room::new("2F 洋室")]).unwrap()).unwrap();

        assert_eq!(cmd_rooms_add(&store, &file).unwrap(), Outcome::Compliant);
        assert_eq!(store.load_rooms().unwrap().data.len(), 2);

        cmd_rooms_remove(&store, "2F 洋室").unwrap();
        let rooms = store.load_rooms().unwrap().data;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "1F 寝室");

        assert!(cmd_rooms_remove(&store, "2F 洋室").is_err());
        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_file(&file);
    }
}
