use std::path::{Path, PathBuf};

use bevy::prelude::*;
use network::plugin::{apply_road_commands, sync_engine_params, validate_changed_roads};
use network::{EngineParams, MapDiagnostics, RoadMap, RoadMapChanged};

use crate::atomic_write::atomic_write;
use crate::map_codec::{load_map_from_file, save_map_to_file};
use crate::opendrive::{export_xodr, import_xodr};
use crate::save_error::SaveError;

// ---------------------------------------------------------------------------
// File formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// Header + bitcode payload.
    Binary,
    OpenDrive,
}

impl MapFormat {
    /// `.xodr` files are OpenDRIVE, anything else is the binary format.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xodr") => MapFormat::OpenDrive,
            _ => MapFormat::Binary,
        }
    }
}

/// Write `map` in the format its extension names. Returns bytes written.
pub fn write_map_file(map: &RoadMap, path: &Path, compress: bool) -> Result<usize, SaveError> {
    match MapFormat::for_path(path) {
        MapFormat::Binary => save_map_to_file(map, path, compress),
        MapFormat::OpenDrive => {
            let xml = export_xodr(map);
            atomic_write(path, xml.as_bytes())?;
            Ok(xml.len())
        }
    }
}

pub fn read_map_file(path: &Path) -> Result<RoadMap, SaveError> {
    match MapFormat::for_path(path) {
        MapFormat::Binary => load_map_from_file(path),
        MapFormat::OpenDrive => import_xodr(&std::fs::read_to_string(path)?),
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Event, Debug, Clone)]
pub struct SaveMapEvent {
    pub path: PathBuf,
    /// LZ4-compress the binary payload. Ignored for OpenDRIVE.
    pub compress: bool,
}

impl SaveMapEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compress: true,
        }
    }
}

#[derive(Event, Debug, Clone)]
pub struct LoadMapEvent {
    pub path: PathBuf,
}

impl LoadMapEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Outcome of a save or load request.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum MapFileResult {
    Saved { path: PathBuf, bytes: usize },
    Loaded { path: PathBuf, roads: usize },
    Failed { path: PathBuf, error: String },
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveMapEvent>()
            .add_event::<LoadMapEvent>()
            .add_event::<MapFileResult>();

        // Loads land before this frame's edits; saves see the edited map.
        app.add_systems(
            Update,
            (
                handle_load_events
                    .before(sync_engine_params)
                    .before(apply_road_commands),
                handle_save_events.after(validate_changed_roads),
            ),
        );
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

fn handle_save_events(
    mut events: EventReader<SaveMapEvent>,
    map: Res<RoadMap>,
    mut results: EventWriter<MapFileResult>,
) {
    for event in events.read() {
        let result = match write_map_file(&map, &event.path, event.compress) {
            Ok(bytes) => {
                info!(
                    "Saved {} roads to {} ({bytes} bytes)",
                    map.road_count(),
                    event.path.display()
                );
                MapFileResult::Saved {
                    path: event.path.clone(),
                    bytes,
                }
            }
            Err(e) => {
                error!("Save to {} failed: {e}", event.path.display());
                MapFileResult::Failed {
                    path: event.path.clone(),
                    error: e.to_string(),
                }
            }
        };
        results.send(result);
    }
}

/// Replaces the map wholesale; the last request of a frame wins.
fn handle_load_events(
    mut events: EventReader<LoadMapEvent>,
    mut map: ResMut<RoadMap>,
    mut params: ResMut<EngineParams>,
    mut diagnostics: ResMut<MapDiagnostics>,
    mut changed: EventWriter<RoadMapChanged>,
    mut results: EventWriter<MapFileResult>,
) {
    for event in events.read() {
        let loaded = match read_map_file(&event.path) {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Load from {} failed: {e}", event.path.display());
                diagnostics
                    .rejected_commands
                    .push(format!("load_map: {e}"));
                results.send(MapFileResult::Failed {
                    path: event.path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        *diagnostics = MapDiagnostics::default();
        for violation in loaded.validate_all() {
            warn!("Loaded map: {violation}");
            diagnostics.record(violation);
        }
        info!(
            "Loaded {} roads and {} junctions from {}",
            loaded.road_count(),
            loaded.junctions().count(),
            event.path.display()
        );

        *params = loaded.params().clone();
        *map = loaded;
        changed.send(RoadMapChanged {
            roads: map.roads().map(|road| road.id).collect(),
        });
        results.send(MapFileResult::Loaded {
            path: event.path.clone(),
            roads: map.road_count(),
        });
    }
}
