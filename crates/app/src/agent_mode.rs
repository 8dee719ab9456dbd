//! Headless `--agent` mode: a blocking loop that reads JSON requests from
//! stdin and writes JSON responses to stdout.
//!
//! ## Protocol
//!
//! Each line of stdin is a JSON object with a `"cmd"` discriminator, e.g.
//! `{"cmd":"create_road","points":[[0,0],[40,0]]}`. Each line of stdout is a
//! JSON response with `"protocol_version"` and `"type"` fields. Logs go to
//! stderr so they never interleave with responses.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use bevy::prelude::*;
use network::link_graph::{LinkTarget, RoadEnd};
use network::model::{ContactPoint, LaneSide, LaneType, RoadId};
use network::{MapDiagnostics, RoadCommand, RoadMapChanged, RoadSpec};
use save::{LoadMapEvent, MapFileResult, SaveMapEvent};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AgentRequest {
    CreateRoad {
        points: Vec<[f32; 2]>,
        #[serde(default)]
        name: Option<String>,
    },
    SplitRoad {
        road: u32,
        s: f32,
    },
    CreateLane {
        road: u32,
        section: usize,
        /// `"left"` or `"right"`.
        side: String,
        /// OpenDRIVE lane type name, e.g. `"driving"`.
        lane_type: String,
    },
    UpdateLaneWidth {
        road: u32,
        section: usize,
        lane: i32,
        width: f32,
    },
    AddLaneSection {
        road: u32,
        s: f32,
    },
    /// Link `road`'s `contact` end to `target_road`'s `target_contact` end.
    Link {
        road: u32,
        contact: String,
        target_road: u32,
        target_contact: String,
    },
    Crossing {
        a: u32,
        b: u32,
    },
    Save {
        path: PathBuf,
        #[serde(default = "default_compress")]
        compress: bool,
    },
    Load {
        path: PathBuf,
    },
    Report,
    Quit,
}

fn default_compress() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub protocol_version: u32,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Ready,
    /// Command applied; lists every road touched.
    Applied { changed: Vec<u32> },
    Rejected { message: String },
    Saved { bytes: usize },
    Loaded { roads: usize },
    Report { report: serde_json::Value },
    Error { message: String },
    Goodbye,
}

pub fn make_response(payload: ResponsePayload) -> AgentResponse {
    AgentResponse {
        protocol_version: PROTOCOL_VERSION,
        payload,
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

pub fn run_agent_mode() {
    let mut app = crate::headless_app(true);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    write_response(&mut stdout, &make_response(ResponsePayload::Ready));
    info!("roadforge agent mode v{PROTOCOL_VERSION} ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("stdin read error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<AgentRequest>(&line) {
            Ok(request) => process_request(request, &mut app),
            Err(e) => make_response(ResponsePayload::Error {
                message: format!("Parse error: {e}"),
            }),
        };
        let is_goodbye = matches!(response.payload, ResponsePayload::Goodbye);
        write_response(&mut stdout, &response);
        if is_goodbye {
            break;
        }
    }

    info!("roadforge agent mode shutting down");
}

fn write_response(out: &mut impl Write, response: &AgentResponse) {
    match serde_json::to_string(response) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
            let _ = out.flush();
        }
        Err(e) => error!("Could not serialize response: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

pub fn process_request(request: AgentRequest, app: &mut App) -> AgentResponse {
    let payload = match request {
        AgentRequest::Save { path, compress } => {
            app.world_mut().send_event(SaveMapEvent { path, compress });
            file_result(app)
        }
        AgentRequest::Load { path } => {
            app.world_mut().send_event(LoadMapEvent::new(path));
            file_result(app)
        }
        AgentRequest::Report => ResponsePayload::Report {
            report: app.world().resource::<MapDiagnostics>().report(),
        },
        AgentRequest::Quit => ResponsePayload::Goodbye,
        edit => match to_command(edit) {
            Ok(command) => apply_command(command, app),
            Err(message) => ResponsePayload::Error { message },
        },
    };
    make_response(payload)
}

/// Translate an editing request into a [`RoadCommand`].
fn to_command(request: AgentRequest) -> Result<RoadCommand, String> {
    let command = match request {
        AgentRequest::CreateRoad { points, name } => {
            let mut spec = RoadSpec::new(points.into_iter().map(Vec2::from).collect());
            if let Some(name) = name {
                spec = spec.with_name(name);
            }
            RoadCommand::CreateRoad(spec)
        }
        AgentRequest::SplitRoad { road, s } => RoadCommand::SplitRoad {
            road: RoadId(road),
            s,
        },
        AgentRequest::CreateLane {
            road,
            section,
            side,
            lane_type,
        } => RoadCommand::CreateLane {
            road: RoadId(road),
            section,
            side: parse_side(&side)?,
            lane_type: LaneType::parse(&lane_type)
                .ok_or_else(|| format!("unknown lane type \"{lane_type}\""))?,
        },
        AgentRequest::UpdateLaneWidth {
            road,
            section,
            lane,
            width,
        } => RoadCommand::UpdateLaneWidth {
            road: RoadId(road),
            section,
            lane,
            width,
        },
        AgentRequest::AddLaneSection { road, s } => RoadCommand::AddLaneSection {
            road: RoadId(road),
            s,
        },
        AgentRequest::Link {
            road,
            contact,
            target_road,
            target_contact,
        } => {
            let target = LinkTarget::Road(RoadEnd::new(
                RoadId(target_road),
                parse_contact(&target_contact)?,
            ));
            match parse_contact(&contact)? {
                ContactPoint::Start => RoadCommand::LinkPredecessor {
                    road: RoadId(road),
                    target,
                },
                ContactPoint::End => RoadCommand::LinkSuccessor {
                    road: RoadId(road),
                    target,
                },
            }
        }
        AgentRequest::Crossing { a, b } => RoadCommand::CreateCrossingJunction {
            a: RoadId(a),
            b: RoadId(b),
        },
        other => return Err(format!("{other:?} is not an edit")),
    };
    Ok(command)
}

fn parse_side(value: &str) -> Result<LaneSide, String> {
    match value {
        "left" => Ok(LaneSide::Left),
        "right" => Ok(LaneSide::Right),
        _ => Err(format!("side must be \"left\" or \"right\", got \"{value}\"")),
    }
}

fn parse_contact(value: &str) -> Result<ContactPoint, String> {
    ContactPoint::parse(value)
        .ok_or_else(|| format!("contact must be \"start\" or \"end\", got \"{value}\""))
}

/// Run one frame with `command` queued and report what it did.
fn apply_command(command: RoadCommand, app: &mut App) -> ResponsePayload {
    let rejected_before = app
        .world()
        .resource::<MapDiagnostics>()
        .rejected_commands
        .len();
    app.world_mut().send_event(command);
    app.update();

    let diagnostics = app.world().resource::<MapDiagnostics>();
    if diagnostics.rejected_commands.len() > rejected_before {
        let message = diagnostics
            .rejected_commands
            .last()
            .cloned()
            .unwrap_or_default();
        return ResponsePayload::Rejected { message };
    }

    let mut changed: Vec<u32> = app
        .world_mut()
        .resource_mut::<Events<RoadMapChanged>>()
        .drain()
        .flat_map(|event| event.roads)
        .map(|road| road.0)
        .collect();
    changed.sort_unstable();
    changed.dedup();
    ResponsePayload::Applied { changed }
}

fn file_result(app: &mut App) -> ResponsePayload {
    app.update();
    let results: Vec<MapFileResult> = app
        .world_mut()
        .resource_mut::<Events<MapFileResult>>()
        .drain()
        .collect();
    // A load also announces its roads; they are not an edit.
    app.world_mut()
        .resource_mut::<Events<RoadMapChanged>>()
        .clear();
    match results.into_iter().last() {
        Some(MapFileResult::Saved { bytes, .. }) => ResponsePayload::Saved { bytes },
        Some(MapFileResult::Loaded { roads, .. }) => ResponsePayload::Loaded { roads },
        Some(MapFileResult::Failed { error, .. }) => ResponsePayload::Error { message: error },
        None => ResponsePayload::Error {
            message: "no file result".to_string(),
        },
    }
}
