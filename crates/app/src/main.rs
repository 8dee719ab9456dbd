mod agent_mode;
mod cli;
mod demo;

use std::process::ExitCode;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use network::{MapDiagnostics, RoadMap, RoadNetworkPlugin};
use save::{LoadMapEvent, MapFileResult, SaveMapEvent, SavePlugin};

use cli::CliArgs;

/// Headless app: network and save plugins on `MinimalPlugins`, already
/// stepped once so resources exist.
pub(crate) fn headless_app(with_logging: bool) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    if with_logging {
        app.add_plugins(LogPlugin::default());
    }
    app.add_plugins((RoadNetworkPlugin, SavePlugin));
    app.update();
    app
}

/// Drain file results, returning how many failed.
pub(crate) fn count_failures(app: &mut App) -> usize {
    app.world_mut()
        .resource_mut::<Events<MapFileResult>>()
        .drain()
        .filter(|result| matches!(result, MapFileResult::Failed { .. }))
        .count()
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.agent {
        agent_mode::run_agent_mode();
        return ExitCode::SUCCESS;
    }
    run_batch(&args)
}

fn run_batch(args: &CliArgs) -> ExitCode {
    let mut app = headless_app(true);

    if let Some(path) = &args.load {
        app.world_mut().send_event(LoadMapEvent::new(path));
    } else {
        demo::queue_demo(&mut app);
    }
    app.update();
    if count_failures(&mut app) > 0 {
        return ExitCode::FAILURE;
    }

    if let Some(path) = &args.xodr {
        app.world_mut().send_event(SaveMapEvent {
            path: path.clone(),
            compress: false,
        });
    }
    if let Some(path) = &args.save {
        app.world_mut().send_event(SaveMapEvent {
            path: path.clone(),
            compress: args.compress(),
        });
    }
    app.update();
    let failures = count_failures(&mut app);

    let map = app.world().resource::<RoadMap>();
    let diagnostics = app.world().resource::<MapDiagnostics>();
    info!(
        "Map has {} roads and {} junctions, {} violations",
        map.road_count(),
        map.junctions().count(),
        diagnostics.violation_count()
    );
    if args.report {
        match serde_json::to_string_pretty(&diagnostics.report()) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Could not render diagnostics report: {e}"),
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
