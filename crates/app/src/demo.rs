//! Demo network built through the command queue, for runs without `--load`.

use bevy::prelude::*;
use network::link_graph::{LinkTarget, RoadEnd};
use network::model::{LaneSide, LaneType, RoadId};
use network::{RoadCommand, RoadSpec};

/// Queue the demo commands: a bending three-road chain with a sidewalk, and a
/// four-way crossing. Ids are explicit so later commands can refer to them.
pub fn demo_commands() -> Vec<RoadCommand> {
    let west = RoadId(0);
    let bend = RoadId(1);
    let north = RoadId(2);
    let avenue = RoadId(3);
    let cross = RoadId(4);

    vec![
        RoadCommand::CreateRoad(
            RoadSpec::straight(Vec2::ZERO, Vec2::new(80.0, 0.0))
                .with_id(west)
                .with_name("Harbour Road"),
        ),
        RoadCommand::CreateRoad(
            RoadSpec::new(vec![
                Vec2::new(80.0, 0.0),
                Vec2::new(110.0, 10.0),
                Vec2::new(130.0, 40.0),
            ])
            .with_id(bend)
            .with_predecessor(LinkTarget::Road(RoadEnd::end(west))),
        ),
        RoadCommand::CreateRoad(
            RoadSpec::straight(Vec2::new(130.0, 40.0), Vec2::new(130.0, 120.0))
                .with_id(north)
                .with_predecessor(LinkTarget::Road(RoadEnd::end(bend))),
        ),
        RoadCommand::CreateLane {
            road: west,
            section: 0,
            side: LaneSide::Right,
            lane_type: LaneType::Sidewalk,
        },
        RoadCommand::AddLaneSection { road: west, s: 40.0 },
        RoadCommand::CreateRoad(
            RoadSpec::straight(Vec2::new(-100.0, 250.0), Vec2::new(100.0, 250.0))
                .with_id(avenue)
                .with_name("Avenue"),
        ),
        RoadCommand::CreateRoad(
            RoadSpec::straight(Vec2::new(0.0, 150.0), Vec2::new(0.0, 350.0))
                .with_id(cross)
                .with_name("Cross Street"),
        ),
        RoadCommand::CreateCrossingJunction {
            a: avenue,
            b: cross,
        },
    ]
}

pub fn queue_demo(app: &mut App) {
    for command in demo_commands() {
        app.world_mut().send_event(command);
    }
    info!("Queued demo network");
}
