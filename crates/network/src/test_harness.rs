//! # TestNetwork - headless test harness for the road engine
//!
//! Wraps a `bevy::app::App` running `RoadNetworkPlugin` under
//! `MinimalPlugins`. Builder methods edit the [`RoadMap`] resource directly;
//! `send` + `tick` go through the command events like an editing tool would.

use bevy::app::App;
use bevy::prelude::*;

use crate::engine_params::EngineParams;
use crate::link_graph::{LinkTarget, RoadEnd};
use crate::model::{ContactPoint, JunctionId, Lane, Road, RoadId};
use crate::plugin::{MapDiagnostics, RoadCommand, RoadMapChanged, RoadNetworkPlugin};
use crate::road_map::{LaneLayout, RoadMap, RoadSpec};

pub struct TestNetwork {
    app: App,
    /// Roads created through the builder, in creation order.
    roads: Vec<RoadId>,
    junctions: Vec<JunctionId>,
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An empty map with default engine parameters and validation on.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        let params = EngineParams {
            validate_after_mutation: true,
            ..Default::default()
        };
        app.insert_resource(params);
        app.add_plugins(RoadNetworkPlugin);
        app.update();
        Self {
            app,
            roads: Vec::new(),
            junctions: Vec::new(),
        }
    }

    /// Two straight default roads of `length` crossing at the origin: road 0
    /// along +X, road 1 along +Y.
    pub fn crossing(length: f32) -> Self {
        let half = length * 0.5;
        Self::new()
            .with_straight_road(Vec2::new(-half, 0.0), Vec2::new(half, 0.0))
            .with_straight_road(Vec2::new(0.0, -half), Vec2::new(0.0, half))
    }

    // -----------------------------------------------------------------------
    // Builder (consumes and returns Self)
    // -----------------------------------------------------------------------

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.map_mut().set_params(params.clone());
        self.app.insert_resource(params);
        self
    }

    /// Stop recording validation findings after each mutation.
    pub fn without_validation(self) -> Self {
        let params = EngineParams {
            validate_after_mutation: false,
            ..self.map().params().clone()
        };
        self.with_params(params)
    }

    pub fn with_road(mut self, spec: RoadSpec) -> Self {
        let id = self
            .map_mut()
            .create_road(spec)
            .unwrap_or_else(|err| panic!("create_road failed: {err}"));
        self.roads.push(id);
        self
    }

    /// Straight road with the default 3+3 driving lanes.
    pub fn with_straight_road(self, from: Vec2, to: Vec2) -> Self {
        self.with_road(RoadSpec::straight(from, to))
    }

    pub fn with_lanes(self, from: Vec2, to: Vec2, lanes_per_side: usize) -> Self {
        self.with_road(RoadSpec::straight(from, to).with_lanes(LaneLayout::driving(lanes_per_side)))
    }

    pub fn with_one_way_road(self, from: Vec2, to: Vec2, lanes: usize) -> Self {
        self.with_road(RoadSpec::straight(from, to).with_lanes(LaneLayout::one_way(lanes)))
    }

    /// Link the end of builder road `a` to the start of builder road `b`.
    pub fn link_end_to_start(self, a: usize, b: usize) -> Self {
        self.link(a, ContactPoint::End, b, ContactPoint::Start)
    }

    pub fn link_end_to_end(self, a: usize, b: usize) -> Self {
        self.link(a, ContactPoint::End, b, ContactPoint::End)
    }

    pub fn link_start_to_start(self, a: usize, b: usize) -> Self {
        self.link(a, ContactPoint::Start, b, ContactPoint::Start)
    }

    fn link(mut self, a: usize, a_contact: ContactPoint, b: usize, b_contact: ContactPoint) -> Self {
        let (a, b) = (self.road(a), self.road(b));
        let target = LinkTarget::Road(RoadEnd::new(b, b_contact));
        let result = match a_contact {
            ContactPoint::Start => self.map_mut().link_predecessor(a, target),
            ContactPoint::End => self.map_mut().link_successor(a, target),
        };
        if let Err(err) = result {
            panic!("linking road {a} to road {b} failed: {err}");
        }
        self
    }

    /// Turn builder roads `a` and `b` into a 4-way crossing junction.
    pub fn with_crossing_junction(mut self, a: usize, b: usize) -> Self {
        let (a, b) = (self.road(a), self.road(b));
        let junction = self
            .map_mut()
            .create_crossing_junction(a, b)
            .unwrap_or_else(|err| panic!("crossing junction failed: {err}"));
        self.junctions.push(junction);
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Id of the `index`-th road created through the builder.
    pub fn road(&self, index: usize) -> RoadId {
        self.roads[index]
    }

    pub fn junction(&self, index: usize) -> JunctionId {
        self.junctions[index]
    }

    pub fn road_data(&self, index: usize) -> &Road {
        let id = self.road(index);
        self.map()
            .road(id)
            .unwrap_or_else(|| panic!("road {id} is gone"))
    }

    pub fn lane(&self, road: RoadId, section: usize, lane: i32) -> &Lane {
        self.map()
            .road(road)
            .and_then(|r| r.sections.get(section))
            .and_then(|s| s.lane(lane))
            .unwrap_or_else(|| panic!("road {road} has no lane {lane} in section {section}"))
    }

    pub fn map(&self) -> &RoadMap {
        self.app.world().resource::<RoadMap>()
    }

    pub fn map_mut(&mut self) -> &mut RoadMap {
        self.app.world_mut().resource_mut::<RoadMap>().into_inner()
    }

    pub fn into_map(mut self) -> RoadMap {
        std::mem::take(self.map_mut())
    }

    pub fn diagnostics(&self) -> &MapDiagnostics {
        self.app.world().resource::<MapDiagnostics>()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn assert_resource_exists<T: Resource>(&self) {
        assert!(
            self.app.world().get_resource::<T>().is_some(),
            "resource {} is missing",
            std::any::type_name::<T>()
        );
    }

    // -----------------------------------------------------------------------
    // Frames and events
    // -----------------------------------------------------------------------

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn send(&mut self, command: RoadCommand) {
        self.app.world_mut().send_event(command);
    }

    pub fn tick(&mut self) {
        self.app.update();
    }

    pub fn tick_n(&mut self, frames: usize) {
        for _ in 0..frames {
            self.app.update();
        }
    }

    pub fn drain_changed_events(&mut self) -> Vec<RoadMapChanged> {
        self.app
            .world_mut()
            .resource_mut::<Events<RoadMapChanged>>()
            .drain()
            .collect()
    }
}
