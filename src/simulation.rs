use crate::error::SimError;
use crate::handle::{ControlledLink, SimulationHandle, VehicleState};
use crate::junction::{Junction, JunctionAttributes};
use crate::lane::{Lane, LaneAttributes};
use crate::light::{parse_state, LightState};
use crate::math::Point2d;
use crate::vehicle::{Vehicle, VehicleAttributes};
use crate::{JunctionId, LaneId, LaneSet, VehicleId, VehicleSet};
use itertools::Itertools;
use rand_distr::Distribution;
use slotmap::SlotMap;
use std::collections::HashMap;

/// The minimum gap to keep behind the vehicle ahead, in m.
const MIN_GAP: f64 = 7.5; // m

/// A small lane-based traffic simulation.
///
/// Vehicles drive along straight lanes at their desired speed, keep a gap to the vehicle
/// ahead, stop at the end of a lane unless the junction shows green for their next lane,
/// and leave the network at the end of their route.
#[derive(Default)]
pub struct Simulation {
    /// The lanes in the network.
    lanes: LaneSet,
    lane_names: HashMap<String, LaneId>,
    /// The signalised junctions.
    junctions: SlotMap<JunctionId, Junction>,
    junction_names: HashMap<String, JunctionId>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    vehicle_names: HashMap<String, VehicleId>,
    /// Vehicles which reached the end of their route in the last step.
    arrived: Vec<String>,
    /// The current simulation time in s.
    time: f64,
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a lane to the network.
    pub fn add_lane(&mut self, attributes: &LaneAttributes) -> LaneId {
        let id = self.lanes.insert_with_key(|id| Lane::new(id, attributes));
        self.lane_names.insert(attributes.name.to_string(), id);
        id
    }

    /// Specifies that the end of the `from` lane connects to the start of the `to` lane.
    pub fn add_lane_connection(&mut self, from: LaneId, to: LaneId) {
        self.lanes[from].add_lane_out(to);
    }

    /// Adds a signalised junction. Its links become lane connections controlled by it.
    pub fn add_junction(&mut self, attributes: JunctionAttributes) -> JunctionId {
        let links = attributes.links.to_vec();
        let name = attributes.name.to_string();
        let id = self.junctions.insert(Junction::new(attributes));
        for (from, to) in links {
            self.add_lane_connection(from, to);
            self.lanes[from].set_junction(id);
        }
        self.junction_names.insert(name, id);
        id
    }

    /// Adds a vehicle at the start of the first lane of `route`.
    pub fn add_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        route: &[LaneId],
    ) -> Result<VehicleId, SimError> {
        let connected = route
            .iter()
            .tuple_windows()
            .all(|(a, b)| self.lanes[*a].lanes_out().contains(b));
        if route.is_empty() || !connected {
            return Err(SimError::UnknownLane(format!(
                "no route for vehicle {}",
                attributes.name
            )));
        }
        let vehicle_id = self.vehicles.insert(Vehicle::new(attributes, route.to_vec()));
        self.lanes[route[0]].insert_vehicle(&self.vehicles, vehicle_id);
        self.vehicle_names
            .insert(attributes.name.to_string(), vehicle_id);
        Ok(vehicle_id)
    }

    /// Adds a vehicle travelling along the shortest route from `from` to `to`.
    pub fn add_vehicle_between(
        &mut self,
        attributes: &VehicleAttributes,
        from: LaneId,
        to: LaneId,
    ) -> Result<VehicleId, SimError> {
        let route = self.find_route(from, to).ok_or_else(|| {
            SimError::UnknownLane(format!("no route for vehicle {}", attributes.name))
        })?;
        self.add_vehicle(attributes, &route)
    }

    /// Finds the shortest route between two lanes, by length.
    pub fn find_route(&self, from: LaneId, to: LaneId) -> Option<Vec<LaneId>> {
        let (route, _) = pathfinding::prelude::dijkstra(
            &from,
            |lane_id| {
                let lane = &self.lanes[*lane_id];
                lane.lanes_out()
                    .iter()
                    .map(|next| (*next, (self.lanes[*next].length() * 1000.0) as u64))
                    .collect::<Vec<_>>()
            },
            |lane_id| *lane_id == to,
        )?;
        Some(route)
    }

    /// Randomly assigns a desired velocity adjustment factor to each vehicle,
    /// which is sampled from a normal distribution with a mean of 1 (no adjustment)
    /// and standard deviation of `stddev`.
    pub fn randomise_velocity_adjusts(&mut self, stddev: f64) {
        let mut rand = rand::thread_rng();
        let distr = rand_distr::Normal::new(1.0, stddev).expect("Invalid standard deviation");
        for (_, vehicle) in &mut self.vehicles {
            let factor = distr.sample(&mut rand).clamp(0.75, 1.25);
            vehicle.set_speed_adjust(factor);
        }
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.arrived.clear();
        self.time += dt;
        self.update_lights(dt);
        self.integrate(dt);
        self.advance_vehicles();
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    /// Looks up a lane by name.
    pub fn lane_id(&self, name: &str) -> Option<LaneId> {
        self.lane_names.get(name).copied()
    }

    /// Advances every junction's signal program.
    fn update_lights(&mut self, dt: f64) {
        for (_, junction) in &mut self.junctions {
            junction.program_mut().step(dt);
        }
    }

    /// Works out how far each vehicle may travel and moves it, front to back on each lane.
    fn integrate(&mut self, dt: f64) {
        for (_, lane) in &self.lanes {
            let mut limit = f64::INFINITY;
            for vehicle_id in lane.vehicles().iter().rev() {
                let vehicle = &mut self.vehicles[*vehicle_id];
                let stop_line = match Self::may_leave(&self.junctions, lane, vehicle.next_lane()) {
                    true => f64::INFINITY,
                    false => lane.length(),
                };
                let max_pos = f64::min(limit, stop_line);
                let target = vehicle.target_speed(lane.speed_limit(), self.time);
                vehicle.integrate(target, max_pos, dt);
                limit = vehicle.pos() - MIN_GAP;
            }
        }
    }

    /// Determines whether a vehicle may pass the end of `lane` towards `next`.
    /// Uncontrolled connections and the end of a route are always passable.
    fn may_leave(
        junctions: &SlotMap<JunctionId, Junction>,
        lane: &Lane,
        next: Option<LaneId>,
    ) -> bool {
        let (Some(junction_id), Some(next)) = (lane.junction(), next) else {
            return true;
        };
        match junctions[junction_id].link_state(lane.id(), next) {
            Some(state) => state == LightState::Green,
            None => true,
        }
    }

    /// Find vehicles that have passed the end of their lane and either move them
    /// to their next lane or remove them from the simulation.
    fn advance_vehicles(&mut self) {
        let mut advanced = vec![];
        let mut exited = vec![];

        for (vehicle_id, vehicle) in &mut self.vehicles {
            let lane_id = vehicle.lane_id();
            let length = self.lanes[lane_id].length();
            if vehicle.pos() <= length {
                continue;
            }
            self.lanes[lane_id].remove_vehicle(vehicle_id);
            match vehicle.next_lane() {
                Some(next) => {
                    vehicle.advance(vehicle.pos() - length);
                    advanced.push((vehicle_id, next));
                }
                None => exited.push(vehicle_id),
            }
        }

        for (vehicle_id, lane_id) in advanced {
            self.lanes[lane_id].insert_vehicle(&self.vehicles, vehicle_id);
        }

        for vehicle_id in exited {
            if let Some(vehicle) = self.vehicles.remove(vehicle_id) {
                self.vehicle_names.remove(vehicle.name());
                self.arrived.push(vehicle.name().to_string());
            }
        }
    }

    fn junction(&self, name: &str) -> Result<&Junction, SimError> {
        self.junction_names
            .get(name)
            .map(|id| &self.junctions[*id])
            .ok_or_else(|| SimError::UnknownJunction(name.to_string()))
    }

    fn junction_mut(&mut self, name: &str) -> Result<&mut Junction, SimError> {
        match self.junction_names.get(name) {
            Some(id) => Ok(&mut self.junctions[*id]),
            None => Err(SimError::UnknownJunction(name.to_string())),
        }
    }
}

impl SimulationHandle for Simulation {
    fn time(&self) -> f64 {
        self.time
    }

    fn vehicle_ids(&self) -> Vec<String> {
        self.vehicles.values().map(|v| v.name().to_string()).collect()
    }

    fn vehicle(&self, id: &str) -> Option<VehicleState> {
        let vehicle = &self.vehicles[*self.vehicle_names.get(id)?];
        let lane = &self.lanes[vehicle.lane_id()];
        Some(VehicleState {
            id: vehicle.name().to_string(),
            kind: vehicle.kind().to_string(),
            position: lane.sample(vehicle.pos()),
            edge: lane.edge().to_string(),
            lane: lane.name().to_string(),
            speed: vehicle.vel(),
        })
    }

    fn lane_vehicles(&self, lane: &str) -> Result<Vec<String>, SimError> {
        let lane_id = self
            .lane_id(lane)
            .ok_or_else(|| SimError::UnknownLane(lane.to_string()))?;
        Ok(self.lanes[lane_id]
            .vehicles()
            .iter()
            .map(|id| self.vehicles[*id].name().to_string())
            .collect())
    }

    fn arrived_ids(&self) -> Vec<String> {
        self.arrived.clone()
    }

    fn junction_ids(&self) -> Vec<String> {
        self.junctions
            .values()
            .map(|j| j.name().to_string())
            .collect()
    }

    fn junction_position(&self, junction: &str) -> Result<Point2d, SimError> {
        Ok(self.junction(junction)?.position())
    }

    fn controlled_lanes(&self, junction: &str) -> Result<Vec<String>, SimError> {
        Ok(self
            .junction(junction)?
            .links()
            .iter()
            .map(|(from, _)| self.lanes[*from].name().to_string())
            .collect())
    }

    fn controlled_links(&self, junction: &str) -> Result<Vec<ControlledLink>, SimError> {
        Ok(self
            .junction(junction)?
            .links()
            .iter()
            .map(|(from, to)| ControlledLink::new(self.lanes[*from].name(), self.lanes[*to].name()))
            .collect())
    }

    fn signal_state(&self, junction: &str) -> Result<String, SimError> {
        Ok(self.junction(junction)?.program().state().to_string())
    }

    fn set_signal_state(&mut self, junction: &str, state: &str) -> Result<(), SimError> {
        let parsed = parse_state(junction, state)?;
        let program = self.junction_mut(junction)?.program_mut();
        if parsed.len() != program.num_links() {
            return Err(SimError::InvalidState {
                junction: junction.to_string(),
                state: state.to_string(),
            });
        }
        program.force(parsed);
        Ok(())
    }

    fn remaining_phase_time(&self, junction: &str) -> Result<f64, SimError> {
        Ok(self.junction(junction)?.program().remaining())
    }

    fn set_phase_duration(&mut self, junction: &str, duration: f64) -> Result<(), SimError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(SimError::InvalidDuration {
                junction: junction.to_string(),
                duration,
            });
        }
        self.junction_mut(junction)?
            .program_mut()
            .set_remaining(duration);
        Ok(())
    }

    fn slow_down(&mut self, vehicle: &str, speed: f64, duration: f64) -> Result<(), SimError> {
        let id = self
            .vehicle_names
            .get(vehicle)
            .ok_or_else(|| SimError::UnknownVehicle(vehicle.to_string()))?;
        self.vehicles[*id].slow_down(speed, duration, self.time);
        Ok(())
    }
}
