//! A scripted simulation for driving the coordinator tick by tick.

#![allow(dead_code)]

use ev_priority::math::Point2d;
use ev_priority::{ControlledLink, SimError, SimulationHandle, VehicleState};

pub struct StubJunction {
    pub id: String,
    pub position: Point2d,
    pub lanes: Vec<String>,
    pub links: Vec<ControlledLink>,
    pub state: String,
    pub remaining: f64,
}

#[derive(Default)]
pub struct StubSim {
    pub time: f64,
    pub vehicles: Vec<VehicleState>,
    pub junctions: Vec<StubJunction>,
    pub arrived: Vec<String>,
    pub slowed: Vec<(String, f64, f64)>,
    pub state_writes: usize,
}

impl StubSim {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a junction whose links leave the given lanes, in order.
    pub fn add_junction(&mut self, id: &str, x: f64, y: f64, lanes: &[&str], state: &str) {
        self.junctions.push(StubJunction {
            id: id.to_string(),
            position: Point2d::new(x, y),
            lanes: lanes.iter().map(|l| l.to_string()).collect(),
            links: lanes
                .iter()
                .map(|l| ControlledLink::new(*l, format!("{}_out", id)))
                .collect(),
            state: state.to_string(),
            remaining: 10.0,
        });
    }

    /// Places a vehicle on a lane, replacing any previous state.
    pub fn place(&mut self, id: &str, kind: &str, lane: &str, x: f64, y: f64, speed: f64) {
        self.vehicles.retain(|v| v.id != id);
        self.vehicles.push(VehicleState {
            id: id.to_string(),
            kind: kind.to_string(),
            position: Point2d::new(x, y),
            edge: lane.split('_').next().unwrap_or(lane).to_string(),
            lane: lane.to_string(),
            speed,
        });
    }

    /// Removes a vehicle as if it reached its destination.
    pub fn arrive(&mut self, id: &str) {
        self.vehicles.retain(|v| v.id != id);
        self.arrived.push(id.to_string());
    }

    /// Moves on to the next tick.
    pub fn step(&mut self, dt: f64) {
        self.time += dt;
        self.arrived.clear();
    }

    pub fn junction_state(&self, id: &str) -> &str {
        &self.find(id).unwrap().state
    }

    pub fn junction_mut(&mut self, id: &str) -> &mut StubJunction {
        self.junctions.iter_mut().find(|j| j.id == id).unwrap()
    }

    fn find(&self, id: &str) -> Result<&StubJunction, SimError> {
        self.junctions
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| SimError::UnknownJunction(id.to_string()))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut StubJunction, SimError> {
        self.junctions
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| SimError::UnknownJunction(id.to_string()))
    }
}

impl SimulationHandle for StubSim {
    fn time(&self) -> f64 {
        self.time
    }

    fn vehicle_ids(&self) -> Vec<String> {
        self.vehicles.iter().map(|v| v.id.clone()).collect()
    }

    fn vehicle(&self, id: &str) -> Option<VehicleState> {
        self.vehicles.iter().find(|v| v.id == id).cloned()
    }

    fn lane_vehicles(&self, lane: &str) -> Result<Vec<String>, SimError> {
        Ok(self
            .vehicles
            .iter()
            .filter(|v| v.lane == lane)
            .map(|v| v.id.clone())
            .collect())
    }

    fn arrived_ids(&self) -> Vec<String> {
        self.arrived.clone()
    }

    fn junction_ids(&self) -> Vec<String> {
        self.junctions.iter().map(|j| j.id.clone()).collect()
    }

    fn junction_position(&self, junction: &str) -> Result<Point2d, SimError> {
        Ok(self.find(junction)?.position)
    }

    fn controlled_lanes(&self, junction: &str) -> Result<Vec<String>, SimError> {
        Ok(self.find(junction)?.lanes.clone())
    }

    fn controlled_links(&self, junction: &str) -> Result<Vec<ControlledLink>, SimError> {
        Ok(self.find(junction)?.links.clone())
    }

    fn signal_state(&self, junction: &str) -> Result<String, SimError> {
        Ok(self.find(junction)?.state.clone())
    }

    fn set_signal_state(&mut self, junction: &str, state: &str) -> Result<(), SimError> {
        self.find_mut(junction)?.state = state.to_string();
        self.state_writes += 1;
        Ok(())
    }

    fn remaining_phase_time(&self, junction: &str) -> Result<f64, SimError> {
        Ok(self.find(junction)?.remaining)
    }

    fn set_phase_duration(&mut self, junction: &str, duration: f64) -> Result<(), SimError> {
        self.find_mut(junction)?.remaining = duration;
        Ok(())
    }

    fn slow_down(&mut self, vehicle: &str, speed: f64, duration: f64) -> Result<(), SimError> {
        if !self.vehicles.iter().any(|v| v.id == vehicle) {
            return Err(SimError::UnknownVehicle(vehicle.to_string()));
        }
        self.slowed.push((vehicle.to_string(), speed, duration));
        Ok(())
    }
}
