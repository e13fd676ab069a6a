//! The boundary between the coordinator and the traffic simulation.

use crate::error::SimError;
use crate::math::Point2d;
use serde::{Deserialize, Serialize};

/// A read-only snapshot of one vehicle, taken during the current tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub id: String,
    /// The vehicle type, e.g. `"emergency"`.
    pub kind: String,
    pub position: Point2d,
    /// The road the vehicle is on.
    pub edge: String,
    pub lane: String,
    /// Speed in m/s.
    pub speed: f64,
}

/// A movement through a junction, governed by one character of its signal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlledLink {
    pub incoming: String,
    pub outgoing: String,
}

impl ControlledLink {
    pub fn new(incoming: impl Into<String>, outgoing: impl Into<String>) -> Self {
        Self {
            incoming: incoming.into(),
            outgoing: outgoing.into(),
        }
    }
}

/// The queries and mutators the coordinator needs from a traffic simulation.
///
/// The simulation owns all vehicle, lane and junction state. The coordinator only reads it,
/// except through [Self::set_signal_state], [Self::set_phase_duration] and [Self::slow_down].
pub trait SimulationHandle {
    /// The current simulation time in s.
    fn time(&self) -> f64;

    /// The IDs of all vehicles currently in the network.
    fn vehicle_ids(&self) -> Vec<String>;

    /// Gets a snapshot of a vehicle, or `None` if it is not in the network.
    fn vehicle(&self, id: &str) -> Option<VehicleState>;

    /// The IDs of the vehicles on a lane during the last step.
    fn lane_vehicles(&self, lane: &str) -> Result<Vec<String>, SimError>;

    /// The IDs of vehicles that reached their destination during the last step.
    fn arrived_ids(&self) -> Vec<String>;

    /// The IDs of all signalised junctions.
    fn junction_ids(&self) -> Vec<String>;

    /// The location of a junction.
    fn junction_position(&self, junction: &str) -> Result<Point2d, SimError>;

    /// The lanes controlled by a junction, one per controlled link.
    fn controlled_lanes(&self, junction: &str) -> Result<Vec<String>, SimError>;

    /// The links controlled by a junction, in signal state order.
    fn controlled_links(&self, junction: &str) -> Result<Vec<ControlledLink>, SimError>;

    /// The junction's current signal state, one character per controlled link.
    fn signal_state(&self, junction: &str) -> Result<String, SimError>;

    /// Replaces the junction's signal state.
    fn set_signal_state(&mut self, junction: &str, state: &str) -> Result<(), SimError>;

    /// The time until the junction's current phase ends, in s.
    fn remaining_phase_time(&self, junction: &str) -> Result<f64, SimError>;

    /// Sets the duration of the junction's current phase, measured from now, in s.
    /// Fails with [SimError::InvalidDuration] if `duration` is negative or not finite.
    fn set_phase_duration(&mut self, junction: &str, duration: f64) -> Result<(), SimError>;

    /// Gradually slows a vehicle to `speed` over `duration` seconds.
    fn slow_down(&mut self, vehicle: &str, speed: f64, duration: f64) -> Result<(), SimError>;
}
