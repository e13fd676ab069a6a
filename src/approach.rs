use crate::error::SimError;
use crate::handle::SimulationHandle;
use itertools::Itertools;
use std::collections::HashSet;

/// Marks that a priority event has already been sent for a vehicle's approach to a junction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApproachRecord {
    pub junction: String,
    pub vehicle: String,
}

/// An emergency vehicle found on one of a junction's controlled lanes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    pub vehicle: String,
    pub lane: String,
}

/// The state of a (junction, vehicle) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApproachState {
    /// The vehicle is not approaching the junction.
    Absent,
    /// The vehicle is on a controlled lane and its priority event has been sent.
    Notified,
}

/// The outcome of observing one junction for one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No emergency vehicle is on the junction's controlled lanes.
    Idle,
    /// A new approach began; a priority event must be sent for it.
    Fired(Occupant),
    /// The approach was already notified.
    Held(Occupant),
}

impl Transition {
    /// Gets the emergency vehicle the junction should favour this tick.
    pub fn occupant(&self) -> Option<&Occupant> {
        match self {
            Transition::Idle => None,
            Transition::Fired(occupant) | Transition::Held(occupant) => Some(occupant),
        }
    }
}

/// Decides when an emergency vehicle's approach to a junction should raise a priority event.
///
/// Each approach raises exactly one event. An approach ends once the vehicle is no longer
/// on any of the junction's controlled lanes, so a later return raises a new event.
///
/// Only the first emergency vehicle found at a junction (in controlled lane order) is
/// tracked. Others are picked up once it leaves.
#[derive(Clone, Debug, Default)]
pub struct ApproachTrigger {
    records: HashSet<ApproachRecord>,
}

impl ApproachTrigger {
    /// Creates a trigger with no approaches in progress.
    pub fn new() -> Self {
        Default::default()
    }

    /// Updates the approaches to `junction` given the emergency vehicles currently on its
    /// controlled lanes, in lane order.
    pub fn observe(&mut self, junction: &str, occupants: &[Occupant]) -> Transition {
        self.records.retain(|record| {
            record.junction != junction || occupants.iter().any(|o| o.vehicle == record.vehicle)
        });

        let Some(first) = occupants.first() else {
            return Transition::Idle;
        };
        let fresh = self.records.insert(ApproachRecord {
            junction: junction.to_string(),
            vehicle: first.vehicle.clone(),
        });
        match fresh {
            true => Transition::Fired(first.clone()),
            false => Transition::Held(first.clone()),
        }
    }

    /// Ends every approach of a vehicle, e.g. once it has left the simulation.
    pub fn forget_vehicle(&mut self, vehicle: &str) {
        self.records.retain(|record| record.vehicle != vehicle);
    }

    /// Gets the state of a (junction, vehicle) pair.
    pub fn state(&self, junction: &str, vehicle: &str) -> ApproachState {
        let record = ApproachRecord {
            junction: junction.to_string(),
            vehicle: vehicle.to_string(),
        };
        match self.records.contains(&record) {
            true => ApproachState::Notified,
            false => ApproachState::Absent,
        }
    }

    /// Returns an iterator over the approaches in progress.
    pub fn records(&self) -> impl Iterator<Item = &ApproachRecord> {
        self.records.iter()
    }
}

/// Finds the emergency vehicles on a junction's controlled lanes.
///
/// Lanes are visited in controlled lane order, each once. Internal lanes, whose IDs start
/// with `:`, are skipped when `skip_internal` is set.
pub fn scan_junction<S: SimulationHandle + ?Sized>(
    sim: &S,
    junction: &str,
    emergency_type: &str,
    skip_internal: bool,
) -> Result<Vec<Occupant>, SimError> {
    let lanes = sim.controlled_lanes(junction)?;
    let mut occupants = vec![];
    for lane in lanes.iter().unique() {
        if skip_internal && lane.starts_with(':') {
            continue;
        }
        for vehicle in sim.lane_vehicles(lane)? {
            let is_emergency = sim
                .vehicle(&vehicle)
                .map_or(false, |v| v.kind == emergency_type);
            if is_emergency {
                occupants.push(Occupant {
                    vehicle,
                    lane: lane.clone(),
                });
            }
        }
    }
    Ok(occupants)
}
