use serde::Serialize;
use std::collections::HashMap;

/// One completed emergency vehicle journey.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JourneyRecord {
    pub vehicle_id: String,
    /// Simulation time the vehicle was first seen, in s.
    pub depart: f64,
    /// Simulation time the vehicle arrived, in s.
    pub arrival: f64,
    pub travel_time: f64,
    /// The edge the vehicle was first seen on.
    pub origin: String,
    /// The last edge the vehicle was seen on.
    pub destination: String,
}

#[derive(Clone, Debug)]
struct OpenJourney {
    depart: f64,
    origin: String,
    last_edge: String,
}

/// Records depart and arrival times of emergency vehicles.
#[derive(Clone, Debug, Default)]
pub struct JourneyTracker {
    open: HashMap<String, OpenJourney>,
    completed: Vec<JourneyRecord>,
}

impl JourneyTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Notes that a vehicle is on `edge` at `time`. The first sighting is its departure.
    pub fn observe(&mut self, vehicle: &str, edge: &str, time: f64) {
        let journey = self
            .open
            .entry(vehicle.to_string())
            .or_insert_with(|| OpenJourney {
                depart: time,
                origin: edge.to_string(),
                last_edge: edge.to_string(),
            });
        if journey.last_edge != edge {
            journey.last_edge = edge.to_string();
        }
    }

    /// Closes the journey of a vehicle that arrived at `time`.
    /// Returns the record, or `None` if the vehicle was never observed.
    pub fn arrive(&mut self, vehicle: &str, time: f64) -> Option<&JourneyRecord> {
        let journey = self.open.remove(vehicle)?;
        self.completed.push(JourneyRecord {
            vehicle_id: vehicle.to_string(),
            depart: journey.depart,
            arrival: time,
            travel_time: time - journey.depart,
            origin: journey.origin,
            destination: journey.last_edge,
        });
        self.completed.last()
    }

    /// Gets the journeys completed so far, in arrival order.
    pub fn completed(&self) -> &[JourneyRecord] {
        &self.completed
    }

    /// Gets the departure time of a vehicle still travelling.
    pub fn depart_time(&self, vehicle: &str) -> Option<f64> {
        self.open.get(vehicle).map(|j| j.depart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_travel_time() {
        let mut tracker = JourneyTracker::new();
        tracker.observe("ev0", "e1", 60.0);
        tracker.observe("ev0", "e2", 61.0);
        tracker.observe("ev0", "e3", 90.0);
        let record = tracker.arrive("ev0", 95.5).unwrap();
        assert_eq!(record.origin, "e1");
        assert_eq!(record.destination, "e3");
        assert!((record.travel_time - 35.5).abs() < 1e-9);
        assert!(tracker.depart_time("ev0").is_none());
    }

    #[test]
    fn unseen_arrival_is_ignored() {
        let mut tracker = JourneyTracker::new();
        assert!(tracker.arrive("ghost", 1.0).is_none());
        assert!(tracker.completed().is_empty());
    }
}
