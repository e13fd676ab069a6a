use crate::math::{distance, lerp, Point2d};
use crate::{JunctionId, LaneId, VehicleId, VehicleSet};

/// A lane represents a single straight lane of traffic.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The lane name, e.g. `"E1_0"`.
    name: String,
    /// The road the lane belongs to.
    edge: String,
    /// The start of the lane's centre line.
    start: Point2d,
    /// The end of the lane's centre line, where the stop line is.
    end: Point2d,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// The lanes that succeed this one.
    lanes_out: Vec<LaneId>,
    /// The junction controlling the end of the lane, if any.
    junction: Option<JunctionId>,
    /// The vehicles on the lane, ordered from back to front.
    vehicles: Vec<VehicleId>,
}

/// The attributes of a lane.
pub struct LaneAttributes<'a> {
    pub name: &'a str,
    pub edge: &'a str,
    pub start: Point2d,
    pub end: Point2d,
    /// The speed limit in m/s.
    pub speed_limit: f64,
}

impl Lane {
    /// Creates a new lane.
    pub(crate) fn new(id: LaneId, attribs: &LaneAttributes) -> Self {
        Self {
            id,
            name: attribs.name.to_string(),
            edge: attribs.edge.to_string(),
            start: attribs.start,
            end: attribs.end,
            speed_limit: attribs.speed_limit,
            lanes_out: vec![],
            junction: None,
            vehicles: vec![],
        }
    }

    /// Gets the lane ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edge(&self) -> &str {
        &self.edge
    }

    /// Gets the length of the lane in m.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Gets the speed limit in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Gets the world position of a point `pos` metres along the lane.
    pub fn sample(&self, pos: f64) -> Point2d {
        let len = self.length();
        match len > 0.0 {
            true => lerp(self.start, self.end, pos / len),
            false => self.start,
        }
    }

    /// Gets the lanes that succeed this one.
    pub fn lanes_out(&self) -> &[LaneId] {
        &self.lanes_out
    }

    /// Gets the junction controlling the end of the lane.
    pub fn junction(&self) -> Option<JunctionId> {
        self.junction
    }

    /// Gets the vehicles on the lane, from back to front.
    pub fn vehicles(&self) -> &[VehicleId] {
        &self.vehicles
    }

    /// Adds a successor lane.
    pub(crate) fn add_lane_out(&mut self, lane_id: LaneId) {
        if !self.lanes_out.contains(&lane_id) {
            self.lanes_out.push(lane_id);
        }
    }

    /// Sets the junction controlling the end of the lane.
    pub(crate) fn set_junction(&mut self, junction: JunctionId) {
        self.junction = Some(junction);
    }

    /// Inserts the vehicle with the given ID into the lane, keeping back to front order.
    pub(crate) fn insert_vehicle(&mut self, vehicles: &VehicleSet, id: VehicleId) {
        let veh_pos = vehicles[id].pos();
        let idx = self
            .vehicles
            .iter()
            .map(|id| vehicles[*id].pos())
            .position(|pos| pos > veh_pos)
            .unwrap_or(self.vehicles.len());
        self.vehicles.insert(idx, id);
    }

    /// Removes the vehicle with the given ID from the lane.
    pub(crate) fn remove_vehicle(&mut self, id: VehicleId) {
        if let Some(idx) = self.vehicles.iter().rposition(|v| *v == id) {
            self.vehicles.remove(idx);
        }
    }
}
