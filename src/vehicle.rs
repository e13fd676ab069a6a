use crate::LaneId;

/// The maximum acceleration of all vehicles in m/s<sup>2</sup>.
const MAX_ACC: f64 = 2.6;

/// The comfortable deceleration of all vehicles in m/s<sup>2</sup>.
const COMF_DEC: f64 = 4.5;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's name, e.g. `"ev0"`.
    name: String,
    /// The vehicle type, e.g. `"emergency"`.
    kind: String,
    /// The speed the vehicle travels at when unobstructed, in m/s.
    desired_speed: f64,
    /// Multiplies the desired speed.
    speed_adjust: f64,
    /// The vehicle's route, including the lane it's currently on.
    route: Vec<LaneId>,
    /// The index of the current lane in the route.
    route_idx: usize,
    /// The longitudinal position along the current lane, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// An imposed gradual slow down.
    slow_down: Option<SlowDown>,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy)]
pub struct VehicleAttributes<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    /// The speed the vehicle travels at when unobstructed, in m/s.
    pub desired_speed: f64,
}

/// A speed cap which falls linearly from `from` to `to` over a time interval.
#[derive(Clone, Copy, Debug)]
struct SlowDown {
    from: f64,
    to: f64,
    start: f64,
    duration: f64,
}

impl SlowDown {
    /// Gets the speed cap at time `t`, or `None` once the slow down has finished.
    fn cap(&self, t: f64) -> Option<f64> {
        let elapsed = t - self.start;
        if elapsed > self.duration {
            return None;
        }
        let frac = match self.duration > 0.0 {
            true => (elapsed / self.duration).clamp(0.0, 1.0),
            false => 1.0,
        };
        Some(self.from + frac * (self.to - self.from))
    }
}

impl Vehicle {
    /// Creates a new vehicle at the start of its route.
    pub(crate) fn new(attributes: &VehicleAttributes, route: Vec<LaneId>) -> Self {
        Self {
            name: attributes.name.to_string(),
            kind: attributes.kind.to_string(),
            desired_speed: attributes.desired_speed,
            speed_adjust: 1.0,
            route,
            route_idx: 0,
            pos: 0.0,
            vel: 0.0,
            slow_down: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Gets the lane the vehicle is on.
    pub fn lane_id(&self) -> LaneId {
        self.route[self.route_idx]
    }

    /// Gets the next lane on the vehicle's route, if there is one.
    pub fn next_lane(&self) -> Option<LaneId> {
        self.route.get(self.route_idx + 1).copied()
    }

    /// Gets the position along the current lane in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// Gets the velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// Sets the desired velocity adjustment factor.
    pub(crate) fn set_speed_adjust(&mut self, factor: f64) {
        self.speed_adjust = factor;
    }

    /// Slows the vehicle from its current speed to `speed` over `duration` seconds,
    /// starting at simulation time `now`.
    pub(crate) fn slow_down(&mut self, speed: f64, duration: f64, now: f64) {
        self.slow_down = Some(SlowDown {
            from: self.vel.max(speed),
            to: speed,
            start: now,
            duration,
        });
    }

    /// Computes the speed the vehicle would like to reach at time `now` on a lane
    /// with the given speed limit.
    pub(crate) fn target_speed(&mut self, speed_limit: f64, now: f64) -> f64 {
        let mut target = f64::min(self.desired_speed * self.speed_adjust, speed_limit);
        match self.slow_down.and_then(|s| s.cap(now)) {
            Some(cap) => target = target.min(cap),
            None => self.slow_down = None,
        }
        target
    }

    /// Accelerates towards `target` and advances the vehicle, never past `max_pos`.
    pub(crate) fn integrate(&mut self, target: f64, max_pos: f64, dt: f64) {
        let dv = (target - self.vel).clamp(-COMF_DEC * dt, MAX_ACC * dt);
        self.vel = f64::max(self.vel + dv, 0.0);
        let next = self.pos + self.vel * dt;
        if next >= max_pos {
            self.pos = f64::max(max_pos, self.pos);
            if max_pos.is_finite() {
                self.vel = 0.0;
            }
        } else {
            self.pos = next;
        }
    }

    /// Moves the vehicle onto the next lane of its route, carrying over `overshoot` metres.
    pub(crate) fn advance(&mut self, overshoot: f64) {
        self.route_idx += 1;
        self.pos = overshoot;
    }
}
