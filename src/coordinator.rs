use crate::approach::{scan_junction, ApproachTrigger, Occupant, Transition};
use crate::channel::PriorityChannel;
use crate::config::CoordinatorConfig;
use crate::decision::{Applied, DecisionApplier};
use crate::error::{ConfigError, TickError};
use crate::handle::SimulationHandle;
use crate::journey::{JourneyRecord, JourneyTracker};
use crate::light::{SignalOverrideController, SignalState};
use crate::math::distance;
use crate::message::{OutboundMessage, PriorityEvent, TrackingUpdate};
use crate::registry::{Rsu, RsuRegistry};

/// Everything that happened during one call to [PriorityCoordinator::tick].
#[derive(Debug, Default)]
pub struct TickReport {
    /// Simulation time of the tick, in s.
    pub time: f64,
    /// Priority events raised this tick.
    pub events: Vec<PriorityEvent>,
    /// Junctions whose signals were overridden, with the state written.
    pub overrides: Vec<(String, SignalState)>,
    /// Decisions applied this tick.
    pub applied: Vec<Applied>,
    /// Journeys completed this tick.
    pub journeys: Vec<JourneyRecord>,
    /// Failures that were isolated to one vehicle, junction or message.
    pub errors: Vec<TickError>,
}

/// Grants signal priority to emergency vehicles, one simulation tick at a time.
///
/// Each tick the coordinator:
/// 1. applies the decisions that have arrived from the decision service,
/// 2. closes the approaches and journeys of vehicles that left the network,
/// 3. tracks every emergency vehicle against its nearest RSU,
/// 4. scans every RSU's junction, raising a priority event when an approach begins and
///    overriding the junction's signals for as long as it lasts.
///
/// Failures are confined to the vehicle, junction or message concerned and are returned
/// in the [TickReport]; none of them stops the tick.
pub struct PriorityCoordinator {
    config: CoordinatorConfig,
    registry: RsuRegistry,
    trigger: ApproachTrigger,
    overrides: SignalOverrideController,
    applier: DecisionApplier,
    channel: PriorityChannel,
    journeys: JourneyTracker,
}

impl PriorityCoordinator {
    /// Creates a coordinator for the RSUs in `config`, validating them against `sim`.
    pub fn new<S: SimulationHandle + ?Sized>(
        config: CoordinatorConfig,
        sim: &S,
        channel: PriorityChannel,
    ) -> Result<Self, ConfigError> {
        let registry = RsuRegistry::build(&config.rsus, sim)?;
        Ok(Self {
            config,
            registry,
            trigger: ApproachTrigger::new(),
            overrides: SignalOverrideController,
            applier: DecisionApplier,
            channel,
            journeys: JourneyTracker::new(),
        })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Gets the RSU registry.
    pub fn registry(&self) -> &RsuRegistry {
        &self.registry
    }

    /// Gets the approach trigger and the approaches it is tracking.
    pub fn trigger(&self) -> &ApproachTrigger {
        &self.trigger
    }

    /// Gets the journeys recorded so far.
    pub fn journeys(&self) -> &JourneyTracker {
        &self.journeys
    }

    /// Runs the coordinator for the simulation's current step.
    /// Call once after every simulation step.
    pub fn tick<S: SimulationHandle + ?Sized>(&mut self, sim: &mut S) -> TickReport {
        let mut report = TickReport {
            time: sim.time(),
            ..Default::default()
        };
        self.apply_decisions(sim, &mut report);
        self.handle_arrivals(sim, &mut report);
        self.track_vehicles(sim, &mut report);
        self.update_junctions(sim, &mut report);
        report
    }

    /// Applies every decision received since the last tick.
    fn apply_decisions<S: SimulationHandle + ?Sized>(&self, sim: &mut S, report: &mut TickReport) {
        for decision in self.channel.drain_decisions() {
            match self.applier.apply(sim, &self.registry, &decision) {
                Ok(applied) => report.applied.push(applied),
                Err(err) => {
                    log::warn!("Discarding decision for {}: {}", decision.target, err);
                    report.errors.push(err.into());
                }
            }
        }
    }

    /// Ends the approaches and journeys of vehicles that have left the network.
    fn handle_arrivals<S: SimulationHandle + ?Sized>(&mut self, sim: &S, report: &mut TickReport) {
        for vehicle in sim.arrived_ids() {
            self.trigger.forget_vehicle(&vehicle);
            if let Some(record) = self.journeys.arrive(&vehicle, report.time) {
                log::info!(
                    "Vehicle {} arrived after {:.1}s",
                    record.vehicle_id,
                    record.travel_time
                );
                report.journeys.push(record.clone());
            }
        }
    }

    /// Records, reports and clears the way for every emergency vehicle.
    fn track_vehicles<S: SimulationHandle + ?Sized>(&mut self, sim: &mut S, report: &mut TickReport) {
        let vehicles = sim
            .vehicle_ids()
            .iter()
            .filter_map(|id| sim.vehicle(id))
            .collect::<Vec<_>>();
        let emergency_type = self.config.emergency_type.clone();

        for ev in vehicles.iter().filter(|v| v.kind == emergency_type) {
            self.journeys.observe(&ev.id, &ev.edge, report.time);

            let nearest = self.registry.nearest(ev.position);
            if let Some((rsu, dist)) = nearest {
                log::debug!("Vehicle {} nearest RSU {} at {:.1}m", ev.id, rsu.id(), dist);
            }
            if self.config.tracking_updates {
                let update = TrackingUpdate {
                    ev_id: ev.id.clone(),
                    location: [ev.position.x, ev.position.y],
                    time: report.time,
                    lane: ev.lane.clone(),
                    edge: ev.edge.clone(),
                    rsu: nearest.map(|(rsu, _)| rsu.id().to_string()),
                };
                self.send(OutboundMessage::Tracking(update), report);
            }

            if let Some(clear) = self.config.clear_lane {
                let sharing_edge = vehicles
                    .iter()
                    .filter(|v| v.id != ev.id && v.edge == ev.edge && v.kind != emergency_type);
                for other in sharing_edge {
                    if let Err(err) = sim.slow_down(&other.id, clear.speed, clear.duration) {
                        log::warn!("Could not slow vehicle {}: {}", other.id, err);
                        report.errors.push(err.into());
                    }
                }
            }
        }
    }

    /// Scans every RSU's junction for emergency vehicles, raising events and
    /// overriding signals as required.
    fn update_junctions<S: SimulationHandle + ?Sized>(&mut self, sim: &mut S, report: &mut TickReport) {
        for rsu in self.registry.all() {
            let junction = rsu.junction();
            let occupants = match scan_junction(
                sim,
                junction,
                &self.config.emergency_type,
                self.config.skip_internal_lanes,
            ) {
                Ok(occupants) => occupants,
                Err(err) => {
                    log::warn!("Could not scan junction {}: {}", junction, err);
                    report.errors.push(err.into());
                    continue;
                }
            };

            let transition = self.trigger.observe(junction, &occupants);
            if let Transition::Fired(occupant) = &transition {
                if let Some(event) = self.priority_event(sim, rsu, occupant, report.time) {
                    log::info!(
                        "Vehicle {} approaching {} on {}, {:.1}m away, ETA {:.1}s",
                        event.ev_id,
                        event.rsu_id,
                        occupant.lane,
                        event.distance,
                        event.eta_seconds
                    );
                    report.events.push(event.clone());
                    self.send(OutboundMessage::Priority(event), report);
                }
            }

            if let Some(occupant) = transition.occupant() {
                match self.overrides.apply(sim, junction, &occupant.lane) {
                    Ok(state) => report.overrides.push((junction.to_string(), state)),
                    Err(err) => {
                        log::warn!("Could not override junction {}: {}", junction, err);
                        report.errors.push(err.into());
                    }
                }
            }
        }
    }

    /// Builds the priority event for an approach that just began.
    fn priority_event<S: SimulationHandle + ?Sized>(
        &self,
        sim: &S,
        rsu: &Rsu,
        occupant: &Occupant,
        time: f64,
    ) -> Option<PriorityEvent> {
        let ev = sim.vehicle(&occupant.vehicle)?;
        let dist = distance(ev.position, rsu.location());
        Some(PriorityEvent {
            ev_id: ev.id,
            rsu_id: rsu.id().to_string(),
            tls_id: rsu.junction().to_string(),
            position: ev.position.into(),
            speed: ev.speed,
            distance: dist,
            eta_seconds: dist / ev.speed.max(self.config.min_eta_speed),
            sim_time: time,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Sends a message, logging and recording the failure if it is dropped.
    fn send(&self, message: OutboundMessage, report: &mut TickReport) {
        if let Err(err) = self.channel.send(message) {
            log::warn!("Dropped message to decision service: {}", err);
            report.errors.push(err.into());
        }
    }
}
