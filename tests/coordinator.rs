//! Tests of the coordinator's tick loop against a scripted simulation.

mod common;

use assert_approx_eq::assert_approx_eq;
use common::StubSim;
use ev_priority::{
    Applied, ApproachState, CoordinatorConfig, DecisionAction, DecisionError, OutboundMessage,
    OverrideError, PriorityChannel, PriorityCoordinator, PriorityDecision, RsuConfig,
    ServiceEndpoint, TickError, TransportError,
};

fn config(junctions: &[&str]) -> CoordinatorConfig {
    CoordinatorConfig {
        rsus: junctions
            .iter()
            .map(|j| RsuConfig {
                id: format!("RSU_{}", j),
                junction: j.to_string(),
            })
            .collect(),
        tracking_updates: false,
        clear_lane: None,
        ..Default::default()
    }
}

/// Two junctions 100 m apart, each controlling three incoming lanes.
fn two_junctions() -> StubSim {
    let mut sim = StubSim::new();
    sim.add_junction("J1", 0.0, 0.0, &["laneA_0", "laneB_0", "laneC_0"], "GGr");
    sim.add_junction("J4", 100.0, 0.0, &["laneD_0", "laneE_0"], "Gr");
    sim
}

fn coordinator(sim: &StubSim, config: CoordinatorConfig) -> (PriorityCoordinator, ServiceEndpoint) {
    let (channel, service) = PriorityChannel::pair(16);
    let coordinator = PriorityCoordinator::new(config, sim, channel).unwrap();
    (coordinator, service)
}

fn priority_events(service: &ServiceEndpoint) -> Vec<String> {
    service
        .drain()
        .into_iter()
        .filter_map(|m| match m {
            OutboundMessage::Priority(e) => Some(format!("{}@{}", e.ev_id, e.rsu_id)),
            _ => None,
        })
        .collect()
}

/// Test the worked example: an emergency vehicle on the middle lane makes it the only green.
#[test]
fn emergency_lane_is_green_and_others_red() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneB_0", -30.0, 0.0, 10.0);
    let report = coordinator.tick(&mut sim);

    assert_eq!(sim.junction_state("J1"), "rGr");
    assert_eq!(sim.junction_state("J4"), "Gr");
    assert_eq!(report.overrides.len(), 1);
    assert!(report.errors.is_empty());
}

/// Test that a continuous approach produces exactly one event.
#[test]
fn one_event_per_approach() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneA_0", -50.0, 0.0, 10.0);
    let mut fired = 0;
    for i in 0..20 {
        sim.place("ev0", "emergency", "laneA_0", -50.0 + i as f64, 0.0, 10.0);
        fired += coordinator.tick(&mut sim).events.len();
        sim.step(1.0);
    }

    assert_eq!(fired, 1);
    assert_eq!(priority_events(&service), ["ev0@RSU_J1"]);
    assert_eq!(coordinator.trigger().state("J1", "ev0"), ApproachState::Notified);
}

/// Test that leaving the junction's lanes ends the approach and returning starts a new one.
#[test]
fn reapproach_raises_new_event() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneA_0", -20.0, 0.0, 10.0);
    coordinator.tick(&mut sim);
    sim.place("ev0", "emergency", "loop_0", -20.0, 50.0, 10.0);
    coordinator.tick(&mut sim);
    assert_eq!(coordinator.trigger().state("J1", "ev0"), ApproachState::Absent);
    sim.place("ev0", "emergency", "laneC_0", -20.0, 0.0, 10.0);
    coordinator.tick(&mut sim);

    assert_eq!(priority_events(&service), ["ev0@RSU_J1", "ev0@RSU_J1"]);
}

/// Test that the event carries the distance to the junction and an arrival estimate.
#[test]
fn event_estimates_distance_and_eta() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneD_0", 70.0, 40.0, 10.0);
    let report = coordinator.tick(&mut sim);

    let event = &report.events[0];
    assert_eq!(event.rsu_id, "RSU_J4");
    assert_eq!(event.tls_id, "J4");
    assert_approx_eq!(event.distance, 50.0);
    assert_approx_eq!(event.eta_seconds, 5.0);
    assert_approx_eq!(event.position.x, 70.0);
}

/// Test that a stopped vehicle's ETA uses the speed floor rather than dividing by zero.
#[test]
fn stopped_vehicle_eta_is_finite() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneD_0", 90.0, 0.0, 0.0);
    let report = coordinator.tick(&mut sim);
    assert_approx_eq!(report.events[0].eta_seconds, 100.0);
}

/// Test that vehicles of other types never trigger priority.
#[test]
fn ordinary_vehicles_are_ignored() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("car0", "passenger", "laneC_0", -10.0, 0.0, 10.0);
    let report = coordinator.tick(&mut sim);
    assert!(report.events.is_empty());
    assert_eq!(sim.junction_state("J1"), "GGr");
    assert!(service.drain().is_empty());
}

/// Test that internal junction lanes are not scanned.
#[test]
fn internal_lanes_are_skipped() {
    let mut sim = StubSim::new();
    sim.add_junction("J1", 0.0, 0.0, &[":J1_0_0", "laneA_0"], "rr");
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1"]));

    sim.place("ev0", "emergency", ":J1_0_0", 0.0, 0.0, 5.0);
    let report = coordinator.tick(&mut sim);
    assert!(report.events.is_empty());
    assert_eq!(sim.junction_state("J1"), "rr");
}

/// Test that with two emergency vehicles at one junction only the first lane is favoured.
#[test]
fn first_emergency_lane_wins() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev1", "emergency", "laneC_0", -10.0, 0.0, 10.0);
    sim.place("ev0", "emergency", "laneA_0", -10.0, 0.0, 10.0);
    let report = coordinator.tick(&mut sim);

    assert_eq!(sim.junction_state("J1"), "Grr");
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].ev_id, "ev0");
}

/// Test that reapplying the same override does not rewrite the junction state.
#[test]
fn override_is_idempotent() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneB_0", -30.0, 0.0, 10.0);
    for _ in 0..5 {
        coordinator.tick(&mut sim);
    }
    assert_eq!(sim.state_writes, 1);
    assert_eq!(sim.junction_state("J1"), "rGr");
}

/// Test that a decision to extend green adds to the remaining phase time.
#[test]
fn extend_green_decision_lengthens_phase() {
    let mut sim = two_junctions();
    sim.junction_mut("J4").remaining = 3.0;
    let (channel, service) = PriorityChannel::pair(16);
    let mut coordinator = PriorityCoordinator::new(config(&["J1", "J4"]), &sim, channel).unwrap();

    let decision = PriorityDecision::from_json(r#"{"tls_id":"J4","action":"extend_green_10s"}"#).unwrap();
    service.decide(decision).unwrap();
    let report = coordinator.tick(&mut sim);

    assert_approx_eq!(sim.junction_mut("J4").remaining, 13.0);
    assert_eq!(
        report.applied,
        [Applied::Extended {
            junction: "J4".into(),
            duration: 13.0
        }]
    );
}

/// Test that decisions may name the RSU instead of the junction.
#[test]
fn decision_by_rsu_id() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    service
        .decide(PriorityDecision::new("RSU_J1", DecisionAction::ExtendGreen(5.0)))
        .unwrap();
    coordinator.tick(&mut sim);
    assert_approx_eq!(sim.junction_mut("J1").remaining, 15.0);
}

/// Test that an unknown target is reported and changes no junction.
#[test]
fn unknown_decision_target_changes_nothing() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    service
        .decide(PriorityDecision::new("J99", DecisionAction::ExtendGreen(10.0)))
        .unwrap();
    service
        .decide(PriorityDecision::new("J4", DecisionAction::Ack))
        .unwrap();
    let report = coordinator.tick(&mut sim);

    assert!(matches!(
        &report.errors[..],
        [TickError::Decision(DecisionError::UnknownTarget(t))] if t == "J99"
    ));
    assert_eq!(report.applied.len(), 1);
    for junction in &sim.junctions {
        assert_approx_eq!(junction.remaining, 10.0);
    }
    assert_eq!(sim.junction_state("J1"), "GGr");
    assert_eq!(sim.junction_state("J4"), "Gr");
}

/// Test that unknown actions are acknowledged without any change.
#[test]
fn unknown_action_is_acknowledged() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    service
        .decide(PriorityDecision::from_json(r#"{"tls_id":"J1","action":"hold_red"}"#).unwrap())
        .unwrap();
    let report = coordinator.tick(&mut sim);
    assert_eq!(
        report.applied,
        [Applied::Acknowledged {
            junction: "J1".into()
        }]
    );
    assert_approx_eq!(sim.junction_mut("J1").remaining, 10.0);
}

/// Test that a negative extension on the wire is acknowledged and leaves the phase alone.
#[test]
fn negative_extension_changes_nothing() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    let decision =
        PriorityDecision::from_json(r#"{"tls_id":"J1","action":"extend_green","duration":-50}"#)
            .unwrap();
    service.decide(decision).unwrap();
    let report = coordinator.tick(&mut sim);

    assert!(report.errors.is_empty());
    assert_eq!(
        report.applied,
        [Applied::Acknowledged {
            junction: "J1".into()
        }]
    );
    assert_approx_eq!(sim.junction_mut("J1").remaining, 10.0);
}

/// Test that extensions which are negative or not finite are refused without a write.
#[test]
fn invalid_extension_is_refused() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));

    for secs in [-50.0, -1e300, f64::INFINITY] {
        service
            .decide(PriorityDecision::new("J4", DecisionAction::ExtendGreen(secs)))
            .unwrap();
    }
    service
        .decide(PriorityDecision::new("J4", DecisionAction::ExtendGreen(2.5)))
        .unwrap();
    let report = coordinator.tick(&mut sim);

    assert_eq!(report.errors.len(), 3);
    assert!(report.errors.iter().all(|err| matches!(
        err,
        TickError::Decision(DecisionError::InvalidExtension { junction, .. }) if junction == "J4"
    )));
    assert_eq!(report.applied.len(), 1);
    assert_approx_eq!(sim.junction_mut("J4").remaining, 12.5);
}

/// Test that a junction whose state does not match its links fails alone.
#[test]
fn state_length_mismatch_is_isolated() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));
    sim.junction_mut("J1").state = "GG".into();

    sim.place("ev0", "emergency", "laneA_0", -10.0, 0.0, 10.0);
    sim.place("ev1", "emergency", "laneE_0", 90.0, 0.0, 10.0);
    let report = coordinator.tick(&mut sim);

    assert!(matches!(
        &report.errors[..],
        [TickError::Override(OverrideError::StateLengthMismatch { links: 3, state: 2, .. })]
    ));
    assert_eq!(sim.junction_state("J1"), "GG");
    assert_eq!(sim.junction_state("J4"), "rG");
    assert_eq!(report.events.len(), 2);
}

/// Test that a missing decision service never stops the tick.
#[test]
fn dropped_service_does_not_stop_overrides() {
    let mut sim = two_junctions();
    let (mut coordinator, service) = coordinator(&sim, config(&["J1", "J4"]));
    drop(service);

    sim.place("ev0", "emergency", "laneB_0", -30.0, 0.0, 10.0);
    let report = coordinator.tick(&mut sim);

    assert_eq!(sim.junction_state("J1"), "rGr");
    assert_eq!(report.events.len(), 1);
    assert!(matches!(
        &report.errors[..],
        [TickError::Transport(TransportError::Disconnected)]
    ));
}

/// Test that an arriving vehicle ends its approaches and completes its journey.
#[test]
fn arrival_closes_approach_and_journey() {
    let mut sim = two_junctions();
    let (mut coordinator, _service) = coordinator(&sim, config(&["J1", "J4"]));

    sim.time = 60.0;
    sim.place("ev0", "emergency", "laneA_0", -30.0, 0.0, 10.0);
    coordinator.tick(&mut sim);
    sim.step(25.0);
    sim.arrive("ev0");
    let report = coordinator.tick(&mut sim);

    assert_eq!(coordinator.trigger().records().count(), 0);
    assert_eq!(report.journeys.len(), 1);
    assert_eq!(report.journeys[0].origin, "laneA");
    assert_approx_eq!(report.journeys[0].depart, 60.0);
    assert_approx_eq!(report.journeys[0].travel_time, 25.0);
}

/// Test that every emergency vehicle is reported against its nearest RSU each tick.
#[test]
fn tracking_updates_name_nearest_rsu() {
    let mut sim = two_junctions();
    let mut config = config(&["J1", "J4"]);
    config.tracking_updates = true;
    let (mut coordinator, service) = coordinator(&sim, config);

    sim.place("ev0", "emergency", "loop_0", 80.0, 30.0, 10.0);
    coordinator.tick(&mut sim);
    coordinator.tick(&mut sim);

    let updates: Vec<_> = service
        .drain()
        .into_iter()
        .filter_map(|m| match m {
            OutboundMessage::Tracking(u) => u.rsu,
            _ => None,
        })
        .collect();
    assert_eq!(updates, ["RSU_J4", "RSU_J4"]);
}

/// Test that other vehicles on the emergency vehicle's edge are slowed.
#[test]
fn clear_lane_slows_vehicles_on_same_edge() {
    let mut sim = two_junctions();
    let mut config = config(&["J1", "J4"]);
    config.clear_lane = CoordinatorConfig::default().clear_lane;
    let (mut coordinator, _service) = coordinator(&sim, config);

    sim.place("ev0", "emergency", "laneA_0", -60.0, 0.0, 10.0);
    sim.place("car0", "passenger", "laneA_1", -40.0, 0.0, 10.0);
    sim.place("car1", "passenger", "laneD_0", 60.0, 0.0, 10.0);
    coordinator.tick(&mut sim);

    assert_eq!(sim.slowed, [("car0".to_string(), 2.0, 5.0)]);
}

/// Test that separate coordinators keep separate approach state.
#[test]
fn coordinators_do_not_share_state() {
    let mut sim = two_junctions();
    let (mut first, _s1) = coordinator(&sim, config(&["J1", "J4"]));
    let (mut second, _s2) = coordinator(&sim, config(&["J1", "J4"]));

    sim.place("ev0", "emergency", "laneA_0", -10.0, 0.0, 10.0);
    assert_eq!(first.tick(&mut sim).events.len(), 1);
    assert_eq!(second.tick(&mut sim).events.len(), 1);
}
