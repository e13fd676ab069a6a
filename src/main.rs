use anyhow::Context;
use clap::Parser;
use ev_priority::math::Point2d;
use ev_priority::{
    CoordinatorConfig, DecisionAction, JunctionAttributes, LaneAttributes, LaneId,
    OutboundMessage, Phase, PriorityChannel, PriorityCoordinator, PriorityDecision,
    ServiceEndpoint, Simulation, SimulationHandle, TransportError, VehicleAttributes,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Spacing between junctions along the corridor, in m.
const BLOCK: f64 = 200.0;

#[derive(Parser)]
#[command(name = "ev-priority")]
#[command(about = "Emergency vehicle signal priority on a simulated signalised corridor")]
struct Cli {
    /// Coordinator configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of simulation steps
    #[arg(long, default_value = "20000")]
    steps: usize,

    /// Time step in s
    #[arg(long, default_value = "0.1")]
    dt: f64,

    /// Simulation time at which the emergency vehicle departs, in s
    #[arg(long, default_value = "60")]
    ev_depart: f64,

    /// Answer every priority event with an extension of this many seconds instead of "ack"
    #[arg(long)]
    extend_green: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CoordinatorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    let junctions = config
        .rsus
        .iter()
        .map(|rsu| rsu.junction.clone())
        .collect::<Vec<_>>();

    let (mut sim, corridor) = build_corridor(&junctions);
    let (channel, service) = PriorityChannel::pair(config.channel_capacity);
    let emergency_type = config.emergency_type.clone();
    let mut coordinator = PriorityCoordinator::new(config, &sim, channel)?;

    let reply = match cli.extend_green {
        Some(secs) => DecisionAction::ExtendGreen(secs as f64),
        None => DecisionAction::Ack,
    };
    let service = thread::spawn(move || run_service(service, reply));

    let mut ev_added = false;
    for _ in 0..cli.steps {
        sim.step(cli.dt);
        if !ev_added && sim.time() >= cli.ev_depart {
            let attributes = VehicleAttributes {
                name: "ev0",
                kind: &emergency_type,
                desired_speed: 20.0,
            };
            let first = corridor[0];
            let last = corridor[corridor.len() - 1];
            sim.add_vehicle_between(&attributes, first, last)?;
            ev_added = true;
        }

        let report = coordinator.tick(&mut sim);
        for record in &report.journeys {
            println!("{}", serde_json::to_string(record)?);
        }
        if ev_added && !report.journeys.is_empty() {
            break;
        }
    }

    drop(coordinator);
    if service.join().is_err() {
        log::warn!("Decision service thread panicked");
    }
    Ok(())
}

/// Stands in for the decision service, answering each priority event with `reply`.
fn run_service(service: ServiceEndpoint, reply: DecisionAction) {
    loop {
        let message = match service.recv_timeout(Duration::from_millis(100)) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(TransportError::Disconnected) => break,
            Err(err) => {
                log::warn!("Decision service: {}", err);
                break;
            }
        };
        match message.to_json() {
            Ok(json) => log::debug!("Decision service received {}", json),
            Err(err) => log::warn!("Decision service could not encode message: {}", err),
        }
        if let OutboundMessage::Priority(event) = message {
            let decision = PriorityDecision::new(event.tls_id, reply.clone());
            if service.decide(decision).is_err() {
                break;
            }
        }
    }
}

/// Builds an east-bound corridor through the given junctions, each crossed by a
/// north-bound street, and fills it with background traffic.
/// Returns the simulation and the corridor lanes from west to east.
fn build_corridor(junctions: &[String]) -> (Simulation, Vec<LaneId>) {
    let mut sim = Simulation::new();

    let corridor = (0..=junctions.len())
        .map(|i| {
            let name = format!("E{}", i);
            sim.add_lane(&LaneAttributes {
                name: &format!("{}_0", name),
                edge: &name,
                start: Point2d::new(BLOCK * i as f64, 0.0),
                end: Point2d::new(BLOCK * (i + 1) as f64, 0.0),
                speed_limit: 16.7,
            })
        })
        .collect::<Vec<_>>();

    for (i, name) in junctions.iter().enumerate() {
        let x = BLOCK * (i + 1) as f64;
        let south = sim.add_lane(&LaneAttributes {
            name: &format!("S{}_0", i),
            edge: &format!("S{}", i),
            start: Point2d::new(x, -BLOCK),
            end: Point2d::new(x, 0.0),
            speed_limit: 13.9,
        });
        let north = sim.add_lane(&LaneAttributes {
            name: &format!("N{}_0", i),
            edge: &format!("N{}", i),
            start: Point2d::new(x, 0.0),
            end: Point2d::new(x, BLOCK),
            speed_limit: 13.9,
        });
        let phases = [("Gr", 30.0), ("yr", 3.0), ("rG", 30.0), ("ry", 3.0)]
            .into_iter()
            .filter_map(|(state, duration)| Some(Phase::new(state.parse().ok()?, duration)))
            .collect();
        sim.add_junction(JunctionAttributes {
            name,
            position: Point2d::new(x, 0.0),
            links: &[(corridor[i], corridor[i + 1]), (south, north)],
            phases,
        });

        for n in 0..3 {
            let car = format!("car_{}_{}", i, n);
            let attributes = VehicleAttributes {
                name: &car,
                kind: "passenger",
                desired_speed: 12.0,
            };
            if let Err(err) = sim.add_vehicle(&attributes, &[south, north]) {
                log::warn!("Could not add {}: {}", car, err);
            }
        }
    }
    sim.randomise_velocity_adjusts(0.1);

    (sim, corridor)
}
