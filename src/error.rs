//! Error types.

use thiserror::Error;

/// A fatal problem with the RSU registry or the coordinator configuration.
/// Only raised while the coordinator is being built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("RSUs {first} and {second} both claim junction {junction}")]
    DuplicateJunction {
        junction: String,
        first: String,
        second: String,
    },
    #[error("RSU id {0} is registered twice")]
    DuplicateRsu(String),
    #[error("RSU {rsu} references junction {junction}, which is not in the simulation")]
    UnknownJunction { rsu: String, junction: String },
    #[error("no RSUs are registered")]
    EmptyRegistry,
    #[error("junction {junction} has {lanes} controlled lanes but {links} controlled links")]
    InconsistentJunction {
        junction: String,
        lanes: usize,
        links: usize,
    },
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// A failed query or mutation against the simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("unknown vehicle {0}")]
    UnknownVehicle(String),
    #[error("unknown lane {0}")]
    UnknownLane(String),
    #[error("unknown junction {0}")]
    UnknownJunction(String),
    #[error("invalid signal state {state:?} for junction {junction}")]
    InvalidState { junction: String, state: String },
    #[error("invalid phase duration {duration} for junction {junction}")]
    InvalidDuration { junction: String, duration: f64 },
}

/// The override for a single junction could not be computed or applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverrideError {
    #[error("junction {junction} has {links} controlled links but a signal state of length {state}")]
    StateLengthMismatch {
        junction: String,
        links: usize,
        state: usize,
    },
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// An inbound decision could not be applied.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision targets unknown junction or RSU {0}")]
    UnknownTarget(String),
    #[error("cannot extend junction {junction} by {secs}s")]
    InvalidExtension { junction: String, secs: f64 },
    #[error("malformed decision: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// The decision service link could not accept a message.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("decision service link is disconnected")]
    Disconnected,
    #[error("outbound queue is full")]
    Full,
}

/// A failure isolated to one vehicle, junction or message during a tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("override failed: {0}")]
    Override(#[from] OverrideError),
    #[error("decision rejected: {0}")]
    Decision(#[from] DecisionError),
    #[error("message dropped: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Sim(#[from] SimError),
}
