//! Traffic signal priority for emergency vehicles.
//!
//! A [PriorityCoordinator] watches a traffic simulation through the [SimulationHandle] trait.
//! Whenever an emergency vehicle enters a lane controlled by a junction with a roadside unit
//! (RSU), the junction's signals are overridden in its favour and a single priority event is
//! sent to an external decision service over a [PriorityChannel]. Decisions coming back,
//! such as extending the current green phase, are applied on the following tick.
//!
//! [Simulation] is a small in-memory implementation of [SimulationHandle].

pub use approach::{scan_junction, ApproachRecord, ApproachState, ApproachTrigger, Occupant, Transition};
pub use cgmath;
pub use channel::{PriorityChannel, ServiceEndpoint};
pub use config::{ClearLaneConfig, CoordinatorConfig, RsuConfig};
pub use coordinator::{PriorityCoordinator, TickReport};
pub use decision::{Applied, DecisionApplier};
pub use error::{ConfigError, DecisionError, OverrideError, SimError, TickError, TransportError};
pub use handle::{ControlledLink, SimulationHandle, VehicleState};
pub use journey::{JourneyRecord, JourneyTracker};
pub use junction::{Junction, JunctionAttributes};
pub use lane::{Lane, LaneAttributes};
pub use light::{override_state, LightState, Phase, SignalOverrideController, SignalProgram, SignalState};
pub use message::{DecisionAction, OutboundMessage, Position, PriorityDecision, PriorityEvent, TrackingUpdate};
pub use registry::{Rsu, RsuRegistry};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{Vehicle, VehicleAttributes};

mod approach;
mod channel;
mod config;
mod coordinator;
mod decision;
mod error;
mod handle;
mod journey;
mod junction;
mod lane;
mod light;
pub mod math;
mod message;
mod registry;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [Junction].
    pub struct JunctionId;
    /// Unique ID of an [Rsu] within its [RsuRegistry].
    pub struct RsuKey;
}

type LaneSet = SlotMap<LaneId, Lane>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
