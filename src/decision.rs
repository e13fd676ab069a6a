use crate::error::DecisionError;
use crate::handle::SimulationHandle;
use crate::message::{is_extension, DecisionAction, PriorityDecision};
use crate::registry::RsuRegistry;

/// The effect of applying one decision.
#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    /// The junction's current phase now lasts `duration` more seconds.
    Extended { junction: String, duration: f64 },
    /// The decision was acknowledged without changing anything.
    Acknowledged { junction: String },
}

/// Applies decisions from the decision service to junction phase timing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionApplier;

impl DecisionApplier {
    /// Applies a decision to the junction it targets.
    ///
    /// An extension sets the current phase to last its remaining time plus the extension.
    /// Decisions for junctions outside the registry fail with
    /// [DecisionError::UnknownTarget], and negative or non-finite extensions with
    /// [DecisionError::InvalidExtension]. Neither changes anything.
    pub fn apply<S: SimulationHandle + ?Sized>(
        &self,
        sim: &mut S,
        registry: &RsuRegistry,
        decision: &PriorityDecision,
    ) -> Result<Applied, DecisionError> {
        let rsu = registry
            .target(&decision.target)
            .ok_or_else(|| DecisionError::UnknownTarget(decision.target.clone()))?;
        let junction = rsu.junction().to_string();

        match &decision.action {
            DecisionAction::ExtendGreen(secs) => {
                if !is_extension(*secs) {
                    return Err(DecisionError::InvalidExtension {
                        junction,
                        secs: *secs,
                    });
                }
                let duration = sim.remaining_phase_time(&junction)? + secs;
                sim.set_phase_duration(&junction, duration)?;
                log::info!(
                    "Junction {}: extended current phase by {}s to {:.1}s",
                    junction,
                    secs,
                    duration
                );
                Ok(Applied::Extended { junction, duration })
            }
            DecisionAction::Ack => Ok(Applied::Acknowledged { junction }),
            DecisionAction::Unknown(token) => {
                log::debug!("Junction {}: ignoring unknown action {:?}", junction, token);
                Ok(Applied::Acknowledged { junction })
            }
        }
    }
}
