use crate::light::{LightState, Phase, SignalProgram};
use crate::math::Point2d;
use crate::LaneId;

/// A signalised junction.
#[derive(Clone, Debug)]
pub struct Junction {
    name: String,
    position: Point2d,
    /// The (incoming, outgoing) lane pairs, in signal state order.
    links: Vec<(LaneId, LaneId)>,
    program: SignalProgram,
}

/// The attributes of a junction.
pub struct JunctionAttributes<'a> {
    pub name: &'a str,
    pub position: Point2d,
    /// The controlled links, in signal state order.
    pub links: &'a [(LaneId, LaneId)],
    /// The fixed-time program; every phase has one state per link.
    pub phases: Vec<Phase>,
}

impl Junction {
    /// Creates a new junction.
    ///
    /// # Panics
    /// If the phases do not have exactly one state per link.
    pub(crate) fn new(attribs: JunctionAttributes) -> Self {
        let program = SignalProgram::new(attribs.phases);
        assert_eq!(
            program.num_links(),
            attribs.links.len(),
            "Junction {} needs one signal per link",
            attribs.name
        );
        Self {
            name: attribs.name.to_string(),
            position: attribs.position,
            links: attribs.links.to_vec(),
            program,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Point2d {
        self.position
    }

    /// Gets the controlled links, in signal state order.
    pub fn links(&self) -> &[(LaneId, LaneId)] {
        &self.links
    }

    pub fn program(&self) -> &SignalProgram {
        &self.program
    }

    pub(crate) fn program_mut(&mut self) -> &mut SignalProgram {
        &mut self.program
    }

    /// Gets the signal shown to vehicles moving from `from` to `to`,
    /// or `None` if the junction does not control that movement.
    pub fn link_state(&self, from: LaneId, to: LaneId) -> Option<LightState> {
        let idx = self.links.iter().position(|link| *link == (from, to))?;
        self.program.state().get(idx)
    }
}
