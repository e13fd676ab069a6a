use crate::error::{OverrideError, SimError};
use crate::handle::{ControlledLink, SimulationHandle};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// The state of a single controlled link's signal.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum LightState {
    Red,
    Amber,
    Green,
}

impl LightState {
    /// Gets the character used for this state in a signal state string.
    pub fn as_char(self) -> char {
        match self {
            LightState::Red => 'r',
            LightState::Amber => 'y',
            LightState::Green => 'G',
        }
    }

    /// Parses a signal state character. Priority and minor greens are both green.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' | 'R' => Some(LightState::Red),
            'y' | 'Y' => Some(LightState::Amber),
            'g' | 'G' => Some(LightState::Green),
            _ => None,
        }
    }
}

/// The signal states of all links at a junction, in controlled link order.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct SignalState(SmallVec<[LightState; 16]>);

impl SignalState {
    /// Gets the number of links covered by the state.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the state of the link at `idx`.
    pub fn get(&self, idx: usize) -> Option<LightState> {
        self.0.get(idx).copied()
    }

    /// Returns an iterator over the link states.
    pub fn iter(&self) -> impl Iterator<Item = LightState> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<LightState> for SignalState {
    fn from_iter<I: IntoIterator<Item = LightState>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for SignalState {
    type Err = char;

    /// Parses a state string, failing with the first unrecognised character.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| LightState::from_char(c).ok_or(c))
            .collect()
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|s| write!(f, "{}", s.as_char()))
    }
}

/// Computes the override state for a junction: every link leaving `emergency_lane`
/// is green and every other link is red.
///
/// # Parameters
/// * `junction` - The junction ID, used for error reporting
/// * `links` - The junction's controlled links, in signal state order
/// * `current` - The junction's current signal state
/// * `emergency_lane` - The lane occupied by the emergency vehicle
pub fn override_state(
    junction: &str,
    links: &[ControlledLink],
    current: &str,
    emergency_lane: &str,
) -> Result<SignalState, OverrideError> {
    let state_len = current.chars().count();
    if state_len != links.len() {
        return Err(OverrideError::StateLengthMismatch {
            junction: junction.to_string(),
            links: links.len(),
            state: state_len,
        });
    }
    Ok(links
        .iter()
        .map(|link| match link.incoming == emergency_lane {
            true => LightState::Green,
            false => LightState::Red,
        })
        .collect())
}

/// Rewrites junction signal states to favour an emergency lane.
///
/// The controller does not remember the state it replaced. Callers that need to
/// restore it must read [SimulationHandle::signal_state] before overriding.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalOverrideController;

impl SignalOverrideController {
    /// Computes the override for `junction` and writes it to the simulation.
    /// Returns the new state. Writing the same override again is a no-op.
    pub fn apply<S: SimulationHandle + ?Sized>(
        &self,
        sim: &mut S,
        junction: &str,
        emergency_lane: &str,
    ) -> Result<SignalState, OverrideError> {
        let links = sim.controlled_links(junction)?;
        let current = sim.signal_state(junction)?;
        let state = override_state(junction, &links, &current, emergency_lane)?;
        let encoded = state.to_string();
        if encoded != current {
            sim.set_signal_state(junction, &encoded)?;
            log::info!(
                "Junction {}: emergency vehicle on {}, state {} -> {}",
                junction,
                emergency_lane,
                current,
                encoded
            );
        }
        Ok(state)
    }
}

/// A fixed-time signal program for one junction.
#[derive(Clone, Debug)]
pub struct SignalProgram {
    /// The phases, cycled in order.
    phases: Vec<Phase>,
    /// The index of the current phase.
    current: usize,
    /// The time until the current phase ends, in s.
    remaining: f64,
    /// A state written over the current phase, held until the phase ends.
    forced: Option<SignalState>,
}

/// One phase of a [SignalProgram].
#[derive(Clone, Debug)]
pub struct Phase {
    pub state: SignalState,
    /// The duration of the phase in s.
    pub duration: f64,
}

impl Phase {
    pub fn new(state: SignalState, duration: f64) -> Self {
        Self { state, duration }
    }
}

impl SignalProgram {
    /// Creates a program that starts at the beginning of its first phase.
    ///
    /// # Panics
    /// If `phases` is empty or the phases cover different numbers of links.
    pub fn new(phases: Vec<Phase>) -> Self {
        assert!(!phases.is_empty(), "Signal program must have at least one phase");
        assert!(
            phases.iter().all(|p| p.state.len() == phases[0].state.len()),
            "All phases must cover the same links"
        );
        let remaining = phases[0].duration;
        Self {
            phases,
            current: 0,
            remaining,
            forced: None,
        }
    }

    /// Advances the program by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.remaining -= dt;
        while self.remaining <= 0.0 {
            self.forced = None;
            self.current = (self.current + 1) % self.phases.len();
            self.remaining += self.phases[self.current].duration.max(f64::EPSILON);
        }
    }

    /// Gets the state currently shown by the signals.
    pub fn state(&self) -> &SignalState {
        self.forced
            .as_ref()
            .unwrap_or(&self.phases[self.current].state)
    }

    /// Gets the number of links covered by the program.
    pub fn num_links(&self) -> usize {
        self.phases[0].state.len()
    }

    /// Gets the index of the current phase.
    pub fn phase(&self) -> usize {
        self.current
    }

    /// Gets the time until the current phase ends, in s.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Shows `state` until the current phase ends.
    pub fn force(&mut self, state: SignalState) {
        self.forced = Some(state);
    }

    /// Sets the time until the current phase ends, in s.
    /// A negative duration ends the phase on the next step.
    pub fn set_remaining(&mut self, duration: f64) {
        self.remaining = duration.max(0.0);
    }
}

/// Parses a state string received from the simulation.
pub(crate) fn parse_state(junction: &str, state: &str) -> Result<SignalState, SimError> {
    state.parse().map_err(|_| SimError::InvalidState {
        junction: junction.to_string(),
        state: state.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(lanes: &[&str]) -> Vec<ControlledLink> {
        lanes.iter().map(|l| ControlledLink::new(*l, "out_0")).collect()
    }

    #[test]
    fn emergency_lane_gets_green() {
        let links = links(&["laneA_0", "laneB_0", "laneC_0"]);
        let state = override_state("J1", &links, "GGr", "laneB_0").unwrap();
        assert_eq!(state.to_string(), "rGr");
    }

    #[test]
    fn override_never_yellow() {
        let links = links(&["a", "b", "b", "c"]);
        let state = override_state("J1", &links, "yyyy", "b").unwrap();
        assert!(state.iter().all(|s| s != LightState::Amber));
        assert_eq!(state.to_string(), "rGGr");
    }

    #[test]
    fn length_mismatch_is_reported() {
        let links = links(&["a", "b"]);
        let err = override_state("J9", &links, "rrr", "a").unwrap_err();
        assert_eq!(
            err,
            OverrideError::StateLengthMismatch {
                junction: "J9".into(),
                links: 2,
                state: 3
            }
        );
    }

    #[test]
    fn program_cycles_phases() {
        let mut program = SignalProgram::new(vec![
            Phase::new("Gr".parse().unwrap(), 10.0),
            Phase::new("rG".parse().unwrap(), 5.0),
        ]);
        program.step(9.5);
        assert_eq!(program.phase(), 0);
        program.step(1.0);
        assert_eq!(program.phase(), 1);
        assert_eq!(program.state().to_string(), "rG");
        assert!((program.remaining() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn negative_remaining_ends_phase_on_next_step() {
        let mut program = SignalProgram::new(vec![
            Phase::new("Gr".parse().unwrap(), 30.0),
            Phase::new("rG".parse().unwrap(), 30.0),
        ]);
        program.set_remaining(-1e300);
        program.step(0.1);
        assert_eq!(program.phase(), 1);
        assert!((program.remaining() - 29.9).abs() < 1e-9);
    }

    #[test]
    fn forced_state_lasts_until_phase_end() {
        let mut program = SignalProgram::new(vec![
            Phase::new("Gr".parse().unwrap(), 2.0),
            Phase::new("rG".parse().unwrap(), 2.0),
        ]);
        program.force("rr".parse().unwrap());
        program.step(1.0);
        assert_eq!(program.state().to_string(), "rr");
        program.step(1.0);
        assert_eq!(program.state().to_string(), "rG");
    }

    #[test]
    fn parses_minor_green() {
        let state: SignalState = "gGyr".parse().unwrap();
        assert_eq!(state.to_string(), "GGyr");
        assert_eq!("rxr".parse::<SignalState>(), Err('x'));
    }
}
