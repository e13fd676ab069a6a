//! Coordinator configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The vehicle type treated as an emergency vehicle unless configured otherwise.
pub const DEFAULT_EMERGENCY_TYPE: &str = "emergency";

/// Configuration of a [PriorityCoordinator](crate::PriorityCoordinator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Vehicles of this type receive signal priority.
    pub emergency_type: String,
    /// The roadside units, in registry order.
    pub rsus: Vec<RsuConfig>,
    /// Whether to ignore internal junction lanes (IDs starting with `:`) when scanning.
    pub skip_internal_lanes: bool,
    /// Speed floor in m/s used when estimating arrival times.
    pub min_eta_speed: f64,
    /// Slows other traffic sharing the emergency vehicle's edge.
    pub clear_lane: Option<ClearLaneConfig>,
    /// Whether to send a tracking update for every emergency vehicle each tick.
    pub tracking_updates: bool,
    /// The maximum number of outbound messages waiting for the decision service.
    pub channel_capacity: usize,
}

/// A roadside unit and the junction it serves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsuConfig {
    pub id: String,
    pub junction: String,
}

/// How vehicles ahead of an emergency vehicle are slowed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClearLaneConfig {
    /// Target speed in m/s.
    pub speed: f64,
    /// Time to reach the target speed in s.
    pub duration: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let rsus = ["J1", "J4", "J5", "J6", "J7"]
            .into_iter()
            .map(|junction| RsuConfig {
                id: format!("RSU_{}", junction),
                junction: junction.to_string(),
            })
            .collect();
        Self {
            emergency_type: DEFAULT_EMERGENCY_TYPE.to_string(),
            rsus,
            skip_internal_lanes: true,
            min_eta_speed: 0.1,
            clear_lane: Some(ClearLaneConfig {
                speed: 2.0,
                duration: 5.0,
            }),
            tracking_updates: true,
            channel_capacity: 256,
        }
    }
}

impl CoordinatorConfig {
    /// Loads a configuration from a JSON file. Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
