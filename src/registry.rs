use crate::config::RsuConfig;
use crate::error::ConfigError;
use crate::handle::SimulationHandle;
use crate::math::{distance, Point2d};
use crate::RsuKey;
use itertools::Itertools;
use slotmap::SlotMap;
use std::collections::HashMap;

/// A roadside unit, serving exactly one signalised junction.
#[derive(Clone, Debug, PartialEq)]
pub struct Rsu {
    key: RsuKey,
    id: String,
    junction: String,
    location: Point2d,
}

impl Rsu {
    /// The registry key of the RSU.
    pub fn key(&self) -> RsuKey {
        self.key
    }

    /// The RSU identifier, e.g. `"RSU_J4"`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The junction served by this RSU.
    pub fn junction(&self) -> &str {
        &self.junction
    }

    /// The location of the junction.
    pub fn location(&self) -> Point2d {
        self.location
    }
}

/// The set of roadside units, built once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct RsuRegistry {
    /// Slots are never freed, so iteration follows registration order.
    rsus: SlotMap<RsuKey, Rsu>,
    by_id: HashMap<String, RsuKey>,
    by_junction: HashMap<String, RsuKey>,
}

impl RsuRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds a registry from configuration, checking every RSU against the simulation.
    ///
    /// Fails if the list is empty, if a junction is claimed twice or is not a signalised
    /// junction of the simulation, or if a junction's controlled lanes and links disagree.
    pub fn build<S: SimulationHandle + ?Sized>(
        rsus: &[RsuConfig],
        sim: &S,
    ) -> Result<Self, ConfigError> {
        let junctions = sim.junction_ids();
        let mut registry = Self::new();
        for rsu in rsus {
            if !junctions.contains(&rsu.junction) {
                return Err(ConfigError::UnknownJunction {
                    rsu: rsu.id.clone(),
                    junction: rsu.junction.clone(),
                });
            }
            let lanes = sim.controlled_lanes(&rsu.junction)?;
            let links = sim.controlled_links(&rsu.junction)?;
            if lanes.len() != links.len() {
                return Err(ConfigError::InconsistentJunction {
                    junction: rsu.junction.clone(),
                    lanes: lanes.len(),
                    links: links.len(),
                });
            }
            let location = sim.junction_position(&rsu.junction)?;
            registry.register(&rsu.id, &rsu.junction, location)?;
        }
        if registry.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        log::info!(
            "Registered {} RSUs: {}",
            registry.len(),
            registry.all().map(|rsu| rsu.id()).join(", ")
        );
        Ok(registry)
    }

    /// Registers an RSU for a junction at the given location.
    pub fn register(
        &mut self,
        id: &str,
        junction: &str,
        location: Point2d,
    ) -> Result<RsuKey, ConfigError> {
        if self.by_id.contains_key(id) {
            return Err(ConfigError::DuplicateRsu(id.to_string()));
        }
        if let Some(other) = self.by_junction.get(junction) {
            return Err(ConfigError::DuplicateJunction {
                junction: junction.to_string(),
                first: self.rsus[*other].id.clone(),
                second: id.to_string(),
            });
        }
        let key = self.rsus.insert_with_key(|key| Rsu {
            key,
            id: id.to_string(),
            junction: junction.to_string(),
            location,
        });
        self.by_id.insert(id.to_string(), key);
        self.by_junction.insert(junction.to_string(), key);
        Ok(key)
    }

    /// The number of registered RSUs.
    pub fn len(&self) -> usize {
        self.rsus.len()
    }

    /// Whether no RSUs are registered.
    pub fn is_empty(&self) -> bool {
        self.rsus.is_empty()
    }

    /// Gets the RSU serving the given junction.
    pub fn resolve(&self, junction: &str) -> Option<&Rsu> {
        self.by_junction.get(junction).map(|key| &self.rsus[*key])
    }

    /// Gets an RSU by its own identifier.
    pub fn get(&self, id: &str) -> Option<&Rsu> {
        self.by_id.get(id).map(|key| &self.rsus[*key])
    }

    /// Resolves a decision target, which may name either a junction or an RSU.
    pub fn target(&self, name: &str) -> Option<&Rsu> {
        self.resolve(name).or_else(|| self.get(name))
    }

    /// Returns an iterator over the RSUs in registration order.
    pub fn all(&self) -> impl Iterator<Item = &Rsu> {
        self.rsus.values()
    }

    /// Finds the RSU whose junction is nearest to `position`, along with the distance to it.
    ///
    /// Ties go to the RSU registered first. Only returns `None` for an empty registry.
    pub fn nearest(&self, position: Point2d) -> Option<(&Rsu, f64)> {
        let mut best: Option<(&Rsu, f64)> = None;
        for rsu in self.all() {
            let dist = distance(position, rsu.location);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((rsu, dist)),
            }
        }
        best
    }
}
