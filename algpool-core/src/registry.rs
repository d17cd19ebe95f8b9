use crate::error::UnitError;
use crate::infrastructure::{UnitFactory, UnitHandle};
use crate::types::{TypeName, UnitId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Arena of primary unit instances.
///
/// A name is instantiated at most once; every later reference to the same
/// name resolves to the same [`UnitId`].
#[derive(Default)]
pub struct UnitRegistry {
    units: Vec<UnitHandle>,
    by_name: HashMap<String, UnitId>,
    /// Names whose initialization failed, with the error it reported
    failed: HashMap<String, UnitError>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: UnitId) -> &UnitHandle {
        &self.units[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the unit registered under `id.name`, creating and initializing
    /// it through `factory` on first sighting. Only initialized units are
    /// registered; a name that failed to initialize keeps reporting that error.
    pub fn resolve(&mut self, id: &TypeName, factory: &dyn UnitFactory) -> Result<UnitId, UnitError> {
        if let Some(e) = self.failed.get(&id.name) {
            return Err(e.clone());
        }
        if let Some(existing) = self.lookup(&id.name) {
            let unit = self.get(existing);
            if unit.type_name() != id.type_name {
                warn!(
                    name = %id.name,
                    requested = %id.type_name,
                    registered = %unit.type_name(),
                    "Unit already registered with a different type, reusing it"
                );
            }
            return Ok(existing);
        }

        let unit: UnitHandle = Arc::from(factory.create(id)?);
        if let Err(e) = unit.initialize() {
            self.failed.insert(id.name.clone(), e.clone());
            return Err(e);
        }
        let uid = UnitId(self.units.len());
        self.units.push(unit);
        self.by_name.insert(id.name.clone(), uid);
        debug!(unit = %id, id = %uid, "Unit created");
        Ok(uid)
    }
}
