//! Pool configuration and the JSON manifest format used by the CLI.

use crate::infrastructure_in_memory::UnitSpec;
use crate::types::TypeName;
use serde::{Deserialize, Serialize};

fn default_max_depth() -> usize {
    64
}

/// Options consumed by [`crate::pool::AlgResourcePool`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Top-level units as `Type/Name` strings
    pub top_units: Vec<TypeName>,
    /// Clone units that declare themselves unclonable anyway
    pub override_unclonable: bool,
    /// Create clones on demand instead of during initialization
    pub lazy_creation: bool,
    /// Count non-blocking acquires that find no free instance
    pub count_instance_misses: bool,
    /// Deepest composite nesting accepted while flattening
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            top_units: Vec::new(),
            override_unclonable: false,
            lazy_creation: false,
            count_instance_misses: false,
            max_depth: default_max_depth(),
        }
    }
}

impl PoolConfig {
    pub fn with_top_units(top_units: &[&str]) -> Self {
        Self {
            top_units: top_units.iter().map(|t| TypeName::parse(t)).collect(),
            ..Self::default()
        }
    }
}

/// A pool configuration together with the units it may instantiate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub pool: PoolConfig,
    pub units: Vec<UnitSpec>,
}

impl Manifest {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
