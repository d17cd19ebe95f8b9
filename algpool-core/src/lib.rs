//! # algpool-core
//!
//! Algorithm resource pool for concurrent event processing.
//! Unrolls nested sequencers into a precedence graph and a flat list of
//! leaf units, keeps a bounded pool of clones per leaf, and reserves named
//! resources through a single mutex-guarded bitset.

pub mod clone_pool;
pub mod config;
pub mod error;
pub mod graph;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
pub mod pool;
pub mod registry;
pub mod resource;
pub mod sequencer;
pub mod types;

pub use config::{Manifest, PoolConfig};
pub use error::{FlattenError, GraphError, PoolError, Transition, UnitError};
pub use infrastructure::{UnitFactory, UnitHandle, WorkUnit};
pub use pool::{AlgResourcePool, PoolState};

#[cfg(test)]
mod resource_test;
#[cfg(test)]
mod graph_test;
#[cfg(test)]
#[path = "infrastructure_test.rs"]
mod infrastructure_test;
