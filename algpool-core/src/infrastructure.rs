use std::sync::Arc;

use crate::error::UnitError;
use crate::types::{Composition, TypeName};

/// Shared handle to one live instance of a unit.
pub type UnitHandle = Arc<dyn WorkUnit>;

/// Defines the contract the pool needs from a unit of work.
///
/// Lifecycle methods take `&self`: an instance is handed to one worker at a
/// time (or to many at once when reentrant), so implementations keep their
/// own state behind interior mutability.
pub trait WorkUnit: Send + Sync {
    fn name(&self) -> &str;

    fn type_name(&self) -> &str;

    /// Maximum number of concurrent instances. `0` marks a reentrant unit whose
    /// single instance is shared by all callers.
    fn cardinality(&self) -> usize;

    fn is_clonable(&self) -> bool;

    /// Named resources this unit must hold exclusively while it runs
    fn needed_resources(&self) -> &[String];

    /// Ordered member references. Non-empty only for composites.
    fn members(&self) -> &[TypeName] {
        &[]
    }

    /// Control semantics; only consulted when `members` is non-empty
    fn composition(&self) -> Composition {
        Composition::default()
    }

    /// 0 for the primary instance, 1.. for clones
    fn clone_index(&self) -> usize;

    fn set_clone_index(&mut self, index: usize);

    fn initialize(&self) -> Result<(), UnitError>;

    fn start(&self) -> Result<(), UnitError>;

    fn stop(&self) -> Result<(), UnitError>;

    fn begin_run(&self) -> Result<(), UnitError> {
        Ok(())
    }

    fn end_run(&self) -> Result<(), UnitError> {
        Ok(())
    }

    /// Processes one event. Driven by the external executor, never by the pool.
    fn execute(&self) -> Result<(), UnitError> {
        Ok(())
    }

    fn is_reentrant(&self) -> bool {
        self.cardinality() == 0
    }

    fn type_name_ref(&self) -> TypeName {
        TypeName::new(self.type_name(), self.name())
    }
}

/// Creates fresh, uninitialized units by type and name.
pub trait UnitFactory: Send + Sync {
    fn create(&self, id: &TypeName) -> Result<Box<dyn WorkUnit>, UnitError>;
}
