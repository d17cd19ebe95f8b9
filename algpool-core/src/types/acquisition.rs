use crate::infrastructure::UnitHandle;

/// Why an acquire did not hand out an instance.
///
/// Neither case is a fault: the caller is expected to retry on a later
/// scheduling pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireFailureReason {
    /// Every instance of the unit is checked out
    NoInstance,
    /// An instance was free but at least one needed resource is held elsewhere
    ResourcesBusy {
        /// Names of the needed resources that are currently held
        held: Vec<String>,
    },
}

/// Result of attempting to acquire a unit instance
pub enum AcquireResult {
    Success {
        instance: UnitHandle,
    },
    Failure {
        reason: AcquireFailureReason,
    },
}

impl AcquireResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AcquireResult::Success { .. })
    }

    /// The acquired instance, if any
    pub fn instance(self) -> Option<UnitHandle> {
        match self {
            AcquireResult::Success { instance } => Some(instance),
            AcquireResult::Failure { .. } => None,
        }
    }
}

impl std::fmt::Debug for AcquireResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquireResult::Success { instance } => f
                .debug_struct("Success")
                .field("name", &instance.name())
                .field("clone_index", &instance.clone_index())
                .finish(),
            AcquireResult::Failure { reason } => {
                f.debug_struct("Failure").field("reason", reason).finish()
            }
        }
    }
}

/// Snapshot of one clone pool's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceCounts {
    pub allowed: usize,
    pub created: usize,
    pub queued: usize,
}
