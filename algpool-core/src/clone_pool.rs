use crate::error::PoolError;
use crate::infrastructure::UnitHandle;
use crate::types::InstanceCounts;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::atomic::{AtomicUsize, Ordering};

/// FIFO of live instances of one leaf unit.
///
/// Backed by a bounded MPMC channel so any number of workers can push and pop
/// concurrently; a blocking pop parks the caller until an instance is pushed.
pub struct ClonePool {
    name: String,
    allowed: usize,
    created: AtomicUsize,
    reentrant: bool,
    tx: Sender<UnitHandle>,
    rx: Receiver<UnitHandle>,
}

impl ClonePool {
    /// An empty pool for at most `allowed` instances (at least one)
    pub fn new(name: impl Into<String>, allowed: usize, reentrant: bool) -> Self {
        let allowed = allowed.max(1);
        let (tx, rx) = bounded(allowed);
        Self {
            name: name.into(),
            allowed,
            created: AtomicUsize::new(0),
            reentrant,
            tx,
            rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allowed(&self) -> usize {
        self.allowed
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    /// Instances currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.rx.len()
    }

    pub fn counts(&self) -> InstanceCounts {
        InstanceCounts {
            allowed: self.allowed,
            created: self.created(),
            queued: self.queued(),
        }
    }

    /// Adds a freshly created instance and pushes it into the queue
    pub fn add_instance(&self, instance: UnitHandle) -> Result<(), PoolError> {
        self.push(instance)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Reserves a creation slot for a lazily created clone. Returns the clone
    /// index to use, or `None` when the pool is already at its bound.
    pub fn reserve_slot(&self) -> Option<usize> {
        self.created
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.allowed).then_some(n + 1)
            })
            .ok()
    }

    /// Gives back a slot obtained from [`Self::reserve_slot`] whose clone could not be created
    pub fn release_slot(&self) {
        self.created.fetch_sub(1, Ordering::SeqCst);
    }

    /// Returns an instance to the queue. Never blocks.
    pub fn push(&self, instance: UnitHandle) -> Result<(), PoolError> {
        self.tx.try_send(instance).map_err(|e| match e {
            TrySendError::Full(_) | TrySendError::Disconnected(_) => {
                PoolError::QueueOverflow(self.name.clone())
            }
        })
    }

    pub fn try_pop(&self) -> Option<UnitHandle> {
        self.rx.try_recv().ok()
    }

    /// Waits until an instance is available
    pub fn pop(&self) -> UnitHandle {
        loop {
            // The pool owns a sender, so the channel never disconnects
            if let Ok(instance) = self.rx.recv() {
                return instance;
            }
        }
    }
}

impl std::fmt::Debug for ClonePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClonePool")
            .field("name", &self.name)
            .field("allowed", &self.allowed)
            .field("created", &self.created())
            .field("queued", &self.queued())
            .field("reentrant", &self.reentrant)
            .finish()
    }
}
