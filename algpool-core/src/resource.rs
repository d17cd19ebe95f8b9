use crate::types::{ResourceMask, UnitKey};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Outcome of an all-or-nothing reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationResult {
    Reserved,
    /// Nothing was reserved; these needed resources are held elsewhere
    Busy { held: Vec<String> },
}

#[derive(Default)]
struct TableState {
    /// Resource name -> bit index, in discovery order
    indices: IndexMap<String, usize>,
    requirements: HashMap<UnitKey, ResourceMask>,
    /// Set bit = resource is free
    available: ResourceMask,
}

impl TableState {
    fn width(&self) -> usize {
        self.indices.len()
    }

    fn names_of(&self, mask: &ResourceMask) -> Vec<String> {
        mask.ones()
            .filter_map(|i| self.indices.get_index(i).map(|(name, _)| name.clone()))
            .collect()
    }
}

/// Exclusive access to named resources, modelled as one dense bitset.
///
/// Every operation takes the single table lock for the duration of a few
/// bitwise operations. A unit reserves all of its resources in one step or
/// none of them, so holders can never deadlock on each other.
#[derive(Default)]
pub struct ResourceTable {
    state: Mutex<TableState>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the resources a unit needs and returns its requirement mask.
    /// Unseen names get the next bit; every mask grows to the new width.
    pub fn register_resource_needs(&self, key: UnitKey, resources: &[String]) -> ResourceMask {
        let mut state = self.state.lock();

        let mut bits = Vec::with_capacity(resources.len());
        for name in resources {
            let next = state.indices.len();
            let index = *state.indices.entry(name.clone()).or_insert(next);
            bits.push(index);
        }

        let width = state.width();
        for mask in state.requirements.values_mut() {
            mask.resize(width, false);
        }
        state.available.resize(width, true);

        let mut requirement = ResourceMask::new(width);
        for bit in bits {
            requirement.set(bit, true);
        }
        state.requirements.insert(key, requirement.clone());
        requirement
    }

    pub fn requirements(&self, key: UnitKey) -> Option<ResourceMask> {
        self.state.lock().requirements.get(&key).cloned()
    }

    /// Atomically reserves `mask` if every bit in it is free
    pub fn try_reserve(&self, mask: &ResourceMask) -> bool {
        let mut state = self.state.lock();
        if mask.is_subset_of(&state.available) {
            state.available.clear_bits(mask);
            true
        } else {
            false
        }
    }

    /// Like [`Self::try_reserve`] for a registered unit, reporting which
    /// resources blocked it. Units without requirements always succeed.
    pub fn try_reserve_for(&self, key: UnitKey) -> ReservationResult {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(requirement) = state.requirements.get(&key) else {
            return ReservationResult::Reserved;
        };
        if requirement.is_subset_of(&state.available) {
            state.available.clear_bits(requirement);
            ReservationResult::Reserved
        } else {
            let mut held = requirement.clone();
            held.clear_bits(&state.available);
            ReservationResult::Busy {
                held: state.names_of(&held),
            }
        }
    }

    /// Clears `mask` unconditionally
    pub fn reserve(&self, mask: &ResourceMask) {
        self.state.lock().available.clear_bits(mask);
    }

    /// Marks every bit of `mask` free again
    pub fn free(&self, mask: &ResourceMask) {
        self.state.lock().available.union_with(mask);
    }

    /// Frees everything a registered unit requires
    pub fn free_for(&self, key: UnitKey) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(requirement) = state.requirements.get(&key) {
            state.available.union_with(requirement);
        }
    }

    /// Marks a single resource as held. Returns false for an unknown name.
    pub fn reserve_by_name(&self, name: &str) -> bool {
        self.set_by_name(name, false)
    }

    /// Marks a single resource as free. Returns false for an unknown name.
    pub fn release_by_name(&self, name: &str) -> bool {
        self.set_by_name(name, true)
    }

    fn set_by_name(&self, name: &str, free: bool) -> bool {
        let mut state = self.state.lock();
        match state.indices.get(name).copied() {
            Some(index) => {
                state.available.set(index, free);
                true
            }
            None => false,
        }
    }

    pub fn set_all_available(&self) {
        self.state.lock().available.set_all();
    }

    /// Snapshot of the availability mask
    pub fn available(&self) -> ResourceMask {
        self.state.lock().available.clone()
    }

    pub fn is_available(&self, name: &str) -> Option<bool> {
        let state = self.state.lock();
        state.indices.get(name).map(|i| state.available.get(*i))
    }

    /// Resource names in bit order
    pub fn resource_names(&self) -> Vec<String> {
        self.state.lock().indices.keys().cloned().collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.state.lock().indices.get(name).copied()
    }
}
