use crate::clone_pool::ClonePool;
use crate::config::PoolConfig;
use crate::error::{PoolError, Transition, UnitError};
use crate::graph::{PrecedenceGraph, ROOT_NODE_NAME};
use crate::infrastructure::{UnitFactory, UnitHandle};
use crate::registry::UnitRegistry;
use crate::resource::{ReservationResult, ResourceTable};
use crate::sequencer::{SequencerFlattener, dedup_by_identity};
use crate::types::{AcquireFailureReason, AcquireResult, InstanceCounts, TypeName, UnitId, UnitKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lifecycle of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Configured,
    Initialized,
    Started,
    Stopped,
    Finalized,
}

/// Owns the precedence graph, one clone pool per leaf unit and the resource
/// table, and hands unit instances out to the executor.
///
/// Structure is built through `&mut self` during [`Self::initialize`]; the
/// runtime operations take `&self` so one pool can be shared across worker
/// threads behind an `Arc`.
pub struct AlgResourcePool {
    config: PoolConfig,
    factory: Arc<dyn UnitFactory>,
    default_top_units: Vec<TypeName>,
    state: PoolState,
    registry: UnitRegistry,
    graph: PrecedenceGraph,
    top_units: Vec<UnitId>,
    flat_units: Vec<UnitId>,
    pools: HashMap<UnitKey, Arc<ClonePool>>,
    /// Every live leaf instance, clones included
    instances: Mutex<Vec<UnitHandle>>,
    resources: ResourceTable,
    misses: Mutex<HashMap<String, u64>>,
}

impl AlgResourcePool {
    pub fn new(config: PoolConfig, factory: Arc<dyn UnitFactory>) -> Self {
        Self {
            config,
            factory,
            default_top_units: Vec::new(),
            state: PoolState::Configured,
            registry: UnitRegistry::new(),
            graph: PrecedenceGraph::new(),
            top_units: Vec::new(),
            flat_units: Vec::new(),
            pools: HashMap::new(),
            instances: Mutex::new(Vec::new()),
            resources: ResourceTable::new(),
            misses: Mutex::new(HashMap::new()),
        }
    }

    /// Top-level units to fall back on when the configuration lists none
    pub fn with_default_top_units(mut self, units: Vec<TypeName>) -> Self {
        self.default_top_units = units;
        self
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn graph(&self) -> &PrecedenceGraph {
        &self.graph
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    fn expect_state(&self, operation: &'static str, allowed: &[PoolState]) -> Result<(), PoolError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PoolError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Builds the graph, the flat leaf list, the clone pools and the resource
    /// table.
    ///
    /// Independent entries are processed best-effort: every failure is logged
    /// and collected, and the pool still ends up `Initialized` with whatever
    /// could be built. The caller decides whether a partial failure is fatal.
    pub fn initialize(&mut self) -> Result<(), PoolError> {
        self.expect_state("initialize", &[PoolState::Configured])?;
        let mut failures = Vec::new();

        let top_names = if self.config.top_units.is_empty() {
            info!("Top unit list empty, recovering the default list");
            self.default_top_units.clone()
        } else {
            self.config.top_units.clone()
        };

        // eager, AND, concurrent, propagate-all
        self.graph
            .add_head_node(ROOT_NODE_NAME, false, false, false, true)?;

        let factory = Arc::clone(&self.factory);
        for item in &top_names {
            match self.registry.resolve(item, factory.as_ref()) {
                Ok(id) => {
                    if !self.top_units.contains(&id) {
                        self.top_units.push(id);
                    }
                }
                Err(e) => {
                    warn!(unit = %item, error = %e, "Top unit could not be set up");
                    failures.push(e.to_string());
                }
            }
        }

        let mut flat = Vec::new();
        for &id in &self.top_units {
            let mut flattener = SequencerFlattener::new(
                &mut self.registry,
                &mut self.graph,
                factory.as_ref(),
                self.config.max_depth,
            );
            if let Err(e) = flattener.flatten(id, ROOT_NODE_NAME, &mut flat) {
                let name = self.registry.get(id).name().to_string();
                error!(unit = %name, error = %e, "Unit could not be flattened");
                failures.push(format!("{}: {}", name, e));
            }
        }
        dedup_by_identity(&mut flat);
        self.flat_units = flat;

        debug!("List of algorithms is:");
        for id in &self.flat_units {
            let unit = self.registry.get(*id);
            debug!("  o {}/{} {}", unit.type_name(), unit.name(), id);
        }

        for id in self.flat_units.clone() {
            let unit = Arc::clone(self.registry.get(id));
            if let Err(e) = self.bootstrap(&unit) {
                error!(unit = unit.name(), error = %e, "Unit could not be bootstrapped");
                failures.push(e.to_string());
            }
        }

        // every resource starts out free
        self.resources.set_all_available();
        self.state = PoolState::Initialized;

        if failures.is_empty() {
            info!(
                top = self.top_units.len(),
                leaves = self.flat_units.len(),
                resources = self.resources.resource_names().len(),
                "Resource pool initialized"
            );
            Ok(())
        } else {
            warn!(failures = failures.len(), "Units could not be properly decoded");
            Err(PoolError::Initialization(failures))
        }
    }

    /// Starts every leaf instance, clones included. Stops at the first failure.
    pub fn start(&mut self) -> Result<(), PoolError> {
        self.expect_state("start", &[PoolState::Initialized, PoolState::Stopped])?;
        for unit in self.instances.get_mut().iter() {
            if let Err(e) = unit.start() {
                error!(unit = unit.name(), clone = unit.clone_index(), "Unable to start unit");
                return Err(e.into());
            }
        }
        self.state = PoolState::Started;
        Ok(())
    }

    /// Stops every leaf instance. Stops at the first failure.
    pub fn stop(&mut self) -> Result<(), PoolError> {
        self.expect_state("stop", &[PoolState::Started])?;
        for unit in self.instances.get_mut().iter() {
            if let Err(e) = unit.stop() {
                error!(unit = unit.name(), clone = unit.clone_index(), "Unable to stop unit");
                return Err(e.into());
            }
        }
        if self.config.count_instance_misses {
            info!("{}", self.instance_misses_report());
        }
        self.state = PoolState::Stopped;
        Ok(())
    }

    /// Drops every clone pool, the graph and all unit handles held by the pool
    pub fn finalize(&mut self) -> Result<(), PoolError> {
        self.expect_state(
            "finalize",
            &[
                PoolState::Configured,
                PoolState::Initialized,
                PoolState::Stopped,
            ],
        )?;
        self.pools.clear();
        self.graph = PrecedenceGraph::new();
        self.registry = UnitRegistry::new();
        self.top_units.clear();
        self.flat_units.clear();
        self.instances.get_mut().clear();
        self.state = PoolState::Finalized;
        Ok(())
    }

    /// Calls `begin_run` on every instance of every leaf unit
    pub fn begin_run(&self) -> Result<(), PoolError> {
        let failures: Vec<String> = self
            .instances_snapshot()
            .iter()
            .filter_map(|unit| run_hook(unit, Transition::BeginRun).err())
            .collect();
        run_result(Transition::BeginRun, failures)
    }

    /// Calls `end_run` on every leaf instance and on every composite top unit
    pub fn end_run(&self) -> Result<(), PoolError> {
        let mut failures: Vec<String> = self
            .instances_snapshot()
            .iter()
            .filter_map(|unit| run_hook(unit, Transition::EndRun).err())
            .collect();
        for id in &self.top_units {
            if self.flat_units.contains(id) {
                continue;
            }
            if let Err(e) = run_hook(self.registry.get(*id), Transition::EndRun) {
                failures.push(e);
            }
        }
        run_result(Transition::EndRun, failures)
    }

    /// Hooks run on a copy so the instance list is not locked during unit code
    fn instances_snapshot(&self) -> Vec<UnitHandle> {
        self.instances.lock().clone()
    }

    // ─── Bootstrap ──────────────────────────────────────────────────────────

    fn allowed_instances(&self, unit: &UnitHandle) -> usize {
        let cardinality = unit.cardinality();
        if cardinality == 0 {
            return 1;
        }
        if unit.is_clonable() || cardinality == 1 {
            return cardinality;
        }
        if self.config.override_unclonable {
            warn!(
                unit = unit.name(),
                cardinality, "Overriding unclonability of unit, setting cardinality"
            );
            cardinality
        } else {
            info!(
                unit = unit.name(),
                cardinality, "Unit is unclonable but cardinality was set, only creating 1 instance"
            );
            1
        }
    }

    fn bootstrap(&mut self, unit: &UnitHandle) -> Result<(), PoolError> {
        let name = unit.name();
        let key = UnitKey::of(name);
        debug!(unit = name, "Treating resource management and clones");

        let allowed = self.allowed_instances(unit);
        let pool = Arc::new(ClonePool::new(name, allowed, unit.is_reentrant()));
        self.resources
            .register_resource_needs(key, unit.needed_resources());
        self.pools.insert(key, Arc::clone(&pool));
        self.graph
            .attach_algorithms_to_nodes(name, Arc::clone(&pool))?;

        pool.add_instance(Arc::clone(unit))?;
        self.instances.get_mut().push(Arc::clone(unit));

        if !self.config.lazy_creation {
            for index in 1..allowed {
                debug!(unit = %unit.type_name_ref(), index, "Creating clone");
                let clone = self.create_clone(unit, index)?;
                pool.add_instance(Arc::clone(&clone))?;
                self.instances.get_mut().push(clone);
            }
        }
        Ok(())
    }

    fn create_clone(&self, unit: &UnitHandle, index: usize) -> Result<UnitHandle, PoolError> {
        let clone_err = |source: UnitError| PoolError::CloneCreation {
            name: unit.name().to_string(),
            source,
        };
        let mut clone = self
            .factory
            .create(&unit.type_name_ref())
            .map_err(clone_err)?;
        clone.set_clone_index(index);
        if let Err(e) = clone.initialize() {
            error!(unit = unit.name(), index, "Unable to initialize clone");
            return Err(clone_err(e));
        }
        Ok(Arc::from(clone))
    }

    /// Creates one more clone on demand. Only used with lazy creation.
    fn spawn_clone(&self, pool: &ClonePool, index: usize) -> Result<UnitHandle, PoolError> {
        let primary = self
            .registry
            .lookup(pool.name())
            .map(|id| Arc::clone(self.registry.get(id)))
            .ok_or_else(|| PoolError::UnknownUnit(pool.name().to_string()))?;
        let clone = self.create_clone(&primary, index)?;
        if self.state == PoolState::Started {
            clone.start().map_err(|source| PoolError::CloneCreation {
                name: pool.name().to_string(),
                source,
            })?;
        }
        debug!(unit = pool.name(), index, "Clone created lazily");
        self.instances.lock().push(Arc::clone(&clone));
        Ok(clone)
    }

    // ─── Runtime ────────────────────────────────────────────────────────────

    fn pool_for(&self, name: &str) -> Result<&Arc<ClonePool>, PoolError> {
        self.pools.get(&UnitKey::of(name)).ok_or_else(|| {
            error!(unit = name, "Algorithm requested, but not recognised");
            PoolError::UnknownUnit(name.to_string())
        })
    }

    fn try_pop_or_create(&self, pool: &ClonePool) -> Result<Option<UnitHandle>, PoolError> {
        if let Some(instance) = pool.try_pop() {
            return Ok(Some(instance));
        }
        if !self.config.lazy_creation {
            return Ok(None);
        }
        let Some(index) = pool.reserve_slot() else {
            return Ok(None);
        };
        match self.spawn_clone(pool, index) {
            Ok(clone) => Ok(Some(clone)),
            Err(e) => {
                pool.release_slot();
                Err(e)
            }
        }
    }

    /// Hands out an instance of `name` with all of its resources reserved.
    ///
    /// A missing instance or a busy resource is reported as
    /// [`AcquireResult::Failure`], not as an error; only an unknown name is.
    pub fn acquire_algorithm(&self, name: &str, blocking: bool) -> Result<AcquireResult, PoolError> {
        let pool = self.pool_for(name)?;

        let instance = match self.try_pop_or_create(pool)? {
            Some(instance) => instance,
            None if blocking => pool.pop(),
            None => {
                if self.config.count_instance_misses {
                    *self.misses.lock().entry(name.to_string()).or_insert(0) += 1;
                }
                debug!(unit = name, "No instance could be retrieved in non-blocking mode");
                return Ok(AcquireResult::Failure {
                    reason: AcquireFailureReason::NoInstance,
                });
            }
        };

        let result = match self.resources.try_reserve_for(UnitKey::of(name)) {
            ReservationResult::Reserved => AcquireResult::Success {
                instance: Arc::clone(&instance),
            },
            ReservationResult::Busy { held } => {
                debug!(unit = name, ?held, "Resources of unit are held elsewhere");
                if !pool.is_reentrant() {
                    pool.push(Arc::clone(&instance))?;
                }
                AcquireResult::Failure {
                    reason: AcquireFailureReason::ResourcesBusy { held },
                }
            }
        };

        // a reentrant instance is never consumed
        if pool.is_reentrant() {
            pool.push(instance)?;
        }
        Ok(result)
    }

    /// Frees the resources of `name` and returns a non-reentrant instance to its pool
    pub fn release_algorithm(&self, name: &str, instance: UnitHandle) -> Result<(), PoolError> {
        let pool = self.pool_for(name)?;
        self.resources.free_for(UnitKey::of(name));
        if !pool.is_reentrant() {
            pool.push(instance)?;
        }
        Ok(())
    }

    /// Marks a single named resource as held, outside of any unit
    pub fn acquire_resource(&self, name: &str) -> Result<(), PoolError> {
        if self.resources.reserve_by_name(name) {
            Ok(())
        } else {
            Err(PoolError::UnknownResource(name.to_string()))
        }
    }

    pub fn release_resource(&self, name: &str) -> Result<(), PoolError> {
        if self.resources.release_by_name(name) {
            Ok(())
        } else {
            Err(PoolError::UnknownResource(name.to_string()))
        }
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Unique leaf units in first-visit order
    pub fn flat_algorithm_list(&self) -> Vec<UnitHandle> {
        self.flat_units
            .iter()
            .map(|id| Arc::clone(self.registry.get(*id)))
            .collect()
    }

    pub fn top_algorithm_list(&self) -> Vec<UnitHandle> {
        self.top_units
            .iter()
            .map(|id| Arc::clone(self.registry.get(*id)))
            .collect()
    }

    pub fn instance_counts(&self, name: &str) -> Option<InstanceCounts> {
        self.pools.get(&UnitKey::of(name)).map(|p| p.counts())
    }

    /// Non-blocking misses per unit, most frequent first
    pub fn instance_misses(&self) -> Vec<(String, u64)> {
        let mut misses: Vec<(String, u64)> = self
            .misses
            .lock()
            .iter()
            .map(|(name, n)| (name.clone(), *n))
            .collect();
        misses.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        misses
    }

    pub fn instance_misses_report(&self) -> String {
        let misses = self.instance_misses();
        let width = misses.first().map_or(1, |(_, n)| n.to_string().len());
        let rule = "=".repeat(79);

        let mut out = String::new();
        let _ = writeln!(out, "Hit parade of algorithm instance misses:");
        let _ = writeln!(out, " {}", rule);
        let _ = writeln!(out, "{:>w$} | Algorithm (# of clones)", "Misses", w = width + 7);
        let _ = writeln!(out, " {}", rule);
        for (name, n) in &misses {
            let allowed = self.instance_counts(name).map_or(0, |c| c.allowed);
            let _ = writeln!(out, "{:>w$}   {} ({})", n, name, allowed, w = width + 6);
        }
        out
    }
}

fn run_hook(unit: &UnitHandle, transition: Transition) -> Result<(), String> {
    let outcome = match transition {
        Transition::BeginRun => unit.begin_run(),
        Transition::EndRun => unit.end_run(),
        Transition::Initialize => unit.initialize(),
        Transition::Start => unit.start(),
        Transition::Stop => unit.stop(),
        Transition::Execute => unit.execute(),
    };
    outcome.map_err(|e| {
        error!(unit = unit.name(), clone = unit.clone_index(), error = %e, "{} failed", transition);
        e.to_string()
    })
}

fn run_result(transition: Transition, failures: Vec<String>) -> Result<(), PoolError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(PoolError::Run {
            transition,
            failures,
        })
    }
}
