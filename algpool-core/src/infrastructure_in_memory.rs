use crate::error::{Transition, UnitError};
use crate::infrastructure::{UnitFactory, WorkUnit};
use crate::types::{Composition, TypeName};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn default_cardinality() -> usize {
    1
}

fn default_clonable() -> bool {
    true
}

/// Declarative description of a unit, as found in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    /// Defaults to the name
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default = "default_cardinality")]
    pub cardinality: usize,
    #[serde(default = "default_clonable")]
    pub clonable: bool,
    #[serde(default)]
    pub resources: Vec<String>,
    /// `Type/Name` references; non-empty makes this unit a composite
    #[serde(default)]
    pub members: Vec<TypeName>,
    #[serde(default)]
    pub composition: Composition,
    /// Simulated cost of one `execute` call, in microseconds
    #[serde(default)]
    pub work_us: u64,
    /// Transitions that report failure (fault injection)
    #[serde(default)]
    pub fail_on: Vec<Transition>,
    /// Clones with an index at or above this value fail to initialize
    #[serde(default)]
    pub fail_clone_from: Option<usize>,
}

impl UnitSpec {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            cardinality: 1,
            clonable: true,
            resources: Vec::new(),
            members: Vec::new(),
            composition: Composition::default(),
            work_us: 0,
            fail_on: Vec::new(),
            fail_clone_from: None,
        }
    }

    pub fn composite(name: impl Into<String>, members: &[&str], composition: Composition) -> Self {
        Self {
            members: members.iter().map(|m| TypeName::parse(m)).collect(),
            composition,
            ..Self::leaf(name)
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: usize) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn unclonable(mut self) -> Self {
        self.clonable = false;
        self
    }

    pub fn with_resources(mut self, resources: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn failing_on(mut self, transition: Transition) -> Self {
        self.fail_on.push(transition);
        self
    }

    pub fn failing_clones_from(mut self, index: usize) -> Self {
        self.fail_clone_from = Some(index);
        self
    }

    pub fn resolved_type(&self) -> &str {
        self.type_name.as_deref().unwrap_or(&self.name)
    }
}

/// Per-instance call counters, shared between a unit and the factory that made it
#[derive(Debug, Default)]
pub struct UnitProbe {
    pub clone_index: AtomicUsize,
    pub initialized: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub begun_runs: AtomicUsize,
    pub ended_runs: AtomicUsize,
    pub executions: AtomicUsize,
}

impl UnitProbe {
    fn counter(&self, transition: Transition) -> &AtomicUsize {
        match transition {
            Transition::Initialize => &self.initialized,
            Transition::Start => &self.started,
            Transition::Stop => &self.stopped,
            Transition::BeginRun => &self.begun_runs,
            Transition::EndRun => &self.ended_runs,
            Transition::Execute => &self.executions,
        }
    }

    pub fn count(&self, transition: Transition) -> usize {
        self.counter(transition).load(Ordering::SeqCst)
    }
}

/// A unit whose behaviour is fully described by a [`UnitSpec`]
pub struct ConfiguredUnit {
    spec: Arc<UnitSpec>,
    clone_index: usize,
    probe: Arc<UnitProbe>,
}

impl ConfiguredUnit {
    pub fn new(spec: Arc<UnitSpec>) -> Self {
        Self {
            spec,
            clone_index: 0,
            probe: Arc::new(UnitProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<UnitProbe> {
        Arc::clone(&self.probe)
    }

    fn transition(&self, transition: Transition) -> Result<(), UnitError> {
        self.probe.counter(transition).fetch_add(1, Ordering::SeqCst);
        let clone_fails = transition == Transition::Initialize
            && self.clone_index > 0
            && self
                .spec
                .fail_clone_from
                .is_some_and(|from| self.clone_index >= from);
        if clone_fails || self.spec.fail_on.contains(&transition) {
            return Err(UnitError::Transition {
                name: self.spec.name.clone(),
                transition,
                reason: format!("injected failure (clone {})", self.clone_index),
            });
        }
        Ok(())
    }
}

impl WorkUnit for ConfiguredUnit {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn type_name(&self) -> &str {
        self.spec.resolved_type()
    }

    fn cardinality(&self) -> usize {
        self.spec.cardinality
    }

    fn is_clonable(&self) -> bool {
        self.spec.clonable
    }

    fn needed_resources(&self) -> &[String] {
        &self.spec.resources
    }

    fn members(&self) -> &[TypeName] {
        &self.spec.members
    }

    fn composition(&self) -> Composition {
        self.spec.composition
    }

    fn clone_index(&self) -> usize {
        self.clone_index
    }

    fn set_clone_index(&mut self, index: usize) {
        self.clone_index = index;
        self.probe.clone_index.store(index, Ordering::SeqCst);
    }

    fn initialize(&self) -> Result<(), UnitError> {
        self.transition(Transition::Initialize)
    }

    fn start(&self) -> Result<(), UnitError> {
        self.transition(Transition::Start)
    }

    fn stop(&self) -> Result<(), UnitError> {
        self.transition(Transition::Stop)
    }

    fn begin_run(&self) -> Result<(), UnitError> {
        self.transition(Transition::BeginRun)
    }

    fn end_run(&self) -> Result<(), UnitError> {
        self.transition(Transition::EndRun)
    }

    fn execute(&self) -> Result<(), UnitError> {
        if self.spec.work_us > 0 {
            std::thread::sleep(Duration::from_micros(self.spec.work_us));
        }
        self.transition(Transition::Execute)
    }
}

/// Factory over a fixed table of [`UnitSpec`]s, keyed by unit name.
///
/// Every instance it creates is tracked through its [`UnitProbe`] so callers
/// can observe lifecycle calls after the fact.
#[derive(Default)]
pub struct ConfiguredFactory {
    specs: IndexMap<String, Arc<UnitSpec>>,
    probes: Mutex<IndexMap<String, Vec<Arc<UnitProbe>>>>,
}

impl ConfiguredFactory {
    pub fn new(specs: impl IntoIterator<Item = UnitSpec>) -> Self {
        Self {
            specs: specs
                .into_iter()
                .map(|s| (s.name.clone(), Arc::new(s)))
                .collect(),
            probes: Mutex::new(IndexMap::new()),
        }
    }

    pub fn spec(&self, name: &str) -> Option<&UnitSpec> {
        self.specs.get(name).map(|s| s.as_ref())
    }

    /// Probes of every instance created under `name`, in creation order
    pub fn probes(&self, name: &str) -> Vec<Arc<UnitProbe>> {
        self.probes.lock().get(name).cloned().unwrap_or_default()
    }

    /// Number of instances created under `name`
    pub fn created(&self, name: &str) -> usize {
        self.probes.lock().get(name).map_or(0, Vec::len)
    }
}

impl UnitFactory for ConfiguredFactory {
    fn create(&self, id: &TypeName) -> Result<Box<dyn WorkUnit>, UnitError> {
        let spec = self
            .specs
            .get(&id.name)
            .filter(|s| s.resolved_type() == id.type_name)
            .ok_or_else(|| UnitError::UnknownType {
                type_name: id.type_name.clone(),
                name: id.name.clone(),
            })?;

        let unit = ConfiguredUnit::new(Arc::clone(spec));
        self.probes
            .lock()
            .entry(id.name.clone())
            .or_default()
            .push(unit.probe());
        Ok(Box::new(unit))
    }
}
