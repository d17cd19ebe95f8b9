use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::PoolState;

/// Failure reported by a unit's lifecycle transition or by the factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unknown unit type '{type_name}' requested for '{name}'")]
    UnknownType { type_name: String, name: String },
    #[error("{transition} of unit '{name}' failed: {reason}")]
    Transition {
        name: String,
        transition: Transition,
        reason: String,
    },
}

/// Lifecycle transitions a unit goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Initialize,
    Start,
    Stop,
    BeginRun,
    EndRun,
    Execute,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Initialize => write!(f, "initialize"),
            Transition::Start => write!(f, "start"),
            Transition::Stop => write!(f, "stop"),
            Transition::BeginRun => write!(f, "beginRun"),
            Transition::EndRun => write!(f, "endRun"),
            Transition::Execute => write!(f, "execute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("head node already set to '{0}'")]
    HeadAlreadySet(String),
    #[error("head node must be added before any other node")]
    NoHead,
    #[error("decision hub node '{0}', requested to be parent, is not registered")]
    UnknownParent(String),
    #[error("no algorithm node named '{0}'")]
    UnknownAlgorithm(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlattenError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("composite nesting under '{name}' exceeds the maximum depth of {max_depth}")]
    DepthExceeded { name: String, max_depth: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("algorithm '{0}' requested, but not recognised")]
    UnknownUnit(String),
    #[error("resource '{0}' is not known to the pool")]
    UnknownResource(String),
    #[error("cannot {operation} a pool in state {state:?}")]
    InvalidTransition {
        operation: &'static str,
        state: PoolState,
    },
    #[error("initialization completed with {} failure(s): {}", .0.len(), .0.join("; "))]
    Initialization(Vec<String>),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("{} unit(s) failed during {transition}: {}", .failures.len(), .failures.join("; "))]
    Run {
        transition: Transition,
        failures: Vec<String>,
    },
    #[error("could not create clone of '{name}': {source}")]
    CloneCreation {
        name: String,
        #[source]
        source: UnitError,
    },
    #[error("instance queue of '{0}' is full")]
    QueueOverflow(String),
}
