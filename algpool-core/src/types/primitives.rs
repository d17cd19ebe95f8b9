use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// How a composite combines the outcome of its members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    /// All members must pass
    #[default]
    And,
    /// Any passing member is enough
    Or,
}

/// Whether a composite stops evaluating members once its outcome is known
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exit {
    /// Short-circuit on the first decisive member
    Lazy,
    /// Every member is visited
    #[default]
    Eager,
}

/// Whether members form an ordered chain or an unordered set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sequencing {
    Sequential,
    #[default]
    Concurrent,
}

/// Control semantics of a composite unit (a sequencer).
///
/// Only meaningful for units that declare members; leaves carry the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub logic: Logic,
    pub exit: Exit,
    pub sequencing: Sequencing,
    /// Ignore each member's pass/fail result when propagating
    pub all_pass: bool,
}

impl Composition {
    pub fn new(logic: Logic, exit: Exit, sequencing: Sequencing, all_pass: bool) -> Self {
        Self {
            logic,
            exit,
            sequencing,
            all_pass,
        }
    }

    pub fn mode_or(&self) -> bool {
        self.logic == Logic::Or
    }

    pub fn is_lazy(&self) -> bool {
        self.exit == Exit::Lazy
    }

    pub fn is_sequential(&self) -> bool {
        self.sequencing == Sequencing::Sequential
    }
}

/// A `Type/Name` reference to a unit. A bare `Name` means the type equals the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeName {
    pub type_name: String,
    pub name: String,
}

impl TypeName {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((t, n)) => Self::new(t.trim(), n.trim()),
            None => Self::new(s.trim(), s.trim()),
        }
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<TypeName> for String {
    fn from(tn: TypeName) -> Self {
        tn.to_string()
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.type_name == self.name {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.type_name, self.name)
        }
    }
}

/// Arena index of a unit inside the registry. This is the identity used for
/// de-duplication: two references to the same name resolve to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable hash of a unit name, used to key pools and resource requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitKey(pub u64);

impl UnitKey {
    pub fn of(name: &str) -> Self {
        // DefaultHasher::new() uses fixed keys, so the value is stable within the process
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self(hasher.finish())
    }
}
