#![forbid(unsafe_code)]

//! The three forms a `disabled`/`readonly` prop can take.
//!
//! Schemas supply a boolean, a predicate over the live form, or a
//! declarative condition list — all three resolve through one entrypoint so
//! callers never branch on the form. Only the condition-list form is
//! reactive: its referenced paths are watchable. Predicates are evaluated
//! fresh on every read.

use std::fmt;
use std::sync::Arc;

use formflux_core::condition::{Condition, eval_all};
use formflux_core::path::Path;
use formflux_core::store::Store;

/// What a gate predicate gets to look at: the owning field's path and the
/// live form-data graph.
#[derive(Debug)]
pub struct GateProbe<'a> {
    pub path: &'a Path,
    pub store: &'a Store,
}

/// Predicate form of a gate.
pub type GateFn = dyn Fn(&GateProbe<'_>) -> bool + Send + Sync;

/// A `disabled`/`readonly` prop in any of its three supported forms.
#[derive(Clone, Default)]
pub enum Gate {
    /// A plain boolean.
    Static(bool),
    /// A condition list, AND-reduced against the graph.
    When(Vec<Condition>),
    /// A host predicate, invoked directly — no AND aggregation.
    Predicate(Arc<GateFn>),
    /// No gate configured; resolves false.
    #[default]
    Off,
}

impl Gate {
    /// A predicate gate.
    #[must_use]
    pub fn predicate(f: impl Fn(&GateProbe<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Resolve for the field at `path` against the current graph.
    ///
    /// Condition lists evaluate in the field's row context (its parent
    /// path), same as availability conditions.
    #[must_use]
    pub fn resolve(&self, path: &Path, store: &Store) -> bool {
        match self {
            Self::Off => false,
            Self::Static(value) => *value,
            Self::When(conditions) => eval_all(conditions, &path.parent(), store),
            Self::Predicate(f) => f(&GateProbe { path, store }),
        }
    }

    /// The paths a condition-list gate reads, for watch registration.
    /// Static and predicate gates have none.
    #[must_use]
    pub fn referenced_paths(&self, path: &Path) -> Vec<Path> {
        match self {
            Self::When(conditions) => {
                let context = path.parent();
                conditions
                    .iter()
                    .map(|c| c.referenced_path(&context))
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

impl From<bool> for Gate {
    fn from(value: bool) -> Self {
        Self::Static(value)
    }
}

impl From<Vec<Condition>> for Gate {
    fn from(conditions: Vec<Condition>) -> Self {
        Self::When(conditions)
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Gate::Off"),
            Self::Static(value) => write!(f, "Gate::Static({value})"),
            Self::When(conditions) => write!(f, "Gate::When({} conditions)", conditions.len()),
            Self::Predicate(_) => write!(f, "Gate::Predicate"),
        }
    }
}
