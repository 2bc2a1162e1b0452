#![forbid(unsafe_code)]

//! Declarative availability conditions.
//!
//! A condition is a tuple tested against the form-data graph:
//!
//! - `["some.path"]` — truthy test on the value at the path
//! - `["some.path", value]` — deep equality against a scalar/object
//! - `["some.path", [v1, v2]]` — membership: the stored value must equal
//!   one of the array's elements, case-sensitivity as stored
//!
//! A condition *list* is satisfied only if every entry evaluates true (AND);
//! the empty list is vacuously true. Paths go through the wildcard-aware
//! resolver, so a schema written once per repeated row tests the right
//! siblings. Evaluation is pure over the current store snapshot.

use std::fmt;

use serde_json::Value;

use crate::path::Path;
use crate::resolver;
use crate::store::Store;
use crate::value::is_truthy;

/// What the value at the condition's path is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// Deep equality with one value.
    Equals(Value),
    /// Equality with any element of the set.
    OneOf(Vec<Value>),
}

/// One declarative condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    target: String,
    expected: Option<Expected>,
}

impl Condition {
    /// Truthy test: `[path]`.
    #[must_use]
    pub fn truthy(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            expected: None,
        }
    }

    /// Equality test: `[path, value]`.
    #[must_use]
    pub fn equals(target: impl Into<String>, value: Value) -> Self {
        Self {
            target: target.into(),
            expected: Some(Expected::Equals(value)),
        }
    }

    /// Membership test: `[path, [v1, v2, ...]]`.
    #[must_use]
    pub fn one_of(target: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            expected: Some(Expected::OneOf(values)),
        }
    }

    /// The unresolved target expression.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Parse one condition from its JSON tuple form.
    pub fn from_value(raw: &Value) -> Result<Self, ConditionParseError> {
        match raw {
            Value::String(path) => Ok(Self::truthy(path.clone())),
            Value::Array(parts) => match parts.as_slice() {
                [Value::String(path)] => Ok(Self::truthy(path.clone())),
                [Value::String(path), Value::Array(values)] => {
                    Ok(Self::one_of(path.clone(), values.clone()))
                }
                [Value::String(path), value] => Ok(Self::equals(path.clone(), value.clone())),
                _ => Err(ConditionParseError::BadShape(raw.clone())),
            },
            _ => Err(ConditionParseError::BadShape(raw.clone())),
        }
    }

    /// The absolute path this condition reads, given a context row.
    #[must_use]
    pub fn referenced_path(&self, context: &Path) -> Path {
        let (path_part, _) = resolver::split_default(&self.target);
        resolver::resolved_path(path_part, context)
    }

    /// Evaluate against the current graph.
    #[must_use]
    pub fn eval(&self, context: &Path, store: &Store) -> bool {
        let resolved = resolver::resolve(&self.target, context, store);
        let value = resolved.value.unwrap_or(Value::Null);
        match &self.expected {
            None => is_truthy(&value),
            Some(Expected::Equals(expected)) => value == *expected,
            Some(Expected::OneOf(set)) => set.iter().any(|v| value == *v),
        }
    }
}

/// AND-reduce a condition list; the empty list is vacuously true.
#[must_use]
pub fn eval_all(conditions: &[Condition], context: &Path, store: &Store) -> bool {
    conditions.iter().all(|c| c.eval(context, store))
}

/// Parse a condition list from its JSON form (an array of tuples).
pub fn parse_conditions(raw: &Value) -> Result<Vec<Condition>, ConditionParseError> {
    match raw {
        Value::Array(items) => items.iter().map(Condition::from_value).collect(),
        other => Err(ConditionParseError::BadShape(other.clone())),
    }
}

/// A condition tuple that doesn't match any supported shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionParseError {
    BadShape(Value),
}

impl fmt::Display for ConditionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadShape(v) => write!(f, "unsupported condition shape: {v}"),
        }
    }
}

impl std::error::Error for ConditionParseError {}
