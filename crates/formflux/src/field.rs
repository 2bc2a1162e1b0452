#![forbid(unsafe_code)]

//! Field configuration and per-field state.
//!
//! [`FieldConfig`] is the declarative half: what the schema says about a
//! field. [`Field`] is the live half the [`crate::Form`] owns: gates,
//! contributed conditions, the local disable override, and the validation
//! pipeline. Fields hold no value — the store is the single source of
//! truth and fields only know their path into it.

use std::collections::BTreeMap;
use std::time::Duration;

use formflux_core::condition::Condition;
use formflux_core::path::Path;
use formflux_core::store::Store;
use formflux_validate::pipeline::RulePipeline;
use formflux_validate::rule::RuleSpec;
use serde_json::Value;

use crate::gate::Gate;

/// How a config carries its rule list until registration parses it.
#[derive(Debug, Clone)]
pub(crate) enum RuleSource {
    Specs(Vec<RuleSpec>),
    Text(String),
    Json(Value),
}

/// Declarative field description, built fluently and handed to
/// [`crate::Form::register_field`].
#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub(crate) path: String,
    pub(crate) label: Option<String>,
    pub(crate) rules: Option<RuleSource>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) disabled: Gate,
    pub(crate) readonly: Gate,
    pub(crate) debounce: Option<Duration>,
}

impl FieldConfig {
    /// A field at `path` with no rules, no conditions, and open gates.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: None,
            rules: None,
            conditions: Vec::new(),
            disabled: Gate::Off,
            readonly: Gate::Off,
            debounce: None,
        }
    }

    /// Human-readable name, interpolated as `:attribute`. Defaults to the
    /// path's last segment.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Rules from a `"ruleName:p1,p2|other"` string.
    #[must_use]
    pub fn rules_str(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(RuleSource::Text(rules.into()));
        self
    }

    /// Rules from pre-parsed descriptors.
    #[must_use]
    pub fn rules(mut self, specs: Vec<RuleSpec>) -> Self {
        self.rules = Some(RuleSource::Specs(specs));
        self
    }

    /// Rules from the JSON object form.
    #[must_use]
    pub fn rules_value(mut self, value: Value) -> Self {
        self.rules = Some(RuleSource::Json(value));
        self
    }

    /// Add one availability condition (the field's own condition list).
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Replace the field's own condition list.
    #[must_use]
    pub fn conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// The `disabled` prop in any of its three forms.
    #[must_use]
    pub fn disabled(mut self, gate: impl Into<Gate>) -> Self {
        self.disabled = gate.into();
        self
    }

    /// The `readonly` prop in any of its three forms.
    #[must_use]
    pub fn readonly(mut self, gate: impl Into<Gate>) -> Self {
        self.readonly = gate.into();
        self
    }

    /// Per-field debounce window override.
    #[must_use]
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }
}

/// Live per-field state owned by the form.
pub(crate) struct Field {
    pub(crate) path: Path,
    pub(crate) attribute: String,
    /// The schema's own condition list.
    pub(crate) own_conditions: Vec<Condition>,
    /// Conditions contributed by containers, keyed for removal.
    pub(crate) extra_conditions: BTreeMap<String, Vec<Condition>>,
    pub(crate) disabled_gate: Gate,
    pub(crate) readonly_gate: Gate,
    /// `None` defers to the disabled gate; an explicit value from
    /// `disable()`/`enable()` wins over condition logic.
    pub(crate) local_disabled: Option<bool>,
    /// Derived availability, kept current by the form.
    pub(crate) available: bool,
    /// Mask-completion flag maintained by the rendering layer.
    pub(crate) mask_complete: Option<bool>,
    pub(crate) pipeline: RulePipeline,
}

impl Field {
    /// The row context conditions and dependencies resolve in.
    pub(crate) fn context(&self) -> Path {
        self.path.parent()
    }

    /// The field's name: its last path segment.
    pub(crate) fn name(&self) -> &str {
        self.path.last().unwrap_or(self.attribute.as_str())
    }

    /// Own plus contributed conditions, in a stable order.
    pub(crate) fn all_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.own_conditions
            .iter()
            .chain(self.extra_conditions.values().flatten())
    }

    /// Effective disabled state: the local override wins, then the gate.
    pub(crate) fn is_disabled(&self, store: &Store) -> bool {
        self.local_disabled
            .unwrap_or_else(|| self.disabled_gate.resolve(&self.path, store))
    }

    /// Effective readonly state.
    pub(crate) fn is_readonly(&self, store: &Store) -> bool {
        self.readonly_gate.resolve(&self.path, store)
    }
}
