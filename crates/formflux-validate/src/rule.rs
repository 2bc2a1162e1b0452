#![forbid(unsafe_code)]

//! The rule contract, rule descriptors, and the name → factory registry.
//!
//! # Rule string grammar
//!
//! ```text
//! "ruleName:param1,param2|otherRule:param"
//! ```
//!
//! Pipes delimit rules, a colon introduces the attribute list, commas split
//! attributes. An attribute of the form `key=value` is *named* rather than
//! positional (`unique:users,email,debounce=300`). The object form
//! `{"ruleName": {...}}` is equally supported via [`RuleSpec::from_value`].
//!
//! # Dispatch
//!
//! Rule names resolve through a [`RuleRegistry`] exactly once, when a
//! field's schema is parsed — there is no runtime name inspection. Factories
//! receive the parsed [`RuleSpec`] plus the form's [`Services`] and return a
//! ready [`Rule`] or a [`ConfigError`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use formflux_core::path::Path;
use serde_json::Value;

use crate::transport::{CaptchaProvider, ConfigError, HttpClient, TransportError, UniqueBackend};

// ---------------------------------------------------------------------------
// CheckContext
// ---------------------------------------------------------------------------

/// A dependency resolved on the main thread before `check` runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    /// Absolute path the dependency expression resolved to.
    pub path: Path,
    /// Value bound there at trigger time (or the default literal).
    pub value: Option<Value>,
    /// `true` when `value` came from a `|'literal'` fallback.
    pub used_default: bool,
}

/// Everything a rule's `check` may look at.
///
/// Contexts are snapshots: the pipeline builds one per rule on the main
/// thread at trigger time, and async rules receive an owned clone on their
/// worker thread. Rules never read the store directly.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// The field's current value (`null` when unbound).
    pub value: Value,
    /// Human-readable field name, interpolated as `:attribute`.
    pub attribute: String,
    /// The field's absolute path.
    pub path: Path,
    /// Dependency expression → resolution, keyed by the expression text
    /// returned from [`Rule::dependencies`].
    pub dependencies: BTreeMap<String, ResolvedDependency>,
    /// `false` when the element is disabled, readonly, or unavailable.
    pub active: bool,
    /// Mask-completion flag from the rendering layer, when the field has
    /// masking behavior.
    pub mask_complete: Option<bool>,
}

impl CheckContext {
    /// A minimal context for tests and simple hosts.
    #[must_use]
    pub fn bare(value: Value, attribute: impl Into<String>, path: Path) -> Self {
        Self {
            value,
            attribute: attribute.into(),
            path,
            dependencies: BTreeMap::new(),
            active: true,
            mask_complete: None,
        }
    }

    /// The resolved value of a dependency, `null` when unresolved.
    #[must_use]
    pub fn dependency_value(&self, expr: &str) -> Value {
        self.dependencies
            .get(expr)
            .and_then(|d| d.value.clone())
            .unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Rule trait
// ---------------------------------------------------------------------------

/// Why a rule could not produce a verdict. Distinct from the rule simply
/// failing, which is `Ok(false)`.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    Config(ConfigError),
    Transport(TransportError),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RuleError {}

impl From<ConfigError> for RuleError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<TransportError> for RuleError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// One named, parametrized predicate contributing to a field's validity.
pub trait Rule: Send + Sync {
    /// The rule's registered name.
    fn name(&self) -> &str;

    /// `true` for rules that run in the pipeline's async phase.
    fn is_async(&self) -> bool {
        false
    }

    /// Dependency expressions the engine resolves before `check` and keeps
    /// watched for re-validation. `field_name` is the owning field's last
    /// path segment, for rules that derive a sibling name from it.
    fn dependencies(&self, field_name: &str) -> Vec<String> {
        let _ = field_name;
        Vec::new()
    }

    /// The core predicate. `Ok(false)` is a validation failure; `Err` is a
    /// fault (configuration or transport) that also fails the field closed.
    fn check(&self, ctx: &CheckContext) -> Result<bool, RuleError>;

    /// Default message template with `:key` placeholders.
    fn message_template(&self) -> &str;

    /// Parameters interpolated into the template. Always includes
    /// `attribute`.
    fn message_params(&self, ctx: &CheckContext) -> BTreeMap<String, String> {
        BTreeMap::from([("attribute".to_string(), ctx.attribute.clone())])
    }

    /// Per-rule debounce override; the pipeline takes the maximum.
    fn debounce_override(&self) -> Option<Duration> {
        None
    }
}

impl fmt::Debug for dyn Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name()).finish()
    }
}

// ---------------------------------------------------------------------------
// RuleSpec
// ---------------------------------------------------------------------------

/// A parsed rule descriptor: name plus positional and named attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    pub attributes: Vec<String>,
    pub named: BTreeMap<String, String>,
}

impl RuleSpec {
    /// A descriptor with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Positional attribute at `index`.
    #[must_use]
    pub fn attribute(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(String::as_str)
    }

    /// Named attribute by key.
    #[must_use]
    pub fn named(&self, key: &str) -> Option<&str> {
        self.named.get(key).map(String::as_str)
    }

    /// Named `debounce` attribute parsed as milliseconds.
    #[must_use]
    pub fn debounce_ms(&self) -> Option<u64> {
        self.named("debounce").and_then(|v| v.parse().ok())
    }

    /// Parse one `name:attr,attr` chunk.
    fn parse_single(chunk: &str) -> Result<Self, ConfigError> {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            return Err(ConfigError::InvalidRuleSpec("empty rule name".into()));
        }
        let (name, attrs) = match chunk.split_once(':') {
            Some((name, attrs)) => (name, attrs),
            None => (chunk, ""),
        };
        let mut spec = Self::new(name.trim());
        if spec.name.is_empty() {
            return Err(ConfigError::InvalidRuleSpec("empty rule name".into()));
        }
        for attr in attrs.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            match attr.split_once('=') {
                Some((key, value)) => {
                    spec.named.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => spec.attributes.push(attr.to_string()),
            }
        }
        Ok(spec)
    }

    /// Parse a pipe-delimited rule list.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ConfigError> {
        raw.split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Self::parse_single)
            .collect()
    }

    /// Parse from the JSON object form.
    ///
    /// Accepted shapes: a rule string, an array mixing strings and objects,
    /// or an object mapping rule names to `null`/scalar/array/object
    /// attribute payloads.
    pub fn from_value(raw: &Value) -> Result<Vec<Self>, ConfigError> {
        match raw {
            Value::String(s) => Self::parse_list(s),
            Value::Array(items) => {
                let mut specs = Vec::new();
                for item in items {
                    specs.extend(Self::from_value(item)?);
                }
                Ok(specs)
            }
            Value::Object(map) => {
                let mut specs = Vec::new();
                for (name, payload) in map {
                    let mut spec = Self::new(name.clone());
                    match payload {
                        Value::Null | Value::Bool(true) => {}
                        Value::Array(attrs) => {
                            spec.attributes = attrs
                                .iter()
                                .map(formflux_core::value::stable_string)
                                .collect();
                        }
                        Value::Object(params) => {
                            for (key, value) in params {
                                spec.named.insert(
                                    key.clone(),
                                    formflux_core::value::stable_string(value),
                                );
                            }
                        }
                        scalar => {
                            spec.attributes
                                .push(formflux_core::value::stable_string(scalar));
                        }
                    }
                    specs.push(spec);
                }
                Ok(specs)
            }
            other => Err(ConfigError::InvalidRuleSpec(format!(
                "unsupported rule descriptor: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Services and RuleRegistry
// ---------------------------------------------------------------------------

/// External collaborators rules capture at construction time.
#[derive(Clone, Default)]
pub struct Services {
    pub http: Option<Arc<dyn HttpClient>>,
    pub captcha: Option<Arc<dyn CaptchaProvider>>,
    pub unique_backend: Option<UniqueBackend>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("http", &self.http.is_some())
            .field("captcha", &self.captcha.is_some())
            .field("unique_backend", &self.unique_backend)
            .finish()
    }
}

/// Factory signature: spec + services → rule instance.
pub type RuleFactory =
    Arc<dyn Fn(&RuleSpec, &Services) -> Result<Arc<dyn Rule>, ConfigError> + Send + Sync>;

/// Maps rule names to factories, resolved once at schema-parse time.
#[derive(Clone)]
pub struct RuleRegistry {
    factories: BTreeMap<String, RuleFactory>,
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleRegistry {
    /// A registry with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// The built-in rule set: `required`, `completed`, `confirmed`,
    /// `unique`, `captcha`.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("required", |_, _| {
            Ok(Arc::new(crate::rules::Required::new()) as Arc<dyn Rule>)
        });
        registry.register("completed", |_, _| {
            Ok(Arc::new(crate::rules::Completed::new()) as Arc<dyn Rule>)
        });
        registry.register("confirmed", |spec, _| {
            Ok(Arc::new(crate::rules::Confirmed::from_spec(spec)) as Arc<dyn Rule>)
        });
        registry.register("unique", |spec, services| {
            crate::rules::Unique::from_spec(spec, services).map(|r| Arc::new(r) as Arc<dyn Rule>)
        });
        registry.register("captcha", |_, services| {
            Ok(Arc::new(crate::rules::Captcha::new(services.captcha.clone())) as Arc<dyn Rule>)
        });
        registry
    }

    /// Register (or replace) a factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&RuleSpec, &Services) -> Result<Arc<dyn Rule>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Build the rule chain for a list of descriptors, in declaration order.
    pub fn build(
        &self,
        specs: &[RuleSpec],
        services: &Services,
    ) -> Result<Vec<Arc<dyn Rule>>, ConfigError> {
        specs
            .iter()
            .map(|spec| {
                let factory = self
                    .factories
                    .get(&spec.name)
                    .ok_or_else(|| ConfigError::UnknownRule(spec.name.clone()))?;
                factory(spec, services)
            })
            .collect()
    }
}
