#![forbid(unsafe_code)]

//! The form: one store, its fields, and the reactive wiring between them.
//!
//! All state lives on the caller's thread. Two flows drive everything:
//!
//! - [`Form::set_value`] writes the graph, notifies the watch registry, and
//!   routes the fired tags: condition watches re-derive availability (with
//!   downward propagation), dependency watches re-trigger validation of
//!   fields that already validated once, and the owning field's own-value
//!   watch arms its debounce window.
//! - [`Form::poll`] fires due debounced validations and drains async rule
//!   results into settled states.
//!
//! Explicit [`Form::validate`] bypasses debouncing and runs immediately.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use formflux_core::condition::Condition;
use formflux_core::path::Path;
use formflux_core::resolver;
use formflux_core::store::Store;
use formflux_core::watch::WatchRegistry;
use formflux_validate::message_bag::MessageBag;
use formflux_validate::messages::MessageResolver;
use formflux_validate::pipeline::{
    DEFAULT_DEBOUNCE, Fault, PipelineState, RulePipeline, TimeSource,
};
use formflux_validate::rule::{
    CheckContext, ResolvedDependency, RuleRegistry, RuleSpec, Services,
};
use formflux_validate::transport::{CaptchaProvider, HttpClient, UniqueBackend};
use serde_json::Value;

use crate::Error;
use crate::field::{Field, FieldConfig, RuleSource};

/// Why a watch was registered; the variant routes the notification.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WatchTag {
    /// The field's own value: arms its debounce window.
    OwnValue(Path),
    /// A path referenced by the field's condition lists: re-derives
    /// availability.
    Condition(Path),
    /// A path referenced by the field's rule dependencies: re-triggers
    /// validation once the field has validated.
    Dependency(Path),
    /// A host-registered watch (URL-templated item sources and the like).
    Custom(String),
}

/// The reactive condition & validation engine for one form.
pub struct Form {
    store: Store,
    fields: BTreeMap<Path, Field>,
    watches: WatchRegistry<WatchTag>,
    registry: RuleRegistry,
    services: Services,
    messages: Arc<MessageResolver>,
    clock: TimeSource,
    default_debounce: Duration,
    custom_fired: Vec<String>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("fields", &self.fields.len())
            .field("watches", &self.watches.len())
            .finish()
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// An empty form with the standard rule registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            fields: BTreeMap::new(),
            watches: WatchRegistry::new(),
            registry: RuleRegistry::standard(),
            services: Services::default(),
            messages: Arc::new(MessageResolver::new()),
            clock: TimeSource::system(),
            default_debounce: DEFAULT_DEBOUNCE,
            custom_fired: Vec::new(),
        }
    }

    /// Seed the store from an existing value tree.
    #[must_use]
    pub fn with_data(mut self, root: Value) -> Self {
        self.store = Store::from_value(root);
        self
    }

    /// Inject the HTTP client the `unique` rule's endpoint descriptor uses.
    #[must_use]
    pub fn with_http(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.services.http = Some(client);
        self
    }

    /// Inject the captcha provider.
    #[must_use]
    pub fn with_captcha(mut self, provider: Arc<dyn CaptchaProvider>) -> Self {
        self.services.captcha = Some(provider);
        self
    }

    /// Configure how the `unique` rule reaches its backend.
    #[must_use]
    pub fn with_unique_backend(mut self, backend: UniqueBackend) -> Self {
        self.services.unique_backend = Some(backend);
        self
    }

    /// Replace the rule registry (to add custom rules).
    #[must_use]
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace message templates/translator.
    #[must_use]
    pub fn with_messages(mut self, messages: MessageResolver) -> Self {
        self.messages = Arc::new(messages);
        self
    }

    /// Replace the clock (tests drive a fixed one).
    #[must_use]
    pub fn with_clock(mut self, clock: TimeSource) -> Self {
        self.clock = clock;
        self
    }

    /// Change the default per-field debounce window.
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.default_debounce = window;
        self
    }

    // -----------------------------------------------------------------------
    // Field lifecycle
    // -----------------------------------------------------------------------

    /// Mount a field. Rule names resolve against the registry here, once;
    /// a wiring problem surfaces as an error now instead of a validation
    /// failure later.
    pub fn register_field(&mut self, config: FieldConfig) -> Result<(), Error> {
        let path = Path::parse(&config.path);
        let specs = match config.rules {
            None => Vec::new(),
            Some(RuleSource::Specs(specs)) => specs,
            Some(RuleSource::Text(text)) => RuleSpec::parse_list(&text)?,
            Some(RuleSource::Json(value)) => RuleSpec::from_value(&value)?,
        };
        let rules = self.registry.build(&specs, &self.services)?;
        let attribute = config
            .label
            .unwrap_or_else(|| path.last().unwrap_or_default().to_string());
        let pipeline = RulePipeline::new(
            rules,
            Arc::clone(&self.messages),
            config.debounce.unwrap_or(self.default_debounce),
        );
        tracing::debug!(path = %path, "field registered");
        self.fields.insert(
            path.clone(),
            Field {
                path: path.clone(),
                attribute,
                own_conditions: config.conditions,
                extra_conditions: BTreeMap::new(),
                disabled_gate: config.disabled,
                readonly_gate: config.readonly,
                local_disabled: None,
                available: true,
                mask_complete: None,
                pipeline,
            },
        );
        self.watches
            .watch(WatchTag::OwnValue(path.clone()), path.clone(), &self.store);
        self.establish_condition_watches(&path);
        self.establish_dependency_watches(&path);
        self.recompute_subtree(&path);
        Ok(())
    }

    /// Unmount a field: its watches are torn down so nothing fires against
    /// a destroyed field, and any in-flight async results die with the
    /// pipeline's channel.
    pub fn remove_field(&mut self, path: &str) {
        let path = Path::parse(path);
        if self.fields.remove(&path).is_some() {
            tracing::debug!(path = %path, "field removed");
            self.watches.unwatch(&WatchTag::OwnValue(path.clone()));
            self.watches.unwatch(&WatchTag::Condition(path.clone()));
            self.watches.unwatch(&WatchTag::Dependency(path));
        }
    }

    /// Registered field paths, in path order.
    #[must_use]
    pub fn field_paths(&self) -> Vec<&Path> {
        self.fields.keys().collect()
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Read the value at `path`.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.store.get(&Path::parse(path))
    }

    /// The whole form-data tree.
    #[must_use]
    pub fn data(&self) -> &Value {
        self.store.root()
    }

    /// Write `value` at `path` and run the reactive flow: condition
    /// watchers re-derive availability, dependency watchers re-trigger
    /// validation, the owning field's debounce window is armed. A deeply
    /// equal write is a no-op.
    pub fn set_value(&mut self, path: &str, value: Value) {
        let path = Path::parse(path);
        if !self.store.set(&path, value) {
            return;
        }
        let fired = self.watches.notify(&path, &self.store);
        let now = self.clock.now_ns();
        for tag in fired {
            match tag {
                WatchTag::OwnValue(p) => {
                    if let Some(field) = self.fields.get_mut(&p) {
                        field.pipeline.schedule(now);
                    }
                }
                WatchTag::Condition(p) => self.recompute_subtree(&p),
                WatchTag::Dependency(p) => {
                    let validated = self
                        .fields
                        .get(&p)
                        .is_some_and(|f| f.pipeline.validated());
                    if validated {
                        let _ = self.run_validation(&p);
                    }
                }
                WatchTag::Custom(key) => self.custom_fired.push(key),
            }
        }
    }

    /// Remove the value at `path`, with the same reactive flow as a write.
    pub fn clear_value(&mut self, path: &str) {
        let parsed = Path::parse(path);
        if self.store.remove(&parsed).is_none() {
            return;
        }
        let fired = self.watches.notify(&parsed, &self.store);
        let now = self.clock.now_ns();
        for tag in fired {
            match tag {
                WatchTag::OwnValue(p) => {
                    // Clearing a field's own path resets its validation
                    // state rather than re-validating the now-empty value.
                    if p == parsed {
                        if let Some(field) = self.fields.get_mut(&p) {
                            field.pipeline.reset();
                        }
                    } else if let Some(field) = self.fields.get_mut(&p) {
                        field.pipeline.schedule(now);
                    }
                }
                WatchTag::Condition(p) => self.recompute_subtree(&p),
                WatchTag::Dependency(p) => {
                    let validated = self
                        .fields
                        .get(&p)
                        .is_some_and(|f| f.pipeline.validated());
                    if validated {
                        let _ = self.run_validation(&p);
                    }
                }
                WatchTag::Custom(key) => self.custom_fired.push(key),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validate one field immediately, bypassing debounce.
    pub fn validate(&mut self, path: &str) -> Result<PipelineState, Error> {
        let path = Path::parse(path);
        self.run_validation(&path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))
    }

    /// Trigger immediate validation of every field.
    pub fn validate_all(&mut self) {
        let paths: Vec<Path> = self.fields.keys().cloned().collect();
        for path in paths {
            let _ = self.run_validation(&path);
        }
    }

    /// Trigger every field and block until all settle or `timeout` elapses.
    /// Returns the conjunction of the settled validities, `None` on timeout.
    pub fn validate_all_blocking(&mut self, timeout: Duration) -> Option<bool> {
        self.validate_all();
        let deadline = Instant::now() + timeout;
        let mut all_valid = true;
        let paths: Vec<Path> = self.fields.keys().cloned().collect();
        for path in paths {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let field = self.fields.get_mut(&path)?;
            all_valid &= field.pipeline.settle_blocking(remaining)?;
        }
        Some(all_valid)
    }

    /// Fire due debounced validations and drain async results. Returns
    /// `true` when any field's state changed. Hosts call this from their
    /// tick/idle loop.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now_ns();
        let due: Vec<Path> = self
            .fields
            .iter()
            .filter(|(_, f)| f.pipeline.poll_due(now))
            .map(|(p, _)| p.clone())
            .collect();
        let mut changed = !due.is_empty();
        for path in due {
            let _ = self.run_validation(&path);
        }
        for field in self.fields.values_mut() {
            changed |= field.pipeline.drain();
        }
        changed
    }

    /// Block until one field's current pass settles.
    pub fn settle_blocking(&mut self, path: &str, timeout: Duration) -> Option<bool> {
        self.fields
            .get_mut(&Path::parse(path))?
            .pipeline
            .settle_blocking(timeout)
    }

    /// Reset a field's validation state without touching its value.
    pub fn reset_validators(&mut self, path: &str) -> Result<(), Error> {
        let path = Path::parse(path);
        let field = self
            .fields
            .get_mut(&path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.pipeline.reset();
        Ok(())
    }

    /// A field's validation state-machine position.
    #[must_use]
    pub fn state(&self, path: &str) -> Option<PipelineState> {
        self.fields
            .get(&Path::parse(path))
            .map(|f| f.pipeline.state())
    }

    /// `true` once the field has validated at least once since mount/reset.
    #[must_use]
    pub fn validated(&self, path: &str) -> Option<bool> {
        self.fields
            .get(&Path::parse(path))
            .map(|f| f.pipeline.validated())
    }

    /// A field's message bag.
    #[must_use]
    pub fn message_bag(&self, path: &str) -> Option<&MessageBag> {
        self.fields.get(&Path::parse(path)).map(|f| f.pipeline.bag())
    }

    /// Mutable bag access for host-injected prepend/append messages.
    pub fn message_bag_mut(&mut self, path: &str) -> Option<&mut MessageBag> {
        self.fields
            .get_mut(&Path::parse(path))
            .map(|f| f.pipeline.bag_mut())
    }

    /// Drain faults (configuration/transport signals) from every field.
    pub fn drain_faults(&mut self) -> Vec<(Path, Fault)> {
        let mut out = Vec::new();
        for (path, field) in &mut self.fields {
            for fault in field.pipeline.take_faults() {
                out.push((path.clone(), fault));
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Availability and gates
    // -----------------------------------------------------------------------

    /// A field's derived availability (its conditions AND every ancestor's).
    #[must_use]
    pub fn available(&self, path: &str) -> Option<bool> {
        self.fields.get(&Path::parse(path)).map(|f| f.available)
    }

    /// Effective disabled state: local override first, then the gate.
    #[must_use]
    pub fn is_disabled(&self, path: &str) -> Option<bool> {
        self.fields
            .get(&Path::parse(path))
            .map(|f| f.is_disabled(&self.store))
    }

    /// Effective readonly state.
    #[must_use]
    pub fn is_readonly(&self, path: &str) -> Option<bool> {
        self.fields
            .get(&Path::parse(path))
            .map(|f| f.is_readonly(&self.store))
    }

    /// Force-disable, overriding condition logic.
    pub fn disable(&mut self, path: &str) -> Result<(), Error> {
        self.set_local_disabled(path, Some(true))
    }

    /// Force-enable, overriding condition logic.
    pub fn enable(&mut self, path: &str) -> Result<(), Error> {
        self.set_local_disabled(path, Some(false))
    }

    /// Drop the local override and defer to the disabled gate again.
    pub fn clear_disabled_override(&mut self, path: &str) -> Result<(), Error> {
        self.set_local_disabled(path, None)
    }

    fn set_local_disabled(&mut self, path: &str, value: Option<bool>) -> Result<(), Error> {
        let path = Path::parse(path);
        let field = self
            .fields
            .get_mut(&path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.local_disabled = value;
        Ok(())
    }

    /// Contribute conditions to a field under `key` (containers use this);
    /// combined availability is re-derived and propagated downward.
    pub fn add_conditions(
        &mut self,
        path: &str,
        key: &str,
        conditions: Vec<Condition>,
    ) -> Result<(), Error> {
        let path = Path::parse(path);
        let field = self
            .fields
            .get_mut(&path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.extra_conditions.insert(key.to_string(), conditions);
        self.establish_condition_watches(&path);
        self.recompute_subtree(&path);
        Ok(())
    }

    /// Withdraw the conditions contributed under `key`.
    pub fn remove_conditions(&mut self, path: &str, key: &str) -> Result<(), Error> {
        let path = Path::parse(path);
        let field = self
            .fields
            .get_mut(&path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.extra_conditions.remove(key);
        self.establish_condition_watches(&path);
        self.recompute_subtree(&path);
        Ok(())
    }

    /// Rendering layer reports the mask-complete flag for a masked field.
    pub fn set_mask_complete(&mut self, path: &str, complete: Option<bool>) -> Result<(), Error> {
        let path = Path::parse(path);
        let field = self
            .fields
            .get_mut(&path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.mask_complete = complete;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Custom watches
    // -----------------------------------------------------------------------

    /// Watch an expression on behalf of the host (e.g. a URL-templated item
    /// source); fired keys accumulate until drained.
    pub fn watch_custom(&mut self, key: &str, expr: &str) {
        let (path_part, _) = resolver::split_default(expr);
        let path = resolver::resolved_path(path_part, &Path::root());
        self.watches
            .watch(WatchTag::Custom(key.to_string()), path, &self.store);
    }

    /// Drop a host watch.
    pub fn unwatch_custom(&mut self, key: &str) {
        self.watches.unwatch(&WatchTag::Custom(key.to_string()));
    }

    /// Keys of host watches that fired since the last drain.
    pub fn drain_custom_triggers(&mut self) -> Vec<String> {
        std::mem::take(&mut self.custom_fired)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Snapshot contexts for every rule of the field, resolving rule
    /// dependencies from the graph on this thread. Async rules take these
    /// snapshots to their worker threads; nothing down there reads the
    /// store.
    fn build_contexts(&self, path: &Path) -> Option<Vec<CheckContext>> {
        let field = self.fields.get(path)?;
        let context = field.context();
        let value = self.store.get(&field.path).cloned().unwrap_or(Value::Null);
        let active = field.available
            && !field.is_disabled(&self.store)
            && !field.is_readonly(&self.store);
        let name = field.name().to_string();
        let contexts = field
            .pipeline
            .rules()
            .iter()
            .map(|rule| {
                let dependencies: BTreeMap<String, ResolvedDependency> = rule
                    .dependencies(&name)
                    .into_iter()
                    .map(|expr| {
                        let resolved = resolver::resolve(&expr, &context, &self.store);
                        (
                            expr,
                            ResolvedDependency {
                                path: resolved.path,
                                value: resolved.value,
                                used_default: resolved.used_default,
                            },
                        )
                    })
                    .collect();
                CheckContext {
                    value: value.clone(),
                    attribute: field.attribute.clone(),
                    path: field.path.clone(),
                    dependencies,
                    active,
                    mask_complete: field.mask_complete,
                }
            })
            .collect();
        Some(contexts)
    }

    fn run_validation(&mut self, path: &Path) -> Option<PipelineState> {
        let contexts = self.build_contexts(path)?;
        let field = self.fields.get_mut(path)?;
        Some(field.pipeline.run(&contexts))
    }

    /// Re-register the condition watches from the field's current combined
    /// condition lists. Called on mount and whenever the referenced path
    /// set may have changed.
    fn establish_condition_watches(&mut self, path: &Path) {
        self.watches.unwatch(&WatchTag::Condition(path.clone()));
        let referenced: Vec<Path> = match self.fields.get(path) {
            Some(field) => {
                let context = field.context();
                field
                    .all_conditions()
                    .map(|c| c.referenced_path(&context))
                    .collect()
            }
            None => return,
        };
        for r in referenced {
            self.watches
                .watch(WatchTag::Condition(path.clone()), r, &self.store);
        }
    }

    fn establish_dependency_watches(&mut self, path: &Path) {
        self.watches.unwatch(&WatchTag::Dependency(path.clone()));
        let referenced: Vec<Path> = match self.fields.get(path) {
            Some(field) => {
                let context = field.context();
                let name = field.name().to_string();
                field
                    .pipeline
                    .rules()
                    .iter()
                    .flat_map(|rule| rule.dependencies(&name))
                    .map(|expr| {
                        let (path_part, _) = resolver::split_default(&expr);
                        resolver::resolved_path(path_part, &context)
                    })
                    .collect()
            }
            None => return,
        };
        for r in referenced {
            self.watches
                .watch(WatchTag::Dependency(path.clone()), r, &self.store);
        }
    }

    fn availability_for(&self, path: &Path) -> bool {
        let parent_ok = self
            .fields
            .iter()
            .filter(|(p, _)| *p != path && p.is_prefix_of(path))
            .max_by_key(|(p, _)| p.len())
            .is_none_or(|(_, ancestor)| ancestor.available);
        let Some(field) = self.fields.get(path) else {
            return parent_ok;
        };
        let context = field.context();
        parent_ok
            && field
                .all_conditions()
                .all(|c| c.eval(&context, &self.store))
    }

    /// Recompute availability for `root` and every registered descendant,
    /// parents first so changes propagate downward in one pass.
    fn recompute_subtree(&mut self, root: &Path) {
        let mut paths: Vec<Path> = self
            .fields
            .keys()
            .filter(|p| root.is_prefix_of(p))
            .cloned()
            .collect();
        paths.sort_by_key(Path::len);
        for path in paths {
            let available = self.availability_for(&path);
            if let Some(field) = self.fields.get_mut(&path)
                && field.available != available
            {
                tracing::debug!(path = %path, available, "availability changed");
                field.available = available;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> Form {
        Form::new()
    }

    #[test]
    fn values_read_back_through_the_form() {
        let mut form = form();
        form.set_value("address.city", json!("Oslo"));
        assert_eq!(form.value("address.city"), Some(&json!("Oslo")));
        assert_eq!(form.data(), &json!({"address": {"city": "Oslo"}}));
    }

    #[test]
    fn availability_follows_referenced_condition_path() {
        let mut form = form();
        form.register_field(
            FieldConfig::new("company").condition(Condition::equals("kind", json!("business"))),
        )
        .unwrap();

        assert_eq!(form.available("company"), Some(false));
        form.set_value("kind", json!("business"));
        assert_eq!(form.available("company"), Some(true));
        form.set_value("kind", json!("personal"));
        assert_eq!(form.available("company"), Some(false));
    }

    #[test]
    fn empty_condition_list_is_available() {
        let mut form = form();
        form.register_field(FieldConfig::new("email")).unwrap();
        assert_eq!(form.available("email"), Some(true));
    }

    #[test]
    fn parent_unavailability_cascades_to_descendants() {
        let mut form = form();
        form.register_field(
            FieldConfig::new("address").condition(Condition::truthy("needs_shipping")),
        )
        .unwrap();
        form.register_field(FieldConfig::new("address.city")).unwrap();

        assert_eq!(form.available("address"), Some(false));
        assert_eq!(form.available("address.city"), Some(false));

        form.set_value("needs_shipping", json!(true));
        assert_eq!(form.available("address"), Some(true));
        assert_eq!(form.available("address.city"), Some(true));
    }

    #[test]
    fn contributed_conditions_combine_and_withdraw() {
        let mut form = form();
        form.register_field(FieldConfig::new("row.qty")).unwrap();
        assert_eq!(form.available("row.qty"), Some(true));

        form.add_conditions(
            "row.qty",
            "container",
            vec![Condition::truthy("row.enabled")],
        )
        .unwrap();
        assert_eq!(form.available("row.qty"), Some(false));

        form.set_value("row.enabled", json!(true));
        assert_eq!(form.available("row.qty"), Some(true));

        form.remove_conditions("row.qty", "container").unwrap();
        form.set_value("row.enabled", json!(false));
        assert_eq!(form.available("row.qty"), Some(true));
    }

    #[test]
    fn local_override_wins_over_gate() {
        let mut form = form();
        form.register_field(FieldConfig::new("email").disabled(true)).unwrap();
        assert_eq!(form.is_disabled("email"), Some(true));

        form.enable("email").unwrap();
        assert_eq!(form.is_disabled("email"), Some(false));

        form.clear_disabled_override("email").unwrap();
        assert_eq!(form.is_disabled("email"), Some(true));
    }

    #[test]
    fn readonly_gate_reacts_to_the_graph() {
        let mut form = form();
        form.register_field(
            FieldConfig::new("total")
                .readonly(crate::gate::Gate::When(vec![Condition::truthy("locked")])),
        )
        .unwrap();
        assert_eq!(form.is_readonly("total"), Some(false));
        form.set_value("locked", json!(true));
        assert_eq!(form.is_readonly("total"), Some(true));
    }

    #[test]
    fn validate_runs_sync_rules_immediately() {
        let mut form = form();
        form.register_field(FieldConfig::new("email").rules_str("required")).unwrap();

        assert_eq!(form.validate("email").unwrap(), PipelineState::Invalid);
        assert_eq!(
            form.message_bag("email").unwrap().error(),
            Some("email is required")
        );

        form.set_value("email", json!("a@b.co"));
        assert_eq!(form.validate("email").unwrap(), PipelineState::Valid);
        assert!(form.message_bag("email").unwrap().is_empty());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let mut form = form();
        assert!(matches!(
            form.validate("nope"),
            Err(Error::UnknownField(_))
        ));
        assert_eq!(form.state("nope"), None);
    }

    #[test]
    fn unknown_rule_is_rejected_at_registration() {
        let mut form = form();
        let err = form
            .register_field(FieldConfig::new("email").rules_str("no_such_rule"))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn value_change_arms_debounce_not_immediate_validation() {
        let clock = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let mut form = Form::new().with_clock(TimeSource::fixed(clock.clone()));
        form.register_field(FieldConfig::new("email").rules_str("required")).unwrap();

        form.set_value("email", json!(""));
        // Not yet validated: the trigger is debounced.
        assert_eq!(form.state("email"), Some(PipelineState::Idle));
        assert!(!form.poll());

        // Advance past the window and poll again.
        clock.store(
            DEFAULT_DEBOUNCE.as_nanos() as u64 + 1,
            std::sync::atomic::Ordering::SeqCst,
        );
        assert!(form.poll());
        assert_eq!(form.state("email"), Some(PipelineState::Invalid));
    }

    #[test]
    fn reset_validators_clears_state_but_not_value() {
        let mut form = form();
        form.register_field(FieldConfig::new("email").rules_str("required")).unwrap();
        form.set_value("email", json!(""));
        form.validate("email").unwrap();
        assert_eq!(form.validated("email"), Some(true));

        form.reset_validators("email").unwrap();
        assert_eq!(form.state("email"), Some(PipelineState::Idle));
        assert_eq!(form.validated("email"), Some(false));
        assert!(form.message_bag("email").unwrap().is_empty());
        assert_eq!(form.value("email"), Some(&json!("")));
    }

    #[test]
    fn clearing_a_fields_value_resets_its_validation() {
        let mut form = form();
        form.register_field(FieldConfig::new("email").rules_str("required")).unwrap();
        form.set_value("email", json!("x"));
        form.validate("email").unwrap();
        assert_eq!(form.validated("email"), Some(true));

        form.clear_value("email");
        assert_eq!(form.validated("email"), Some(false));
        assert_eq!(form.state("email"), Some(PipelineState::Idle));
    }

    #[test]
    fn remove_field_tears_down_watches() {
        let mut form = form();
        form.register_field(
            FieldConfig::new("company").condition(Condition::truthy("kind")),
        )
        .unwrap();
        form.remove_field("company");
        assert_eq!(form.available("company"), None);
        // A write to the formerly referenced path must not fire anything.
        form.set_value("kind", json!("business"));
        assert!(form.drain_custom_triggers().is_empty());
    }

    #[test]
    fn custom_watches_fire_and_drain() {
        let mut form = form();
        form.watch_custom("city-options", "address.country");

        form.set_value("address.country", json!("NO"));
        assert_eq!(form.drain_custom_triggers(), vec!["city-options"]);
        assert!(form.drain_custom_triggers().is_empty());

        form.set_value("unrelated", json!(1));
        assert!(form.drain_custom_triggers().is_empty());

        form.unwatch_custom("city-options");
        form.set_value("address.country", json!("SE"));
        assert!(form.drain_custom_triggers().is_empty());
    }

    #[test]
    fn validate_all_blocking_covers_every_field() {
        let mut form = form();
        form.register_field(FieldConfig::new("a").rules_str("required")).unwrap();
        form.register_field(FieldConfig::new("b").rules_str("required")).unwrap();
        form.set_value("a", json!("x"));

        // b is empty: overall invalid.
        assert_eq!(
            form.validate_all_blocking(Duration::from_secs(5)),
            Some(false)
        );

        form.set_value("b", json!("y"));
        assert_eq!(
            form.validate_all_blocking(Duration::from_secs(5)),
            Some(true)
        );
    }
}
