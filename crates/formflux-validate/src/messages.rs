#![forbid(unsafe_code)]

//! Message templates, interpolation, and the translation seam.
//!
//! Rule messages are templates with `:key` placeholders (`:attribute must be
//! unique`). The host may override templates per rule name and may supply a
//! translator hook that receives the template and the parameter bag — when
//! present it fully replaces the default interpolation, so localization
//! systems with their own placeholder syntax plug in unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Translation hook: `(template, params) -> rendered message`.
pub type Translator = Arc<dyn Fn(&str, &BTreeMap<String, String>) -> String + Send + Sync>;

/// Substitute `:key` placeholders in `template` from `params`.
///
/// Longer keys are substituted first so `:other_value` is never clobbered
/// by a shorter `:other`.
#[must_use]
pub fn interpolate(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
    let mut out = template.to_string();
    for key in keys {
        out = out.replace(&format!(":{key}"), &params[key]);
    }
    out
}

/// Resolves a rule's final user-facing message.
#[derive(Clone, Default)]
pub struct MessageResolver {
    overrides: BTreeMap<String, String>,
    translator: Option<Translator>,
}

impl std::fmt::Debug for MessageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageResolver")
            .field("overrides", &self.overrides)
            .field("translator", &self.translator.is_some())
            .finish()
    }
}

impl MessageResolver {
    /// A resolver with no overrides and default interpolation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the template for a rule name.
    #[must_use]
    pub fn with_override(mut self, rule: impl Into<String>, template: impl Into<String>) -> Self {
        self.overrides.insert(rule.into(), template.into());
        self
    }

    /// Install a translation hook.
    #[must_use]
    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Render the message for `rule`, preferring the host override.
    #[must_use]
    pub fn message_for(
        &self,
        rule: &str,
        default_template: &str,
        params: &BTreeMap<String, String>,
    ) -> String {
        let template = self
            .overrides
            .get(rule)
            .map_or(default_template, String::as_str);
        match &self.translator {
            Some(translate) => translate(template, params),
            None => interpolate(template, params),
        }
    }
}
