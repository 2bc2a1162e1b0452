#![forbid(unsafe_code)]

//! The `confirmed` rule: the field must match its confirmation sibling.

use std::collections::BTreeMap;

use crate::rule::{CheckContext, Rule, RuleError, RuleSpec};

/// Compares against `"{name}_confirmation"` in the same row, or a
/// rule-specified alternate (`confirmed:other_field`).
///
/// The comparison itself is a plain deep equality; the rule's reactivity —
/// editing the confirmation target re-triggers this field's validation —
/// comes entirely from the dependency declaration, which the engine keeps
/// watched.
#[derive(Debug, Clone, Default)]
pub struct Confirmed {
    /// Explicit other-field expression; `None` derives it from the field
    /// name at check time.
    other: Option<String>,
}

impl Confirmed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against an explicit expression instead of the derived name.
    #[must_use]
    pub fn against(other: impl Into<String>) -> Self {
        Self {
            other: Some(other.into()),
        }
    }

    /// Build from a parsed descriptor (`confirmed` or `confirmed:other`).
    #[must_use]
    pub fn from_spec(spec: &RuleSpec) -> Self {
        match spec.attribute(0).or_else(|| spec.named("other")) {
            Some(other) => Self::against(other),
            None => Self::new(),
        }
    }

    fn other_expr_for(&self, ctx: &CheckContext) -> String {
        match &self.other {
            Some(expr) => expr.clone(),
            None => {
                let name = ctx.path.last().unwrap_or(ctx.attribute.as_str());
                format!("{name}_confirmation")
            }
        }
    }
}

impl Rule for Confirmed {
    fn name(&self) -> &str {
        "confirmed"
    }

    fn dependencies(&self, field_name: &str) -> Vec<String> {
        match &self.other {
            Some(expr) => vec![expr.clone()],
            None => vec![format!("{field_name}_confirmation")],
        }
    }

    fn check(&self, ctx: &CheckContext) -> Result<bool, RuleError> {
        let expr = self.other_expr_for(ctx);
        let other = ctx.dependency_value(&expr);
        Ok(ctx.value == other)
    }

    fn message_template(&self) -> &str {
        ":attribute confirmation does not match"
    }

    fn message_params(&self, ctx: &CheckContext) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("attribute".to_string(), ctx.attribute.clone()),
            ("other".to_string(), self.other_expr_for(ctx)),
        ])
    }
}
