#![forbid(unsafe_code)]

//! The `required` rule: the field must be filled.

use formflux_core::value::is_filled;

use crate::rule::{CheckContext, Rule, RuleError};

/// Fails on `null`, empty strings, and empty collections. `false` and `0`
/// count as deliberate entries and pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl Required {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn check(&self, ctx: &CheckContext) -> Result<bool, RuleError> {
        Ok(is_filled(&ctx.value))
    }

    fn message_template(&self) -> &str {
        ":attribute is required"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflux_core::path::Path;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> CheckContext {
        CheckContext::bare(value, "email", Path::parse("email"))
    }

    #[test]
    fn empty_values_fail() {
        let rule = Required::new();
        assert_eq!(rule.check(&ctx(json!(null))), Ok(false));
        assert_eq!(rule.check(&ctx(json!(""))), Ok(false));
        assert_eq!(rule.check(&ctx(json!([]))), Ok(false));
    }

    #[test]
    fn deliberate_entries_pass() {
        let rule = Required::new();
        assert_eq!(rule.check(&ctx(json!("x"))), Ok(true));
        assert_eq!(rule.check(&ctx(json!(false))), Ok(true));
        assert_eq!(rule.check(&ctx(json!(0))), Ok(true));
    }

    #[test]
    fn is_synchronous() {
        assert!(!Required::new().is_async());
    }
}
