#![forbid(unsafe_code)]

//! The `completed` rule: a masked input must be filled all the way.

use formflux_core::value::is_filled;

use crate::rule::{CheckContext, Rule, RuleError};

/// Checks the rendering layer's mask-complete flag.
///
/// An empty field always passes — emptiness is `required`'s responsibility.
/// Without masking behavior (`mask_complete` absent from the context) the
/// rule degrades to a plain filled check, which a non-empty value satisfies
/// by definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;

impl Completed {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for Completed {
    fn name(&self) -> &str {
        "completed"
    }

    fn check(&self, ctx: &CheckContext) -> Result<bool, RuleError> {
        if !is_filled(&ctx.value) {
            return Ok(true);
        }
        Ok(ctx.mask_complete.unwrap_or(true))
    }

    fn message_template(&self) -> &str {
        ":attribute must be completed"
    }
}
