#![forbid(unsafe_code)]

//! The `captcha` rule: delegate verification to an external provider.

use std::sync::Arc;

use crate::rule::{CheckContext, Rule, RuleError};
use crate::transport::{CaptchaProvider, ConfigError};

/// Not evaluable on its own — asks the provider for the user's challenge
/// response and verifies it remotely.
///
/// An inactive element (disabled, readonly, or unavailable) passes
/// trivially; verification is pointless for input the user cannot give.
/// Running without a provider is a configuration fault, never a "please try
/// again" message.
#[derive(Clone)]
pub struct Captcha {
    provider: Option<Arc<dyn CaptchaProvider>>,
}

impl std::fmt::Debug for Captcha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Captcha")
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

impl Captcha {
    #[must_use]
    pub fn new(provider: Option<Arc<dyn CaptchaProvider>>) -> Self {
        Self { provider }
    }
}

impl Rule for Captcha {
    fn name(&self) -> &str {
        "captcha"
    }

    fn is_async(&self) -> bool {
        true
    }

    fn check(&self, ctx: &CheckContext) -> Result<bool, RuleError> {
        if !ctx.active {
            return Ok(true);
        }
        let provider = self.provider.as_ref().ok_or(ConfigError::MissingProvider {
            rule: "captcha".into(),
        })?;
        match provider.get_response() {
            None => Ok(false),
            Some(response) => Ok(provider.verify(&response)?),
        }
    }

    fn message_template(&self) -> &str {
        ":attribute verification failed"
    }
}
