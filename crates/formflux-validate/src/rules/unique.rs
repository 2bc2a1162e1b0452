#![forbid(unsafe_code)]

//! The `unique` rule: a remote lookup certifies the value is unused.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use formflux_core::value::stable_string;
use serde_json::Value;

use crate::rule::{CheckContext, Rule, RuleError, RuleSpec, Services};
use crate::transport::{ConfigError, HttpClient, HttpRequest, TransportError, UniqueBackend};

/// Asynchronous remote uniqueness check.
///
/// Positional attributes become request parameters: each is resolved against
/// the form graph first (wildcard-aware, so a repeated-row rule reads its
/// own row) and falls back to the literal text when nothing is bound there.
/// The backend is either a host function or an HTTP descriptor executed
/// through the injected client.
///
/// A transport failure fails closed — a check that cannot complete cannot
/// certify uniqueness — and surfaces as a fault distinct from the plain
/// not-unique message.
pub struct Unique {
    params: Vec<String>,
    backend: UniqueBackend,
    http: Option<Arc<dyn HttpClient>>,
    debounce: Option<Duration>,
}

impl std::fmt::Debug for Unique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unique")
            .field("params", &self.params)
            .field("backend", &self.backend)
            .field("debounce", &self.debounce)
            .finish()
    }
}

impl Unique {
    /// Build from a parsed descriptor plus the form's services.
    ///
    /// Missing backend configuration is refused here, at schema-parse time,
    /// so a wiring bug never masquerades as a validation failure later.
    pub fn from_spec(spec: &RuleSpec, services: &Services) -> Result<Self, ConfigError> {
        let backend = services
            .unique_backend
            .clone()
            .ok_or(ConfigError::MissingEndpoint {
                rule: "unique".into(),
            })?;
        if matches!(backend, UniqueBackend::Http { .. }) && services.http.is_none() {
            return Err(ConfigError::MissingHttpClient {
                rule: "unique".into(),
            });
        }
        Ok(Self {
            params: spec.attributes.clone(),
            backend,
            http: services.http.clone(),
            debounce: spec.debounce_ms().map(Duration::from_millis),
        })
    }

    fn resolved_params(&self, ctx: &CheckContext) -> Vec<(String, Value)> {
        self.params
            .iter()
            .map(|expr| {
                let value = ctx
                    .dependencies
                    .get(expr)
                    .and_then(|d| d.value.clone())
                    .unwrap_or_else(|| Value::String(expr.clone()));
                (expr.clone(), value)
            })
            .collect()
    }
}

impl Rule for Unique {
    fn name(&self) -> &str {
        "unique"
    }

    fn is_async(&self) -> bool {
        true
    }

    fn dependencies(&self, _field_name: &str) -> Vec<String> {
        self.params.clone()
    }

    fn check(&self, ctx: &CheckContext) -> Result<bool, RuleError> {
        let params = self.resolved_params(ctx);
        match &self.backend {
            UniqueBackend::Function(endpoint) => {
                Ok(endpoint(&ctx.value, &ctx.attribute, &params)?)
            }
            UniqueBackend::Http { url, method } => {
                let client = self.http.as_ref().ok_or(ConfigError::MissingHttpClient {
                    rule: "unique".into(),
                })?;
                let mut request_params = vec![
                    ("value".to_string(), stable_string(&ctx.value)),
                    ("name".to_string(), ctx.attribute.clone()),
                ];
                request_params.extend(
                    params
                        .iter()
                        .map(|(name, value)| (name.clone(), stable_string(value))),
                );
                let response = client.send(&HttpRequest {
                    url: url.clone(),
                    method: *method,
                    params: request_params,
                })?;
                if !response.is_success() {
                    return Err(TransportError::Status(response.status).into());
                }
                // The endpoint answers with a JSON boolean (or anything
                // truthy meaning "unique").
                let body: Value =
                    serde_json::from_str(response.body.trim()).unwrap_or(Value::Null);
                Ok(formflux_core::value::is_truthy(&body))
            }
        }
    }

    fn message_template(&self) -> &str {
        ":attribute must be unique"
    }

    fn message_params(&self, ctx: &CheckContext) -> BTreeMap<String, String> {
        BTreeMap::from([("attribute".to_string(), ctx.attribute.clone())])
    }

    fn debounce_override(&self) -> Option<Duration> {
        self.debounce
    }
}
