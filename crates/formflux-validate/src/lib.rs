#![forbid(unsafe_code)]

//! Validation layer for formflux.
//!
//! This crate turns rule descriptors into per-field validation pipelines:
//!
//! - [`MessageBag`] — ordered error/info messages with prepend/base/append
//!   buckets
//! - [`Rule`] — the contract every rule implements, sync or async
//! - [`rules`] — the concrete rules: `required`, `completed`, `confirmed`,
//!   `unique`, `captcha`
//! - [`RuleRegistry`] — name → factory dispatch, resolved once at
//!   schema-parse time
//! - [`RulePipeline`] — sync-first short-circuit, concurrent async rules,
//!   debounce, and token-based stale-result discard
//! - [`transport`] — the `HttpClient`/`CaptchaProvider` seams the host
//!   implements
//!
//! # Design principles
//!
//! 1. **Sync before async**: synchronous rules always complete, in declared
//!    order, before any asynchronous rule is dispatched.
//! 2. **Last trigger wins**: every trigger takes a fresh monotonic token;
//!    results carrying a stale token are discarded on arrival, never merged.
//! 3. **Deterministic reporting**: async rules complete in any order, but
//!    the reported failure is always the lowest declaration index.
//! 4. **Failures are messages, faults are signals**: a rule returning
//!    `false` produces a message in the bag; configuration and transport
//!    problems additionally raise a [`Fault`] the host can drain, so a
//!    wiring bug is never mistaken for "value is invalid".

pub mod message_bag;
pub mod messages;
pub mod pipeline;
pub mod rule;
pub mod rules;
pub mod transport;

pub use message_bag::{Clear, MessageBag, MessageKind};
pub use messages::{MessageResolver, Translator, interpolate};
pub use pipeline::{Fault, FaultKind, PipelineState, RulePipeline, RunToken, TimeSource};
pub use rule::{CheckContext, ResolvedDependency, Rule, RuleError, RuleRegistry, RuleSpec, Services};
pub use transport::{
    CaptchaProvider, ConfigError, HttpClient, HttpRequest, HttpResponse, Method, TransportError,
    UniqueBackend,
};
