#![forbid(unsafe_code)]

//! formflux public facade crate.
//!
//! formflux is a reactive condition & validation engine for form UIs. A
//! [`Form`] owns a mutable form-data graph; fields declare availability
//! conditions and validation rules against it, and the engine keeps both
//! current as values change: condition dependencies re-derive availability,
//! rule dependencies re-trigger validation, async rules run concurrently
//! with debouncing and last-trigger-wins staleness.
//!
//! ```no_run
//! use formflux::prelude::*;
//! use serde_json::json;
//!
//! let mut form = Form::new();
//! form.register_field(
//!     FieldConfig::new("password").rules_str("required|confirmed"),
//! )?;
//! form.register_field(FieldConfig::new("password_confirmation"))?;
//!
//! form.set_value("password", json!("hunter2"));
//! form.set_value("password_confirmation", json!("hunter2"));
//! form.validate("password")?;
//! assert_eq!(form.state("password"), Some(PipelineState::Valid));
//! # Ok::<(), formflux::Error>(())
//! ```

use std::fmt;

mod field;
mod form;
mod gate;

pub use field::FieldConfig;
pub use form::Form;
pub use gate::{Gate, GateFn, GateProbe};

// --- Core re-exports -------------------------------------------------------

pub use formflux_core::condition::{Condition, Expected, parse_conditions};
pub use formflux_core::path::Path;
pub use formflux_core::store::Store;

// --- Validation re-exports -------------------------------------------------

pub use formflux_validate::message_bag::{Clear, MessageBag, MessageKind};
pub use formflux_validate::messages::{MessageResolver, Translator};
pub use formflux_validate::pipeline::{
    DEFAULT_DEBOUNCE, Fault, FaultKind, PipelineState, TimeSource,
};
pub use formflux_validate::rule::{
    CheckContext, Rule, RuleError, RuleRegistry, RuleSpec, Services,
};
pub use formflux_validate::rules::{Captcha, Completed, Confirmed, Required, Unique};
pub use formflux_validate::transport::{
    CaptchaProvider, ConfigError, HttpClient, HttpRequest, HttpResponse, Method, TransportError,
    UniqueBackend,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for formflux APIs.
#[derive(Debug)]
pub enum Error {
    /// Schema or service wiring problem, caught at registration.
    Config(ConfigError),
    /// An operation addressed a path with no registered field.
    UnknownField(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::UnknownField(path) => write!(f, "no field registered at '{path}'"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Condition, Error, FieldConfig, Form, Gate, MessageBag, MessageKind, PipelineState,
        RuleSpec, TimeSource, UniqueBackend,
    };
}
