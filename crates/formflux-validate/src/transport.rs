#![forbid(unsafe_code)]

//! External collaborator seams and the non-validation error taxonomy.
//!
//! The engine never speaks a wire protocol itself. The host hands it an
//! [`HttpClient`] (used only by the `unique` rule), a [`CaptchaProvider`],
//! or a plain endpoint function — all blocking, because they run on the
//! pipeline's worker threads, never on the main thread.
//!
//! Two error families live here and both are *faults*, not validation
//! messages: [`ConfigError`] (the integration is wired wrong) and
//! [`TransportError`] (the remote check could not complete). Rules that hit
//! either fail closed; the fault travels out-of-band so the host can tell
//! "user must fix this" from "the system could not check this".

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// HTTP method for endpoint descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A request the engine asks the host's client to perform.
///
/// `params` go to the query string for `GET` and the body for `POST`;
/// that distinction is the client's to honor.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
}

/// The part of a response the engine looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP client supplied by the host.
pub trait HttpClient: Send + Sync {
    /// Perform the request, returning the response or a transport error.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Captcha verification supplied by the rendering layer.
pub trait CaptchaProvider: Send + Sync {
    /// The user's current challenge response, if they produced one.
    fn get_response(&self) -> Option<String>;

    /// Verify a challenge response with the captcha service.
    fn verify(&self, response: &str) -> Result<bool, TransportError>;
}

/// Endpoint function form for the `unique` rule:
/// `(value, field_name, params) -> unique?`.
pub type UniqueFn =
    dyn Fn(&Value, &str, &[(String, Value)]) -> Result<bool, TransportError> + Send + Sync;

/// How the `unique` rule reaches its backend.
#[derive(Clone)]
pub enum UniqueBackend {
    /// A host-supplied function.
    Function(Arc<UniqueFn>),
    /// An HTTP endpoint descriptor, executed through the injected client.
    Http { url: String, method: Method },
}

impl fmt::Debug for UniqueBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => write!(f, "UniqueBackend::Function"),
            Self::Http { url, method } => {
                write!(f, "UniqueBackend::Http({method} {url})")
            }
        }
    }
}

/// A remote check that could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response.
    Network(String),
    /// The response carried a non-success status.
    Status(u16),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(detail) => write!(f, "network failure: {detail}"),
            Self::Status(code) => write!(f, "unexpected response status {code}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The integration is wired wrong — never a user-facing validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A rule name with no registered factory.
    UnknownRule(String),
    /// The `unique` rule has no backend configured.
    MissingEndpoint { rule: String },
    /// An HTTP endpoint descriptor without an injected client.
    MissingHttpClient { rule: String },
    /// The `captcha` rule ran without a provider.
    MissingProvider { rule: String },
    /// A rule is missing a required attribute.
    MissingAttribute { rule: String, expected: String },
    /// A rule descriptor that doesn't match the supported shapes.
    InvalidRuleSpec(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRule(name) => write!(f, "unknown rule '{name}'"),
            Self::MissingEndpoint { rule } => {
                write!(f, "rule '{rule}' has no endpoint configured")
            }
            Self::MissingHttpClient { rule } => {
                write!(f, "rule '{rule}' needs an HTTP client for its endpoint")
            }
            Self::MissingProvider { rule } => {
                write!(f, "rule '{rule}' has no captcha provider configured")
            }
            Self::MissingAttribute { rule, expected } => {
                write!(f, "rule '{rule}' is missing attribute '{expected}'")
            }
            Self::InvalidRuleSpec(detail) => write!(f, "invalid rule descriptor: {detail}"),
        }
    }
}

impl std::error::Error for ConfigError {}
