#![forbid(unsafe_code)]

//! Core data layer for formflux.
//!
//! This crate owns everything that touches the form-data graph directly:
//!
//! - [`Path`] — dot-delimited addresses into the graph, with wildcard
//!   segments for repeated structures
//! - [`Store`] — the single owned, mutable value tree all fields read and
//!   write through
//! - [`resolver`] — dependency-expression resolution (wildcards, sibling
//!   shorthand, default literals)
//! - [`Condition`] — declarative availability expressions with AND-list
//!   semantics
//! - [`WatchRegistry`] — deep-inequality change watches keyed by caller tags
//!
//! The validation layer (`formflux-validate`) and the facade (`formflux`)
//! build on these types; nothing in this crate knows about rules, message
//! bags, or fields.

pub mod condition;
pub mod path;
pub mod resolver;
pub mod store;
pub mod value;
pub mod watch;

pub use condition::{Condition, Expected, eval_all, parse_conditions};
pub use path::Path;
pub use resolver::{Resolution, resolve, resolved_path};
pub use store::Store;
pub use value::{is_filled, is_truthy, stable_string};
pub use watch::WatchRegistry;
