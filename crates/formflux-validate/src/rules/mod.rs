#![forbid(unsafe_code)]

//! The built-in rules.
//!
//! `required` and `completed` are plain synchronous predicates. `confirmed`
//! is synchronous but cross-field: its dependency declaration is what makes
//! editing the confirmation target re-trigger validation. `unique` and
//! `captcha` are asynchronous and run on pipeline worker threads against
//! snapshots prepared on the main thread.

mod captcha;
mod completed;
mod confirmed;
mod required;
mod unique;

pub use captcha::Captcha;
pub use completed::Completed;
pub use confirmed::Confirmed;
pub use required::Required;
pub use unique::Unique;
