#![forbid(unsafe_code)]

//! Dependency-expression resolution.
//!
//! A dependency expression names another field's value from the point of
//! view of a *context* — the row a field lives in (its parent path). The
//! grammar, all parts optional except the path:
//!
//! ```text
//! expr       := path-part [ "|'" literal "'" ]
//! path-part  := segment ( "." segment )*
//! segment    := name | index | "*"
//! ```
//!
//! Resolution rules, in order:
//!
//! - A bare single segment (no dots, no wildcard) is a **sibling**: it
//!   resolves inside the context row. This is what `confirmed`'s
//!   `{name}_confirmation` lookup needs.
//! - A **leading** `*` expands to the entire context path, so a rule written
//!   once on a repeated-row schema addresses the correct row: `*.qty` in the
//!   context `items.2` resolves to `items.2.qty`.
//! - An **interior** `*` at segment index `i` takes the context path's
//!   segment `i`: `items.*.qty` in the context `items.2` also resolves to
//!   `items.2.qty`.
//! - Anything else is taken as an absolute path.
//!
//! The optional `|'literal'` suffix supplies a fallback used when the
//! resolved path has no bound value.

use serde_json::Value;

use crate::path::{Path, WILDCARD};
use crate::store::Store;

/// Outcome of resolving a dependency expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The absolute path the expression resolved to.
    pub path: Path,
    /// The value currently bound there, or the default literal, or `None`.
    pub value: Option<Value>,
    /// `true` when `value` came from the `|'literal'` fallback.
    pub used_default: bool,
}

/// Split an expression into its path part and optional default literal.
#[must_use]
pub fn split_default(expr: &str) -> (&str, Option<&str>) {
    if let Some(pipe) = expr.rfind("|'")
        && let Some(rest) = expr[pipe + 2..].strip_suffix('\'')
    {
        return (&expr[..pipe], Some(rest));
    }
    (expr, None)
}

/// Resolve just the path part of `expr` against `context` (the row path).
#[must_use]
pub fn resolved_path(expr_path: &str, context: &Path) -> Path {
    let raw = Path::parse(expr_path);
    let segments = raw.segments();

    // Sibling shorthand: one plain segment lives inside the context row.
    if segments.len() == 1 && segments[0] != WILDCARD {
        return context.join(&segments[0]);
    }

    let mut out: Vec<String> = Vec::with_capacity(segments.len() + context.len());
    for (i, segment) in segments.iter().enumerate() {
        if segment != WILDCARD {
            out.push(segment.clone());
        } else if i == 0 {
            out.extend(context.segments().iter().cloned());
        } else if let Some(ctx_segment) = context.get(i) {
            out.push(ctx_segment.to_string());
        } else {
            // Context too short to substitute; leave the wildcard in place
            // so the caller sees an unresolvable path rather than a wrong one.
            tracing::debug!(expr = expr_path, context = %context, index = i,
                "wildcard segment has no matching context segment");
            out.push(segment.clone());
        }
    }
    Path::from_segments(out)
}

/// Resolve `expr` against `context` and look the result up in `store`.
#[must_use]
pub fn resolve(expr: &str, context: &Path, store: &Store) -> Resolution {
    let (path_part, default) = split_default(expr);
    let path = resolved_path(path_part, context);
    match store.get(&path) {
        Some(value) => Resolution {
            path,
            value: Some(value.clone()),
            used_default: false,
        },
        None => Resolution {
            path,
            value: default.map(|d| Value::String(d.to_string())),
            used_default: default.is_some(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: &str) -> Path {
        Path::parse(raw)
    }

    #[test]
    fn split_default_with_and_without_suffix() {
        assert_eq!(split_default("a.b|'fallback'"), ("a.b", Some("fallback")));
        assert_eq!(split_default("a.b"), ("a.b", None));
        assert_eq!(split_default("a|'x|y'"), ("a", Some("x|y")));
    }

    #[test]
    fn bare_segment_resolves_as_sibling() {
        assert_eq!(
            resolved_path("password_confirmation", &p("signup")),
            p("signup.password_confirmation")
        );
        // Root context: sibling of the top level.
        assert_eq!(resolved_path("email", &Path::root()), p("email"));
    }

    #[test]
    fn leading_wildcard_expands_to_whole_context() {
        assert_eq!(resolved_path("*.qty", &p("items.2")), p("items.2.qty"));
    }

    #[test]
    fn interior_wildcard_takes_positional_context_segment() {
        assert_eq!(resolved_path("items.*.qty", &p("items.2")), p("items.2.qty"));
    }

    #[test]
    fn dotted_path_without_wildcard_is_absolute() {
        assert_eq!(resolved_path("address.city", &p("items.2")), p("address.city"));
    }

    #[test]
    fn interior_wildcard_beyond_context_stays_unresolved() {
        let resolved = resolved_path("items.*.qty", &p("items"));
        assert!(resolved.has_wildcard());
    }

    #[test]
    fn resolve_reads_bound_value() {
        let mut store = Store::new();
        store.set(&p("items.2.qty"), json!(7));
        let r = resolve("*.qty", &p("items.2"), &store);
        assert_eq!(r.path, p("items.2.qty"));
        assert_eq!(r.value, Some(json!(7)));
        assert!(!r.used_default);
    }

    #[test]
    fn resolve_falls_back_to_default_literal() {
        let store = Store::new();
        let r = resolve("country|'NO'", &Path::root(), &store);
        assert_eq!(r.path, p("country"));
        assert_eq!(r.value, Some(json!("NO")));
        assert!(r.used_default);
    }

    #[test]
    fn resolve_unbound_without_default_is_none() {
        let store = Store::new();
        let r = resolve("missing.value", &Path::root(), &store);
        assert_eq!(r.value, None);
        assert!(!r.used_default);
    }
}
