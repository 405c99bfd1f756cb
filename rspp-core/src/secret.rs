//! Secret reference resolution (§4.2).
//!
//! The module never logs a raw secret value; callers that need to log a
//! resolved value should pass it through [`redact`] first.

use rspp_types::RsppError;

const REDACTED_MARKER: &str = "***redacted***";

/// Split a reference string into the bare name it refers to.
///
/// Accepts `env://NAME` and bare `NAME`. Rejects any reference containing
/// `/` outside of the `env://` scheme prefix, and any `://` scheme other
/// than `env`.
fn resolve_name(reference: &str) -> Result<&str, RsppError> {
    if let Some(name) = reference.strip_prefix("env://") {
        if name.is_empty() {
            return Err(RsppError::InvalidArg("empty secret name".into()));
        }
        return Ok(name);
    }
    if reference.contains("://") {
        return Err(RsppError::InvalidArg(format!(
            "unsupported secret reference scheme: {reference}"
        )));
    }
    if reference.contains('/') {
        return Err(RsppError::InvalidArg(format!(
            "secret reference must not contain '/': {reference}"
        )));
    }
    if reference.is_empty() {
        return Err(RsppError::InvalidArg("empty secret reference".into()));
    }
    Ok(reference)
}

/// Resolve a secret reference through an injected lookup function.
///
/// The lookup returns `(value, present)`; an empty or whitespace-only value
/// is treated as a resolution failure even when `present` is `true`.
pub fn resolve(reference: &str, lookup: impl Fn(&str) -> (String, bool)) -> Result<String, RsppError> {
    let name = resolve_name(reference)?;
    let (value, present) = lookup(name);
    if !present || value.trim().is_empty() {
        return Err(RsppError::InvalidArg(format!(
            "secret {name:?} is not present or empty"
        )));
    }
    Ok(value)
}

/// Resolve a literal value if present, otherwise resolve a secret reference.
///
/// Fails when neither is present, or when the reference fails to resolve.
pub fn resolve_literal_or_ref(
    literal: Option<&str>,
    reference: Option<&str>,
    lookup: impl Fn(&str) -> (String, bool),
) -> Result<String, RsppError> {
    if let Some(literal) = literal.filter(|s| !s.trim().is_empty()) {
        return Ok(literal.to_string());
    }
    match reference {
        Some(reference) => resolve(reference, lookup),
        None => Err(RsppError::InvalidArg(
            "neither literal nor secret reference was supplied".into(),
        )),
    }
}

/// Resolve a secret reference for a non-critical value, falling back to a
/// caller-supplied literal when the lookup fails rather than erroring.
pub fn resolve_or_fallback(
    reference: &str,
    fallback: &str,
    lookup: impl Fn(&str) -> (String, bool),
) -> String {
    resolve(reference, lookup).unwrap_or_else(|_| fallback.to_string())
}

/// Return a constant redaction marker for a non-empty secret value. Never
/// echoes any part of the input.
#[must_use]
pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        REDACTED_MARKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(value: &str) -> impl Fn(&str) -> (String, bool) + '_ {
        move |_name| (value.to_string(), true)
    }

    fn absent() -> impl Fn(&str) -> (String, bool) {
        |_name| (String::new(), false)
    }

    #[test]
    fn resolves_env_scheme_and_bare_name() {
        assert_eq!(resolve("env://FOO", present("bar")).unwrap(), "bar");
        assert_eq!(resolve("FOO", present("bar")).unwrap(), "bar");
    }

    #[test]
    fn rejects_foreign_scheme_and_slash() {
        assert!(resolve("vault://FOO", present("bar")).is_err());
        assert!(resolve("a/b", present("bar")).is_err());
    }

    #[test]
    fn rejects_empty_value() {
        assert!(resolve("FOO", present("   ")).is_err());
        assert!(resolve("FOO", absent()).is_err());
    }

    #[test]
    fn literal_wins_over_reference() {
        let resolved = resolve_literal_or_ref(Some("literal"), Some("env://FOO"), absent()).unwrap();
        assert_eq!(resolved, "literal");
    }

    #[test]
    fn fallback_used_when_lookup_fails() {
        assert_eq!(resolve_or_fallback("env://FOO", "default", absent()), "default");
    }

    #[test]
    fn redact_never_echoes_input() {
        assert_eq!(redact("super-secret"), "***redacted***");
        assert_eq!(redact(""), "");
    }
}
