use serde::{Deserialize, Serialize};

use crate::error::RsppError;

/// One of the strategies surrounding orchestration may apply after a
/// non-success outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdaptiveAction {
    /// Retry the same provider.
    Retry,
    /// Switch to the next candidate provider.
    ProviderSwitch,
    /// Fall back to a degraded response.
    Fallback,
}

impl AdaptiveAction {
    const ALL: [Self; 3] = [Self::Retry, Self::ProviderSwitch, Self::Fallback];

    /// Parse the wire identifier used in rule sets and request payloads.
    pub fn parse(s: &str) -> Result<Self, RsppError> {
        match s {
            "retry" => Ok(Self::Retry),
            "provider_switch" => Ok(Self::ProviderSwitch),
            "fallback" => Ok(Self::Fallback),
            other => Err(RsppError::InvalidArg(format!(
                "unknown adaptive action: {other}"
            ))),
        }
    }

    /// Stable wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::ProviderSwitch => "provider_switch",
            Self::Fallback => "fallback",
        }
    }

    /// All three actions, in the canonical sorted order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        Self::ALL
    }
}

/// Deduplicate and sort a list of adaptive actions, failing on duplicates.
///
/// An empty input is a valid empty result; callers decide their own defaults.
pub fn normalize_adaptive_actions(
    actions: &[AdaptiveAction],
) -> Result<Vec<AdaptiveAction>, RsppError> {
    let mut seen = Vec::with_capacity(actions.len());
    for &action in actions {
        if seen.contains(&action) {
            return Err(RsppError::InvalidArg(format!(
                "duplicate adaptive action: {}",
                action.as_str()
            )));
        }
        seen.push(action);
    }
    seen.sort();
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent_and_order_independent() {
        let a = [AdaptiveAction::Fallback, AdaptiveAction::Retry];
        let b = [AdaptiveAction::Retry, AdaptiveAction::Fallback];
        let na = normalize_adaptive_actions(&a).unwrap();
        let nb = normalize_adaptive_actions(&b).unwrap();
        assert_eq!(na, nb);
        assert_eq!(normalize_adaptive_actions(&na).unwrap(), na);
    }

    #[test]
    fn normalize_rejects_duplicates() {
        let dup = [AdaptiveAction::Retry, AdaptiveAction::Retry];
        assert!(normalize_adaptive_actions(&dup).is_err());
    }

    #[test]
    fn normalize_empty_is_valid() {
        assert_eq!(normalize_adaptive_actions(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(AdaptiveAction::parse("bogus").is_err());
    }
}
