//! Rule sets and the policy resolver algorithm (§4.4).
//!
//! The resolver itself lives here, as a method on [`RuleSet`], rather than in
//! `rspp-core`: it is a pure function over this crate's data alone, with no
//! I/O or adapter dependency, so keeping it next to the data it orders avoids
//! a needless round-trip through a second crate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::adaptive_action::{normalize_adaptive_actions, AdaptiveAction};
use crate::error::RsppError;
use crate::modality::Modality;
use crate::snapshot::{CapabilitySnapshot, DEFAULT_SNAPSHOT_REF};

/// Default policy-snapshot reference applied when a [`RuleSet`] supplies none.
pub const DEFAULT_POLICY_SNAPSHOT_REF: &str = "policy/default";

/// Default value for [`RuleSet::max_attempts_per_provider`].
pub const DEFAULT_MAX_ATTEMPTS_PER_PROVIDER: u32 = 2;

/// Attempt and latency ceilings for a resolved turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum total attempts across all candidate providers.
    pub max_total_attempts: u64,
    /// Maximum total wall-clock latency, in milliseconds, across all attempts.
    pub max_total_latency_ms: u64,
}

/// The rule scope that produced a resolved candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingReason {
    /// Selected by a by-tenant rule.
    RuleTenant,
    /// Selected by a by-language rule.
    RuleLanguage,
    /// Selected by a by-region rule.
    RuleRegion,
    /// Selected by a by-cost-tier rule.
    RuleCostTier,
    /// Selected by the default rule.
    RuleDefault,
    /// No rule matched; fell back to catalog order.
    FallbackCatalogDefault,
}

impl RoutingReason {
    /// Stable wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RuleTenant => "rule:tenant",
            Self::RuleLanguage => "rule:language",
            Self::RuleRegion => "rule:region",
            Self::RuleCostTier => "rule:cost_tier",
            Self::RuleDefault => "rule:default",
            Self::FallbackCatalogDefault => "fallback:catalog_default",
        }
    }
}

/// Whether candidate re-ordering consulted a capability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    /// Re-ordered using capability-snapshot health/price signals.
    CapabilitySnapshot,
    /// No snapshot signals available; catalog/rule order retained.
    FallbackDefault,
}

impl SignalSource {
    /// Stable wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CapabilitySnapshot => "capability_snapshot",
            Self::FallbackDefault => "fallback_default",
        }
    }
}

/// Layered ordering rules plus the attempt/action policy applied once a
/// candidate list is produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    /// Modality → ordered provider ids, evaluated when no scoped rule matches.
    pub default: HashMap<Modality, Vec<String>>,
    /// Tenant value → modality → ordered provider ids.
    pub by_tenant: HashMap<String, HashMap<Modality, Vec<String>>>,
    /// Language value → modality → ordered provider ids.
    pub by_language: HashMap<String, HashMap<Modality, Vec<String>>>,
    /// Region value → modality → ordered provider ids.
    pub by_region: HashMap<String, HashMap<Modality, Vec<String>>>,
    /// Cost-tier value → modality → ordered provider ids.
    pub by_cost_tier: HashMap<String, HashMap<Modality, Vec<String>>>,
    /// Adaptive actions the plan permits. Empty means "all three" at resolve time.
    pub allowed_actions: Vec<AdaptiveAction>,
    /// Maximum attempts against a single provider before orchestration must
    /// switch. Zero is treated as [`DEFAULT_MAX_ATTEMPTS_PER_PROVIDER`].
    pub max_attempts_per_provider: u32,
    /// Attempt/latency ceilings for the whole turn.
    pub budget: Budget,
    /// Reference recorded on resolved plans; defaulted when empty.
    pub policy_snapshot_ref: Option<String>,
}

/// Per-resolve inputs that vary by turn; the [`RuleSet`] itself is turn-invariant.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput<'a> {
    /// Modality being resolved.
    pub modality: Modality,
    /// Provider ids known to the adapter catalog, in catalog (lexicographic) order.
    pub catalog_provider_ids: Vec<String>,
    /// An operator- or caller-pinned provider, pinned first if present.
    pub preferred_provider: Option<String>,
    /// Tenant scope key, if any.
    pub tenant: Option<String>,
    /// Language scope key, if any.
    pub language: Option<String>,
    /// Region scope key, if any.
    pub region: Option<String>,
    /// Cost-tier scope key, if any.
    pub cost_tier: Option<String>,
    /// Capability snapshot consulted for health/price re-ordering, if any.
    pub capability_snapshot: Option<&'a CapabilitySnapshot>,
}

/// Frozen per-turn selection decision: ordered candidates, budget, allowed
/// actions, snapshot refs, and the reason the ordering was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTurnPlan {
    /// Non-empty, ordered candidate provider ids.
    pub ordered_candidates: Vec<String>,
    /// Maximum attempts per provider before orchestration must switch.
    pub max_attempts_per_provider: u32,
    /// Sorted, unique adaptive actions permitted for this turn.
    pub allowed_actions: Vec<AdaptiveAction>,
    /// Attempt/latency ceilings for the whole turn.
    pub budget: Budget,
    /// Policy snapshot reference recorded for replay.
    pub policy_snapshot_ref: String,
    /// Capability snapshot reference recorded for replay.
    pub capability_snapshot_ref: String,
    /// Which rule scope produced the candidate list.
    pub routing_reason: RoutingReason,
    /// Whether candidate re-ordering consulted a capability snapshot.
    pub signal_source: SignalSource,
}

fn dedup_trim_preserve_order(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

fn health_rank(signal: Option<&crate::snapshot::ProviderSignal>) -> u8 {
    match signal {
        Some(s) if s.healthy => 0,
        None => 1,
        Some(_) => 2,
    }
}

impl RuleSet {
    /// Run the deterministic policy-resolver algorithm (§4.4, steps 1-9).
    pub fn resolve(&self, input: &ResolveInput<'_>) -> Result<ResolvedTurnPlan, RsppError> {
        // Step 1: validate modality (closed enum, always valid) and catalog ids.
        let catalog = dedup_trim_preserve_order(&input.catalog_provider_ids);
        if catalog.is_empty() {
            return Err(RsppError::InvalidResolverInput(
                "catalog provider id list is empty".into(),
            ));
        }
        // Step 2: validate budget. Fields are unsigned, so non-negativity is
        // guaranteed by the type system; this is a documented no-op kept for
        // symmetry with the other validated inputs.

        // Step 3: scoped rule precedence tenant -> language -> region -> cost-tier -> default.
        let scoped = [
            (
                input.tenant.as_deref(),
                &self.by_tenant,
                RoutingReason::RuleTenant,
            ),
            (
                input.language.as_deref(),
                &self.by_language,
                RoutingReason::RuleLanguage,
            ),
            (
                input.region.as_deref(),
                &self.by_region,
                RoutingReason::RuleRegion,
            ),
            (
                input.cost_tier.as_deref(),
                &self.by_cost_tier,
                RoutingReason::RuleCostTier,
            ),
        ];

        let mut picked: Option<(Vec<String>, RoutingReason)> = None;
        for (key, rules, reason) in scoped {
            let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
                continue;
            };
            if let Some(list) = rules.get(key).and_then(|by_modality| {
                by_modality
                    .get(&input.modality)
                    .filter(|l| !l.is_empty())
            }) {
                picked = Some((dedup_trim_preserve_order(list), reason));
                break;
            }
        }
        let (candidates, routing_reason) = match picked {
            Some(found) => found,
            None => match self
                .default
                .get(&input.modality)
                .filter(|l| !l.is_empty())
            {
                Some(list) => (dedup_trim_preserve_order(list), RoutingReason::RuleDefault),
                None => (catalog.clone(), RoutingReason::FallbackCatalogDefault),
            },
        };

        // Step 4: filter to the catalog set, preserving order; fall back to
        // catalog order if nothing survives.
        let catalog_set: std::collections::HashSet<&str> =
            catalog.iter().map(String::as_str).collect();
        let mut ordered: Vec<String> = candidates
            .into_iter()
            .filter(|id| catalog_set.contains(id.as_str()))
            .collect();
        if ordered.is_empty() {
            ordered = catalog.clone();
        }

        // Step 5: re-order by capability snapshot, if present.
        let signal_source = match input.capability_snapshot {
            Some(snapshot) if !snapshot.providers.is_empty() => {
                let orig_index: HashMap<&str, usize> = ordered
                    .iter()
                    .enumerate()
                    .map(|(i, id)| (id.as_str(), i))
                    .collect();
                ordered.sort_by_key(|id| {
                    let signal = snapshot.providers.get(id);
                    let rank = health_rank(signal);
                    let price = signal.map_or(u64::MAX, |s| s.price_micros);
                    let idx = orig_index[id.as_str()];
                    (rank, price, idx)
                });
                SignalSource::CapabilitySnapshot
            }
            _ => SignalSource::FallbackDefault,
        };

        // Step 6: pin the preferred provider first, if present in the set.
        if let Some(preferred) = input.preferred_provider.as_deref() {
            if let Some(pos) = ordered.iter().position(|id| id == preferred) {
                let provider = ordered.remove(pos);
                ordered.insert(0, provider);
            }
        }

        // Step 7: fail if nothing survived.
        if ordered.is_empty() {
            return Err(RsppError::NoCandidates);
        }

        // Step 8: resolve allowed actions.
        let allowed_actions = if self.allowed_actions.is_empty() {
            AdaptiveAction::all().to_vec()
        } else {
            normalize_adaptive_actions(&self.allowed_actions)?
        };

        let max_attempts_per_provider = if self.max_attempts_per_provider == 0 {
            DEFAULT_MAX_ATTEMPTS_PER_PROVIDER
        } else {
            self.max_attempts_per_provider
        };

        // Step 9: populate refs and return.
        let policy_snapshot_ref = self
            .policy_snapshot_ref
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_POLICY_SNAPSHOT_REF.to_string());
        let capability_snapshot_ref = input
            .capability_snapshot
            .map(|s| s.snapshot_ref.clone())
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_REF.to_string());

        Ok(ResolvedTurnPlan {
            ordered_candidates: ordered,
            max_attempts_per_provider,
            allowed_actions,
            budget: self.budget,
            policy_snapshot_ref,
            capability_snapshot_ref,
            routing_reason,
            signal_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CapabilitySnapshot, FreezeInput, ProviderSignal};
    use std::collections::BTreeMap;

    fn ids(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn scenario_resolver_precedence() {
        let mut by_tenant = HashMap::new();
        let mut stt_rules = HashMap::new();
        stt_rules.insert(Modality::Stt, ids(&["stt-b", "stt-a", "stt-c"]));
        by_tenant.insert("tenant-a".to_string(), stt_rules);

        let rules = RuleSet {
            by_tenant,
            ..Default::default()
        };

        let mut providers = BTreeMap::new();
        providers.insert(
            "stt-a".to_string(),
            ProviderSignal {
                healthy: true,
                availability_score: 90,
                price_micros: 30,
            },
        );
        providers.insert(
            "stt-b".to_string(),
            ProviderSignal {
                healthy: false,
                availability_score: 10,
                price_micros: 10,
            },
        );
        providers.insert(
            "stt-c".to_string(),
            ProviderSignal {
                healthy: true,
                availability_score: 80,
                price_micros: 20,
            },
        );
        let snapshot = CapabilitySnapshot::freeze(FreezeInput {
            snapshot_ref: None,
            captured_at_ms: 0,
            providers,
        })
        .unwrap();

        let input = ResolveInput {
            modality: Modality::Stt,
            catalog_provider_ids: ids(&["stt-a", "stt-b", "stt-c"]),
            preferred_provider: None,
            tenant: Some("tenant-a".to_string()),
            language: None,
            region: None,
            cost_tier: None,
            capability_snapshot: Some(&snapshot),
        };

        let plan = rules.resolve(&input).unwrap();
        assert_eq!(plan.ordered_candidates, ids(&["stt-c", "stt-a", "stt-b"]));
        assert_eq!(plan.routing_reason, RoutingReason::RuleTenant);
        assert_eq!(plan.signal_source, SignalSource::CapabilitySnapshot);
    }

    #[test]
    fn scenario_preferred_pin() {
        let mut default = HashMap::new();
        default.insert(Modality::Llm, ids(&["llm-a", "llm-b", "llm-c"]));
        let rules = RuleSet {
            default,
            ..Default::default()
        };

        let mut providers = BTreeMap::new();
        providers.insert(
            "llm-b".to_string(),
            ProviderSignal {
                healthy: false,
                availability_score: 0,
                price_micros: 0,
            },
        );
        let snapshot = CapabilitySnapshot::freeze(FreezeInput {
            snapshot_ref: None,
            captured_at_ms: 0,
            providers,
        })
        .unwrap();

        let input = ResolveInput {
            modality: Modality::Llm,
            catalog_provider_ids: ids(&["llm-a", "llm-b", "llm-c"]),
            preferred_provider: Some("llm-b".to_string()),
            tenant: None,
            language: None,
            region: None,
            cost_tier: None,
            capability_snapshot: Some(&snapshot),
        };

        let plan = rules.resolve(&input).unwrap();
        assert_eq!(plan.ordered_candidates.first().unwrap(), "llm-b");
    }

    #[test]
    fn scenario_catalog_fallback() {
        let rules = RuleSet::default();
        let input = ResolveInput {
            modality: Modality::Tts,
            catalog_provider_ids: ids(&["tts-b", "tts-a"]),
            preferred_provider: None,
            tenant: None,
            language: None,
            region: None,
            cost_tier: None,
            capability_snapshot: None,
        };
        let plan = rules.resolve(&input).unwrap();
        assert_eq!(plan.ordered_candidates, ids(&["tts-b", "tts-a"]));
        assert_eq!(plan.routing_reason, RoutingReason::FallbackCatalogDefault);
        assert_eq!(plan.allowed_actions, AdaptiveAction::all().to_vec());
    }

    #[test]
    fn resolve_fails_on_empty_catalog() {
        let rules = RuleSet::default();
        let input = ResolveInput {
            modality: Modality::Stt,
            catalog_provider_ids: vec![],
            ..Default::default()
        };
        assert!(rules.resolve(&input).is_err());
    }

    #[test]
    fn resolve_is_deterministic_across_calls() {
        let rules = RuleSet::default();
        let input = ResolveInput {
            modality: Modality::Stt,
            catalog_provider_ids: ids(&["stt-a", "stt-b"]),
            ..Default::default()
        };
        let a = rules.resolve(&input).unwrap();
        let b = rules.resolve(&input).unwrap();
        assert_eq!(a, b);
    }
}
