//! Adapter catalog (§4.5): registers adapters per modality and yields
//! deterministic candidate orderings.

use std::collections::BTreeMap;
use std::sync::Arc;

use rspp_types::{Modality, RsppError};

use crate::adapter::Adapter;

/// Default value for the `max` argument of [`AdapterCatalog::candidates`].
pub const DEFAULT_MAX_CANDIDATES: usize = 5;

/// Adapters partitioned by modality, immutable after construction.
///
/// Provider iteration order within a modality is lexicographic by provider
/// id: adapters are stored in a `BTreeMap` keyed by id, so that ordering
/// falls out of the data structure rather than needing a sort at read time.
pub struct AdapterCatalog {
    by_modality: BTreeMap<Modality, BTreeMap<String, Arc<dyn Adapter>>>,
}

impl std::fmt::Debug for AdapterCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .by_modality
            .iter()
            .map(|(m, ids)| (m.as_str(), ids.len()))
            .collect();
        f.debug_struct("AdapterCatalog").field("counts", &counts).finish()
    }
}

impl AdapterCatalog {
    /// Construct a catalog from a flat adapter list.
    ///
    /// Rejects an empty provider id, and a provider id registered more than
    /// once within the same modality.
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Result<Self, RsppError> {
        let mut by_modality: BTreeMap<Modality, BTreeMap<String, Arc<dyn Adapter>>> =
            BTreeMap::new();
        for adapter in adapters {
            let id = adapter.provider_id().to_string();
            if id.trim().is_empty() {
                return Err(RsppError::InvalidArg("adapter provider id is empty".into()));
            }
            let modality = adapter.modality();
            let slot = by_modality.entry(modality).or_default();
            if slot.contains_key(&id) {
                return Err(RsppError::DuplicateProvider {
                    modality: modality.as_str().to_string(),
                    provider_id: id,
                });
            }
            slot.insert(id, adapter);
        }
        Ok(Self { by_modality })
    }

    /// Return up to `max` (default [`DEFAULT_MAX_CANDIDATES`]) adapters for
    /// `modality`, with `preferred` first if given, followed by the rest in
    /// lexicographic provider-id order.
    pub fn candidates(
        &self,
        modality: Modality,
        preferred: Option<&str>,
        max: Option<usize>,
    ) -> Result<Vec<Arc<dyn Adapter>>, RsppError> {
        let max = max.unwrap_or(DEFAULT_MAX_CANDIDATES);
        let slot = self.by_modality.get(&modality).ok_or_else(|| RsppError::UnknownProvider {
            modality: modality.as_str().to_string(),
            provider_id: preferred.unwrap_or_default().to_string(),
        })?;

        let mut out = Vec::with_capacity(max.min(slot.len()));
        if let Some(preferred) = preferred {
            let adapter = slot.get(preferred).ok_or_else(|| RsppError::UnknownProvider {
                modality: modality.as_str().to_string(),
                provider_id: preferred.to_string(),
            })?;
            out.push(Arc::clone(adapter));
        }
        for (id, adapter) in slot {
            if out.len() >= max {
                break;
            }
            if Some(id.as_str()) == preferred {
                continue;
            }
            out.push(Arc::clone(adapter));
        }
        Ok(out)
    }

    /// Look up one adapter by modality and provider id.
    pub fn get(&self, modality: Modality, provider_id: &str) -> Option<Arc<dyn Adapter>> {
        self.by_modality
            .get(&modality)
            .and_then(|slot| slot.get(provider_id))
            .map(Arc::clone)
    }

    /// All registered provider ids for `modality`, in lexicographic order.
    #[must_use]
    pub fn provider_ids(&self, modality: Modality) -> Vec<String> {
        self.by_modality
            .get(&modality)
            .map(|slot| slot.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Assert that every modality has an adapter count within `[min, max]`.
    pub fn validate_coverage(&self, min: usize, max: usize) -> Result<(), RsppError> {
        for modality in Modality::all() {
            let count = self.by_modality.get(&modality).map_or(0, BTreeMap::len);
            if count < min || count > max {
                return Err(RsppError::InvalidArg(format!(
                    "modality {modality} has {count} adapters, outside [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }
}
