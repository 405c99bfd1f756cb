//! Capability snapshot data model (§4.3): frozen per-provider health,
//! availability, and price signals used by the policy resolver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RsppError;

/// Default snapshot reference applied when the caller supplies none.
pub const DEFAULT_SNAPSHOT_REF: &str = "provider-capability/default";

/// Per-provider signal frozen into a [`CapabilitySnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderSignal {
    /// Whether the provider is currently considered healthy.
    pub healthy: bool,
    /// Availability score in `[0, 100]`.
    pub availability_score: u8,
    /// Price in micros (1e-6 of the provider's billing unit), `>= 0`.
    pub price_micros: u64,
}

impl ProviderSignal {
    fn validate(&self) -> Result<(), RsppError> {
        if self.availability_score > 100 {
            return Err(RsppError::InvalidSnapshot(format!(
                "availability score out of range: {}",
                self.availability_score
            )));
        }
        Ok(())
    }
}

/// Caller-supplied descriptor consumed by a freeze call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreezeInput {
    /// Caller-chosen reference; defaulted to [`DEFAULT_SNAPSHOT_REF`] when empty.
    pub snapshot_ref: Option<String>,
    /// Capture timestamp in epoch milliseconds.
    pub captured_at_ms: u64,
    /// Per-provider signals, keyed by provider id.
    pub providers: BTreeMap<String, ProviderSignal>,
}

/// Frozen per-provider signals captured before turn open, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    /// Non-empty snapshot reference.
    pub snapshot_ref: String,
    /// Capture timestamp in epoch milliseconds.
    pub captured_at_ms: u64,
    /// Per-provider signals, keyed by provider id, ordered by key for
    /// deterministic iteration.
    pub providers: BTreeMap<String, ProviderSignal>,
}

impl CapabilitySnapshot {
    /// Construct a snapshot from a freeze input, validating provider ids and
    /// per-provider fields. Does not compute the fingerprint; see
    /// `rspp_core::snapshot::fingerprint`.
    pub fn freeze(input: FreezeInput) -> Result<Self, RsppError> {
        let snapshot_ref = match input.snapshot_ref {
            Some(s) if !s.trim().is_empty() => s,
            _ => DEFAULT_SNAPSHOT_REF.to_string(),
        };
        for (provider_id, signal) in &input.providers {
            if provider_id.trim().is_empty() {
                return Err(RsppError::InvalidSnapshot(
                    "empty provider id in snapshot".into(),
                ));
            }
            signal.validate()?;
        }
        Ok(Self {
            snapshot_ref,
            captured_at_ms: input.captured_at_ms,
            providers: input.providers,
        })
    }

    /// Re-validate an already-constructed snapshot, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), RsppError> {
        if self.snapshot_ref.trim().is_empty() {
            return Err(RsppError::InvalidSnapshot("empty snapshot ref".into()));
        }
        for (provider_id, signal) in &self.providers {
            if provider_id.trim().is_empty() {
                return Err(RsppError::InvalidSnapshot(
                    "empty provider id in snapshot".into(),
                ));
            }
            signal.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_defaults_snapshot_ref() {
        let snap = CapabilitySnapshot::freeze(FreezeInput {
            snapshot_ref: None,
            captured_at_ms: 0,
            providers: BTreeMap::new(),
        })
        .unwrap();
        assert_eq!(snap.snapshot_ref, DEFAULT_SNAPSHOT_REF);
    }

    #[test]
    fn freeze_rejects_out_of_range_availability() {
        let mut providers = BTreeMap::new();
        providers.insert(
            "stt-a".to_string(),
            ProviderSignal {
                healthy: true,
                availability_score: 255,
                price_micros: 0,
            },
        );
        let err = CapabilitySnapshot::freeze(FreezeInput {
            snapshot_ref: None,
            captured_at_ms: 0,
            providers,
        });
        assert!(err.is_err());
    }
}
