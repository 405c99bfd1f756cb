//! Capability-snapshot fingerprinting (§4.3).
//!
//! Construction and validation of [`CapabilitySnapshot`] live in
//! `rspp-types`, next to the data; the fingerprint lives here because it is
//! the one place in the data model that needs a hashing dependency.

use rspp_types::CapabilitySnapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
struct FingerprintView<'a> {
    snapshot_ref: &'a str,
    captured_at_ms: u64,
    providers: &'a std::collections::BTreeMap<String, rspp_types::ProviderSignal>,
}

/// Hex-encoded SHA-256 fingerprint of a deterministic serialization of
/// `{snapshot_ref, captured_at_ms, providers sorted by provider-id}`.
///
/// Stable across calls on the same snapshot, and across snapshots built from
/// equivalent inputs regardless of map insertion order: `providers` is a
/// `BTreeMap`, so serialization always iterates in key order.
#[must_use]
pub fn fingerprint(snapshot: &CapabilitySnapshot) -> String {
    let view = FingerprintView {
        snapshot_ref: &snapshot.snapshot_ref,
        captured_at_ms: snapshot.captured_at_ms,
        providers: &snapshot.providers,
    };
    // `serde_json` is stable for a fixed input shape; `BTreeMap` guarantees
    // key order independent of insertion order.
    let bytes = serde_json::to_vec(&view).expect("FingerprintView is always serializable");
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}
