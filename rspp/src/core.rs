//! The facade orchestrator: an immutable adapter catalog plus the rule set
//! and capability snapshot consulted when resolving a turn plan.
//!
//! Retry and provider-switch policy live in the surrounding orchestration,
//! not here (§1, §7): this type resolves one turn plan and performs one
//! adapter attempt at a time, under a defense-in-depth deadline.

use std::sync::Arc;
use std::time::Duration;

use rspp_core::{Adapter, InvocationRequest, Outcome, OutcomeClass, StreamObserver};
use rspp_types::{CapabilitySnapshot, Modality, ResolveInput, ResolvedTurnPlan, RsppError, RuleSet};

/// Per-resolve scoping values that vary by turn; the rule set and catalog do not.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
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
}

/// Builder for a [`Pipeline`]: register adapters and attach a rule set
/// before freezing the catalog.
pub struct PipelineBuilder {
    adapters: Vec<Arc<dyn Adapter>>,
    rule_set: RuleSet,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a new builder with an empty catalog and a default rule set.
    ///
    /// Behavior:
    /// - Starts with no adapters; you must register at least one per
    ///   modality via `with_adapter` before `build` succeeds.
    /// - Defaults the rule set to catalog-order fallback for every modality
    ///   (`RoutingReason::FallbackCatalogDefault`) until `rule_set` is called.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: vec![],
            rule_set: RuleSet::default(),
        }
    }

    /// Register one adapter. Collisions on `(modality, provider_id)` are
    /// rejected by `build`, not here.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Register many adapters at once.
    #[must_use]
    pub fn with_adapters(mut self, adapters: impl IntoIterator<Item = Arc<dyn Adapter>>) -> Self {
        self.adapters.extend(adapters);
        self
    }

    /// Attach the rule set governing candidate ordering, allowed adaptive
    /// actions, and turn budget.
    #[must_use]
    pub fn rule_set(mut self, rule_set: RuleSet) -> Self {
        self.rule_set = rule_set;
        self
    }

    /// Freeze the adapter catalog and return the orchestrator.
    ///
    /// Fails if no adapters were registered, or if two adapters collide on
    /// `(modality, provider_id)`.
    pub fn build(self) -> Result<Pipeline, RsppError> {
        if self.adapters.is_empty() {
            return Err(RsppError::EmptyCatalog);
        }
        let catalog = rspp_core::AdapterCatalog::new(self.adapters)?;
        Ok(Pipeline {
            catalog,
            rule_set: self.rule_set,
        })
    }
}

/// The frozen facade over an [`rspp_core::AdapterCatalog`] and a [`RuleSet`].
///
/// The catalog is read-only after construction, matching the concurrency
/// model in §5: no other shared mutable state lives inside `Pipeline`.
/// Capability snapshots are supplied fresh to each `resolve_turn_plan` call
/// by the control plane, rather than cached here.
pub struct Pipeline {
    catalog: rspp_core::AdapterCatalog,
    rule_set: RuleSet,
}

impl Pipeline {
    /// Start building a new `Pipeline`.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The frozen adapter catalog.
    #[must_use]
    pub const fn catalog(&self) -> &rspp_core::AdapterCatalog {
        &self.catalog
    }

    /// The active rule set.
    #[must_use]
    pub const fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Resolve the turn plan for `modality`, consulting `capability_snapshot`
    /// if given.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, capability_snapshot), fields(modality = modality.as_str()))
    )]
    pub fn resolve_turn_plan(
        &self,
        modality: Modality,
        ctx: &ResolveContext,
        capability_snapshot: Option<&CapabilitySnapshot>,
    ) -> Result<ResolvedTurnPlan, RsppError> {
        let input = ResolveInput {
            modality,
            catalog_provider_ids: self.catalog.provider_ids(modality),
            preferred_provider: ctx.preferred_provider.clone(),
            tenant: ctx.tenant.clone(),
            language: ctx.language.clone(),
            region: ctx.region.clone(),
            cost_tier: ctx.cost_tier.clone(),
            capability_snapshot,
        };
        self.rule_set.resolve(&input)
    }

    /// Perform one adapter attempt against `provider_id`, bounded by
    /// `deadline`.
    ///
    /// A deadline expiry is folded into a `Timeout` outcome rather than
    /// surfaced as a function-level error, matching §7's propagation policy:
    /// remote-side (and deadline) failures are outcomes, not `Result` errors.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, request), fields(modality = modality.as_str(), provider_id))
    )]
    pub async fn invoke(
        &self,
        modality: Modality,
        provider_id: &str,
        request: &InvocationRequest,
        deadline: Duration,
    ) -> Result<Outcome, RsppError> {
        request.validate()?;
        let adapter = self.catalog.get(modality, provider_id).ok_or_else(|| RsppError::UnknownProvider {
            modality: modality.as_str().to_string(),
            provider_id: provider_id.to_string(),
        })?;
        invoke_with_deadline(adapter.as_ref(), request, deadline).await
    }

    /// Perform one streaming adapter attempt against `provider_id`, bounded
    /// by `deadline` for the whole call.
    pub async fn invoke_stream(
        &self,
        modality: Modality,
        provider_id: &str,
        request: &InvocationRequest,
        observer: &mut dyn StreamObserver,
        deadline: Duration,
    ) -> Result<Outcome, RsppError> {
        request.validate()?;
        let adapter = self.catalog.get(modality, provider_id).ok_or_else(|| RsppError::UnknownProvider {
            modality: modality.as_str().to_string(),
            provider_id: provider_id.to_string(),
        })?;
        let streaming = adapter
            .as_streaming()
            .ok_or_else(|| RsppError::InvalidArg(format!("provider {provider_id:?} does not support streaming")))?;
        match tokio::time::timeout(deadline, streaming.invoke_stream(request, observer)).await {
            Ok(result) => result,
            Err(_) => Ok(timeout_outcome()),
        }
    }
}

fn timeout_outcome() -> Outcome {
    Outcome {
        class: OutcomeClass::Timeout,
        retryable: true,
        reason: Some(rspp_core::reason::PROVIDER_TIMEOUT.to_string()),
        circuit_open: false,
        backoff_ms: 0,
        captured_input: None,
        captured_output: None,
        output_status_code: 0,
        payload_truncated: false,
    }
}

/// Run one `Adapter::invoke` bounded by `deadline`, folding an expiry into a
/// `Timeout` outcome.
///
/// Grounded on `Borsa::provider_call_with_timeout`'s `tokio::time::timeout`
/// wrap, adapted to fold the expiry into the outcome-as-data model instead
/// of a typed `Result` error.
pub async fn invoke_with_deadline(
    adapter: &dyn Adapter,
    request: &InvocationRequest,
    deadline: Duration,
) -> Result<Outcome, RsppError> {
    match tokio::time::timeout(deadline, adapter.invoke(request)).await {
        Ok(result) => result,
        Err(_) => Ok(timeout_outcome()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rspp_core::RequestIdentity;

    struct SlowAdapter;

    #[async_trait]
    impl Adapter for SlowAdapter {
        fn provider_id(&self) -> &str {
            "slow"
        }
        fn modality(&self) -> Modality {
            Modality::Llm
        }
        async fn invoke(&self, _request: &InvocationRequest) -> Result<Outcome, RsppError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn request() -> InvocationRequest {
        InvocationRequest {
            identity: RequestIdentity {
                session_id: "s1".into(),
                turn_id: "t1".into(),
                pipeline_version: "v1".into(),
                event_id: "e1".into(),
                provider_invocation_id: "i1".into(),
                provider_id: "slow".into(),
                modality: Modality::Llm,
            },
            attempt: 1,
            transport_sequence: 0,
            runtime_sequence: 0,
            authority_epoch: 0,
            runtime_timestamp_ms: 0,
            wall_clock_timestamp_ms: 0,
            cancel_requested: false,
            allowed_adaptive_actions: Vec::new(),
            retry_budget_remaining: 1,
            candidate_provider_count: 1,
        }
    }

    #[tokio::test]
    async fn builder_rejects_empty_catalog() {
        let err = Pipeline::builder().build().unwrap_err();
        assert!(matches!(err, RsppError::EmptyCatalog));
    }

    #[tokio::test]
    async fn invoke_unknown_provider_fails() {
        let pipeline = Pipeline::builder()
            .with_adapter(Arc::new(SlowAdapter))
            .build()
            .unwrap();
        let err = pipeline
            .invoke(Modality::Llm, "nope", &request(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, RsppError::UnknownProvider { .. }));
    }

    #[tokio::test]
    async fn invoke_deadline_folds_into_timeout_outcome() {
        let pipeline = Pipeline::builder()
            .with_adapter(Arc::new(SlowAdapter))
            .build()
            .unwrap();
        let outcome = pipeline
            .invoke(Modality::Llm, "slow", &request(), Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(outcome.class, OutcomeClass::Timeout);
        assert!(outcome.retryable);
    }

    #[test]
    fn resolve_turn_plan_falls_back_to_catalog_order() {
        let pipeline = Pipeline::builder()
            .with_adapter(Arc::new(SlowAdapter))
            .build()
            .unwrap();
        let plan = pipeline
            .resolve_turn_plan(Modality::Llm, &ResolveContext::default(), None)
            .unwrap();
        assert_eq!(plan.ordered_candidates, vec!["slow".to_string()]);
    }
}
