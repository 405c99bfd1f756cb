use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex};

use rspp_core::{
    Adapter, InvocationRequest, Outcome, OutcomeClass, StreamChunk, StreamObserver, StreamingAdapter,
};
use rspp_types::{Modality, RsppError};

fn plain_success() -> Outcome {
    Outcome {
        class: OutcomeClass::Success,
        retryable: false,
        reason: None,
        circuit_open: false,
        backoff_ms: 0,
        captured_input: None,
        captured_output: None,
        output_status_code: 0,
        payload_truncated: false,
    }
}

/// Instruction for how a unary `invoke` should behave.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return the given outcome immediately.
    Return(Outcome),
    /// Fail immediately with the given programmer-level error.
    Fail(RsppError),
    /// Hang indefinitely (simulate a stuck provider).
    Hang,
}

/// Instruction for how a streaming invocation should behave.
#[derive(Clone)]
pub enum StreamBehavior {
    /// Deliver these chunks in order through the observer, then return this outcome.
    Success(Vec<StreamChunk>, Outcome),
    /// Fail `invoke_stream` immediately with the given programmer-level error.
    Fail(RsppError),
    /// Hang before delivering anything (simulate a stalled connect).
    Hang,
    /// Deliver chunks pushed externally via the controller until a terminal
    /// chunk arrives or the session is remotely killed.
    Manual,
}

struct StreamSession {
    behavior: StreamBehavior,
    kill_switch: Option<oneshot::Sender<()>>,
    manual_tx: Option<mpsc::Sender<StreamChunk>>,
}

impl StreamSession {
    const fn new(behavior: StreamBehavior) -> Self {
        Self {
            behavior,
            kill_switch: None,
            manual_tx: None,
        }
    }
}

#[derive(Default)]
struct InternalState {
    invoke_rules: HashMap<(Modality, String), MockBehavior>,
    stream_rules: HashMap<(Modality, String), StreamSession>,
    invocation_log: HashMap<(Modality, String), Vec<InvocationRequest>>,
}

/// Controller handle used by tests to drive a [`DynamicMockAdapter`] from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior for unary `invoke` calls on `provider_id`.
    pub async fn set_invoke_behavior(
        &self,
        modality: Modality,
        provider_id: impl Into<String>,
        behavior: MockBehavior,
    ) {
        let mut guard = self.state.lock().await;
        guard
            .invoke_rules
            .insert((modality, provider_id.into()), behavior);
    }

    /// Set the behavior for streaming invocations on `provider_id`.
    pub async fn set_stream_behavior(
        &self,
        modality: Modality,
        provider_id: impl Into<String>,
        behavior: StreamBehavior,
    ) {
        let mut guard = self.state.lock().await;
        let key = (modality, provider_id.into());
        match guard.stream_rules.get_mut(&key) {
            Some(session) => session.behavior = behavior,
            None => {
                guard.stream_rules.insert(key, StreamSession::new(behavior));
            }
        }
    }

    /// Remotely terminate an active `Manual` or `Success` stream session.
    pub async fn kill_stream(&self, modality: Modality, provider_id: &str) {
        let mut guard = self.state.lock().await;
        if let Some(session) = guard.stream_rules.get_mut(&(modality, provider_id.to_string()))
            && let Some(tx) = session.kill_switch.take()
        {
            let _ = tx.send(());
        }
    }

    /// Push a single chunk into an active `Manual` stream session.
    ///
    /// Returns `true` if the chunk was queued, `false` if no `Manual` session
    /// is currently active or its channel has already closed.
    pub async fn push_chunk(&self, modality: Modality, provider_id: &str, chunk: StreamChunk) -> bool {
        let tx_opt = {
            let mut guard = self.state.lock().await;
            guard
                .stream_rules
                .get_mut(&(modality, provider_id.to_string()))
                .and_then(|s| s.manual_tx.clone())
        };
        if let Some(tx) = tx_opt {
            tx.send(chunk).await.is_ok()
        } else {
            false
        }
    }

    /// Return a copy of the invocation log for `provider_id`.
    pub async fn invocation_log(
        &self,
        modality: Modality,
        provider_id: &str,
    ) -> Vec<InvocationRequest> {
        let guard = self.state.lock().await;
        guard
            .invocation_log
            .get(&(modality, provider_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Clear all configured behaviors and the invocation log.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.invoke_rules.clear();
        guard.stream_rules.clear();
        guard.invocation_log.clear();
    }
}

/// An adapter that defers all behavior to an external [`DynamicMockController`].
pub struct DynamicMockAdapter {
    provider_id: String,
    modality: Modality,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockAdapter {
    /// Create a new dynamic mock adapter and its controller.
    #[must_use]
    pub fn new_with_controller(
        provider_id: impl Into<String>,
        modality: Modality,
    ) -> (Arc<dyn Adapter>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self {
            provider_id: provider_id.into(),
            modality,
            state,
        });
        (me as Arc<dyn Adapter>, controller)
    }

    fn key(&self) -> (Modality, String) {
        (self.modality, self.provider_id.clone())
    }
}

#[async_trait]
impl Adapter for DynamicMockAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError> {
        request.validate()?;
        {
            let mut guard = self.state.lock().await;
            guard
                .invocation_log
                .entry(self.key())
                .or_default()
                .push(request.clone());
        }

        let behavior = {
            let guard = self.state.lock().await;
            guard.invoke_rules.get(&self.key()).cloned()
        };

        match behavior {
            Some(MockBehavior::Return(outcome)) => Ok(outcome),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(RsppError::UnknownProvider {
                modality: self.modality.to_string(),
                provider_id: self.provider_id.clone(),
            }),
        }
    }

    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        Some(self)
    }
}

#[async_trait]
impl StreamingAdapter for DynamicMockAdapter {
    async fn invoke_stream(
        &self,
        request: &InvocationRequest,
        observer: &mut dyn StreamObserver,
    ) -> Result<Outcome, RsppError> {
        request.validate()?;
        {
            let mut guard = self.state.lock().await;
            guard
                .invocation_log
                .entry(self.key())
                .or_default()
                .push(request.clone());
        }

        let behavior = {
            let guard = self.state.lock().await;
            guard.stream_rules.get(&self.key()).map(|s| s.behavior.clone())
        };

        match behavior {
            Some(StreamBehavior::Fail(e)) => Err(e),
            Some(StreamBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(StreamBehavior::Success(chunks, outcome)) => {
                let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
                {
                    let mut guard = self.state.lock().await;
                    let entry = guard
                        .stream_rules
                        .entry(self.key())
                        .or_insert_with(|| StreamSession::new(StreamBehavior::Success(Vec::new(), plain_success())));
                    entry.kill_switch = Some(kill_tx);
                    entry.manual_tx = None;
                }

                for chunk in chunks {
                    if kill_rx.try_recv().is_ok() {
                        return Err(RsppError::Observer("mock stream killed".to_string()));
                    }
                    observer.on_chunk(&chunk).await?;
                }
                Ok(outcome)
            }
            Some(StreamBehavior::Manual) => {
                let (tx, mut rx) = mpsc::channel::<StreamChunk>(64);
                let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
                {
                    let mut guard = self.state.lock().await;
                    let entry = guard
                        .stream_rules
                        .entry(self.key())
                        .or_insert_with(|| StreamSession::new(StreamBehavior::Manual));
                    entry.kill_switch = Some(kill_tx);
                    entry.manual_tx = Some(tx);
                }

                loop {
                    tokio::select! {
                        biased;
                        _ = &mut kill_rx => {
                            return Err(RsppError::Observer("mock stream killed".to_string()));
                        }
                        maybe_chunk = rx.recv() => {
                            match maybe_chunk {
                                Some(chunk) => {
                                    let terminal = matches!(
                                        chunk.kind,
                                        rspp_core::StreamChunkKind::Final | rspp_core::StreamChunkKind::Error
                                    );
                                    observer.on_chunk(&chunk).await?;
                                    if terminal {
                                        return Ok(plain_success());
                                    }
                                }
                                None => return Ok(plain_success()),
                            }
                        }
                    }
                }
            }
            None => Err(RsppError::UnknownProvider {
                modality: self.modality.to_string(),
                provider_id: self.provider_id.clone(),
            }),
        }
    }
}
