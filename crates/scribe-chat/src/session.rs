//! Stream session: drives one send from user input to a terminal state

use futures::{StreamExt, future::BoxFuture};
use scribe_ai::{InitiationRequest, Message, RawEventStream, StreamEvent};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{
    accumulator::DeltaAccumulator,
    conversation::ChatConfig,
    error::{PreconditionError, Result},
    events::SessionEvent,
    failure::{ClassifiedError, classify_error, classify_failure},
    handle::SessionHandle,
    history::SharedHistory,
    reconcile::Reconciler,
    side_effects::SideEffectDetector,
    transport::Transport,
};

/// Lifecycle of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingConnection,
    Streaming,
    Finalizing,
    Finished,
    Errored(ClassifiedError),
    Cancelled,
}

impl SessionState {
    /// Finished, Errored or Cancelled
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished | SessionState::Errored(_) | SessionState::Cancelled
        )
    }

    /// AwaitingConnection, Streaming or Finalizing
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingConnection | SessionState::Streaming | SessionState::Finalizing
        )
    }
}

/// Collaborators a session needs, passed in explicitly
pub struct SessionDeps {
    pub history: SharedHistory,
    pub transport: Arc<dyn Transport>,
    pub detector: Arc<dyn SideEffectDetector>,
    pub reconciler: Arc<Reconciler>,
    pub event_tx: broadcast::Sender<SessionEvent>,
    /// Set while a session of the conversation is active
    pub active: Arc<AtomicBool>,
}

/// What woke the run loop
enum Step {
    Cancelled,
    TimedOut,
    Initiated(scribe_ai::Result<()>),
    Event(Option<scribe_ai::Result<String>>),
}

/// One logical send. Single use: once terminal it is never restarted.
pub struct StreamSession {
    id: String,
    config: ChatConfig,
    deps: SessionDeps,
    state: SessionState,
    accumulator: DeltaAccumulator,
    stream: Option<RawEventStream>,
    initiation: Option<BoxFuture<'static, scribe_ai::Result<()>>>,
    handle: SessionHandle,
    started_at: Option<Instant>,
    mutation_observed: bool,
    holds_slot: bool,
    reconciliation: Option<JoinHandle<()>>,
}

impl StreamSession {
    pub fn new(config: ChatConfig, deps: SessionDeps) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let handle = SessionHandle::new(&id);
        Self {
            id,
            config,
            deps,
            state: SessionState::Idle,
            accumulator: DeltaAccumulator::new(),
            stream: None,
            initiation: None,
            handle,
            started_at: None,
            mutation_observed: false,
            holds_slot: false,
            reconciliation: None,
        }
    }

    /// Correlation id sent upstream and expected back on the stream
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Cumulative assistant text received so far
    pub fn text(&self) -> &str {
        self.accumulator.text()
    }

    /// Whether the finalized message announced a mutation. False until finalized.
    pub fn mutation_observed(&self) -> bool {
        self.mutation_observed
    }

    /// Cloneable cancel handle
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// The detached reconciliation task, if one was spawned
    pub fn take_reconciliation(&mut self) -> Option<JoinHandle<()>> {
        self.reconciliation.take()
    }

    /// Append the user message, open the stream and prepare the initiation call.
    ///
    /// Only precondition failures are returned as errors; a transport that cannot
    /// be opened moves the session to `Errored`.
    pub async fn start(&mut self, user_text: &str) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(PreconditionError::NotIdle.into());
        }
        if user_text.trim().is_empty() {
            return Err(PreconditionError::EmptyMessage.into());
        }
        let api_key = self
            .config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PreconditionError::MissingApiKey)?;
        if self.config.project_id.is_none() {
            return Err(PreconditionError::NoProjectSelected.into());
        }
        if self
            .deps
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PreconditionError::SessionActive.into());
        }
        self.holds_slot = true;

        let history = {
            let mut history = self.deps.history.write();
            if let Err(e) = history.append(Message::user(user_text)) {
                drop(history);
                self.release_slot();
                return Err(e.into());
            }
            history.transmission_payload()
        };

        self.state = SessionState::AwaitingConnection;
        self.started_at = Some(Instant::now());
        tracing::info!(
            session_id = %self.id,
            payload_len = history.len(),
            "Session started"
        );
        let _ = self.deps.event_tx.send(SessionEvent::Started {
            session_id: self.id.clone(),
        });

        match self.deps.transport.connect(&self.id).await {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Failed to open event stream");
                self.fail(classify_failure(&e));
                return Ok(());
            }
        }

        let request = InitiationRequest {
            model: self.config.model.clone(),
            openai_api_key: api_key,
            history,
            tools: true,
            session_id: Some(self.id.clone()),
        };
        let transport = Arc::clone(&self.deps.transport);
        self.initiation = Some(Box::pin(async move { transport.initiate(request).await }));

        Ok(())
    }

    /// Drive the session until it reaches a terminal state.
    ///
    /// Multiplexes cancellation, the deadline, the initiation call and the
    /// inbound stream. Returns immediately for an idle or terminal session.
    pub async fn run(&mut self) -> &SessionState {
        let cancel = self.handle.cancel.clone();
        let deadline = match self.started_at {
            Some(started_at) => started_at + self.config.timeout,
            None => return &self.state,
        };

        while self.state.is_active() {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Step::TimedOut,
                result = poll_initiation(&mut self.initiation) => Step::Initiated(result),
                event = next_event(&mut self.stream) => Step::Event(event),
            };

            match step {
                Step::Cancelled => self.cancel(),
                Step::TimedOut => self.time_out(),
                Step::Initiated(Ok(())) => {
                    self.initiation = None;
                    tracing::debug!(session_id = %self.id, "Initiation accepted");
                }
                Step::Initiated(Err(e)) => {
                    self.initiation = None;
                    tracing::warn!(session_id = %self.id, error = %e, "Initiation call failed");
                    self.fail(classify_failure(&e));
                }
                Step::Event(Some(Ok(data))) => self.handle_event(&data),
                Step::Event(Some(Err(e))) => {
                    tracing::warn!(session_id = %self.id, error = %e, "Event stream failed");
                    self.fail(classify_failure(&e));
                }
                Step::Event(None) => {
                    tracing::warn!(session_id = %self.id, "Event stream ended before a terminal signal");
                    self.fail(ClassifiedError::connection_failed());
                }
            }
        }

        &self.state
    }

    /// Apply one raw inbound payload
    pub fn handle_event(&mut self, data: &str) {
        if !self.state.is_active() {
            tracing::debug!(session_id = %self.id, state = ?self.state, "Event ignored");
            return;
        }

        let event = match StreamEvent::parse(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Skipping unparseable stream event");
                return;
            }
        };

        if let Some(echoed) = event.session_id() {
            if echoed != self.id {
                tracing::warn!(
                    session_id = %self.id,
                    echoed,
                    "Ignoring event for another session"
                );
                return;
            }
        }

        match event {
            StreamEvent::Connected { .. } => {
                tracing::debug!(session_id = %self.id, "Stream handshake");
            }
            StreamEvent::Chunk {
                delta,
                finish_reason,
                ..
            } => {
                if let Some(fragment) = delta {
                    self.apply_fragment(&fragment);
                }
                if let Some(reason) = finish_reason {
                    self.finalize(&reason);
                }
            }
            StreamEvent::Error { message } => {
                tracing::warn!(session_id = %self.id, raw = %message, "Upstream error");
                self.fail(classify_error(&message));
            }
            StreamEvent::Unknown => {
                tracing::debug!(session_id = %self.id, "Unrecognized stream event");
            }
        }
    }

    /// User-initiated cancel. No-op outside the active states.
    pub fn cancel(&mut self) {
        if !self.state.is_active() {
            tracing::debug!(session_id = %self.id, state = ?self.state, "Cancel ignored");
            return;
        }
        self.handle.cancel();
        self.terminate(SessionState::Cancelled);
    }

    fn time_out(&mut self) {
        if !self.state.is_active() {
            return;
        }
        self.terminate(SessionState::Errored(ClassifiedError::timeout()));
    }

    fn fail(&mut self, error: ClassifiedError) {
        if !self.state.is_active() {
            return;
        }
        self.terminate(SessionState::Errored(error));
    }

    /// Shared teardown for cancel, timeout and errors
    fn terminate(&mut self, next: SessionState) {
        self.close_transport();
        if self.deps.history.write().discard_open().is_some() {
            tracing::debug!(session_id = %self.id, "Discarded partial assistant message");
        }
        self.release_slot();
        self.state = next;

        let event = match &self.state {
            SessionState::Errored(error) => {
                tracing::warn!(
                    session_id = %self.id,
                    category = ?error.category,
                    "Session errored"
                );
                SessionEvent::Errored {
                    error: error.clone(),
                }
            }
            _ => {
                tracing::info!(session_id = %self.id, "Session cancelled");
                SessionEvent::Cancelled
            }
        };
        let _ = self.deps.event_tx.send(event);
    }

    fn apply_fragment(&mut self, fragment: &str) {
        let content = match self.accumulator.apply_delta(fragment) {
            Ok(content) => content.to_string(),
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Fragment dropped");
                return;
            }
        };

        if self.state == SessionState::AwaitingConnection {
            self.state = SessionState::Streaming;
        }

        if let Err(e) = self
            .deps
            .history
            .write()
            .append(Message::assistant(content.clone()))
        {
            tracing::warn!(session_id = %self.id, error = %e, "History rejected fragment");
        }
        let _ = self
            .deps
            .event_tx
            .send(SessionEvent::MessageUpdate { content });
    }

    fn finalize(&mut self, finish_reason: &str) {
        self.state = SessionState::Finalizing;

        let text = match self.accumulator.finalize() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Finalize called twice");
                self.accumulator.text().to_string()
            }
        };

        {
            let mut history = self.deps.history.write();
            if text.is_empty() {
                history.discard_open();
            } else {
                history.seal();
            }
        }

        self.mutation_observed = self.deps.detector.detect(&text);
        if self.mutation_observed {
            tracing::debug!(
                session_id = %self.id,
                kinds = ?self.deps.detector.matched(&text),
                "Mutation markers found"
            );
        }
        self.close_transport();
        self.release_slot();
        self.state = SessionState::Finished;

        tracing::info!(
            session_id = %self.id,
            finish_reason,
            mutation_observed = self.mutation_observed,
            elapsed_ms = self.started_at.map(|t| t.elapsed().as_millis() as u64).unwrap_or(0),
            "Session finished"
        );
        let _ = self.deps.event_tx.send(SessionEvent::Finished {
            message: Message::assistant(text),
            mutation_observed: self.mutation_observed,
        });

        if self.mutation_observed {
            if let Some(project_id) = &self.config.project_id {
                self.reconciliation = Some(self.deps.reconciler.spawn(project_id.clone()));
            }
        }
    }

    /// Drop the stream and any pending initiation call. Safe to call repeatedly.
    fn close_transport(&mut self) {
        self.initiation = None;
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!(session_id = %self.id, "Transport closed");
        }
    }

    fn release_slot(&mut self) {
        if self.holds_slot {
            self.holds_slot = false;
            self.deps.active.store(false, Ordering::Release);
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.state.is_active() {
            self.close_transport();
            self.deps.history.write().discard_open();
        }
        self.release_slot();
    }
}

async fn poll_initiation(
    slot: &mut Option<BoxFuture<'static, scribe_ai::Result<()>>>,
) -> scribe_ai::Result<()> {
    match slot {
        Some(call) => call.await,
        None => std::future::pending().await,
    }
}

async fn next_event(stream: &mut Option<RawEventStream>) -> Option<scribe_ai::Result<String>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
