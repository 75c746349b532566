//! A single project conversation: configuration, history and session factory.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::{
    error::Result,
    events::{ProjectDataChanged, SessionEvent},
    history::{ConversationHistory, SharedHistory, TRANSMISSION_WINDOW},
    reconcile::{ProjectRefresher, Reconciler, SETTLE_DELAY},
    session::{SessionDeps, StreamSession},
    side_effects::{MarkerClassifier, SideEffectDetector},
    transport::Transport,
};

/// Ceiling for a whole exchange, measured from `start()`
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a product assistant. You help the user write, \
refine and organize the user stories of the selected project. When you create, update or delete \
a user story with your tools, confirm it explicitly in your answer.";

/// Conversation configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model to use
    pub model: String,
    /// Credential forwarded in the initiation call
    pub api_key: Option<String>,
    /// Project whose stories the assistant works on
    pub project_id: Option<String>,
    /// System message, fixed for the lifetime of the conversation
    pub system_prompt: String,
    /// Per-session ceiling
    pub timeout: Duration,
    /// Wait before reconciliation
    pub settle_delay: Duration,
    /// Non-system messages sent upstream
    pub window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            project_id: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            settle_delay: SETTLE_DELAY,
            window: TRANSMISSION_WINDOW,
        }
    }
}

/// One project conversation. Hands out at most one active [`StreamSession`] at a time.
pub struct Conversation {
    config: ChatConfig,
    history: SharedHistory,
    transport: Arc<dyn Transport>,
    detector: Arc<dyn SideEffectDetector>,
    reconciler: Arc<Reconciler>,
    event_tx: broadcast::Sender<SessionEvent>,
    active: Arc<AtomicBool>,
}

impl Conversation {
    /// Create a conversation with the default marker-based side-effect detector
    pub fn new(
        config: ChatConfig,
        transport: Arc<dyn Transport>,
        refresher: Arc<dyn ProjectRefresher>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let history =
            ConversationHistory::with_window(config.system_prompt.clone(), config.window).shared();
        let reconciler = Arc::new(Reconciler::new(refresher, config.settle_delay));
        Self {
            config,
            history,
            transport,
            detector: Arc::new(MarkerClassifier),
            reconciler,
            event_tx,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the side-effect detector
    pub fn with_detector(mut self, detector: Arc<dyn SideEffectDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Subscribe to project change notifications
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ProjectDataChanged> {
        self.reconciler.subscribe()
    }

    /// Shared handle to the transcript, for rendering
    pub fn history(&self) -> SharedHistory {
        Arc::clone(&self.history)
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.config.api_key = api_key;
    }

    pub fn set_project(&mut self, project_id: Option<String>) {
        self.config.project_id = project_id;
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// Whether a session is currently active
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether a send would pass its preconditions right now
    pub fn can_send(&self, text: &str) -> bool {
        !text.trim().is_empty()
            && self.config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            && self.config.project_id.is_some()
            && !self.is_busy()
    }

    /// Create an idle session bound to this conversation
    pub fn session(&self) -> StreamSession {
        StreamSession::new(
            self.config.clone(),
            SessionDeps {
                history: Arc::clone(&self.history),
                transport: Arc::clone(&self.transport),
                detector: Arc::clone(&self.detector),
                reconciler: Arc::clone(&self.reconciler),
                event_tx: self.event_tx.clone(),
                active: Arc::clone(&self.active),
            },
        )
    }

    /// Start a session and drive it to a terminal state
    pub async fn send(&self, text: &str) -> Result<StreamSession> {
        let mut session = self.session();
        session.start(text).await?;
        session.run().await;
        Ok(session)
    }
}
