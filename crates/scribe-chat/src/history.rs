//! Conversation history with a bounded transmission window

use parking_lot::RwLock;
use scribe_ai::Message;
use std::sync::Arc;

use crate::error::HistoryError;

/// Number of non-system messages sent upstream
pub const TRANSMISSION_WINDOW: usize = 10;

/// History shared between the active session (writer) and renderers (readers)
pub type SharedHistory = Arc<RwLock<ConversationHistory>>;

/// Ordered message log.
///
/// Index 0 is always the system message. The full transcript is retained for
/// display; only [`transmission_payload`](Self::transmission_payload) is bounded.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    /// Whether the tail is an assistant message still receiving fragments
    assistant_open: bool,
    window: usize,
}

impl ConversationHistory {
    /// Create a history holding only the system message
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_window(system_prompt, TRANSMISSION_WINDOW)
    }

    /// Create a history with a custom transmission window
    pub fn with_window(system_prompt: impl Into<String>, window: usize) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            assistant_open: false,
            window,
        }
    }

    /// Wrap into a [`SharedHistory`]
    pub fn shared(self) -> SharedHistory {
        Arc::new(RwLock::new(self))
    }

    /// Append a message to the tail.
    ///
    /// An assistant message replaces the open assistant tail if there is one,
    /// otherwise it is pushed and becomes the open tail.
    pub fn append(&mut self, message: Message) -> Result<(), HistoryError> {
        if message.is_system() {
            return Err(HistoryError::SystemMessage);
        }

        if message.is_assistant() {
            if self.assistant_open {
                if let Some(tail) = self.messages.last_mut() {
                    tail.content = message.content;
                }
            } else {
                self.messages.push(message);
                self.assistant_open = true;
            }
            return Ok(());
        }

        if self.assistant_open {
            return Err(HistoryError::AssistantOpen);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Close the open assistant message. Returns it if there was one.
    pub fn seal(&mut self) -> Option<&Message> {
        if !self.assistant_open {
            return None;
        }
        self.assistant_open = false;
        self.messages.last()
    }

    /// Remove the open assistant message entirely
    pub fn discard_open(&mut self) -> Option<Message> {
        if !self.assistant_open {
            return None;
        }
        self.assistant_open = false;
        self.messages.pop()
    }

    /// Whether an assistant message is still receiving fragments
    pub fn is_assistant_open(&self) -> bool {
        self.assistant_open
    }

    /// `[system, ...last N non-system messages]`
    pub fn transmission_payload(&self) -> Vec<Message> {
        let non_system = &self.messages[1..];
        let skip = non_system.len().saturating_sub(self.window);

        std::iter::once(&self.messages[0])
            .chain(non_system[skip..].iter())
            .cloned()
            .collect()
    }

    /// Full retained transcript
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The system message
    pub fn system(&self) -> &Message {
        &self.messages[0]
    }

    /// Last message in the transcript
    pub fn last(&self) -> &Message {
        // index 0 always exists
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system message is present
    pub fn is_empty(&self) -> bool {
        self.messages.len() == 1
    }
}
