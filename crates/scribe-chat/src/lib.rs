//! scribe-chat: streaming chat exchange engine
//!
//! This crate drives one project conversation with a remote assistant:
//! the bounded history, the per-send stream session, error classification,
//! and the reconciliation that follows an assistant-side mutation.

pub mod accumulator;
pub mod conversation;
pub mod error;
pub mod events;
pub mod failure;
pub mod handle;
pub mod history;
pub mod reconcile;
pub mod session;
pub mod side_effects;
pub mod transport;

pub use accumulator::DeltaAccumulator;
pub use conversation::{ChatConfig, Conversation};
pub use error::{Error, HistoryError, PreconditionError, Result};
pub use events::{ProjectDataChanged, SessionEvent};
pub use failure::{ClassifiedError, ErrorCategory, classify_error};
pub use handle::SessionHandle;
pub use history::{ConversationHistory, SharedHistory};
pub use reconcile::{ProjectRefresher, Reconciler};
pub use session::{SessionState, StreamSession};
pub use side_effects::{MarkerClassifier, SideEffectDetector, SideEffectKind};
pub use transport::{ApiTransport, Transport};
