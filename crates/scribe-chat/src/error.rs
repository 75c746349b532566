//! Error types for scribe-chat

use thiserror::Error;

/// Result type alias using scribe-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during chat operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer
    #[error(transparent)]
    Ai(#[from] scribe_ai::Error),

    /// A send was attempted while its preconditions do not hold
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The history rejected a write
    #[error(transparent)]
    History(#[from] HistoryError),

    /// A delta arrived after the message was finalized
    #[error("Assistant message already finalized")]
    AccumulatorFinalized,

    /// A reconciliation collaborator failed
    #[error("Refresh failed: {0}")]
    Refresh(String),
}

/// Why a send cannot start. Surfaced to the UI as a disabled action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("No API key configured")]
    MissingApiKey,

    #[error("No project selected")]
    NoProjectSelected,

    #[error("Session already started")]
    NotIdle,

    #[error("Another message is still being answered")]
    SessionActive,
}

/// Rejected history writes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("The system message is fixed at construction")]
    SystemMessage,

    #[error("An assistant message is still open")]
    AssistantOpen,
}
