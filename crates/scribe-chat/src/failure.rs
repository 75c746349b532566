//! Maps raw failure text to a stable category and a user-facing message

use serde::{Deserialize, Serialize};

/// Canonical failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    RateLimited,
    QuotaExceeded,
    InvalidApiKey,
    InsufficientQuota,
    ModelUnavailable,
    ContextTooLong,
    Unauthorized,
    Forbidden,
    ServerError,
    Timeout,
    ConnectionFailed,
    Unclassified,
}

impl ErrorCategory {
    /// The message shown for this category. `None` for [`ErrorCategory::Unclassified`],
    /// which surfaces the raw text instead.
    pub fn canonical_message(&self) -> Option<&'static str> {
        let message = match self {
            ErrorCategory::RateLimited => {
                "Rate limit reached. Wait a moment before sending another message."
            }
            ErrorCategory::QuotaExceeded => "API quota exceeded. Check your plan and usage limits.",
            ErrorCategory::InvalidApiKey => "Invalid API key. Check the key in your settings.",
            ErrorCategory::InsufficientQuota => {
                "Insufficient quota. Add credits to your account to continue."
            }
            ErrorCategory::ModelUnavailable => {
                "The selected model is not available. Choose another model."
            }
            ErrorCategory::ContextTooLong => {
                "The conversation is too long for this model. Start a new conversation."
            }
            ErrorCategory::Unauthorized => "Authentication failed. Check your API key.",
            ErrorCategory::Forbidden => "Access denied for this resource.",
            ErrorCategory::ServerError => "The server encountered an error. Try again later.",
            ErrorCategory::Timeout => "The response took too long. Try again.",
            ErrorCategory::ConnectionFailed => {
                "Connection to the server failed. Check your network and try again."
            }
            ErrorCategory::Unclassified => return None,
        };
        Some(message)
    }
}

/// A failure after classification: category plus the message to surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ClassifiedError {
    fn canonical(category: ErrorCategory, raw: &str) -> Self {
        let message = category
            .canonical_message()
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string());
        Self { category, message }
    }

    pub fn timeout() -> Self {
        Self::canonical(ErrorCategory::Timeout, "")
    }

    pub fn connection_failed() -> Self {
        Self::canonical(ErrorCategory::ConnectionFailed, "")
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Raw substrings checked in priority order; first hit wins
const PATTERNS: &[(&[&str], ErrorCategory)] = &[
    (&["rate_limit"], ErrorCategory::RateLimited),
    (&["quota_exceeded"], ErrorCategory::QuotaExceeded),
    (&["invalid_api_key"], ErrorCategory::InvalidApiKey),
    (&["insufficient_quota"], ErrorCategory::InsufficientQuota),
    (&["model_not_found"], ErrorCategory::ModelUnavailable),
    (&["context_length_exceeded"], ErrorCategory::ContextTooLong),
    (&["401", "Unauthorized"], ErrorCategory::Unauthorized),
    (&["403", "Forbidden"], ErrorCategory::Forbidden),
    (&["429", "Too Many Requests"], ErrorCategory::RateLimited),
    (&["500", "Internal Server Error"], ErrorCategory::ServerError),
];

/// Classify raw upstream failure text
pub fn classify_error(raw: &str) -> ClassifiedError {
    let category = PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| raw.contains(n)))
        .map(|(_, category)| *category)
        .unwrap_or(ErrorCategory::Unclassified);

    ClassifiedError::canonical(category, raw)
}

/// Classify a wire-layer error. Failures below HTTP map to `ConnectionFailed`.
pub fn classify_failure(error: &scribe_ai::Error) -> ClassifiedError {
    if error.is_connection_failure() {
        return ClassifiedError::connection_failed();
    }
    classify_error(&error.to_string())
}
