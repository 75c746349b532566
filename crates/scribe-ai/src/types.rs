//! Core types for the chat wire protocol

use serde::{Deserialize, Serialize};

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message, as sent upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Body of the outbound initiation call that kicks off generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationRequest {
    /// Model identifier
    pub model: String,
    /// Credential forwarded to the backend
    pub openai_api_key: String,
    /// Bounded transmission payload (system message first)
    pub history: Vec<Message>,
    /// Whether the backend may call its project tools
    pub tools: bool,
    /// Correlates the initiation call with the inbound stream
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_shape() {
        let value = serde_json::to_value(Message::user("bonjour")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "bonjour"}));
    }

    #[test]
    fn test_initiation_request_wire_shape() {
        let request = InitiationRequest {
            model: "gpt-4o".into(),
            openai_api_key: "sk-test".into(),
            history: vec![Message::system("sys"), Message::user("hi")],
            tools: true,
            session_id: Some("abc".into()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["openaiApiKey"], "sk-test");
        assert_eq!(value["tools"], true);
        assert_eq!(value["sessionId"], "abc");
        assert_eq!(value["history"][0]["role"], "system");
        assert_eq!(value["history"][1]["content"], "hi");
    }

    #[test]
    fn test_initiation_request_omits_missing_session_id() {
        let request = InitiationRequest {
            model: "gpt-4o".into(),
            openai_api_key: "sk-test".into(),
            history: vec![],
            tools: true,
            session_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("sessionId").is_none());
    }
}
