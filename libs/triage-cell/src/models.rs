use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Running transcript so the model keeps context between turns.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub assessment: Option<TriageAssessment>,
    pub requires_doctor: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::High => write!(f, "high"),
        }
    }
}

/// Structured outcome the assistant emits once it has gathered enough
/// information to route the patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub specialty: String,
    pub urgency: Urgency,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub recommend_consultation: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Triage assistant not configured")]
    NotConfigured,

    #[error("Chat completion request failed: {0}")]
    UpstreamError(String),

    #[error("Chat completion returned no content")]
    EmptyReply,
}
