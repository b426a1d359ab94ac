use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{ChatRequest, ChatResponse, MessageRole, TriageAssessment, TriageError};

const REQUIRES_DOCTOR_MARKER: &str = "###requiresDoctor=true###";

const SYSTEM_PROMPT: &str = "You are a medical triage assistant. For any symptoms that:\n\
1. Persist for more than a few days\n\
2. Cause significant pain or discomfort\n\
3. Affect daily activities or sleep\n\
4. Could indicate a serious condition\n\
\n\
Respond with: ###requiresDoctor=true### followed by your message explaining why \
a doctor consultation is recommended.\n\
\n\
For minor issues, provide self-care advice first, but escalate if symptoms persist.\n\
\n\
Once you have gathered enough information, append a single JSON object on its own line:\n\
{\"specialty\": \"...\", \"urgency\": \"low|medium|high\", \"symptoms\": [\"...\"], \
\"recommend_consultation\": true|false}";

pub struct TriageAssistant {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl TriageAssistant {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// One chat turn: running history plus the latest patient message go up,
    /// the reply comes back with an optional structured assessment parsed
    /// out of it. A reply that fails to parse is treated as a plain
    /// continuation message.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TriageError> {
        if !self.is_configured() {
            return Err(TriageError::NotConfigured);
        }

        let mut messages = vec![json!({
            "role": "system",
            "content": SYSTEM_PROMPT
        })];

        for entry in &request.history {
            // The system prompt is fixed on this side; drop any system
            // entries a client tries to replay.
            if entry.role == MessageRole::System {
                continue;
            }
            messages.push(json!({
                "role": entry.role.clone(),
                "content": entry.content.clone()
            }));
        }

        messages.push(json!({
            "role": "user",
            "content": request.message
        }));

        debug!("Forwarding {} messages to chat completion API", messages.len());

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages
            }))
            .send()
            .await
            .map_err(|e| TriageError::UpstreamError(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| TriageError::UpstreamError(e.to_string()))?;

        if !status.is_success() {
            warn!("Chat completion API returned {}: {}", status, body);
            return Err(TriageError::UpstreamError(format!(
                "upstream returned {}",
                status
            )));
        }

        let reply = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(TriageError::EmptyReply)?;

        let (message, assessment, requires_doctor) = interpret_reply(reply);

        if let Some(ref a) = assessment {
            info!(
                "Assessment gathered: specialty={}, urgency={}, recommend={}",
                a.specialty, a.urgency, a.recommend_consultation
            );
        }

        Ok(ChatResponse {
            message,
            assessment,
            requires_doctor,
        })
    }
}

/// Strip the escalation marker and pull a trailing JSON assessment out of
/// the assistant's reply, tolerating replies that contain neither.
pub fn interpret_reply(reply: &str) -> (String, Option<TriageAssessment>, bool) {
    let requires_doctor = reply.contains(REQUIRES_DOCTOR_MARKER);
    let cleaned = reply.replace(REQUIRES_DOCTOR_MARKER, "");

    let assessment = extract_assessment(&cleaned);

    // When an assessment parsed, drop its JSON line from the
    // patient-visible text.
    let message = match assessment {
        Some(_) => strip_json_block(&cleaned),
        None => cleaned.trim().to_string(),
    };

    (message, assessment, requires_doctor)
}

fn extract_assessment(text: &str) -> Option<TriageAssessment> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<TriageAssessment>(&text[start..=end]).ok()
}

fn strip_json_block(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            let mut out = String::new();
            out.push_str(&text[..start]);
            out.push_str(&text[end + 1..]);
            out.trim().to_string()
        }
        _ => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Urgency;

    #[test]
    fn interprets_plain_reply() {
        let (message, assessment, requires_doctor) =
            interpret_reply("How long have you had the headache?");
        assert_eq!(message, "How long have you had the headache?");
        assert!(assessment.is_none());
        assert!(!requires_doctor);
    }

    #[test]
    fn detects_escalation_marker() {
        let (message, _, requires_doctor) =
            interpret_reply("###requiresDoctor=true### Persistent chest pain needs review.");
        assert!(requires_doctor);
        assert!(!message.contains("###"));
        assert_eq!(message, "Persistent chest pain needs review.");
    }

    #[test]
    fn parses_structured_assessment() {
        let reply = "A dermatologist should look at this.\n\
            {\"specialty\": \"Dermatology\", \"urgency\": \"medium\", \
            \"symptoms\": [\"rash\", \"itching\"], \"recommend_consultation\": true}";

        let (message, assessment, _) = interpret_reply(reply);
        let assessment = assessment.expect("assessment should parse");

        assert_eq!(assessment.specialty, "Dermatology");
        assert_eq!(assessment.urgency, Urgency::Medium);
        assert_eq!(assessment.symptoms, vec!["rash", "itching"]);
        assert!(assessment.recommend_consultation);
        assert_eq!(message, "A dermatologist should look at this.");
    }

    #[test]
    fn malformed_json_falls_back_to_plain_message() {
        let reply = "Here is my take {not json at all}";
        let (message, assessment, _) = interpret_reply(reply);
        assert!(assessment.is_none());
        assert_eq!(message, reply);
    }

    #[test]
    fn json_missing_fields_falls_back_to_plain_message() {
        let reply = "Partial: {\"specialty\": \"Dermatology\"}";
        let (_, assessment, _) = interpret_reply(reply);
        assert!(assessment.is_none());
    }
}
