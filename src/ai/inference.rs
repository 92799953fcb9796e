use serde::{Deserialize, Serialize};

use crate::domain::Decision;

use super::OracleError;

const SYSTEM_PROMPT: &str = "You are an email sorting agent. Output JSON only.";
const DELETE_SYNONYMS: [&str; 3] = ["DELETE", "SPAM", "TRASH"];
const DEFAULT_REASON: &str = "classifier verdict";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Everything the oracle is told about one message.
#[derive(Debug, Clone)]
pub struct ClassificationInput<'a> {
    pub address: &'a str,
    pub domain: &'a str,
    pub subject: &'a str,
    pub snippet: &'a str,
    pub labels: &'a [String],
}

pub fn build_messages(input: &ClassificationInput<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".into(),
            content: SYSTEM_PROMPT.into(),
        },
        ChatMessage {
            role: "user".into(),
            content: build_prompt(input),
        },
    ]
}

fn build_prompt(input: &ClassificationInput<'_>) -> String {
    let labels = serde_json::to_string(input.labels).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Analyze this email. Trust the SENDER DOMAIN above the subject.

METADATA:
- From: {address} (Domain: {domain})
- Subject: {subject}
- Snippet: {snippet}

YOUR LABELS: {labels}

CRITICAL RULES:
1. CHECK THE SENDER DOMAIN FIRST.
   - "Government" is ONLY for official domains (.gov, .gc.ca).
   - Quora/Reddit/Social notifications are DELETE.
2. "Finance" is for bills/banks.
3. If it's useless promo/spam, output "DELETE".
4. If it doesn't fit a known label, INVENT a short 1-word label (e.g. "Gaming", "Medical").
5. If it needs the user's attention in the inbox, output "INBOX".

Output valid JSON only:
{{
  "reasoning": "Sender is X, Subject is Y...",
  "category": "LabelName" or "DELETE"
}}"#,
        address = input.address,
        domain = input.domain,
        subject = input.subject,
        snippet = input.snippet,
    )
}

/// Validated oracle answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleVerdict {
    pub category: String,
    pub reason: String,
}

impl OracleVerdict {
    pub fn into_decision(self) -> Decision {
        let upper = self.category.to_uppercase();
        if DELETE_SYNONYMS.contains(&upper.as_str()) {
            Decision::delete(self.reason)
        } else if upper == "INBOX" {
            Decision::skip("classified as inbox")
        } else {
            Decision::label(self.category, self.reason)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    category: Option<String>,
    reasoning: Option<String>,
    response: Option<String>,
}

/// Extracts the outermost `{...}` span from free text and validates it.
pub fn parse_verdict(content: &str) -> Result<OracleVerdict, OracleError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => return Err(OracleError::Unparseable("no JSON object found".to_string())),
    };

    let raw: RawVerdict =
        serde_json::from_str(json).map_err(|err| OracleError::Unparseable(err.to_string()))?;

    let category = raw
        .category
        .map(|category| category.trim().to_string())
        .filter(|category| !category.is_empty())
        .ok_or(OracleError::MissingCategory)?;

    let reason = raw
        .reasoning
        .or(raw.response)
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());

    Ok(OracleVerdict { category, reason })
}
