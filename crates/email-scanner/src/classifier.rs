//! Classifier abstraction and the Claude-backed implementation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared_types::{Category, ClassifierVerdict};

use crate::config::BusinessProfile;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 256;

/// The classifier only ever sees a bounded excerpt, both to bound cost and to
/// avoid shipping whole mailboxes to the API.
const MAX_EXCERPT_CHARS: usize = 500;

/// External judgment of one message's sender.
#[allow(async_fn_in_trait)]
pub trait Classifier {
    async fn classify(
        &self,
        sender_name: &str,
        sender_email: &str,
        subject: &str,
        excerpt: &str,
    ) -> Result<ClassifierVerdict>;
}

pub struct ClaudeClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    system_prompt: String,
}

// -- Messages API wire types --

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<MessageParam>,
}

#[derive(Serialize)]
struct MessageParam {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl ClaudeClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, business: &BusinessProfile) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: build_system_prompt(business),
        }
    }
}

impl Classifier for ClaudeClassifier {
    async fn classify(
        &self,
        sender_name: &str,
        sender_email: &str,
        subject: &str,
        excerpt: &str,
    ) -> Result<ClassifierVerdict> {
        let user_prompt = build_user_prompt(sender_name, sender_email, subject, excerpt);

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &self.system_prompt,
            messages: vec![MessageParam {
                role: "user",
                content: user_prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to call classifier API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("classifier API returned {status}: {body}");
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to decode classifier API response")?;

        let text = parsed
            .content
            .first()
            .map(|block| block.text.as_str())
            .unwrap_or_default();

        let json = strip_code_fences(text);
        serde_json::from_str(json)
            .with_context(|| format!("classifier returned unparseable JSON: {json}"))
    }
}

fn build_system_prompt(business: &BusinessProfile) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are an email classifier for {name}.\n\n\
         {description}\n\n\
         Your job is to analyze incoming emails and determine if the sender should be added \
         to the business contact/email list.\n\n\
         You should ADD contacts who are:\n\
         - Requesting services, quotes, or appointments\n\
         - Inquiring about event bookings\n\
         - Interested in lessons or workshops\n\
         - Vendors or partners reaching out for legitimate collaboration\n\
         - Genuinely interested in the business\n\n\
         You should NOT add:\n\
         - Spam or scam emails\n\
         - Automated notifications (shipping, receipts, account alerts)\n\
         - Marketing/newsletter emails from other businesses\n\
         - Personal emails from friends/family (unless business-related)\n\
         - Customer support responses from companies\n\
         - Social media notifications\n\n\
         Valid classifications: {categories}\n\n\
         Respond ONLY with valid JSON. No other text.",
        name = business.name,
        description = business.description,
    )
}

fn build_user_prompt(sender_name: &str, sender_email: &str, subject: &str, excerpt: &str) -> String {
    let sender_name = if sender_name.is_empty() {
        "(unknown)"
    } else {
        sender_name
    };
    let subject = if subject.is_empty() {
        "(no subject)"
    } else {
        subject
    };
    let excerpt = if excerpt.is_empty() {
        "(no body)".to_string()
    } else {
        excerpt.chars().take(MAX_EXCERPT_CHARS).collect()
    };

    format!(
        "Analyze this email and determine if the sender should be added to the business contact list.\n\n\
         From: {sender_name} <{sender_email}>\n\
         Subject: {subject}\n\
         Body preview:\n{excerpt}\n\n\
         Respond with JSON:\n\
         {{\n  \"should_add\": true/false,\n  \"classification\": \"<category>\",\n  \
         \"confidence\": \"high\" | \"medium\" | \"low\",\n  \"reason\": \"<brief explanation>\"\n}}"
    )
}

/// Models sometimes wrap the JSON in a Markdown code fence; strip it.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_plain_text() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_bare_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_with_language() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_unterminated() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_fenced_verdict_parses() {
        let text = "```json\n{\"should_add\": true, \"classification\": \"booking_inquiry\", \"confidence\": \"high\", \"reason\": \"wants a booking\"}\n```";
        let verdict: ClassifierVerdict =
            serde_json::from_str(strip_code_fences(text)).expect("should parse");
        assert!(verdict.should_add);
        assert_eq!(verdict.classification, "booking_inquiry");
    }

    #[test]
    fn test_system_prompt_names_all_categories() {
        let business = BusinessProfile {
            name: "Example Studio".to_string(),
            description: "A small services business.".to_string(),
            own_addresses: vec![],
        };
        let prompt = build_system_prompt(&business);
        assert!(prompt.contains("Example Studio"));
        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()), "missing {category}");
        }
    }

    #[test]
    fn test_user_prompt_truncates_excerpt() {
        let excerpt = "x".repeat(2000);
        let prompt = build_user_prompt("Jane", "jane@x.com", "Hi", &excerpt);
        assert!(prompt.len() < 1200);
        assert!(prompt.contains(&"x".repeat(500)));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_user_prompt_placeholders_for_missing_fields() {
        let prompt = build_user_prompt("", "jane@x.com", "", "");
        assert!(prompt.contains("(unknown)"));
        assert!(prompt.contains("(no subject)"));
        assert!(prompt.contains("(no body)"));
    }
}
