//! Gmail implementation of [`MailSource`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use google_gmail1::api::{Message, MessagePart};
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::path::Path;

use crate::source::{MailSource, MessageRef, MessageSummary};

/// Body excerpts are capped before they reach the classifier.
const MAX_EXCERPT_CHARS: usize = 500;

pub struct GmailSource {
    hub: Gmail<HttpsConnector<HttpConnector>>,
}

impl GmailSource {
    /// Create a client using the installed-flow OAuth credentials, persisting
    /// the token cache to disk so the browser consent step only happens once.
    pub async fn new(credentials_path: &Path, token_cache_path: &Path) -> Result<Self> {
        let secret = google_gmail1::yup_oauth2::read_application_secret(credentials_path)
            .await
            .context("Failed to read OAuth credentials")?;

        let auth = google_gmail1::yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            google_gmail1::yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(token_cache_path)
        .build()
        .await
        .context("Failed to build authenticator")?;

        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = Gmail::new(client, auth);

        Ok(Self { hub })
    }

    /// The authenticated mailbox address. Used by the `auth` command to force
    /// token acquisition and confirm which account was linked.
    pub async fn profile_email(&self) -> Result<String> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile("me")
            .doit()
            .await
            .context("Failed to get Gmail profile")?;

        profile
            .email_address
            .context("No email address in Gmail profile")
    }
}

impl MailSource for GmailSource {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<MessageRef>> {
        let (_, list_response) = self
            .hub
            .users()
            .messages_list("me")
            .q(query)
            .max_results(limit)
            .doit()
            .await
            .context("Failed to list messages")?;

        let refs = list_response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .map(|id| MessageRef { id })
            .collect();

        Ok(refs)
    }

    async fn fetch(&self, message: &MessageRef) -> Result<MessageSummary> {
        let (_, full) = self
            .hub
            .users()
            .messages_get("me", &message.id)
            .format("full")
            .doit()
            .await
            .with_context(|| format!("Failed to get message {}", message.id))?;

        Ok(parse_message(full))
    }
}

fn parse_message(message: Message) -> MessageSummary {
    let id = message.id.clone().unwrap_or_default();
    let snippet = message.snippet.clone().unwrap_or_default();

    let mut subject = String::new();
    let mut from = String::new();

    if let Some(payload) = &message.payload {
        if let Some(headers) = &payload.headers {
            for header in headers {
                match header.name.as_deref() {
                    Some(name) if name.eq_ignore_ascii_case("Subject") => {
                        subject = header.value.clone().unwrap_or_default();
                    }
                    Some(name) if name.eq_ignore_ascii_case("From") => {
                        from = header.value.clone().unwrap_or_default();
                    }
                    _ => {}
                }
            }
        }
    }

    let (sender_email, sender_name) = parse_from_header(&from);

    let body = message
        .payload
        .as_ref()
        .and_then(extract_plain_text)
        .unwrap_or(snippet);

    let internal_date = message
        .internal_date
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    MessageSummary {
        id,
        sender_name,
        sender_email,
        subject,
        excerpt: truncate_chars(&body, MAX_EXCERPT_CHARS),
        internal_date,
    }
}

/// Parse a "From" header like `John Doe <john@example.com>` into
/// (lower-cased address, display name).
fn parse_from_header(from: &str) -> (String, String) {
    let from = from.trim();

    if let Some(bracket_start) = from.rfind('<') {
        if let Some(bracket_end) = from.rfind('>') {
            if bracket_end > bracket_start {
                let address = from[bracket_start + 1..bracket_end].trim().to_lowercase();
                let name = from[..bracket_start].trim().trim_matches('"').trim();
                return (address, name.to_string());
            }
        }
    }

    (from.to_lowercase(), String::new())
}

/// Walk the MIME tree for the first text/plain body.
fn extract_plain_text(part: &MessagePart) -> Option<String> {
    if part.mime_type.as_deref() == Some("text/plain") {
        if let Some(body) = &part.body {
            if let Some(data) = &body.data {
                if let Ok(text) = String::from_utf8(data.clone()) {
                    return Some(text);
                }
            }
        }
    }

    if let Some(parts) = &part.parts {
        for nested in parts {
            if let Some(text) = extract_plain_text(nested) {
                return Some(text);
            }
        }
    }

    None
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
