//! Mail source abstraction and scan query construction.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

/// Identifier of a message in the mail source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
}

/// The slice of a message the reconciliation workflow needs.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    pub id: String,
    pub sender_name: String,
    /// Lower-cased sender address.
    pub sender_email: String,
    pub subject: String,
    /// Plain-text body excerpt, at most 500 characters.
    pub excerpt: String,
    pub internal_date: Option<DateTime<Utc>>,
}

/// External mail store, accessed through search + fetch only.
#[allow(async_fn_in_trait)]
pub trait MailSource {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<MessageRef>>;
    async fn fetch(&self, message: &MessageRef) -> Result<MessageSummary>;
}

/// Build the main scan query: inbox only, minus the static exclusion terms,
/// optionally bounded by the watermark date.
pub fn build_scan_query(exclude_parts: &[String], after: Option<NaiveDate>) -> String {
    let mut parts = vec!["in:inbox".to_string()];
    for exclude in exclude_parts {
        parts.push(format!("-{exclude}"));
    }
    if let Some(date) = after {
        parts.push(format!("after:{}", date.format("%Y/%m/%d")));
    }
    parts.join(" ")
}

/// Build the broad unsubscribe-sweep query. Deliberately loose (no category
/// exclusions); precision comes from the phrase confirmation gate afterwards.
pub fn build_unsubscribe_query(after: Option<NaiveDate>) -> String {
    let mut query = "in:inbox {unsubscribe remove opt-out}".to_string();
    if let Some(date) = after {
        query.push_str(&format!(" after:{}", date.format("%Y/%m/%d")));
    }
    query
}
