//! Unsubscribe-intent confirmation gate.
//!
//! The broad Gmail search for unsubscribe-like mail has poor precision, so a
//! message only counts as an unsubscribe request when its subject + body text
//! also matches this curated phrase pattern. Word boundaries keep substrings
//! like "premove" from matching.

use once_cell::sync::Lazy;
use regex::Regex;

static UNSUBSCRIBE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(unsubscribe|remove me|stop emailing|opt out|take me off|don'?t (want|need) (any ?more|these) emails?|please remove|no longer wish|stop sending)\b",
    )
    .expect("unsubscribe pattern is valid")
});

/// True when the text contains an explicit unsubscribe phrasing.
pub fn is_unsubscribe_request(text: &str) -> bool {
    UNSUBSCRIBE_PATTERN.is_match(text)
}
