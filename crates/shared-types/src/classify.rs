//! Classification categories and the classifier wire format.
//!
//! The classifier adapter returns whatever the model produced; the engine
//! clamps it to the fixed enumerations here before anything is persisted.

use serde::{Deserialize, Serialize};

/// The fixed set of contact categories the classifier may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    QuoteRequest,
    BookingInquiry,
    EventInquiry,
    LessonInquiry,
    GeneralInterest,
    VendorPartner,
    NotRelevant,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::QuoteRequest,
        Category::BookingInquiry,
        Category::EventInquiry,
        Category::LessonInquiry,
        Category::GeneralInterest,
        Category::VendorPartner,
        Category::NotRelevant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::QuoteRequest => "quote_request",
            Category::BookingInquiry => "booking_inquiry",
            Category::EventInquiry => "event_inquiry",
            Category::LessonInquiry => "lesson_inquiry",
            Category::GeneralInterest => "general_interest",
            Category::VendorPartner => "vendor_partner",
            Category::NotRelevant => "not_relevant",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == s.trim())
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::GeneralInterest
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Confidence> {
        match s.trim() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Medium
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw classifier output, exactly as the model returns it.
///
/// Every field is defaulted so a partially-formed JSON object still parses;
/// missing `should_add` means "do not add".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    #[serde(default)]
    pub should_add: bool,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub reason: String,
}

impl ClassifierVerdict {
    /// Clamp out-of-range values to the documented defaults. Raw strings
    /// never flow past this point.
    pub fn clamp(&self) -> Classification {
        Classification {
            should_include: self.should_add,
            category: Category::parse(&self.classification).unwrap_or_default(),
            confidence: Confidence::parse(&self.confidence).unwrap_or_default(),
            rationale: self.reason.clone(),
        }
    }
}

/// A clamped, validated classification judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub should_include: bool,
    pub category: Category,
    pub confidence: Confidence,
    pub rationale: String,
}
