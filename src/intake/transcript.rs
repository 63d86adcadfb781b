//! Boundary schemas for the backend's transcript record.
//!
//! Every field is optional at the wire level. A missing key, a `null`, or a
//! value of the wrong JSON type deserializes as "absent"; a malformed entry
//! inside a category array (no text question or answer) is dropped on its own
//! without affecting its neighbours.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// The five categories a discovery entry can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Situation,
    Lifestyle,
    Readiness,
    Priorities,
    VisitScheduling,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Situation => "situation",
            Self::Lifestyle => "lifestyle",
            Self::Readiness => "readiness",
            Self::Priorities => "priorities",
            Self::VisitScheduling => "visit_scheduling",
        };
        write!(f, "{s}")
    }
}

/// One recorded question/answer pair.
///
/// `question` and `answer` must both be strings; an entry missing either is
/// malformed and dropped by the surrounding category array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    pub question: String,
    pub answer: String,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DiscoveryEntry {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Blank answers carry no information and never count as a reply.
    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }
}

/// Contact details the agent collected while building trust.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub loved_one_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub collected_at: Option<DateTime<Utc>>,
}

/// The backend's accumulated record for one conversation session.
///
/// Treated as an immutable snapshot: every refetch replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub contact_info: Option<ContactInfo>,
    #[serde(rename = "situation_discovery", default, deserialize_with = "lenient_entries")]
    pub situation: Vec<DiscoveryEntry>,
    #[serde(rename = "lifestyle_discovery", default, deserialize_with = "lenient_entries")]
    pub lifestyle: Vec<DiscoveryEntry>,
    #[serde(rename = "readiness_discovery", default, deserialize_with = "lenient_entries")]
    pub readiness: Vec<DiscoveryEntry>,
    #[serde(rename = "priorities_discovery", default, deserialize_with = "lenient_entries")]
    pub priorities: Vec<DiscoveryEntry>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub visit_scheduling: Vec<DiscoveryEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl TranscriptRecord {
    /// Entries filed under `category`, in chronological order.
    pub fn entries(&self, category: Category) -> &[DiscoveryEntry] {
        match category {
            Category::Situation => &self.situation,
            Category::Lifestyle => &self.lifestyle,
            Category::Readiness => &self.readiness,
            Category::Priorities => &self.priorities,
            Category::VisitScheduling => &self.visit_scheduling,
        }
    }

    pub fn loved_one_name(&self) -> Option<&str> {
        self.contact_info
            .as_ref()
            .and_then(|c| c.loved_one_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// Follow-up contact details captured while scheduling the visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mailing_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub preferred_contact: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub collected_at: Option<DateTime<Utc>>,
}

/// One transcript fetch: the record plus visit info, either of which may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSnapshot {
    #[serde(rename = "comprehensiveRecord", default, deserialize_with = "lenient")]
    pub record: Option<TranscriptRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub visit_info: Option<VisitInfo>,
}

impl TranscriptSnapshot {
    pub fn is_empty(&self) -> bool {
        self.record.is_none() && self.visit_info.is_none()
    }
}

/// Deserialize `T`, falling back to `T::default()` when the value has the
/// wrong shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserialize a category array, keeping only well-formed entries.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<DiscoveryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
