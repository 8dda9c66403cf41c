//! Persisted message records and the metadata written alongside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::types::GenerationRequest;
use crate::wizard::model::{
    Advanced, Format, FormatKind, FormatOptions, Intent, IntentKind, MessageLength, Recipient,
    StepData, StepSnapshot, Tone, ToneKind,
};

/// Identifier assigned by the store to a saved message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedMessageId(pub String);

impl std::fmt::Display for PersistedMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse relationship grouping, stored for filtering saved messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    Family,
    Partner,
    Friend,
    Work,
    Other,
}

impl MessageCategory {
    /// Classify a free-form relationship ("my older sister", "coworker").
    pub fn from_relationship(relationship: &str) -> Self {
        const FAMILY: &[&str] = &[
            "mother", "mom", "mum", "father", "dad", "sister", "brother", "sibling", "son",
            "daughter", "child", "parent", "grandma", "grandmother", "grandpa", "grandfather",
            "aunt", "uncle", "cousin", "niece", "nephew", "family",
        ];
        const PARTNER: &[&str] = &[
            "partner", "wife", "husband", "spouse", "girlfriend", "boyfriend", "fiance",
            "fiancee", "fiancé", "fiancée",
        ];
        const FRIEND: &[&str] = &["friend", "bestie", "buddy", "roommate", "neighbor", "neighbour"];
        const WORK: &[&str] = &[
            "colleague", "coworker", "co-worker", "boss", "manager", "mentor", "client",
            "teammate", "employee", "teacher",
        ];

        let lower = relationship.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
            .collect();
        let has_any = |list: &[&str]| words.iter().any(|w| list.contains(w));

        if has_any(PARTNER) {
            Self::Partner
        } else if has_any(FAMILY) {
            Self::Family
        } else if has_any(WORK) {
            Self::Work
        } else if has_any(FRIEND) {
            Self::Friend
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Family => "family",
            Self::Partner => "partner",
            Self::Friend => "friend",
            Self::Work => "work",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// What the persister records about the request that produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    pub recipient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    pub relationship: String,
    /// Intent type, e.g. "gratitude".
    pub intent: String,
    /// Tone label (custom text for custom tones).
    pub tone: String,
    pub intensity: u8,
    pub message_category: String,
    pub message_format: String,
    pub message_intention: String,
    /// Full originating request, kept for edit-and-resend.
    pub request: GenerationRequest,
}

impl MessageMetadata {
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            recipient_name: request.recipient.name.trim().to_string(),
            recipient_id: request.recipient.external_id.clone(),
            relationship: request.recipient.relationship.trim().to_string(),
            intent: request.intent.kind.to_string(),
            tone: request.tone.label(),
            intensity: request.advanced.intensity,
            message_category: MessageCategory::from_relationship(&request.recipient.relationship)
                .to_string(),
            message_format: request.format.kind().to_string(),
            message_intention: request.intent.describe(),
            request: request.clone(),
        }
    }
}

/// A message as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMessage {
    pub id: PersistedMessageId,
    pub user_id: String,
    pub content: String,
    pub recipient_name: String,
    pub recipient_id: Option<String>,
    pub relationship: String,
    pub intent: String,
    pub tone: String,
    pub intensity: u8,
    pub insights: Vec<String>,
    pub message_category: String,
    pub message_format: String,
    pub message_intention: String,
    /// Missing for rows whose request column could not be decoded.
    pub request: Option<GenerationRequest>,
    pub created_at: DateTime<Utc>,
}

impl SavedMessage {
    /// Step data to seed an edit-and-resend session.
    ///
    /// Uses the stored request when available; otherwise rebuilds what it
    /// can from the denormalised columns.
    pub fn step_snapshot(&self) -> StepSnapshot {
        if let Some(request) = &self.request {
            return request_to_snapshot(request);
        }

        let mut snapshot = StepSnapshot::new().with(StepData::Recipient(Recipient {
            name: self.recipient_name.clone(),
            relationship: self.relationship.clone(),
            external_id: self.recipient_id.clone(),
        }));

        if let Some(kind) = IntentKind::parse(&self.intent) {
            let intent = match kind {
                IntentKind::Custom => Intent::custom(self.message_intention.clone()),
                kind => Intent::new(kind),
            };
            snapshot.insert(StepData::Intent(intent));
        }

        let tone = match ToneKind::parse(&self.tone) {
            Some(ToneKind::Custom) | None => Tone::custom(self.tone.clone()),
            Some(kind) => Tone::new(kind),
        };
        snapshot.insert(StepData::Tone(tone));

        if let Some(kind) = FormatKind::parse(&self.message_format) {
            snapshot.insert(StepData::Format(Format {
                length: MessageLength::Medium,
                options: FormatOptions::for_kind(kind),
            }));
        }

        snapshot.insert(StepData::Advanced(Advanced {
            intensity: self.intensity,
            custom_instructions: None,
        }));
        snapshot
    }
}

fn request_to_snapshot(request: &GenerationRequest) -> StepSnapshot {
    StepSnapshot::new()
        .with(StepData::Recipient(request.recipient.clone()))
        .with(StepData::Intent(request.intent.clone()))
        .with(StepData::Tone(request.tone.clone()))
        .with(StepData::Format(request.format.clone()))
        .with(StepData::Style(request.style.clone()))
        .with(StepData::Advanced(request.advanced.clone()))
}

/// Filter for listing saved messages. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFilter {
    pub category: Option<String>,
    pub format: Option<String>,
    pub intention: Option<String>,
    pub limit: Option<usize>,
}
