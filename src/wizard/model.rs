//! Per-step data records and their validation predicates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

use super::state::StepId;

/// Lowest value of the 1–5 sliders (formality, depth, intensity).
pub const SCALE_MIN: u8 = 1;
/// Highest value of the 1–5 sliders.
pub const SCALE_MAX: u8 = 5;
/// Neutral midpoint used when a slider step was never completed.
pub const SCALE_NEUTRAL: u8 = 3;

// ── Recipient ───────────────────────────────────────────────────────

/// Who the message is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    /// Free-form relationship, e.g. "sister", "old college friend".
    pub relationship: String,
    /// Address-book entry, if the recipient was picked from contacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Recipient {
    pub fn validate(&self) -> Result<(), WizardError> {
        require_text(StepId::Recipient, "name", &self.name)?;
        require_text(StepId::Recipient, "relationship", &self.relationship)
    }
}

// ── Intent ──────────────────────────────────────────────────────────

/// Why the message is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentKind {
    CheckIn,
    Gratitude,
    Support,
    Celebration,
    Reconnection,
    Custom,
}

impl IntentKind {
    /// Short phrase used in prompts and stored as the message intention.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::CheckIn => "checking in to see how they are doing",
            Self::Gratitude => "expressing gratitude",
            Self::Support => "offering support and encouragement",
            Self::Celebration => "celebrating something with them",
            Self::Reconnection => "reconnecting after some time apart",
            Self::Custom => "a custom purpose",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "check-in" => Some(Self::CheckIn),
            "gratitude" => Some(Self::Gratitude),
            "support" => Some(Self::Support),
            "celebration" => Some(Self::Celebration),
            "reconnection" => Some(Self::Reconnection),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CheckIn => "check-in",
            Self::Gratitude => "gratitude",
            Self::Support => "support",
            Self::Celebration => "celebration",
            Self::Reconnection => "reconnection",
            Self::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub kind: IntentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            custom_text: None,
        }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            kind: IntentKind::Custom,
            custom_text: Some(text.into()),
        }
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        if self.kind == IntentKind::Custom {
            require_text(
                StepId::Intent,
                "customText",
                self.custom_text.as_deref().unwrap_or_default(),
            )?;
        }
        Ok(())
    }

    /// Custom text only counts when the custom kind was chosen.
    pub fn custom_text(&self) -> Option<&str> {
        match self.kind {
            IntentKind::Custom => self.custom_text.as_deref().map(str::trim),
            _ => None,
        }
    }

    /// Human-readable purpose: the custom text, or the kind's description.
    pub fn describe(&self) -> String {
        self.custom_text()
            .map(str::to_string)
            .unwrap_or_else(|| self.kind.describe().to_string())
    }
}

// ── Tone ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToneKind {
    Warm,
    Casual,
    Sincere,
    Playful,
    Formal,
    Reflective,
    Custom,
}

impl ToneKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warm" => Some(Self::Warm),
            "casual" => Some(Self::Casual),
            "sincere" => Some(Self::Sincere),
            "playful" => Some(Self::Playful),
            "formal" => Some(Self::Formal),
            "reflective" => Some(Self::Reflective),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Warm => "warm",
            Self::Casual => "casual",
            Self::Sincere => "sincere",
            Self::Playful => "playful",
            Self::Formal => "formal",
            Self::Reflective => "reflective",
            Self::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tone {
    pub kind: ToneKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
}

impl Tone {
    pub fn new(kind: ToneKind) -> Self {
        Self {
            kind,
            custom_text: None,
        }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            kind: ToneKind::Custom,
            custom_text: Some(text.into()),
        }
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        if self.kind == ToneKind::Custom {
            require_text(
                StepId::Tone,
                "customText",
                self.custom_text.as_deref().unwrap_or_default(),
            )?;
        }
        Ok(())
    }

    /// The tone as a single string: custom text, or the kind name.
    pub fn label(&self) -> String {
        match (self.kind, self.custom_text.as_deref()) {
            (ToneKind::Custom, Some(text)) => text.trim().to_string(),
            (kind, _) => kind.to_string(),
        }
    }
}

// ── Style ───────────────────────────────────────────────────────────

/// Optional nudges for what the message should include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    #[serde(default)]
    pub mention_memory: bool,
    #[serde(default)]
    pub ask_question: bool,
}

/// Stylistic parameters and context for the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub formality: u8,
    pub emotional_depth: u8,
    /// What prompted the message ("saw a photo of our trip").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompted_by: Option<String>,
    /// What the sender hopes the message achieves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<Guidance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            formality: SCALE_NEUTRAL,
            emotional_depth: SCALE_NEUTRAL,
            prompted_by: None,
            goal: None,
            guidance: None,
            free_text: None,
        }
    }
}

impl Style {
    pub fn validate(&self) -> Result<(), WizardError> {
        require_scale(StepId::Style, "formality", self.formality)?;
        require_scale(StepId::Style, "emotionalDepth", self.emotional_depth)
    }
}

// ── Format ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    Text,
    Email,
    Conversation,
    Card,
    Social,
    Letter,
}

impl FormatKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "email" => Some(Self::Email),
            "conversation" => Some(Self::Conversation),
            "card" => Some(Self::Card),
            "social" => Some(Self::Social),
            "letter" => Some(Self::Letter),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Conversation => "conversation",
            Self::Card => "card",
            Self::Social => "social",
            Self::Letter => "letter",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageLength {
    VeryShort,
    Short,
    Medium,
    Long,
}

impl MessageLength {
    /// Rough target used when prompting the provider.
    pub fn guideline(&self) -> &'static str {
        match self {
            Self::VeryShort => "one or two sentences",
            Self::Short => "a short paragraph",
            Self::Medium => "two or three paragraphs",
            Self::Long => "four or more paragraphs",
        }
    }
}

impl std::fmt::Display for MessageLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::VeryShort => "very-short",
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextOptions {
    pub allow_emoji: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_off: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationOptions {
    pub talking_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocialOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub include_hashtags: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LetterOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salutation: Option<String>,
}

/// Format-specific options, keyed by format kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FormatOptions {
    Text(TextOptions),
    Email(EmailOptions),
    Conversation(ConversationOptions),
    Card(CardOptions),
    Social(SocialOptions),
    Letter(LetterOptions),
}

impl FormatOptions {
    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Text(_) => FormatKind::Text,
            Self::Email(_) => FormatKind::Email,
            Self::Conversation(_) => FormatKind::Conversation,
            Self::Card(_) => FormatKind::Card,
            Self::Social(_) => FormatKind::Social,
            Self::Letter(_) => FormatKind::Letter,
        }
    }

    /// Default (empty) options for a format kind.
    pub fn for_kind(kind: FormatKind) -> Self {
        match kind {
            FormatKind::Text => Self::Text(TextOptions::default()),
            FormatKind::Email => Self::Email(EmailOptions::default()),
            FormatKind::Conversation => Self::Conversation(ConversationOptions::default()),
            FormatKind::Card => Self::Card(CardOptions::default()),
            FormatKind::Social => Self::Social(SocialOptions::default()),
            FormatKind::Letter => Self::Letter(LetterOptions::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub length: MessageLength,
    pub options: FormatOptions,
}

impl Format {
    pub fn new(kind: FormatKind, length: MessageLength) -> Self {
        Self {
            length,
            options: FormatOptions::for_kind(kind),
        }
    }

    pub fn kind(&self) -> FormatKind {
        self.options.kind()
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        match &self.options {
            FormatOptions::Email(email) => {
                if let Some(subject) = &email.subject {
                    require_text(StepId::Format, "emailSubject", subject)?;
                }
            }
            FormatOptions::Conversation(conv) => {
                if conv.talking_points.iter().any(|p| p.trim().is_empty()) {
                    return Err(incomplete(StepId::Format, "talkingPoints contains a blank entry"));
                }
            }
            FormatOptions::Text(_)
            | FormatOptions::Card(_)
            | FormatOptions::Social(_)
            | FormatOptions::Letter(_) => {}
        }
        Ok(())
    }
}

// ── Advanced ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advanced {
    pub intensity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl Default for Advanced {
    fn default() -> Self {
        Self {
            intensity: SCALE_NEUTRAL,
            custom_instructions: None,
        }
    }
}

impl Advanced {
    pub fn validate(&self) -> Result<(), WizardError> {
        require_scale(StepId::Advanced, "intensity", self.intensity)
    }
}

// ── Step data ───────────────────────────────────────────────────────

/// One completed step's record, tagged by the step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "data", rename_all = "snake_case")]
pub enum StepData {
    Recipient(Recipient),
    Intent(Intent),
    Tone(Tone),
    Format(Format),
    Style(Style),
    Advanced(Advanced),
}

impl StepData {
    pub fn step_id(&self) -> StepId {
        match self {
            Self::Recipient(_) => StepId::Recipient,
            Self::Intent(_) => StepId::Intent,
            Self::Tone(_) => StepId::Tone,
            Self::Format(_) => StepId::Format,
            Self::Style(_) => StepId::Style,
            Self::Advanced(_) => StepId::Advanced,
        }
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        match self {
            Self::Recipient(r) => r.validate(),
            Self::Intent(i) => i.validate(),
            Self::Tone(t) => t.validate(),
            Self::Format(f) => f.validate(),
            Self::Style(s) => s.validate(),
            Self::Advanced(a) => a.validate(),
        }
    }
}

/// Read-only view of the completed steps, ordered by step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSnapshot(BTreeMap<StepId, StepData>);

impl StepSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its own step, replacing any earlier record.
    pub fn insert(&mut self, data: StepData) -> Option<StepData> {
        self.0.insert(data.step_id(), data)
    }

    pub fn with(mut self, data: StepData) -> Self {
        self.insert(data);
        self
    }

    pub fn get(&self, step: StepId) -> Option<&StepData> {
        self.0.get(&step)
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.0.contains_key(&step)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.0.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &StepData> + '_ {
        self.0.values()
    }

    pub fn recipient(&self) -> Option<&Recipient> {
        match self.get(StepId::Recipient) {
            Some(StepData::Recipient(r)) => Some(r),
            _ => None,
        }
    }

    pub fn intent(&self) -> Option<&Intent> {
        match self.get(StepId::Intent) {
            Some(StepData::Intent(i)) => Some(i),
            _ => None,
        }
    }

    pub fn tone(&self) -> Option<&Tone> {
        match self.get(StepId::Tone) {
            Some(StepData::Tone(t)) => Some(t),
            _ => None,
        }
    }

    pub fn format(&self) -> Option<&Format> {
        match self.get(StepId::Format) {
            Some(StepData::Format(f)) => Some(f),
            _ => None,
        }
    }

    pub fn style(&self) -> Option<&Style> {
        match self.get(StepId::Style) {
            Some(StepData::Style(s)) => Some(s),
            _ => None,
        }
    }

    pub fn advanced(&self) -> Option<&Advanced> {
        match self.get(StepId::Advanced) {
            Some(StepData::Advanced(a)) => Some(a),
            _ => None,
        }
    }

    /// First required step (in wizard order) that has no record.
    pub fn first_missing_required(&self) -> Option<StepId> {
        StepId::ALL
            .into_iter()
            .find(|step| step.is_required() && !self.contains(*step))
    }
}

// ── Validation helpers ──────────────────────────────────────────────

fn incomplete(step: StepId, reason: impl Into<String>) -> WizardError {
    WizardError::IncompleteStepData {
        step,
        reason: reason.into(),
    }
}

fn require_text(step: StepId, field: &str, value: &str) -> Result<(), WizardError> {
    if value.trim().is_empty() {
        return Err(incomplete(step, format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_scale(step: StepId, field: &str, value: u8) -> Result<(), WizardError> {
    if !(SCALE_MIN..=SCALE_MAX).contains(&value) {
        return Err(incomplete(
            step,
            format!("{field} must be between {SCALE_MIN} and {SCALE_MAX}, got {value}"),
        ));
    }
    Ok(())
}
