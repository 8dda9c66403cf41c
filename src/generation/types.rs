//! Generation request/response contract shared by every transport.

use serde::{Deserialize, Serialize};

use crate::wizard::model::{Advanced, Format, FormatOptions, Intent, Recipient, Style, Tone};

/// Canonical, immutable input to the generation capability.
///
/// Built by [`crate::wizard::assembler::assemble`]; `style` and `advanced`
/// are always present (neutral defaults when the steps were skipped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub recipient: Recipient,
    pub intent: Intent,
    pub tone: Tone,
    pub format: Format,
    pub style: Style,
    pub advanced: Advanced,
}

impl GenerationRequest {
    /// The wire shape sent to both transports.
    pub fn payload(&self) -> GenerationPayload<'_> {
        GenerationPayload {
            recipient: PayloadRecipient {
                name: &self.recipient.name,
                relationship: &self.recipient.relationship,
            },
            intent: PayloadIntent {
                kind: self.intent.kind.to_string(),
                custom: self.intent.custom_text(),
            },
            format: PayloadFormat {
                kind: self.format.kind().to_string(),
                length: self.format.length.to_string(),
                options: format_options_value(&self.format.options),
            },
            tone: self.tone.label(),
            style: &self.style,
            advanced: PayloadAdvanced {
                intensity: self.advanced.intensity,
                custom_instructions: self
                    .advanced
                    .custom_instructions
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            },
        }
    }
}

/// Output of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated message.
    pub content: String,
    /// Short rationales for the choices made (may be empty).
    #[serde(default)]
    pub insights: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload<'a> {
    pub recipient: PayloadRecipient<'a>,
    pub intent: PayloadIntent<'a>,
    pub format: PayloadFormat,
    pub tone: String,
    pub style: &'a Style,
    pub advanced: PayloadAdvanced<'a>,
}

#[derive(Debug, Serialize)]
pub struct PayloadRecipient<'a> {
    pub name: &'a str,
    pub relationship: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PayloadIntent<'a> {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct PayloadFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub length: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAdvanced<'a> {
    pub intensity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<&'a str>,
}

/// Format options as a plain object without the kind tag; `None` when empty.
fn format_options_value(options: &FormatOptions) -> Option<serde_json::Value> {
    let value = match options {
        FormatOptions::Text(o) => serde_json::to_value(o),
        FormatOptions::Email(o) => serde_json::to_value(o),
        FormatOptions::Conversation(o) => serde_json::to_value(o),
        FormatOptions::Card(o) => serde_json::to_value(o),
        FormatOptions::Social(o) => serde_json::to_value(o),
        FormatOptions::Letter(o) => serde_json::to_value(o),
    }
    .ok()?;
    match value.as_object() {
        Some(map) if !map.is_empty() => Some(value),
        _ => None,
    }
}
