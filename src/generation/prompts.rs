//! Prompts for the direct provider call, and parsing of its reply.
//!
//! The managed procedure builds its own prompt from the payload; these are
//! only used on the fallback path, so they must describe the same request
//! the managed procedure receives.

use crate::wizard::model::{FormatOptions, Guidance};

use super::types::{GenerationRequest, GenerationResult};

/// System prompt for the provider: role, rules and the JSON reply contract.
pub fn system_prompt() -> &'static str {
    "\
You write personal messages on behalf of the user. The message must sound like \
the user wrote it themselves: natural, specific, never generic or robotic.

Rules:
- Write in the requested tone and format, and respect the requested length.
- Address the recipient by name where it fits the format.
- Formality and emotional depth are given on a 1-5 scale (1 = lowest).
- Intensity (1-5) controls how strongly feelings are expressed.
- Follow any custom instructions unless they conflict with these rules.
- Never invent specific shared memories; hint at them only if asked to mention one.

Respond with a JSON object with exactly these keys:
- \"content\": the message text, ready to send
- \"insights\": an array of 1-3 short sentences explaining key choices you made

ONLY output the JSON object. No other text."
}

/// User prompt describing everything collected by the wizard.
pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut lines = vec![
        format!(
            "Recipient: {} (relationship: {})",
            request.recipient.name.trim(),
            request.recipient.relationship.trim()
        ),
        format!("Purpose: {}", request.intent.describe()),
        format!("Tone: {}", request.tone.label()),
        format!(
            "Format: {} ({})",
            request.format.kind(),
            request.format.length.guideline()
        ),
    ];

    lines.extend(format_option_lines(&request.format.options));

    lines.push(format!("Formality: {}/5", request.style.formality));
    lines.push(format!("Emotional depth: {}/5", request.style.emotional_depth));
    if let Some(prompted_by) = non_blank(request.style.prompted_by.as_deref()) {
        lines.push(format!("What prompted this message: {prompted_by}"));
    }
    if let Some(goal) = non_blank(request.style.goal.as_deref()) {
        lines.push(format!("Goal of the message: {goal}"));
    }
    if let Some(guidance) = request.style.guidance {
        lines.extend(guidance_lines(guidance));
    }
    if let Some(extra) = non_blank(request.style.free_text.as_deref()) {
        lines.push(format!("Additional context: {extra}"));
    }

    lines.push(format!("Intensity: {}/5", request.advanced.intensity));
    if let Some(instructions) = non_blank(request.advanced.custom_instructions.as_deref()) {
        lines.push(format!("Custom instructions: {instructions}"));
    }

    lines.join("\n")
}

fn format_option_lines(options: &FormatOptions) -> Vec<String> {
    let mut lines = Vec::new();
    match options {
        FormatOptions::Text(text) => {
            if text.allow_emoji {
                lines.push("Emoji are welcome, used sparingly.".to_string());
            } else {
                lines.push("Do not use emoji.".to_string());
            }
        }
        FormatOptions::Email(email) => {
            match non_blank(email.subject.as_deref()) {
                Some(subject) => lines.push(format!("Email subject: {subject}")),
                None => lines.push("Start with a suggested subject line.".to_string()),
            }
            if let Some(sign_off) = non_blank(email.sign_off.as_deref()) {
                lines.push(format!("Sign off with: {sign_off}"));
            }
        }
        FormatOptions::Conversation(conv) => {
            lines.push(
                "Write talking points and openers for a spoken conversation, not a message to send."
                    .to_string(),
            );
            if !conv.talking_points.is_empty() {
                lines.push(format!("Cover these points: {}", conv.talking_points.join("; ")));
            }
        }
        FormatOptions::Card(card) => {
            if let Some(occasion) = non_blank(card.occasion.as_deref()) {
                lines.push(format!("Greeting card occasion: {occasion}"));
            }
        }
        FormatOptions::Social(social) => {
            if let Some(platform) = non_blank(social.platform.as_deref()) {
                lines.push(format!("Platform: {platform}"));
            }
            if social.include_hashtags {
                lines.push("Finish with one or two fitting hashtags.".to_string());
            }
        }
        FormatOptions::Letter(letter) => {
            if let Some(salutation) = non_blank(letter.salutation.as_deref()) {
                lines.push(format!("Open with: {salutation}"));
            }
        }
    }
    lines
}

fn guidance_lines(guidance: Guidance) -> Vec<String> {
    let mut lines = Vec::new();
    if guidance.mention_memory {
        lines.push("Gently reference a shared memory.".to_string());
    }
    if guidance.ask_question {
        lines.push("End with a question that invites a reply.".to_string());
    }
    lines
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse the provider's reply into a result.
///
/// The reply should be a `{content, insights}` object, possibly wrapped in a
/// markdown fence. Plain prose with no JSON in it is taken as the message
/// itself with no insights. A reply that contains JSON which does not decode
/// (truncated, wrong keys) is an error.
pub fn parse_generation_reply(reply: &str) -> Result<GenerationResult, serde_json::Error> {
    match extract_json_object(reply) {
        Some(json_str) => serde_json::from_str::<GenerationResult>(&json_str),
        None => {
            tracing::debug!("Provider reply is not JSON, using it as content");
            Ok(GenerationResult {
                content: reply.trim().to_string(),
                insights: Vec::new(),
            })
        }
    }
}

/// Extract a JSON object from LLM output that might contain markdown or extra text.
///
/// Returns `None` when the text holds no JSON object at all.
fn extract_json_object(text: &str) -> Option<String> {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return Some(trimmed.to_string());
    }

    // Wrapped in markdown code block; an unclosed fence means a cut-off reply
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        let inner = after.find("```").map_or(after, |end| &after[..end]);
        return Some(inner.trim().to_string());
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let inner = after.find("```").map_or(after, |end| &after[..end]).trim();
        if inner.starts_with('{') {
            return Some(inner.to_string());
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return Some(trimmed[start..=end].to_string());
    }

    // An opened object that never closes
    if let Some(start) = trimmed.find("{\"") {
        return Some(trimmed[start..].to_string());
    }

    None
}
