//! ConfigAssembler — turns completed step data into a generation request.
//!
//! Pure and deterministic: the same snapshot always yields the same request.
//! The edit-and-resend flow relies on this when it reruns assembly against
//! step data extracted from a saved message.

use crate::error::AssemblyError;
use crate::generation::types::GenerationRequest;

use super::model::StepSnapshot;
use super::state::StepId;

/// Build a [`GenerationRequest`] from the completed steps.
///
/// Recipient, intent, tone and format are required. A missing style or
/// advanced step is filled with neutral midpoints; nothing else is
/// normalised.
pub fn assemble(steps: &StepSnapshot) -> Result<GenerationRequest, AssemblyError> {
    let recipient = steps
        .recipient()
        .ok_or(AssemblyError::MissingRequiredField(StepId::Recipient))?;
    let intent = steps
        .intent()
        .ok_or(AssemblyError::MissingRequiredField(StepId::Intent))?;
    let tone = steps
        .tone()
        .ok_or(AssemblyError::MissingRequiredField(StepId::Tone))?;
    let format = steps
        .format()
        .ok_or(AssemblyError::MissingRequiredField(StepId::Format))?;

    Ok(GenerationRequest {
        recipient: recipient.clone(),
        intent: intent.clone(),
        tone: tone.clone(),
        format: format.clone(),
        style: steps.style().cloned().unwrap_or_default(),
        advanced: steps.advanced().cloned().unwrap_or_default(),
    })
}
