//! Composition wizard — ordered steps that collect what the message should
//! be, and the assembler that turns them into a generation request.
//!
//! Steps run Recipient → Intent → Tone → Format → Style → Advanced. The
//! first four are required; Style and Advanced fall back to neutral values.

pub mod assembler;
pub mod controller;
pub mod model;
pub mod state;

pub use assembler::assemble;
pub use controller::{WizardController, WizardSession, WizardStatus};
pub use model::{
    Advanced, CardOptions, ConversationOptions, EmailOptions, Format, FormatKind, FormatOptions,
    Guidance, Intent, IntentKind, LetterOptions, MessageLength, Recipient, SocialOptions,
    StepData, StepSnapshot, Style, TextOptions, Tone, ToneKind,
};
pub use state::{StepId, WizardPosition};
