//! Error types for the message composer.

use std::time::Duration;

use crate::wizard::state::StepId;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Step transition errors raised by the wizard controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Incomplete data for step {step}: {reason}")]
    IncompleteStepData { step: StepId, reason: String },

    #[error("Expected data for step {expected}, got {got}")]
    StepMismatch { expected: StepId, got: StepId },

    #[error("Step {step} is required and cannot be skipped")]
    NotSkippable { step: StepId },

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Wizard is already complete")]
    AlreadyComplete,

    #[error("Wizard is not complete (current step: {current})")]
    NotComplete { current: StepId },
}

/// Errors from turning collected step data into a generation request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(StepId),
}

/// Failure of a single transport attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport {transport} request failed: {reason}")]
    RequestFailed { transport: String, reason: String },

    #[error("Transport {transport} returned HTTP {status}: {body}")]
    Status {
        transport: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {transport}: {reason}")]
    InvalidResponse { transport: String, reason: String },

    #[error("Transport {transport} timed out after {timeout:?}")]
    Timeout { transport: String, timeout: Duration },
}

/// Errors surfaced by the generation gateway.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Both primary and fallback failed. Retryable by calling `generate` again.
    #[error("Generation unavailable (primary: {primary}; fallback: {fallback})")]
    Unavailable { primary: String, fallback: String },

    #[error("A generation is already in flight for this session")]
    InFlight,

    #[error("Generation task failed: {0}")]
    TaskFailed(String),
}

/// Errors from the result persister.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Message {id} not found")]
    NotFound { id: String },

    #[error("No generated message to save")]
    NothingToSave,
}

/// Result type alias for the composer.
pub type Result<T> = std::result::Result<T, Error>;
