//! WizardController — owns step progression and the accumulated step data.

use serde::Serialize;
use tracing::debug;

use crate::error::WizardError;

use super::model::{StepData, StepSnapshot};
use super::state::{StepId, WizardPosition};

/// Snapshot of where the wizard is, returned by every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardStatus {
    pub position: WizardPosition,
    pub current_step_index: usize,
    pub completed_steps: Vec<StepId>,
}

/// In-progress composition state for one user.
///
/// Never shared across users and never persisted mid-flight.
#[derive(Debug, Clone, Default)]
pub struct WizardSession {
    current_step_index: usize,
    completed_steps: StepSnapshot,
}

/// Drives a [`WizardSession`] through the ordered steps.
///
/// Transitions are strictly sequential. Data from earlier steps survives
/// `retreat()` so walking forward again re-shows it for editing.
#[derive(Debug, Clone, Default)]
pub struct WizardController {
    session: WizardSession,
}

impl WizardController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session pre-filled with previously collected step data
    /// (edit-and-resend). The wizard starts at the first step so every
    /// record can be reviewed.
    pub fn from_snapshot(snapshot: StepSnapshot) -> Result<Self, WizardError> {
        for data in snapshot.values() {
            data.validate()?;
        }
        Ok(Self {
            session: WizardSession {
                current_step_index: 0,
                completed_steps: snapshot,
            },
        })
    }

    pub fn position(&self) -> WizardPosition {
        WizardPosition::from_index(self.session.current_step_index)
    }

    pub fn current_step(&self) -> Option<StepId> {
        StepId::from_index(self.session.current_step_index)
    }

    pub fn current_step_index(&self) -> usize {
        self.session.current_step_index
    }

    pub fn is_complete(&self) -> bool {
        self.position().is_terminal()
    }

    pub fn status(&self) -> WizardStatus {
        WizardStatus {
            position: self.position(),
            current_step_index: self.session.current_step_index,
            completed_steps: self.session.completed_steps.steps().collect(),
        }
    }

    /// Validate and store `data` for the current step, then move forward.
    ///
    /// On any error the session is left untouched.
    pub fn advance(&mut self, step: StepId, data: StepData) -> Result<WizardStatus, WizardError> {
        let current = self.current_step().ok_or(WizardError::AlreadyComplete)?;
        if step != current {
            return Err(WizardError::StepMismatch {
                expected: current,
                got: step,
            });
        }
        if data.step_id() != step {
            return Err(WizardError::StepMismatch {
                expected: step,
                got: data.step_id(),
            });
        }
        data.validate()?;

        if step.next().is_none() {
            let mut pending = self.session.completed_steps.clone();
            pending.insert(data.clone());
            ensure_required(&pending)?;
        }

        self.session.completed_steps.insert(data);
        self.move_forward(step);
        Ok(self.status())
    }

    /// Pass an optional step without (re)entering data. Any record stored
    /// for it earlier is kept.
    pub fn skip(&mut self) -> Result<WizardStatus, WizardError> {
        let current = self.current_step().ok_or(WizardError::AlreadyComplete)?;
        if current.is_required() {
            return Err(WizardError::NotSkippable { step: current });
        }
        if current.next().is_none() {
            ensure_required(&self.session.completed_steps)?;
        }
        self.move_forward(current);
        Ok(self.status())
    }

    /// Step back by one. Completed data is never removed.
    pub fn retreat(&mut self) -> Result<WizardStatus, WizardError> {
        if self.session.current_step_index == 0 {
            return Err(WizardError::AtFirstStep);
        }
        let from = self.position();
        self.session.current_step_index -= 1;
        debug!(from = %from, to = %self.position(), "Wizard retreated");
        Ok(self.status())
    }

    /// Discard everything and return to the first step.
    pub fn reset(&mut self) {
        self.session = WizardSession::default();
        debug!("Wizard reset");
    }

    /// Read-only copy of the completed steps.
    pub fn snapshot(&self) -> StepSnapshot {
        self.session.completed_steps.clone()
    }

    fn move_forward(&mut self, from: StepId) {
        self.session.current_step_index = from.index() + 1;
        debug!(from = %from, to = %self.position(), "Wizard advanced");
    }
}

fn ensure_required(steps: &StepSnapshot) -> Result<(), WizardError> {
    match steps.first_missing_required() {
        Some(step) => Err(WizardError::IncompleteStepData {
            step,
            reason: "required step has no data".to_string(),
        }),
        None => Ok(()),
    }
}
