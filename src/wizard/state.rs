//! Wizard step ordering — which step comes after which.

use serde::{Deserialize, Serialize};

/// The steps of the composition wizard, in order.
///
/// Progresses linearly: Recipient → Intent → Tone → Format → Style →
/// Advanced → (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Recipient,
    Intent,
    Tone,
    Format,
    Style,
    Advanced,
}

impl StepId {
    /// Every step in wizard order.
    pub const ALL: [StepId; 6] = [
        StepId::Recipient,
        StepId::Intent,
        StepId::Tone,
        StepId::Format,
        StepId::Style,
        StepId::Advanced,
    ];

    /// Number of steps before the terminal state.
    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based position of this step.
    pub fn index(&self) -> usize {
        match self {
            Self::Recipient => 0,
            Self::Intent => 1,
            Self::Tone => 2,
            Self::Format => 3,
            Self::Style => 4,
            Self::Advanced => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<StepId> {
        Self::ALL.get(index).copied()
    }

    /// Required steps must hold data before the wizard can finish.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Self::Recipient | Self::Intent | Self::Tone | Self::Format
        )
    }

    /// The step after this one, or `None` if this is the last step.
    pub fn next(&self) -> Option<StepId> {
        Self::from_index(self.index() + 1)
    }

    /// The step before this one, or `None` for the first step.
    pub fn prev(&self) -> Option<StepId> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Recipient => "recipient",
            Self::Intent => "intent",
            Self::Tone => "tone",
            Self::Format => "format",
            Self::Style => "style",
            Self::Advanced => "advanced",
        };
        write!(f, "{s}")
    }
}

/// Where the wizard currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum WizardPosition {
    Step(StepId),
    Terminal,
}

impl WizardPosition {
    /// Position for a step index; indices past the last step are terminal.
    pub fn from_index(index: usize) -> Self {
        match StepId::from_index(index) {
            Some(step) => Self::Step(step),
            None => Self::Terminal,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Step(step) => step.index(),
            Self::Terminal => StepId::COUNT,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    /// Sequential forward/back moves only; no skipping ahead.
    pub fn can_transition_to(&self, target: WizardPosition) -> bool {
        let (from, to) = (self.index(), target.index());
        to == from + 1 || from == to + 1
    }
}

impl std::fmt::Display for WizardPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(step) => write!(f, "{step}"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_all_steps() {
        let mut current = StepId::Recipient;
        let mut seen = vec![current];
        while let Some(next) = current.next() {
            seen.push(next);
            current = next;
        }
        assert_eq!(seen, StepId::ALL.to_vec());
        assert_eq!(current, StepId::Advanced);
    }

    #[test]
    fn prev_is_inverse_of_next() {
        for step in StepId::ALL {
            if let Some(next) = step.next() {
                assert_eq!(next.prev(), Some(step));
            }
        }
        assert!(StepId::Recipient.prev().is_none());
    }

    #[test]
    fn required_steps() {
        let required: Vec<StepId> = StepId::ALL.into_iter().filter(|s| s.is_required()).collect();
        assert_eq!(
            required,
            vec![StepId::Recipient, StepId::Intent, StepId::Tone, StepId::Format]
        );
    }

    #[test]
    fn display_matches_serde() {
        for step in StepId::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "mismatch for {step:?}");
        }
    }

    #[test]
    fn position_transitions_are_sequential() {
        use WizardPosition::*;
        assert!(Step(StepId::Recipient).can_transition_to(Step(StepId::Intent)));
        assert!(Step(StepId::Advanced).can_transition_to(Terminal));
        assert!(Terminal.can_transition_to(Step(StepId::Advanced)));
        // Skip ahead
        assert!(!Step(StepId::Recipient).can_transition_to(Step(StepId::Tone)));
        assert!(!Step(StepId::Format).can_transition_to(Terminal));
        // Self-transition
        assert!(!Step(StepId::Tone).can_transition_to(Step(StepId::Tone)));
    }

    #[test]
    fn position_from_index() {
        assert_eq!(WizardPosition::from_index(0), WizardPosition::Step(StepId::Recipient));
        assert_eq!(WizardPosition::from_index(StepId::COUNT), WizardPosition::Terminal);
        assert_eq!(WizardPosition::Terminal.index(), StepId::COUNT);
    }
}
