use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Job controller phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Planning,
    Dispatching,
    Reviewing,
    Done,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Planning => "planning",
            JobPhase::Dispatching => "dispatching",
            JobPhase::Reviewing => "reviewing",
            JobPhase::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct PhaseTransition;

impl PhaseTransition {
    /// Check a controller transition against the phase table.
    pub fn validate(from: JobPhase, to: JobPhase) -> Result<(), ProtocolError> {
        if from.is_terminal() {
            return Err(ProtocolError::InvalidTransition { from, to });
        }

        let is_valid = match (from, to) {
            (JobPhase::Planning, JobPhase::Dispatching) => true,
            (JobPhase::Dispatching, JobPhase::Reviewing) => true,
            (JobPhase::Reviewing, JobPhase::Planning) => true,

            // Any phase may finish the job: normal completion or abort.
            (_, JobPhase::Done) => true,

            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(ProtocolError::InvalidTransition { from, to })
        }
    }

    pub fn next_phase(current: JobPhase) -> Option<JobPhase> {
        match current {
            JobPhase::Planning => Some(JobPhase::Dispatching),
            JobPhase::Dispatching => Some(JobPhase::Reviewing),
            JobPhase::Reviewing => Some(JobPhase::Planning),
            JobPhase::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(PhaseTransition::validate(JobPhase::Planning, JobPhase::Dispatching).is_ok());
        assert!(PhaseTransition::validate(JobPhase::Dispatching, JobPhase::Reviewing).is_ok());
        assert!(PhaseTransition::validate(JobPhase::Reviewing, JobPhase::Planning).is_ok());
        assert!(PhaseTransition::validate(JobPhase::Reviewing, JobPhase::Done).is_ok());
        assert!(PhaseTransition::validate(JobPhase::Planning, JobPhase::Done).is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(PhaseTransition::validate(JobPhase::Planning, JobPhase::Reviewing).is_err());
        assert!(PhaseTransition::validate(JobPhase::Dispatching, JobPhase::Planning).is_err());
        assert_eq!(
            PhaseTransition::validate(JobPhase::Done, JobPhase::Planning),
            Err(ProtocolError::InvalidTransition {
                from: JobPhase::Done,
                to: JobPhase::Planning,
            })
        );
        assert!(PhaseTransition::validate(JobPhase::Done, JobPhase::Done).is_err());
    }

    #[test]
    fn test_next_phase_cycles_until_done() {
        assert_eq!(
            PhaseTransition::next_phase(JobPhase::Reviewing),
            Some(JobPhase::Planning)
        );
        assert_eq!(PhaseTransition::next_phase(JobPhase::Done), None);
    }
}
