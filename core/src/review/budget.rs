use thiserror::Error;

/// The job hit its revision ceiling. A terminal condition, not a crash.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("revision limit of {ceiling} reached")]
pub struct RevisionLimitExceeded {
    pub ceiling: u32,
}

/// Per-job revision counter shared by the review gate and the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionBudget {
    current: u32,
    ceiling: u32,
}

impl RevisionBudget {
    pub fn new(ceiling: u32) -> Self {
        Self {
            current: 0,
            ceiling,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn is_exhausted(&self) -> bool {
        self.current >= self.ceiling
    }

    /// Claim the next revision for a fix batch.
    pub fn advance(&mut self) -> Result<u32, RevisionLimitExceeded> {
        if self.is_exhausted() {
            return Err(RevisionLimitExceeded {
                ceiling: self.ceiling,
            });
        }
        self.current += 1;
        Ok(self.current)
    }

    /// Give back `revision` when its fix batch never entered the graph.
    /// Only the most recent claim can be released.
    pub fn release(&mut self, revision: u32) -> bool {
        if revision > 0 && self.current == revision {
            self.current -= 1;
            true
        } else {
            false
        }
    }
}
