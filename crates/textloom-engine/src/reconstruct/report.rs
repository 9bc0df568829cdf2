//! The dead-end report: every search position that failed to extend.
//!
//! Append-only, owned by one reconstruction invocation. On success it is
//! discarded; on failure it becomes the payload of
//! [`ReconstructError::Failure`](crate::error::ReconstructError::Failure)
//! and is the caller's material for explaining *why* the model does not fit
//! the grammar.

use std::fmt;

use serde::Serialize;

/// One candidate that failed to bind at a dead end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAttempt {
    /// Description of the proposed token, e.g. `assignment name=ID`.
    pub token: String,
    pub diagnostic: String,
}

/// One search position where no follower could be bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadEnd {
    /// The token path leading up to the dead end, most recent tokens last.
    pub path: String,
    /// Every candidate tried at this position, in proposal order.
    pub attempts: Vec<FailedAttempt>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeadEndReport {
    entries: Vec<DeadEnd>,
}

impl DeadEndReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DeadEnd) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DeadEnd] {
        &self.entries
    }

    pub fn last(&self) -> Option<&DeadEnd> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DeadEndReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "no dead ends recorded");
        }
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "dead end {} after: {}", i + 1, entry.path)?;
            for attempt in &entry.attempts {
                writeln!(f, "  {}: {}", attempt.token, attempt.diagnostic)?;
            }
        }
        Ok(())
    }
}
