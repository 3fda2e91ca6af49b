//! Progress reporting.

use std::fmt;

use tracing::info;

/// A phase of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Opening source and target connections.
    Connecting,
    /// Extracting both schemas.
    Extracting,
    /// Diffing the schemas.
    Comparing,
    /// Building the migration plan.
    Planning,
    /// Validating the plan.
    Validating,
    /// Executing statement `index` (1-based) of `total`.
    Executing {
        /// Statement number.
        index: usize,
        /// Number of statements in the plan.
        total: usize,
    },
    /// The run finished, successfully or not.
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Extracting => f.write_str("extracting"),
            Self::Comparing => f.write_str("comparing"),
            Self::Planning => f.write_str("planning"),
            Self::Validating => f.write_str("validating"),
            Self::Executing { index, total } => write!(f, "executing statement {index}/{total}"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Receives phase transitions of a run.
///
/// Reporting is observation only: a reporter cannot influence the run.
pub trait ProgressReporter: Send + Sync {
    /// Called on entering `phase`.
    fn report(&self, phase: SyncPhase);
}

/// Reporter that emits each phase as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, phase: SyncPhase) {
        info!(phase = %phase, "Progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(SyncPhase::Connecting.to_string(), "connecting");
        assert_eq!(
            SyncPhase::Executing { index: 3, total: 10 }.to_string(),
            "executing statement 3/10"
        );
    }
}
