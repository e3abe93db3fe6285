//! Experiment lifecycle types.

use std::fmt;

/// The only experiment family this controller processes. Experiments in
/// other families are left untouched.
pub const ENSEMBLE_FAMILY: &str = "ensemble";

/// Experiment lifecycle state.
///
/// `Running` is the only non-terminal state and is set by the creation
/// flow, never by the controller. The controller moves an experiment to
/// exactly one of the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperimentStatus {
    Running,
    Succeeded,
    RolledBack,
    Failed,
}

impl ExperimentStatus {
    /// Stable string form, as persisted in the `experiments.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "rolled_back" => Some(Self::RolledBack),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
