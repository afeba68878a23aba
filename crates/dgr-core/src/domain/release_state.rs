//! State of the release as a whole.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ReleaseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseState {
    Ready,
    InProgress,
    Succeeded,
    Failed,
    /// Someone else drives the release, this instance only follows it.
    Watching,
}

impl ReleaseState {
    pub fn check_transition_allowed(self, new: ReleaseState) -> Result<ReleaseState> {
        use ReleaseState::*;
        let allowed = match (self, new) {
            (Ready, InProgress) | (Ready, Watching) => true,
            (Watching, InProgress) | (Watching, Succeeded) | (Watching, Failed) => true,
            (InProgress, Succeeded) | (InProgress, Failed) => true,
            (Failed, InProgress) => true,
            _ => false,
        };
        if allowed {
            Ok(new)
        } else {
            Err(ReleaseError::IllegalState(format!(
                "cannot transition the release from {self} to {new}"
            )))
        }
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseState::Ready => "Ready",
            ReleaseState::InProgress => "InProgress",
            ReleaseState::Succeeded => "Succeeded",
            ReleaseState::Failed => "Failed",
            ReleaseState::Watching => "Watching",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOfRun {
    Explore,
    DryRun,
    #[default]
    Release,
}
