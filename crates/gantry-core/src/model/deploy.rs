//! Deploy record and its status state machine.

use crate::ids::{DeployGroupId, DeployId, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a deploy.
///
/// Transitions: `Pending -> Running -> {Succeeded, Failed, Errored}`, with
/// `Pending|Running -> Cancelled` as an external transition. `Pending` and
/// `Running` form the active subset; at most one deploy per stage may be
/// active at a time (enforced by the scheduler, not by storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    /// Created, waiting to run
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with a failure reported by the deploy itself
    Failed,
    /// Cancelled externally before reaching a terminal outcome
    Cancelled,
    /// Aborted by an internal error
    Errored,
}

impl DeployStatus {
    /// Whether the deploy is still in flight.
    pub fn is_active(self) -> bool {
        matches!(self, DeployStatus::Pending | DeployStatus::Running)
    }

    /// Whether the deploy reached any terminal state.
    pub fn is_finished(self) -> bool {
        !self.is_active()
    }

    /// Whether the deploy ran to completion on its own, i.e. finished
    /// without external cancellation.
    pub fn finished_naturally(self) -> bool {
        matches!(
            self,
            DeployStatus::Succeeded | DeployStatus::Failed | DeployStatus::Errored
        )
    }
}

impl std::fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeployStatus::Pending => "pending",
            DeployStatus::Running => "running",
            DeployStatus::Succeeded => "succeeded",
            DeployStatus::Failed => "failed",
            DeployStatus::Cancelled => "cancelled",
            DeployStatus::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Effective environment variables resolved for one deploy target.
///
/// A stage spanning several deploy groups gets one entry per group; a stage
/// with no deploy groups gets a single entry with `deploy_group_id = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEnv {
    /// Target deploy group, if any
    pub deploy_group_id: Option<DeployGroupId>,

    /// Effective key -> value mapping for that target
    pub vars: BTreeMap<String, String>,
}

/// One attempt to deploy a reference to a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deploy {
    /// Unique identifier; ids are handed out monotonically, so id order is
    /// creation order
    pub id: DeployId,

    /// Stage being deployed
    pub stage_id: StageId,

    /// Git reference being deployed (commit sha, branch, or tag)
    pub reference: String,

    /// Current status
    pub status: DeployStatus,

    /// Whether this deploy produced a deployable artifact
    pub release: bool,

    /// User who triggered the deploy
    pub started_by: UserId,

    /// Environment variables resolved at creation time, one entry per
    /// deploy target
    pub env: Vec<ResolvedEnv>,

    /// When the deploy was created
    pub created_at: DateTime<Utc>,

    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl Deploy {
    /// Whether the deploy is in the active subset.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether the deploy failed.
    pub fn failed(&self) -> bool {
        self.status == DeployStatus::Failed
    }

    /// Whether the deploy succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == DeployStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_subset() {
        assert!(DeployStatus::Pending.is_active());
        assert!(DeployStatus::Running.is_active());
        assert!(!DeployStatus::Succeeded.is_active());
        assert!(!DeployStatus::Cancelled.is_active());
    }

    #[test]
    fn test_finished_naturally_excludes_cancelled() {
        assert!(DeployStatus::Succeeded.finished_naturally());
        assert!(DeployStatus::Failed.finished_naturally());
        assert!(DeployStatus::Errored.finished_naturally());
        assert!(!DeployStatus::Cancelled.finished_naturally());
        assert!(!DeployStatus::Running.finished_naturally());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DeployStatus::Errored.to_string(), "errored");
    }
}
