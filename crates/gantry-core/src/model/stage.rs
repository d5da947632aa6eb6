//! Stage record: one deployable unit inside a project's pipeline.

use crate::ids::{CommandId, DeployGroupId, ProjectId, StageId, VariableGroupId};
use serde::{Deserialize, Serialize};

/// A deployable unit belonging to exactly one project.
///
/// Stages carry two distinct orderings:
/// - `order` is the positional index inside the project (unique, contiguous
///   from 0), maintained by the pipeline graph.
/// - `next_stage_ids` is the explicit deploy-chain graph: an ordered set of
///   stages to trigger after this one, possibly non-linear, validated for
///   self-references, dangling targets, and cycles at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Unique identifier
    pub id: StageId,

    /// Owning project
    pub project_id: ProjectId,

    /// Stage name, unique within the project
    pub name: String,

    /// Positional index within the project
    pub order: u32,

    /// Template this stage was cloned from, if any. A plain reference, not
    /// an ownership link: many clones may point at one template.
    pub template_stage_id: Option<StageId>,

    /// Commands to run, in execution order (shared by reference with clones)
    pub command_ids: Vec<CommandId>,

    /// Deploy groups this stage deploys to
    pub deploy_group_ids: Vec<DeployGroupId>,

    /// Environment variable groups attached to this stage
    pub variable_group_ids: Vec<VariableGroupId>,

    /// Explicit outgoing deploy-chain edges
    #[serde(default)]
    pub next_stage_ids: Vec<StageId>,

    /// Direct production flag, used when the stage has no deploy groups
    #[serde(default)]
    pub production: bool,

    /// Stage runs tooling only and never ships code; such deploys are not
    /// releases
    #[serde(default)]
    pub no_code_deployed: bool,

    /// Automatically deploy when a release is created
    #[serde(default)]
    pub deploy_on_release: bool,

    /// Notify changeset commit authors when an automated deploy fails
    #[serde(default)]
    pub email_committers_on_automated_deploy_failure: bool,

    /// Static comma-separated address list notified when an automated deploy
    /// fails
    #[serde(default)]
    pub static_emails_on_automated_deploy_failure: Option<String>,

    /// Semicolon-separated address list for routine deploy notifications
    #[serde(default)]
    pub notify_email_address: Option<String>,
}

impl Stage {
    /// Whether this stage was created by cloning a template stage.
    pub fn is_clone(&self) -> bool {
        self.template_stage_id.is_some()
    }

    /// Routine notification addresses, split from `notify_email_address`.
    pub fn notify_email_addresses(&self) -> Vec<String> {
        self.notify_email_address
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether routine email notifications are configured.
    pub fn send_email_notifications(&self) -> bool {
        self.notify_email_address
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// Attributes for creating a new stage.
///
/// Identity, `order`, and pipeline edges are assigned by the pipeline graph;
/// everything else is caller-supplied.
#[derive(Debug, Clone, Default)]
pub struct StageDraft {
    pub name: String,
    pub command_ids: Vec<CommandId>,
    pub deploy_group_ids: Vec<DeployGroupId>,
    pub variable_group_ids: Vec<VariableGroupId>,
    pub production: bool,
    pub no_code_deployed: bool,
    pub deploy_on_release: bool,
    pub email_committers_on_automated_deploy_failure: bool,
    pub static_emails_on_automated_deploy_failure: Option<String>,
    pub notify_email_address: Option<String>,
}

impl StageDraft {
    /// Convenience constructor for a draft with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_with_notify(notify: Option<&str>) -> Stage {
        Stage {
            id: StageId::new(1),
            project_id: ProjectId::new(1),
            name: "staging".into(),
            order: 0,
            template_stage_id: None,
            command_ids: vec![],
            deploy_group_ids: vec![],
            variable_group_ids: vec![],
            next_stage_ids: vec![],
            production: false,
            no_code_deployed: false,
            deploy_on_release: false,
            email_committers_on_automated_deploy_failure: false,
            static_emails_on_automated_deploy_failure: None,
            notify_email_address: notify.map(str::to_string),
        }
    }

    #[test]
    fn test_notify_email_addresses_split() {
        let stage = stage_with_notify(Some("a@x.com; b@x.com;"));
        assert_eq!(stage.notify_email_addresses(), vec!["a@x.com", "b@x.com"]);
        assert!(stage.send_email_notifications());
    }

    #[test]
    fn test_notify_email_addresses_empty() {
        let stage = stage_with_notify(None);
        assert!(stage.notify_email_addresses().is_empty());
        assert!(!stage.send_email_notifications());
    }

    #[test]
    fn test_is_clone() {
        let mut stage = stage_with_notify(None);
        assert!(!stage.is_clone());
        stage.template_stage_id = Some(StageId::new(9));
        assert!(stage.is_clone());
    }
}
