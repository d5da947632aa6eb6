//! Automated-failure notification: who hears about a failed automated
//! deploy.
//!
//! Walks the stage's deploy history and the changeset between the current
//! deploy and the one before it. Every rule short-circuits to "notify
//! nobody": stages without notification settings, non-failures, failures
//! triggered by humans, and stages that were already failing stay quiet.

use gantry_core::error::CoreResult;
use gantry_core::ids::{DeployId, ProjectId};
use gantry_core::model::Deploy;
use gantry_core::store::MemoryStore;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Source of commit metadata for a project.
///
/// Delivery of the changeset itself (git, forge API) is an external
/// concern; the notifier only needs distinct author emails.
pub trait ChangesetProvider: Send + Sync {
    /// Distinct commit author emails in `from..to` for the project.
    /// `from = None` means the full history up to `to`.
    fn author_emails(
        &self,
        project_id: ProjectId,
        from: Option<&str>,
        to: &str,
    ) -> CoreResult<Vec<String>>;
}

/// Computes recipient sets for automated deploy failures.
pub struct FailureNotifier {
    store: Arc<MemoryStore>,
    changesets: Arc<dyn ChangesetProvider>,
}

impl FailureNotifier {
    /// Create a notifier over the given store and changeset source.
    pub fn new(store: Arc<MemoryStore>, changesets: Arc<dyn ChangesetProvider>) -> Self {
        Self { store, changesets }
    }

    /// The set of emails to notify about `deploy_id`, or `None` when
    /// nobody should be notified.
    pub fn recipients(&self, deploy_id: DeployId) -> CoreResult<Option<BTreeSet<String>>> {
        let deploy = self.store.deploy(deploy_id)?;
        let stage = self.store.stage(deploy.stage_id)?;

        let static_emails = stage
            .static_emails_on_automated_deploy_failure
            .as_deref()
            .unwrap_or_default()
            .trim();
        if !stage.email_committers_on_automated_deploy_failure && static_emails.is_empty() {
            return Ok(None);
        }

        if !deploy.failed() {
            return Ok(None);
        }

        // Human-triggered failures are seen by the human; only automation
        // identities notify.
        let user = self.store.user(deploy.started_by)?;
        if !user.integration {
            log::debug!(
                "deploy {} failed but was started by a human, not notifying",
                deploy.id
            );
            return Ok(None);
        }

        // A still-failing pipeline was already reported on the first
        // failure.
        let previous = self.previous_natural_deploy(&deploy);
        if previous.as_ref().is_some_and(Deploy::failed) {
            return Ok(None);
        }

        let mut emails: BTreeSet<String> = static_emails
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if stage.email_committers_on_automated_deploy_failure {
            let authors = self.changesets.author_emails(
                stage.project_id,
                previous.as_ref().map(|d| d.reference.as_str()),
                &deploy.reference,
            )?;
            emails.extend(authors);
        }

        if emails.is_empty() {
            return Ok(None);
        }
        Ok(Some(emails))
    }

    /// The naturally finished deploy immediately preceding `deploy` on the
    /// same stage, i.e. the newest older deploy that reached a terminal
    /// state without being cancelled.
    fn previous_natural_deploy(&self, deploy: &Deploy) -> Option<Deploy> {
        self.store
            .deploys_of_stage(deploy.stage_id)
            .into_iter()
            .find(|d| d.id < deploy.id && d.status.finished_naturally())
    }
}

#[cfg(test)]
#[path = "notifier_test.rs"]
mod tests;
