//! Deploy scheduling: creation, the per-stage state machine, and history
//! views.
//!
//! Deploy creation is one critical section: lock check, active-deploy
//! check, environment resolution, and insert happen under a single gate so
//! two concurrent creators cannot both slip past the checks. That is what
//! guarantees at most one pending/running deploy per stage.

use crate::locks::LockManager;
use gantry_core::config::Config;
use gantry_core::error::{CoreError, CoreResult};
use gantry_core::ids::{DeployGroupId, DeployId, StageId};
use gantry_core::model::{
    Deploy, DeployGroup, DeployStatus, Environment, LockTarget, ResolvedEnv, Stage, User,
};
use gantry_core::scope::{self, ResolveContext};
use gantry_core::store::MemoryStore;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Creates and tracks deploys, one active deploy per stage at a time.
pub struct DeployScheduler {
    store: Arc<MemoryStore>,
    locks: Arc<LockManager>,
    config: Config,
    create_gate: Mutex<()>,
    // Memoized active deploy per stage; entries are dropped on any
    // mutating call for that stage.
    current_cache: Mutex<HashMap<StageId, Option<DeployId>>>,
}

impl DeployScheduler {
    /// Create a scheduler over the given store and lock manager.
    pub fn new(store: Arc<MemoryStore>, locks: Arc<LockManager>, config: Config) -> Self {
        Self {
            store,
            locks,
            config,
            create_gate: Mutex::new(()),
            current_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a deploy of `reference` to a stage, as `user`.
    ///
    /// Fails with [`CoreError::AlreadyLocked`] when the stage (or the
    /// global target) is locked by someone else — warning locks may be
    /// bypassed when the config policy allows it, hard locks never — and
    /// with [`CoreError::ConcurrentActiveDeploy`] when the stage already
    /// has a pending or running deploy. On success the new deploy is
    /// `pending`, carries the effective environment for every deploy
    /// target, and is a release unless the stage ships no code.
    pub fn create_deploy(
        &self,
        stage_id: StageId,
        user: &User,
        reference: &str,
    ) -> CoreResult<Deploy> {
        if reference.trim().is_empty() {
            return Err(CoreError::validation("deploy reference must not be empty"));
        }

        let _gate = self.create_gate.lock().unwrap_or_else(|e| e.into_inner());

        let stage = self.store.stage(stage_id)?;

        // Every covering lock must pass, not just the winning one: a
        // foreign hard stage lock still blocks while the user holds the
        // global lock.
        for lock in self.locks.covering(LockTarget::stage(stage_id)) {
            let bypassable = lock.warning && self.config.warning_lock_bypass;
            if lock.owner != user.id && !bypassable {
                return Err(CoreError::AlreadyLocked {
                    target: lock.target.to_string(),
                    owner: lock.owner.as_u64(),
                });
            }
        }

        if let Some(active) = self
            .store
            .deploys_of_stage(stage_id)
            .into_iter()
            .find(Deploy::is_active)
        {
            return Err(CoreError::ConcurrentActiveDeploy {
                stage: stage_id.as_u64(),
                deploy: active.id.as_u64(),
            });
        }

        let env = self.resolve_env_for_stage(&stage)?;
        let now = Utc::now();
        let deploy = self.store.create_deploy(Deploy {
            id: DeployId::new(0),
            stage_id,
            reference: reference.to_string(),
            status: DeployStatus::Pending,
            release: !stage.no_code_deployed,
            started_by: user.id,
            env,
            created_at: now,
            updated_at: now,
        });
        self.invalidate(stage_id);
        log::debug!(
            "created deploy {} of {} on stage {}",
            deploy.id,
            deploy.reference,
            stage_id
        );
        Ok(deploy)
    }

    /// Transition a pending deploy to running.
    pub fn start(&self, deploy_id: DeployId) -> CoreResult<Deploy> {
        self.transition(deploy_id, DeployStatus::Running, &[DeployStatus::Pending])
    }

    /// Finish a running deploy with a natural terminal outcome
    /// (succeeded, failed, or errored).
    pub fn finish(&self, deploy_id: DeployId, outcome: DeployStatus) -> CoreResult<Deploy> {
        if !outcome.finished_naturally() {
            return Err(CoreError::validation(format!(
                "{outcome} is not a natural terminal outcome"
            )));
        }
        self.transition(deploy_id, outcome, &[DeployStatus::Running])
    }

    /// Cancel an active deploy.
    ///
    /// Cancellation is a state transition, not an interrupt: locks held
    /// for the deploy and any in-flight resolved configuration are the
    /// canceller's responsibility.
    pub fn cancel(&self, deploy_id: DeployId) -> CoreResult<Deploy> {
        self.transition(
            deploy_id,
            DeployStatus::Cancelled,
            &[DeployStatus::Pending, DeployStatus::Running],
        )
    }

    /// The active deploy of a stage, if any. Memoized until the next
    /// mutating call for the stage.
    pub fn current_deploy(&self, stage_id: StageId) -> CoreResult<Option<Deploy>> {
        let cached = {
            let cache = self
                .current_cache
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            cache.get(&stage_id).copied()
        };

        let deploy_id = match cached {
            Some(hit) => hit,
            None => {
                self.store.stage(stage_id)?;
                let found = self
                    .store
                    .deploys_of_stage(stage_id)
                    .into_iter()
                    .find(Deploy::is_active)
                    .map(|d| d.id);
                self.current_cache
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(stage_id, found);
                found
            }
        };

        match deploy_id {
            Some(id) => Ok(Some(self.store.deploy(id)?)),
            None => Ok(None),
        }
    }

    /// Whether the stage has an active deploy.
    pub fn currently_deploying(&self, stage_id: StageId) -> CoreResult<bool> {
        Ok(self.current_deploy(stage_id)?.is_some())
    }

    /// The most recent deploy of a stage by creation order.
    pub fn last_deploy(&self, stage_id: StageId) -> CoreResult<Option<Deploy>> {
        self.store.stage(stage_id)?;
        Ok(self.store.deploys_of_stage(stage_id).into_iter().next())
    }

    /// The most recent successful deploy of a stage.
    pub fn last_successful_deploy(&self, stage_id: StageId) -> CoreResult<Option<Deploy>> {
        self.store.stage(stage_id)?;
        Ok(self
            .store
            .deploys_of_stage(stage_id)
            .into_iter()
            .find(Deploy::succeeded))
    }

    /// Whether `version` is what the stage last successfully deployed.
    pub fn current_release(&self, stage_id: StageId, version: &str) -> CoreResult<bool> {
        Ok(self
            .last_successful_deploy(stage_id)?
            .is_some_and(|d| d.reference == version))
    }

    /// Stages that currently have an active deploy of `reference`.
    pub fn reference_being_deployed(&self, reference: &str) -> Vec<StageId> {
        let mut seen = HashSet::new();
        self.store
            .all_deploys()
            .into_iter()
            .filter(|d| d.is_active() && d.reference == reference)
            .filter_map(|d| seen.insert(d.stage_id).then_some(d.stage_id))
            .collect()
    }

    /// Deploy groups of a stage, in name order.
    pub fn deploy_groups_of(&self, stage_id: StageId) -> CoreResult<Vec<DeployGroup>> {
        let stage = self.store.stage(stage_id)?;
        let mut groups = stage
            .deploy_group_ids
            .iter()
            .map(|id| self.store.deploy_group(*id))
            .collect::<CoreResult<Vec<_>>>()?;
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    /// Distinct environments of a stage's deploy groups.
    pub fn environments_of(&self, stage_id: StageId) -> CoreResult<Vec<Environment>> {
        let mut seen = HashSet::new();
        let mut environments = Vec::new();
        for group in self.deploy_groups_of(stage_id)? {
            if seen.insert(group.environment_id) {
                environments.push(self.store.environment(group.environment_id)?);
            }
        }
        Ok(environments)
    }

    /// Production classification of a stage.
    ///
    /// With deploy groups disabled, or no groups associated, the stage's
    /// own flag decides; otherwise the stage is production when any of its
    /// groups' environments is.
    pub fn production(&self, stage_id: StageId) -> CoreResult<bool> {
        let stage = self.store.stage(stage_id)?;
        if !self.config.deploy_groups_enabled || stage.deploy_group_ids.is_empty() {
            return Ok(stage.production);
        }
        Ok(self
            .environments_of(stage_id)?
            .iter()
            .any(|env| env.production))
    }

    /// The effective environment variable map for one target of a stage,
    /// the view a deployment-target consumer (e.g. Kubernetes) receives.
    pub fn effective_env(
        &self,
        stage_id: StageId,
        deploy_group_id: Option<DeployGroupId>,
    ) -> CoreResult<BTreeMap<String, String>> {
        let stage = self.store.stage(stage_id)?;
        let groups = self.store.variable_groups_by_name(&stage.variable_group_ids)?;
        let ctx = self.target_context(deploy_group_id)?;
        scope::resolve(groups.iter(), &ctx)
    }

    /// Resolve the environment for every deploy target of a stage: one
    /// entry per deploy group, or a single unscoped entry when the stage
    /// has none.
    fn resolve_env_for_stage(&self, stage: &Stage) -> CoreResult<Vec<ResolvedEnv>> {
        let groups = self.store.variable_groups_by_name(&stage.variable_group_ids)?;

        if stage.deploy_group_ids.is_empty() {
            return Ok(vec![ResolvedEnv {
                deploy_group_id: None,
                vars: scope::resolve(groups.iter(), &ResolveContext::default())?,
            }]);
        }

        let mut targets = stage
            .deploy_group_ids
            .iter()
            .map(|id| self.store.deploy_group(*id))
            .collect::<CoreResult<Vec<_>>>()?;
        targets.sort_by(|a, b| a.name.cmp(&b.name));

        targets
            .into_iter()
            .map(|target| {
                let ctx = ResolveContext::new(Some(target.environment_id), Some(target.id));
                Ok(ResolvedEnv {
                    deploy_group_id: Some(target.id),
                    vars: scope::resolve(groups.iter(), &ctx)?,
                })
            })
            .collect()
    }

    /// Build the resolve context for an optional deploy-group target.
    fn target_context(&self, deploy_group_id: Option<DeployGroupId>) -> CoreResult<ResolveContext> {
        match deploy_group_id {
            Some(id) => {
                let group = self.store.deploy_group(id)?;
                Ok(ResolveContext::new(Some(group.environment_id), Some(id)))
            }
            None => Ok(ResolveContext::default()),
        }
    }

    /// Apply a status transition atomically, requiring the current status
    /// to be one of `from`.
    fn transition(
        &self,
        deploy_id: DeployId,
        to: DeployStatus,
        from: &[DeployStatus],
    ) -> CoreResult<Deploy> {
        let mut rejected = None;
        let deploy = self.store.update_deploy(deploy_id, |d| {
            if from.contains(&d.status) {
                d.status = to;
                d.updated_at = Utc::now();
            } else {
                rejected = Some(d.status);
            }
        })?;
        if let Some(status) = rejected {
            return Err(CoreError::validation(format!(
                "deploy {deploy_id} cannot go from {status} to {to}"
            )));
        }
        self.invalidate(deploy.stage_id);
        log::debug!("deploy {} is now {}", deploy.id, deploy.status);
        Ok(deploy)
    }

    fn invalidate(&self, stage_id: StageId) {
        self.current_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&stage_id);
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
