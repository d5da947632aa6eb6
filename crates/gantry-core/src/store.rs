//! In-memory record store: the reference backend for the persistence
//! boundary.
//!
//! The engine only needs create/read/update/delete by id plus ordered scans
//! (stages by project order, deploys newest-first). Each entity map sits
//! behind its own `RwLock`; invariants such as order contiguity or the
//! single-active-deploy rule are enforced by the engine's critical
//! sections, not here. Ids come from one monotone sequence, so id order is
//! creation order.

use crate::error::{CoreError, CoreResult};
use crate::ids::{
    DeployGroupId, DeployId, EnvironmentId, ProjectId, StageId, UserId, VariableGroupId,
};
use crate::model::{
    Deploy, DeployGroup, Environment, EnvironmentVariable, EnvironmentVariableGroup, Project,
    Stage, User,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Thread-safe in-memory store for every record kind.
#[derive(Debug)]
pub struct MemoryStore {
    projects: RwLock<BTreeMap<ProjectId, Project>>,
    stages: RwLock<BTreeMap<StageId, Stage>>,
    deploys: RwLock<BTreeMap<DeployId, Deploy>>,
    environments: RwLock<BTreeMap<EnvironmentId, Environment>>,
    deploy_groups: RwLock<BTreeMap<DeployGroupId, DeployGroup>>,
    variable_groups: RwLock<BTreeMap<VariableGroupId, EnvironmentVariableGroup>>,
    users: RwLock<BTreeMap<UserId, User>>,
    next_id: AtomicU64,
    stage_writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(BTreeMap::new()),
            stages: RwLock::new(BTreeMap::new()),
            deploys: RwLock::new(BTreeMap::new()),
            environments: RwLock::new(BTreeMap::new()),
            deploy_groups: RwLock::new(BTreeMap::new()),
            variable_groups: RwLock::new(BTreeMap::new()),
            users: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            stage_writes: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    // ── Projects ─────────────────────────────────────────────────────

    /// Create a project.
    pub fn create_project(&self, name: impl Into<String>) -> Project {
        let project = Project {
            id: ProjectId::new(self.next_id()),
            name: name.into(),
        };
        self.projects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(project.id, project.clone());
        project
    }

    /// Read a project by id.
    pub fn project(&self, id: ProjectId) -> CoreResult<Project> {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "project",
                id: id.as_u64(),
            })
    }

    // ── Stages ───────────────────────────────────────────────────────

    /// Insert a stage, assigning its id.
    pub fn create_stage(&self, mut stage: Stage) -> Stage {
        stage.id = StageId::new(self.next_id());
        log::debug!("creating stage {} ({})", stage.id, stage.name);
        self.stages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(stage.id, stage.clone());
        stage
    }

    /// Read a stage by id.
    pub fn stage(&self, id: StageId) -> CoreResult<Stage> {
        self.stages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "stage",
                id: id.as_u64(),
            })
    }

    /// Apply `f` to the stage and persist the result.
    pub fn update_stage(&self, id: StageId, f: impl FnOnce(&mut Stage)) -> CoreResult<Stage> {
        let mut stages = self.stages.write().unwrap_or_else(|e| e.into_inner());
        let stage = stages.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "stage",
            id: id.as_u64(),
        })?;
        f(stage);
        self.stage_writes.fetch_add(1, Ordering::SeqCst);
        Ok(stage.clone())
    }

    /// Remove a stage.
    pub fn delete_stage(&self, id: StageId) -> CoreResult<Stage> {
        log::debug!("deleting stage {id}");
        self.stages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .ok_or(CoreError::NotFound {
                entity: "stage",
                id: id.as_u64(),
            })
    }

    /// All stages of a project, ordered by their `order` field.
    pub fn stages_of_project(&self, project_id: ProjectId) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self
            .stages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        stages.sort_by_key(|s| s.order);
        stages
    }

    /// Stages cloned from the given template stage.
    pub fn clones_of_stage(&self, template_id: StageId) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self
            .stages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|s| s.template_stage_id == Some(template_id))
            .cloned()
            .collect();
        stages.sort_by_key(|s| s.id);
        stages
    }

    /// Total number of stage updates written, for write-avoidance checks.
    pub fn stage_write_count(&self) -> u64 {
        self.stage_writes.load(Ordering::SeqCst)
    }

    // ── Deploys ──────────────────────────────────────────────────────

    /// Insert a deploy, assigning its id.
    pub fn create_deploy(&self, mut deploy: Deploy) -> Deploy {
        deploy.id = DeployId::new(self.next_id());
        self.deploys
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(deploy.id, deploy.clone());
        deploy
    }

    /// Read a deploy by id.
    pub fn deploy(&self, id: DeployId) -> CoreResult<Deploy> {
        self.deploys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "deploy",
                id: id.as_u64(),
            })
    }

    /// Apply `f` to the deploy and persist the result.
    pub fn update_deploy(&self, id: DeployId, f: impl FnOnce(&mut Deploy)) -> CoreResult<Deploy> {
        let mut deploys = self.deploys.write().unwrap_or_else(|e| e.into_inner());
        let deploy = deploys.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "deploy",
            id: id.as_u64(),
        })?;
        f(deploy);
        Ok(deploy.clone())
    }

    /// All deploys of a stage, newest first.
    pub fn deploys_of_stage(&self, stage_id: StageId) -> Vec<Deploy> {
        let mut deploys: Vec<Deploy> = self
            .deploys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|d| d.stage_id == stage_id)
            .cloned()
            .collect();
        deploys.sort_by(|a, b| b.id.cmp(&a.id));
        deploys
    }

    /// All deploys across stages, newest first.
    pub fn all_deploys(&self) -> Vec<Deploy> {
        let mut deploys: Vec<Deploy> = self
            .deploys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        deploys.sort_by(|a, b| b.id.cmp(&a.id));
        deploys
    }

    // ── Environments and deploy groups ───────────────────────────────

    /// Create an environment.
    pub fn create_environment(&self, name: impl Into<String>, production: bool) -> Environment {
        let env = Environment {
            id: EnvironmentId::new(self.next_id()),
            name: name.into(),
            production,
        };
        self.environments
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(env.id, env.clone());
        env
    }

    /// Read an environment by id.
    pub fn environment(&self, id: EnvironmentId) -> CoreResult<Environment> {
        self.environments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "environment",
                id: id.as_u64(),
            })
    }

    /// Create a deploy group inside an environment.
    pub fn create_deploy_group(
        &self,
        name: impl Into<String>,
        environment_id: EnvironmentId,
    ) -> DeployGroup {
        let group = DeployGroup {
            id: DeployGroupId::new(self.next_id()),
            name: name.into(),
            environment_id,
        };
        self.deploy_groups
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(group.id, group.clone());
        group
    }

    /// Read a deploy group by id.
    pub fn deploy_group(&self, id: DeployGroupId) -> CoreResult<DeployGroup> {
        self.deploy_groups
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "deploy group",
                id: id.as_u64(),
            })
    }

    // ── Variable groups ──────────────────────────────────────────────

    /// Create an environment variable group.
    pub fn create_variable_group(
        &self,
        name: impl Into<String>,
        variables: Vec<EnvironmentVariable>,
    ) -> EnvironmentVariableGroup {
        let group = EnvironmentVariableGroup {
            id: VariableGroupId::new(self.next_id()),
            name: name.into(),
            variables,
        };
        self.variable_groups
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(group.id, group.clone());
        group
    }

    /// Read a variable group by id.
    pub fn variable_group(&self, id: VariableGroupId) -> CoreResult<EnvironmentVariableGroup> {
        self.variable_groups
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "variable group",
                id: id.as_u64(),
            })
    }

    /// Resolve the given group ids, returned in name order so that
    /// resolution is deterministic.
    pub fn variable_groups_by_name(
        &self,
        ids: &[VariableGroupId],
    ) -> CoreResult<Vec<EnvironmentVariableGroup>> {
        let mut groups = ids
            .iter()
            .map(|id| self.variable_group(*id))
            .collect::<CoreResult<Vec<_>>>()?;
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Create a user.
    pub fn create_user(&self, email: impl Into<String>, integration: bool) -> User {
        let user = User {
            id: UserId::new(self.next_id()),
            email: email.into(),
            integration,
        };
        self.users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.id, user.clone());
        user
    }

    /// Read a user by id.
    pub fn user(&self, id: UserId) -> CoreResult<User> {
        self.users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "user",
                id: id.as_u64(),
            })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
