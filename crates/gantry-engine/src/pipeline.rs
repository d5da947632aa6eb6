//! Stage pipeline maintenance: ordering, cloning, and chain edges.
//!
//! All mutations of a project's stage set run inside a per-project critical
//! section so that `order` values stay unique and contiguous under
//! concurrent appends, reorders, and destroys. The explicit deploy-chain
//! graph (`next_stage_ids`) is validated at write time: self-references,
//! edges to stages outside the project, and cycles are configuration
//! errors.

use crate::hooks::CloneHooks;
use gantry_core::error::{CoreError, CoreResult};
use gantry_core::ids::{ProjectId, StageId};
use gantry_core::model::{Stage, StageDraft};
use gantry_core::store::MemoryStore;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Owns pipeline-shape mutations for every project.
pub struct PipelineGraph {
    store: Arc<MemoryStore>,
    hooks: CloneHooks,
    project_gates: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl PipelineGraph {
    /// Create a pipeline graph over the given store.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            hooks: CloneHooks::new(),
            project_gates: Mutex::new(HashMap::new()),
        }
    }

    /// The stage-clone hook registry.
    pub fn hooks(&self) -> &CloneHooks {
        &self.hooks
    }

    /// Append a new stage to the end of the project's pipeline.
    ///
    /// The name must be non-empty and unused within the project. Assigns
    /// `order = max(existing) + 1`, or 0 for the first stage, inside the
    /// project's critical section so concurrent appends cannot collide.
    pub fn append(&self, project_id: ProjectId, draft: StageDraft) -> CoreResult<Stage> {
        if draft.name.is_empty() {
            return Err(CoreError::validation("stage name must not be empty"));
        }
        self.store.project(project_id)?;

        let gate = self.project_gate(project_id);
        let _guard = gate.lock().unwrap_or_else(|e| e.into_inner());

        let stages = self.store.stages_of_project(project_id);
        if stages.iter().any(|s| s.name == draft.name) {
            return Err(CoreError::validation(format!(
                "stage name {:?} already used in project {project_id}",
                draft.name
            )));
        }
        let order = stages.iter().map(|s| s.order + 1).max().unwrap_or(0);

        let stage = self.store.create_stage(Stage {
            id: StageId::new(0),
            project_id,
            name: draft.name,
            order,
            template_stage_id: None,
            command_ids: draft.command_ids,
            deploy_group_ids: draft.deploy_group_ids,
            variable_group_ids: draft.variable_group_ids,
            next_stage_ids: vec![],
            production: draft.production,
            no_code_deployed: draft.no_code_deployed,
            deploy_on_release: draft.deploy_on_release,
            email_committers_on_automated_deploy_failure: draft
                .email_committers_on_automated_deploy_failure,
            static_emails_on_automated_deploy_failure: draft
                .static_emails_on_automated_deploy_failure,
            notify_email_address: draft.notify_email_address,
        });
        log::debug!(
            "appended stage {} to project {} at order {}",
            stage.id,
            project_id,
            order
        );
        Ok(stage)
    }

    /// Atomically rewrite every listed stage's `order` to its position in
    /// the list.
    ///
    /// The list must be a permutation of the project's stages: unknown ids
    /// fail with [`CoreError::NotFound`], duplicates or a partial list with
    /// [`CoreError::Validation`]. Stages whose order is already correct are
    /// not rewritten.
    pub fn reorder(&self, project_id: ProjectId, ordered: &[StageId]) -> CoreResult<()> {
        let gate = self.project_gate(project_id);
        let _guard = gate.lock().unwrap_or_else(|e| e.into_inner());

        let stages = self.store.stages_of_project(project_id);
        let known: HashMap<StageId, u32> = stages.iter().map(|s| (s.id, s.order)).collect();

        let mut seen = HashSet::new();
        for id in ordered {
            if !known.contains_key(id) {
                return Err(CoreError::NotFound {
                    entity: "stage",
                    id: id.as_u64(),
                });
            }
            if !seen.insert(*id) {
                return Err(CoreError::validation(format!(
                    "stage {id} listed twice in reorder"
                )));
            }
        }
        if ordered.len() != stages.len() {
            return Err(CoreError::validation(format!(
                "reorder list has {} stages, project has {}",
                ordered.len(),
                stages.len()
            )));
        }

        for (position, id) in ordered.iter().enumerate() {
            let position = position as u32;
            if known[id] != position {
                self.store.update_stage(*id, |s| s.order = position)?;
            }
        }
        Ok(())
    }

    /// Build and persist a clone of `template_id`.
    ///
    /// Copies all attributes except identity, order, and pipeline edges;
    /// the command list is shared by reference and `template_stage_id`
    /// points back at the source. Registered clone hooks run against the
    /// unsaved clone before it is persisted.
    pub fn build_clone(&self, template_id: StageId) -> CoreResult<Stage> {
        let template = self.store.stage(template_id)?;

        let mut clone = template.clone();
        clone.id = StageId::new(0);
        clone.order = 0;
        clone.next_stage_ids = vec![];
        clone.template_stage_id = Some(template.id);
        self.hooks.fire_stage_clone(&template, &mut clone);

        let gate = self.project_gate(template.project_id);
        let _guard = gate.lock().unwrap_or_else(|e| e.into_inner());

        clone.order = self
            .store
            .stages_of_project(template.project_id)
            .iter()
            .map(|s| s.order + 1)
            .max()
            .unwrap_or(0);
        let clone = self.store.create_stage(clone);
        log::debug!("cloned stage {} into {}", template.id, clone.id);
        Ok(clone)
    }

    /// Stages cloned from `template_id`.
    pub fn clones(&self, template_id: StageId) -> Vec<Stage> {
        self.store.clones_of_stage(template_id)
    }

    /// The positionally next stage in the same project, or `None` for the
    /// last stage.
    ///
    /// This is adjacency by `order`, independent of the explicit
    /// `next_stage_ids` chain.
    pub fn next(&self, stage_id: StageId) -> CoreResult<Option<Stage>> {
        let stage = self.store.stage(stage_id)?;
        Ok(self
            .store
            .stages_of_project(stage.project_id)
            .into_iter()
            .filter(|s| s.order > stage.order)
            .min_by_key(|s| s.order))
    }

    /// Replace the explicit deploy-chain edges of a stage.
    ///
    /// Validated at write time: duplicate targets are a validation error;
    /// self-references, targets outside the project, and cycles over the
    /// project's whole edge set are configuration errors. The write is
    /// skipped when the edge set is unchanged.
    pub fn set_next_stages(&self, stage_id: StageId, next: Vec<StageId>) -> CoreResult<Stage> {
        let stage = self.store.stage(stage_id)?;

        let gate = self.project_gate(stage.project_id);
        let _guard = gate.lock().unwrap_or_else(|e| e.into_inner());

        let mut seen = HashSet::new();
        for target in &next {
            if !seen.insert(*target) {
                return Err(CoreError::validation(format!(
                    "stage {target} listed twice in next stages"
                )));
            }
            if *target == stage_id {
                return Err(CoreError::configuration(format!(
                    "stage {stage_id} cannot chain to itself"
                )));
            }
        }

        let stages = self.store.stages_of_project(stage.project_id);
        let project_ids: HashSet<StageId> = stages.iter().map(|s| s.id).collect();
        for target in &next {
            if !project_ids.contains(target) {
                return Err(CoreError::configuration(format!(
                    "stage {stage_id} chains to {target}, which is not in the project"
                )));
            }
        }

        Self::validate_acyclic(&stages, stage_id, &next)?;

        if stage.next_stage_ids == next {
            log::debug!("next stages of {stage_id} unchanged, skipping write");
            return Ok(stage);
        }
        self.store
            .update_stage(stage_id, |s| s.next_stage_ids = next)
    }

    /// Remove a stage from its project.
    ///
    /// After deletion the stage's id is removed from every other stage's
    /// `next_stage_ids` and the remaining orders are compacted back to a
    /// contiguous range; only stages that actually changed are written.
    pub fn destroy(&self, stage_id: StageId) -> CoreResult<()> {
        let stage = self.store.stage(stage_id)?;

        let gate = self.project_gate(stage.project_id);
        let _guard = gate.lock().unwrap_or_else(|e| e.into_inner());

        self.store.delete_stage(stage_id)?;

        let survivors = self.store.stages_of_project(stage.project_id);
        for (position, survivor) in survivors.iter().enumerate() {
            let position = position as u32;
            let drops_edge = survivor.next_stage_ids.contains(&stage_id);
            if !drops_edge && survivor.order == position {
                continue;
            }
            self.store.update_stage(survivor.id, |s| {
                s.next_stage_ids.retain(|id| *id != stage_id);
                s.order = position;
            })?;
        }
        log::debug!(
            "destroyed stage {} in project {}",
            stage_id,
            stage.project_id
        );
        Ok(())
    }

    /// Check that replacing `stage_id`'s edges with `next` leaves the
    /// project's deploy-chain graph acyclic.
    fn validate_acyclic(
        stages: &[Stage],
        stage_id: StageId,
        next: &[StageId],
    ) -> CoreResult<()> {
        let mut graph: DiGraph<StageId, ()> = DiGraph::new();
        let mut node_map: HashMap<StageId, NodeIndex> = HashMap::new();

        for stage in stages {
            node_map.insert(stage.id, graph.add_node(stage.id));
        }
        for stage in stages {
            let edges: &[StageId] = if stage.id == stage_id {
                next
            } else {
                &stage.next_stage_ids
            };
            for target in edges {
                if let Some(&to) = node_map.get(target) {
                    graph.add_edge(node_map[&stage.id], to, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::configuration(format!(
                "pipeline cycle: {}",
                Self::find_cycle_path(&graph, cycle.node_id())
            ))),
        }
    }

    /// Find a cycle path starting from a node for error reporting.
    fn find_cycle_path(graph: &DiGraph<StageId, ()>, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = graph.edges(current).next() {
            let target = edge.target();
            path.push(graph[target].to_string());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// The mutex serializing mutations of one project's stage set.
    fn project_gate(&self, project_id: ProjectId) -> Arc<Mutex<()>> {
        let mut gates: MutexGuard<'_, HashMap<ProjectId, Arc<Mutex<()>>>> =
            self.project_gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.entry(project_id).or_default().clone()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
