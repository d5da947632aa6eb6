//! Shared fixtures for engine tests.

use gantry_core::ids::{ProjectId, StageId};
use gantry_core::model::{Stage, StageDraft};
use gantry_core::store::MemoryStore;

/// Insert a stage built from a draft, with `customize` applied before the
/// insert.
pub fn stage_with(
    store: &MemoryStore,
    project_id: ProjectId,
    name: &str,
    order: u32,
    customize: impl FnOnce(&mut Stage),
) -> Stage {
    let draft = StageDraft::named(name);
    let mut stage = Stage {
        id: StageId::new(0),
        project_id,
        name: draft.name,
        order,
        template_stage_id: None,
        command_ids: draft.command_ids,
        deploy_group_ids: draft.deploy_group_ids,
        variable_group_ids: draft.variable_group_ids,
        next_stage_ids: vec![],
        production: false,
        no_code_deployed: false,
        deploy_on_release: false,
        email_committers_on_automated_deploy_failure: false,
        static_emails_on_automated_deploy_failure: None,
        notify_email_address: None,
    };
    customize(&mut stage);
    store.create_stage(stage)
}

/// Insert a plain stage.
pub fn stage(store: &MemoryStore, project_id: ProjectId, name: &str, order: u32) -> Stage {
    stage_with(store, project_id, name, order, |_| {})
}
