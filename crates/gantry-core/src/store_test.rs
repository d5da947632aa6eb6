use super::*;
use crate::model::{DeployStatus, StageDraft};
use crate::scope::VariableScope;
use chrono::Utc;

fn draft_stage(project_id: ProjectId, name: &str, order: u32) -> Stage {
    let draft = StageDraft::named(name);
    Stage {
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
    }
}

fn draft_deploy(stage_id: StageId, reference: &str, user: UserId) -> Deploy {
    Deploy {
        id: DeployId::new(0),
        stage_id,
        reference: reference.to_string(),
        status: DeployStatus::Pending,
        release: true,
        started_by: user,
        env: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_create_assigns_monotone_ids() {
    let store = MemoryStore::new();
    let p1 = store.create_project("a");
    let p2 = store.create_project("b");
    assert!(p1.id < p2.id);
}

#[test]
fn test_stage_read_update_delete() {
    let store = MemoryStore::new();
    let project = store.create_project("app");
    let stage = store.create_stage(draft_stage(project.id, "staging", 0));

    let updated = store
        .update_stage(stage.id, |s| s.production = true)
        .unwrap();
    assert!(updated.production);
    assert!(store.stage(stage.id).unwrap().production);

    store.delete_stage(stage.id).unwrap();
    assert!(matches!(
        store.stage(stage.id),
        Err(CoreError::NotFound { entity: "stage", .. })
    ));
}

#[test]
fn test_stages_of_project_ordered() {
    let store = MemoryStore::new();
    let project = store.create_project("app");
    store.create_stage(draft_stage(project.id, "c", 2));
    store.create_stage(draft_stage(project.id, "a", 0));
    store.create_stage(draft_stage(project.id, "b", 1));

    let names: Vec<String> = store
        .stages_of_project(project.id)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_stages_of_project_scoped() {
    let store = MemoryStore::new();
    let p1 = store.create_project("one");
    let p2 = store.create_project("two");
    store.create_stage(draft_stage(p1.id, "s1", 0));
    store.create_stage(draft_stage(p2.id, "s2", 0));

    assert_eq!(store.stages_of_project(p1.id).len(), 1);
    assert_eq!(store.stages_of_project(p2.id).len(), 1);
}

#[test]
fn test_deploys_of_stage_newest_first() {
    let store = MemoryStore::new();
    let project = store.create_project("app");
    let stage = store.create_stage(draft_stage(project.id, "staging", 0));
    let user = store.create_user("dev@x.com", false);

    let d1 = store.create_deploy(draft_deploy(stage.id, "v1", user.id));
    let d2 = store.create_deploy(draft_deploy(stage.id, "v2", user.id));

    let deploys = store.deploys_of_stage(stage.id);
    assert_eq!(deploys.len(), 2);
    assert_eq!(deploys[0].id, d2.id);
    assert_eq!(deploys[1].id, d1.id);
}

#[test]
fn test_clones_of_stage() {
    let store = MemoryStore::new();
    let project = store.create_project("app");
    let template = store.create_stage(draft_stage(project.id, "template", 0));
    let mut clone = draft_stage(project.id, "clone", 1);
    clone.template_stage_id = Some(template.id);
    let clone = store.create_stage(clone);

    let clones = store.clones_of_stage(template.id);
    assert_eq!(clones.len(), 1);
    assert_eq!(clones[0].id, clone.id);
    assert!(store.clones_of_stage(clone.id).is_empty());
}

#[test]
fn test_variable_groups_by_name_sorted() {
    let store = MemoryStore::new();
    let beta = store.create_variable_group("beta", vec![]);
    let alpha = store.create_variable_group("alpha", vec![]);

    let groups = store.variable_groups_by_name(&[beta.id, alpha.id]).unwrap();
    assert_eq!(groups[0].name, "alpha");
    assert_eq!(groups[1].name, "beta");
}

#[test]
fn test_variable_groups_by_name_unknown_id() {
    let store = MemoryStore::new();
    let result = store.variable_groups_by_name(&[VariableGroupId::new(999)]);
    assert!(matches!(result, Err(CoreError::NotFound { .. })));
}

#[test]
fn test_stage_write_count_tracks_updates() {
    let store = MemoryStore::new();
    let project = store.create_project("app");
    let stage = store.create_stage(draft_stage(project.id, "staging", 0));

    assert_eq!(store.stage_write_count(), 0);
    store.update_stage(stage.id, |s| s.order = 1).unwrap();
    store.update_stage(stage.id, |s| s.order = 2).unwrap();
    assert_eq!(store.stage_write_count(), 2);
}

#[test]
fn test_variable_group_holds_scoped_variables() {
    let store = MemoryStore::new();
    let group = store.create_variable_group(
        "defaults",
        vec![EnvironmentVariable::new("K", "v", VariableScope::All)],
    );
    let loaded = store.variable_group(group.id).unwrap();
    assert_eq!(loaded.variables.len(), 1);
    assert_eq!(loaded.variables[0].scope, VariableScope::All);
}
