use super::*;
use gantry_core::ids::CommandId;

fn fixture() -> (Arc<MemoryStore>, PipelineGraph, ProjectId) {
    let store = Arc::new(MemoryStore::new());
    let project = store.create_project("app");
    let graph = PipelineGraph::new(store.clone());
    (store, graph, project.id)
}

fn assert_contiguous_orders(store: &MemoryStore, project_id: ProjectId) {
    let orders: Vec<u32> = store
        .stages_of_project(project_id)
        .iter()
        .map(|s| s.order)
        .collect();
    let expected: Vec<u32> = (0..orders.len() as u32).collect();
    assert_eq!(orders, expected);
}

#[test]
fn test_append_assigns_contiguous_orders() {
    let (store, graph, project_id) = fixture();

    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    let c = graph.append(project_id, StageDraft::named("c")).unwrap();

    assert_eq!(a.order, 0);
    assert_eq!(b.order, 1);
    assert_eq!(c.order, 2);
    assert_contiguous_orders(&store, project_id);
}

#[test]
fn test_append_unknown_project() {
    let (_store, graph, _) = fixture();
    let err = graph
        .append(ProjectId::new(999), StageDraft::named("a"))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "project", .. }));
}

#[test]
fn test_append_empty_name_rejected() {
    let (_store, graph, project_id) = fixture();
    let err = graph.append(project_id, StageDraft::default()).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[test]
fn test_append_duplicate_name_rejected() {
    let (store, graph, project_id) = fixture();
    graph.append(project_id, StageDraft::named("staging")).unwrap();

    let err = graph
        .append(project_id, StageDraft::named("staging"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    // Uniqueness is per project, not global.
    let other = store.create_project("other");
    graph.append(other.id, StageDraft::named("staging")).unwrap();
}

#[test]
fn test_concurrent_appends_keep_orders_unique() {
    let (store, graph, project_id) = fixture();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let graph = &graph;
            scope.spawn(move || {
                graph
                    .append(project_id, StageDraft::named(format!("s{i}")))
                    .unwrap();
            });
        }
    });

    assert_eq!(store.stages_of_project(project_id).len(), 8);
    assert_contiguous_orders(&store, project_id);
}

#[test]
fn test_reorder() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    let c = graph.append(project_id, StageDraft::named("c")).unwrap();

    graph.reorder(project_id, &[c.id, a.id, b.id]).unwrap();

    let names: Vec<String> = store
        .stages_of_project(project_id)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["c", "a", "b"]);
    assert_contiguous_orders(&store, project_id);
}

#[test]
fn test_reorder_unknown_stage() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();

    let err = graph
        .reorder(project_id, &[a.id, StageId::new(999)])
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "stage", .. }));
}

#[test]
fn test_reorder_duplicate_stage() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    graph.append(project_id, StageDraft::named("b")).unwrap();

    let err = graph.reorder(project_id, &[a.id, a.id]).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[test]
fn test_reorder_partial_list_rejected() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    graph.append(project_id, StageDraft::named("b")).unwrap();

    let err = graph.reorder(project_id, &[a.id]).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[test]
fn test_reorder_skips_unchanged_stages() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();

    let before = store.stage_write_count();
    graph.reorder(project_id, &[a.id, b.id]).unwrap();
    assert_eq!(store.stage_write_count(), before);
}

#[test]
fn test_build_clone_copies_attributes() {
    let (_store, graph, project_id) = fixture();
    let mut draft = StageDraft::named("template");
    draft.command_ids = vec![CommandId::new(5), CommandId::new(6)];
    draft.production = true;
    draft.notify_email_address = Some("ops@x.com".into());
    let template = graph.append(project_id, draft).unwrap();
    graph
        .set_next_stages(
            template.id,
            vec![graph.append(project_id, StageDraft::named("after")).unwrap().id],
        )
        .unwrap();

    let clone = graph.build_clone(template.id).unwrap();

    assert_ne!(clone.id, template.id);
    assert_eq!(clone.template_stage_id, Some(template.id));
    assert_eq!(clone.command_ids, template.command_ids);
    assert!(clone.production);
    assert_eq!(clone.notify_email_address.as_deref(), Some("ops@x.com"));
    // Pipeline edges are not copied.
    assert!(clone.next_stage_ids.is_empty());
    // The clone lands at the end of the pipeline.
    assert_eq!(clone.order, 2);
    assert_eq!(graph.clones(template.id).len(), 1);
}

#[test]
fn test_build_clone_fires_hooks_before_persist() {
    let (store, graph, project_id) = fixture();
    let template = graph.append(project_id, StageDraft::named("template")).unwrap();

    graph.hooks().on_stage_clone(|old, new| {
        new.name = format!("clone of {}", old.name);
    });

    let clone = graph.build_clone(template.id).unwrap();
    assert_eq!(clone.name, "clone of template");
    assert_eq!(store.stage(clone.id).unwrap().name, "clone of template");
}

#[test]
fn test_next_is_positional() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();

    // Explicit chain edges do not affect positional adjacency.
    graph.set_next_stages(b.id, vec![a.id]).unwrap();

    assert_eq!(graph.next(a.id).unwrap().unwrap().id, b.id);
    assert!(graph.next(b.id).unwrap().is_none());
}

#[test]
fn test_set_next_stages_rejects_self_reference() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();

    let err = graph.set_next_stages(a.id, vec![a.id]).unwrap_err();
    assert!(matches!(err, CoreError::Configuration { .. }));
}

#[test]
fn test_set_next_stages_rejects_dangling_edge() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let other_project = store.create_project("other");
    let foreign = graph
        .append(other_project.id, StageDraft::named("foreign"))
        .unwrap();

    let err = graph.set_next_stages(a.id, vec![foreign.id]).unwrap_err();
    assert!(matches!(err, CoreError::Configuration { .. }));
}

#[test]
fn test_set_next_stages_rejects_cycle() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    let c = graph.append(project_id, StageDraft::named("c")).unwrap();

    graph.set_next_stages(a.id, vec![b.id]).unwrap();
    graph.set_next_stages(b.id, vec![c.id]).unwrap();

    let err = graph.set_next_stages(c.id, vec![a.id]).unwrap_err();
    assert!(matches!(err, CoreError::Configuration { .. }));
}

#[test]
fn test_set_next_stages_rejects_duplicates() {
    let (_store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();

    let err = graph.set_next_stages(a.id, vec![b.id, b.id]).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[test]
fn test_set_next_stages_skips_noop_write() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();

    graph.set_next_stages(a.id, vec![b.id]).unwrap();
    let before = store.stage_write_count();
    graph.set_next_stages(a.id, vec![b.id]).unwrap();
    assert_eq!(store.stage_write_count(), before);
}

#[test]
fn test_destroy_removes_edges_from_referencing_stages() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    let c = graph.append(project_id, StageDraft::named("c")).unwrap();

    graph.set_next_stages(a.id, vec![c.id]).unwrap();
    graph.set_next_stages(b.id, vec![c.id]).unwrap();

    graph.destroy(c.id).unwrap();

    assert!(store.stage(a.id).unwrap().next_stage_ids.is_empty());
    assert!(store.stage(b.id).unwrap().next_stage_ids.is_empty());
    assert_contiguous_orders(&store, project_id);
}

#[test]
fn test_destroy_skips_untouched_stages() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    let c = graph.append(project_id, StageDraft::named("c")).unwrap();
    graph.set_next_stages(a.id, vec![c.id]).unwrap();

    // Destroying the last stage shifts no orders, so only the stage
    // referencing it gets rewritten.
    let before = store.stage_write_count();
    graph.destroy(c.id).unwrap();
    assert_eq!(store.stage_write_count(), before + 1);
    assert_eq!(store.stage(b.id).unwrap().order, 1);
}

#[test]
fn test_destroy_middle_stage_compacts_orders() {
    let (store, graph, project_id) = fixture();
    graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    graph.append(project_id, StageDraft::named("c")).unwrap();

    graph.destroy(b.id).unwrap();

    assert_contiguous_orders(&store, project_id);
    let names: Vec<String> = store
        .stages_of_project(project_id)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn test_destroy_unknown_stage() {
    let (_store, graph, _) = fixture();
    let err = graph.destroy(StageId::new(999)).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "stage", .. }));
}

#[test]
fn test_append_destroy_reorder_sequence_keeps_invariant() {
    let (store, graph, project_id) = fixture();
    let a = graph.append(project_id, StageDraft::named("a")).unwrap();
    let b = graph.append(project_id, StageDraft::named("b")).unwrap();
    let c = graph.append(project_id, StageDraft::named("c")).unwrap();

    graph.reorder(project_id, &[b.id, c.id, a.id]).unwrap();
    graph.destroy(c.id).unwrap();
    let d = graph.append(project_id, StageDraft::named("d")).unwrap();

    assert_eq!(d.order, 2);
    assert_contiguous_orders(&store, project_id);
}
