use stagecraft::{NodeId, Removal, Scene, SceneId, SourceRef, StagecraftError};

fn src(id: u64) -> SourceRef {
    SourceRef::new(id, 50.0, 50.0)
}

/// Recompute item indices from the flat order per their defining recurrence
/// and compare with the scene's cached answers.
fn assert_item_index_invariant(scene: &Scene) {
    let mut prev: Option<usize> = None;
    for &id in scene.node_order() {
        let node = scene.node(id).unwrap();
        let expected = if node.is_folder() {
            prev.unwrap_or(0)
        } else {
            prev.map(|p| p + 1).unwrap_or(0)
        };
        assert_eq!(
            scene.item_index(id),
            Some(expected),
            "item index mismatch for {id}"
        );
        prev = Some(expected);
    }
}

#[test]
fn consistency_holds_across_a_mutation_sequence() {
    let mut s = Scene::new(SceneId(1), "seq");
    let mut ids: Vec<NodeId> = Vec::new();
    for i in 0..6 {
        ids.push(s.add_item(src(i), format!("item{i}")).unwrap());
    }
    let f1 = s.add_folder("f1").unwrap();
    let f2 = s.add_folder("f2").unwrap();

    s.reparent(ids[0], Some(f1), 0).unwrap();
    s.reparent(ids[1], Some(f1), 1).unwrap();
    s.reparent(ids[2], Some(f2), 0).unwrap();
    s.reparent(f2, Some(f1), 0).unwrap();
    s.check_consistency().unwrap();
    assert_item_index_invariant(&s);

    s.reorder(ids[3], 0).unwrap();
    s.reparent(ids[4], None, 2).unwrap();
    s.check_consistency().unwrap();
    assert_item_index_invariant(&s);

    s.remove_node(f1, Removal::Ungroup).unwrap();
    s.check_consistency().unwrap();
    assert_item_index_invariant(&s);

    s.remove_node(ids[5], Removal::Cascade).unwrap();
    s.check_consistency().unwrap();
    assert_item_index_invariant(&s);

    // node_order stays a permutation of the live node set.
    assert_eq!(s.node_order().len(), s.len());
}

#[test]
fn item_index_reference_scenario() {
    let mut s = Scene::new(SceneId(1), "ref");
    let item3 = s.add_item(src(3), "item3").unwrap();
    let item2 = s.add_item(src(2), "item2").unwrap();
    let folder1 = s.add_folder("folder1").unwrap();
    let item1 = s.add_item(src(1), "item1").unwrap();
    s.reparent(item2, Some(folder1), 0).unwrap();
    s.reparent(item3, Some(folder1), 1).unwrap();

    assert_eq!(s.node_order(), &[item1, folder1, item2, item3]);
    assert_eq!(s.item_index(item1), Some(0));
    assert_eq!(s.item_index(folder1), Some(0));
    assert_eq!(s.item_index(item2), Some(1));
    assert_eq!(s.item_index(item3), Some(2));
}

#[test]
fn deep_cycle_is_rejected_without_side_effects() {
    let mut s = Scene::new(SceneId(1), "cycle");
    let a = s.add_folder("a").unwrap();
    let b = s.add_folder("b").unwrap();
    let c = s.add_folder("c").unwrap();
    s.reparent(b, Some(a), 0).unwrap();
    s.reparent(c, Some(b), 0).unwrap();
    let before = s.node_order().to_vec();

    // c is nested two levels inside a.
    let err = s.reparent(a, Some(c), 0).unwrap_err();
    assert!(matches!(err, StagecraftError::CycleDetected { .. }));
    assert_eq!(s.node_order(), &before[..]);
    s.check_consistency().unwrap();
}

#[test]
fn read_paths_never_error_on_absent_ids() {
    let s = Scene::new(SceneId(1), "reads");
    let ghost = NodeId(123);
    assert!(s.node(ghost).is_none());
    assert!(s.item_index(ghost).is_none());
    assert!(s.placement_of(ghost).is_none());
    assert!(s.nested_items(ghost).is_empty());
}
