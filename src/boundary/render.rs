use crate::foundation::core::{NodeId, SourceRef, Transform};
use crate::graph::scene::Scene;

/// Read-only per-item state published to the render collaborator after a
/// command commits. Plain data; never a handle into graph internals.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemSnapshot {
    pub id: NodeId,
    pub source: SourceRef,
    pub transform: Transform,
    pub visible: bool,
    /// Paint-order item index; folders contribute no slot.
    pub z_index: usize,
}

/// Snapshot every item in paint order (topmost first). Hidden items are
/// included; the consumer filters on `visible`.
pub fn snapshots(scene: &Scene) -> Vec<ItemSnapshot> {
    scene
        .iter()
        .filter_map(|node| {
            let item = node.as_item()?;
            Some(ItemSnapshot {
                id: node.id,
                source: item.source,
                transform: item.transform,
                visible: item.visible,
                z_index: scene.item_index(node.id)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::SceneId;

    #[test]
    fn snapshots_skip_folders_and_carry_z_index() {
        let mut s = Scene::new(SceneId(1), "snap");
        let item2 = s.add_item(SourceRef::new(2, 10.0, 10.0), "i2").unwrap();
        let folder = s.add_folder("f").unwrap();
        let item1 = s.add_item(SourceRef::new(1, 10.0, 10.0), "i1").unwrap();
        s.reparent(item2, Some(folder), 0).unwrap();

        let snaps = snapshots(&s);
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].id, item1);
        assert_eq!(snaps[0].z_index, 0);
        assert_eq!(snaps[1].id, item2);
        assert_eq!(snaps[1].z_index, 1);
    }

    #[test]
    fn snapshots_report_hidden_items() {
        let mut s = Scene::new(SceneId(1), "snap");
        let item = s.add_item(SourceRef::new(1, 10.0, 10.0), "i").unwrap();
        s.set_visible(item, false).unwrap();
        let snaps = snapshots(&s);
        assert_eq!(snaps.len(), 1);
        assert!(!snaps[0].visible);
    }
}
