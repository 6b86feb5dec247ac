use smallvec::SmallVec;

use crate::foundation::core::{NodeId, Point, Rect, SceneId, Transform, Vec2};
use crate::graph::node::Node;
use crate::graph::scene::Scene;

/// A transient set of node ids scoped to one scene.
///
/// Selections are rebuilt per gesture or API call and deliberately lenient:
/// ids unknown to the scene are dropped at construction, and ids that die
/// afterwards are dropped on read. Bulk geometric operations fan out to the
/// selected items (folders expand to their nested items) and silently skip
/// locked members.
#[derive(Clone, Debug)]
pub struct Selection {
    scene: SceneId,
    ids: SmallVec<[NodeId; 8]>,
}

/// One planned transform change: the item, its transform before, and after.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformDelta {
    pub id: NodeId,
    pub before: Transform,
    pub after: Transform,
}

/// The geometric bulk operations a selection supports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformOp {
    Translate { dx: f64, dy: f64 },
    Resize { factor: f64, anchor: Point },
    Rotate { degrees: f64 },
    FlipX,
    FlipY,
}

impl Selection {
    /// Build a selection, keeping the supplied order, dropping duplicates and
    /// ids the scene does not currently contain.
    pub fn new(scene: &Scene, ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut kept: SmallVec<[NodeId; 8]> = SmallVec::new();
        for id in ids {
            if scene.contains(id) && !kept.contains(&id) {
                kept.push(id);
            }
        }
        Self {
            scene: scene.id(),
            ids: kept,
        }
    }

    pub fn scene_id(&self) -> SceneId {
        self.scene
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected nodes in selection order; ids deleted since construction are
    /// silently dropped.
    pub fn nodes<'a>(&self, scene: &'a Scene) -> Vec<&'a Node> {
        if scene.id() != self.scene {
            return Vec::new();
        }
        self.ids.iter().filter_map(|&id| scene.node(id)).collect()
    }

    /// Selected items with folders expanded to their nested items, in
    /// selection order, deduplicated. A selection is scoped to the scene it
    /// was built from; against any other scene it resolves to nothing, even
    /// if ids happen to overlap.
    pub fn items(&self, scene: &Scene) -> Vec<NodeId> {
        if scene.id() != self.scene {
            return Vec::new();
        }
        let mut out = Vec::new();
        for &id in &self.ids {
            for item in scene.nested_items(id) {
                if !out.contains(&item) {
                    out.push(item);
                }
            }
        }
        out
    }

    /// Like [`Selection::items`] but without locked items; the set a
    /// transform op actually touches.
    pub fn unlocked_items(&self, scene: &Scene) -> Vec<NodeId> {
        self.items(scene)
            .into_iter()
            .filter(|&id| !scene.node(id).is_some_and(Node::is_locked))
            .collect()
    }

    /// Union of the selected items' placement bounds, locked items included;
    /// the selection's geometry, not its mutable subset. `None` for an empty
    /// selection.
    pub fn bounding_box(&self, scene: &Scene) -> Option<Rect> {
        let mut acc: Option<Rect> = None;
        for id in self.items(scene) {
            let Some(item) = scene.node(id).and_then(Node::as_item) else {
                continue;
            };
            let r = item.transform.bounds(item.source.size);
            acc = Some(match acc {
                None => r,
                Some(a) => a.union(r),
            });
        }
        acc
    }

    /// Compute the per-item transform changes `op` would make, without
    /// mutating anything. Locked items are skipped; an empty plan means the
    /// operation is a no-op.
    ///
    /// Flips pivot about the shared center: a lone selected item flips about
    /// its own bounds center, while a wider selection flips about the union
    /// bounding box of every selected item, locked members included, so the
    /// selection mirrors coherently even when parts of it cannot move.
    pub fn plan(&self, scene: &Scene, op: TransformOp) -> Vec<TransformDelta> {
        let targets = self.unlocked_items(scene);
        if targets.is_empty() {
            return Vec::new();
        }
        let pivot = match op {
            TransformOp::FlipX | TransformOp::FlipY => match self.bounding_box(scene) {
                Some(b) => b.center(),
                None => return Vec::new(),
            },
            _ => Point::ZERO,
        };

        let mut deltas = Vec::with_capacity(targets.len());
        for id in targets {
            let Some(item) = scene.node(id).and_then(Node::as_item) else {
                continue;
            };
            let before = item.transform;
            let mut after = before;
            match op {
                TransformOp::Translate { dx, dy } => {
                    after.position += Vec2::new(dx, dy);
                }
                TransformOp::Resize { factor, anchor } => {
                    after.scale = after.scale * factor;
                    after.position = Vec2::new(
                        anchor.x + (before.position.x - anchor.x) * factor,
                        anchor.y + (before.position.y - anchor.y) * factor,
                    );
                }
                TransformOp::Rotate { degrees } => {
                    after.rotate_by(degrees);
                }
                TransformOp::FlipX => {
                    let r = before.bounds(item.source.size);
                    after.position.x = 2.0 * pivot.x - r.x1;
                    after.scale.x = -after.scale.x;
                }
                TransformOp::FlipY => {
                    let r = before.bounds(item.source.size);
                    after.position.y = 2.0 * pivot.y - r.y1;
                    after.scale.y = -after.scale.y;
                }
            }
            deltas.push(TransformDelta { id, before, after });
        }
        deltas
    }

    fn apply(&self, scene: &mut Scene, op: TransformOp) {
        for delta in self.plan(scene, op) {
            // Planned against the live scene an instant ago; cannot be stale.
            let _ = scene.set_transform(delta.id, delta.after);
        }
    }

    /// Move every selected item by `(dx, dy)`.
    pub fn translate(&self, scene: &mut Scene, dx: f64, dy: f64) {
        self.apply(scene, TransformOp::Translate { dx, dy });
    }

    /// Scale every selected item by `factor` about `anchor`.
    pub fn resize(&self, scene: &mut Scene, factor: f64, anchor: Point) {
        self.apply(scene, TransformOp::Resize { factor, anchor });
    }

    /// Rotate every selected item by `degrees` (each about its own pivot).
    pub fn rotate(&self, scene: &mut Scene, degrees: f64) {
        self.apply(scene, TransformOp::Rotate { degrees });
    }

    /// Mirror the selection horizontally about its shared pivot.
    pub fn flip_x(&self, scene: &mut Scene) {
        self.apply(scene, TransformOp::FlipX);
    }

    /// Mirror the selection vertically about its shared pivot.
    pub fn flip_y(&self, scene: &mut Scene) {
        self.apply(scene, TransformOp::FlipY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{SceneId, SourceRef};

    fn scene_with(items: &[(f64, f64)]) -> (Scene, Vec<NodeId>) {
        let mut s = Scene::new(SceneId(1), "sel");
        let mut ids = Vec::new();
        // add_item prepends; add in reverse so ids come out in argument order
        for (i, &(x, y)) in items.iter().enumerate().rev() {
            let id = s
                .add_item(SourceRef::new(i as u64, 20.0, 20.0), format!("i{i}"))
                .unwrap();
            let node = s.node(id).unwrap().as_item().unwrap();
            let mut t = node.transform;
            t.position = Vec2::new(x, y);
            s.set_transform(id, t).unwrap();
            ids.push(id);
        }
        ids.reverse();
        (s, ids)
    }

    #[test]
    fn construction_drops_unknown_and_duplicate_ids() {
        let (s, ids) = scene_with(&[(0.0, 0.0)]);
        let sel = Selection::new(&s, vec![ids[0], NodeId(999), ids[0]]);
        assert_eq!(sel.ids(), &[ids[0]]);
    }

    #[test]
    fn selection_is_inert_against_a_different_scene() {
        let (s, ids) = scene_with(&[(5.0, 5.0)]);
        let sel = Selection::new(&s, ids.clone());

        // A second scene allocates the same numeric ids from zero.
        let mut other = Scene::new(SceneId(2), "other");
        let stray = other.add_item(SourceRef::new(9, 20.0, 20.0), "stray").unwrap();
        assert_eq!(stray, ids[0]);

        sel.translate(&mut other, 50.0, 0.0);
        let p = other.node(stray).unwrap().as_item().unwrap().transform.position;
        assert_eq!(p, Vec2::ZERO);
        assert!(sel.nodes(&other).is_empty());
        assert!(sel.items(&other).is_empty());
    }

    #[test]
    fn translate_moves_all_members() {
        let (mut s, ids) = scene_with(&[(0.0, 0.0), (10.0, 5.0)]);
        let sel = Selection::new(&s, ids.clone());
        sel.translate(&mut s, 3.0, -2.0);
        let p0 = s.node(ids[0]).unwrap().as_item().unwrap().transform.position;
        let p1 = s.node(ids[1]).unwrap().as_item().unwrap().transform.position;
        assert_eq!(p0, Vec2::new(3.0, -2.0));
        assert_eq!(p1, Vec2::new(13.0, 3.0));
    }

    #[test]
    fn single_item_flip_is_idempotent_when_doubled() {
        let (mut s, ids) = scene_with(&[(7.0, 11.0)]);
        let sel = Selection::new(&s, ids.clone());
        let before = s.node(ids[0]).unwrap().as_item().unwrap().transform;
        sel.flip_x(&mut s);
        let mid = s.node(ids[0]).unwrap().as_item().unwrap().transform;
        assert_eq!(mid.position, before.position); // own-center flip keeps the rect
        assert_eq!(mid.scale.x, -before.scale.x);
        sel.flip_x(&mut s);
        let after = s.node(ids[0]).unwrap().as_item().unwrap().transform;
        assert_eq!(after, before);
    }

    #[test]
    fn multi_item_flip_mirrors_about_shared_pivot() {
        // Two 20px items at x=10 and x=30: bbox spans x:[10,50], pivot x=30.
        let (mut s, ids) = scene_with(&[(10.0, 0.0), (30.0, 0.0)]);
        let sel = Selection::new(&s, ids.clone());
        sel.flip_x(&mut s);
        let x0 = s.node(ids[0]).unwrap().as_item().unwrap().transform.position.x;
        let x1 = s.node(ids[1]).unwrap().as_item().unwrap().transform.position.x;
        // Items swap relative positions: [10,30] -> [30,50] mirrors to [10,30].
        assert_eq!(x0, 30.0);
        assert_eq!(x1, 10.0);
    }

    #[test]
    fn locked_items_are_skipped_not_failed() {
        let (mut s, ids) = scene_with(&[(0.0, 0.0), (10.0, 0.0)]);
        s.set_locked(ids[0], true).unwrap();
        let sel = Selection::new(&s, ids.clone());
        sel.translate(&mut s, 5.0, 0.0);
        let p0 = s.node(ids[0]).unwrap().as_item().unwrap().transform.position;
        let p1 = s.node(ids[1]).unwrap().as_item().unwrap().transform.position;
        assert_eq!(p0.x, 0.0);
        assert_eq!(p1.x, 15.0);
    }

    #[test]
    fn fully_locked_selection_is_a_no_op() {
        let (mut s, ids) = scene_with(&[(0.0, 0.0)]);
        s.set_locked(ids[0], true).unwrap();
        let sel = Selection::new(&s, ids.clone());
        assert!(sel.plan(&s, TransformOp::FlipX).is_empty());
        // Locking gates mutation, not geometry.
        assert!(sel.bounding_box(&s).is_some());
    }

    #[test]
    fn folders_expand_to_nested_items() {
        let mut s = Scene::new(SceneId(1), "sel");
        let item = s.add_item(SourceRef::new(0, 10.0, 10.0), "i").unwrap();
        let folder = s.add_folder("f").unwrap();
        s.reparent(item, Some(folder), 0).unwrap();
        let sel = Selection::new(&s, vec![folder]);
        assert_eq!(sel.items(&s), vec![item]);
        sel.translate(&mut s, 1.0, 0.0);
        assert_eq!(
            s.node(item).unwrap().as_item().unwrap().transform.position.x,
            1.0
        );
    }

    #[test]
    fn rotation_accumulates_per_item_and_wraps() {
        let (mut s, ids) = scene_with(&[(0.0, 0.0)]);
        let sel = Selection::new(&s, ids.clone());
        sel.rotate(&mut s, 350.0);
        sel.rotate(&mut s, 20.0);
        let deg = s.node(ids[0]).unwrap().as_item().unwrap().transform.rotation_deg;
        assert_eq!(deg, 10.0);
    }

    #[test]
    fn resize_scales_position_about_anchor() {
        let (mut s, ids) = scene_with(&[(10.0, 10.0)]);
        let sel = Selection::new(&s, ids.clone());
        sel.resize(&mut s, 2.0, Point::new(0.0, 0.0));
        let t = s.node(ids[0]).unwrap().as_item().unwrap().transform;
        assert_eq!(t.position, Vec2::new(20.0, 20.0));
        assert_eq!(t.scale, Vec2::new(2.0, 2.0));
    }
}
