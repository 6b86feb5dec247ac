use crate::foundation::core::{NodeId, Point, SourceRef};
use crate::foundation::error::{StagecraftError, StagecraftResult};
use crate::graph::node::Node;
use crate::graph::scene::{Placement, Removal, RemovedSubtree, Scene};
use crate::select::selection::{Selection, TransformDelta, TransformOp};

/// A reversible unit of graph mutation.
///
/// Every variant captures its *diff* when constructed: enough pre-state to
/// replay the edit forward ([`Command::apply`]) and to restore what it
/// overwrote ([`Command::revert`]). Both directions validate all their
/// preconditions before touching the scene, so a failing command leaves no
/// partial mutation behind.
#[derive(Clone, Debug)]
pub enum Command {
    /// Shared machinery for move/resize/rotate/flip: per-item transform
    /// snapshots before and after.
    ModifyTransform {
        description: String,
        deltas: Vec<TransformDelta>,
    },
    Reparent {
        description: String,
        id: NodeId,
        from: Placement,
        to: Placement,
    },
    Reorder {
        description: String,
        id: NodeId,
        from: usize,
        to: usize,
    },
    Remove {
        description: String,
        id: NodeId,
        mode: Removal,
        /// Captured by the first `apply`; `revert` restores from it.
        removed: Option<RemovedSubtree>,
    },
    CreateItem {
        description: String,
        source: SourceRef,
        name: String,
        /// Captured by the first `apply` so redo reinserts the same id.
        created: Option<(Node, Placement)>,
    },
    CreateFolder {
        description: String,
        name: String,
        created: Option<(Node, Placement)>,
    },
    SetVisible {
        description: String,
        value: bool,
        /// Affected items with their prior value.
        changed: Vec<(NodeId, bool)>,
    },
    SetLocked {
        description: String,
        value: bool,
        changed: Vec<(NodeId, bool)>,
    },
    Rename {
        description: String,
        id: NodeId,
        from: String,
        to: String,
    },
}

fn as_stale(err: StagecraftError) -> StagecraftError {
    match err {
        StagecraftError::NotFound(what) => StagecraftError::stale(what),
        other => other,
    }
}

impl Command {
    /// Human-readable label for undo-menu display.
    pub fn description(&self) -> &str {
        match self {
            Self::ModifyTransform { description, .. }
            | Self::Reparent { description, .. }
            | Self::Reorder { description, .. }
            | Self::Remove { description, .. }
            | Self::CreateItem { description, .. }
            | Self::CreateFolder { description, .. }
            | Self::SetVisible { description, .. }
            | Self::SetLocked { description, .. }
            | Self::Rename { description, .. } => description,
        }
    }

    fn transform_op(
        scene: &Scene,
        selection: &Selection,
        op: TransformOp,
        description: impl Into<String>,
    ) -> Option<Self> {
        let deltas = selection.plan(scene, op);
        if deltas.is_empty() {
            return None;
        }
        Some(Self::ModifyTransform {
            description: description.into(),
            deltas,
        })
    }

    /// Move the selection. `None` when the selection is empty or fully locked.
    pub fn translate(scene: &Scene, selection: &Selection, dx: f64, dy: f64) -> Option<Self> {
        Self::transform_op(
            scene,
            selection,
            TransformOp::Translate { dx, dy },
            "Move items",
        )
    }

    /// Scale the selection about `anchor`.
    pub fn resize(scene: &Scene, selection: &Selection, factor: f64, anchor: Point) -> Option<Self> {
        Self::transform_op(
            scene,
            selection,
            TransformOp::Resize { factor, anchor },
            "Resize items",
        )
    }

    /// Rotate each selected item about its own pivot.
    pub fn rotate(scene: &Scene, selection: &Selection, degrees: f64) -> Option<Self> {
        Self::transform_op(
            scene,
            selection,
            TransformOp::Rotate { degrees },
            "Rotate items",
        )
    }

    /// Mirror the selection horizontally about its shared pivot.
    pub fn flip_x(scene: &Scene, selection: &Selection) -> Option<Self> {
        Self::transform_op(scene, selection, TransformOp::FlipX, "Flip items horizontally")
    }

    /// Mirror the selection vertically about its shared pivot.
    pub fn flip_y(scene: &Scene, selection: &Selection) -> Option<Self> {
        Self::transform_op(scene, selection, TransformOp::FlipY, "Flip items vertically")
    }

    /// Move `id` under `parent` at `index`.
    pub fn reparent(
        scene: &Scene,
        id: NodeId,
        parent: Option<NodeId>,
        index: usize,
    ) -> StagecraftResult<Self> {
        let from = scene
            .placement_of(id)
            .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;
        let name = scene.node(id).map(|n| n.name.clone()).unwrap_or_default();
        Ok(Self::Reparent {
            description: format!("Move \"{name}\""),
            id,
            from,
            to: Placement { parent, index },
        })
    }

    /// Move `id` within its current parent's sibling list.
    pub fn reorder(scene: &Scene, id: NodeId, index: usize) -> StagecraftResult<Self> {
        let from = scene
            .placement_of(id)
            .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;
        Ok(Self::Reorder {
            description: "Reorder items".to_owned(),
            id,
            from: from.index,
            to: index,
        })
    }

    /// Remove `id` (ungroup or cascade).
    pub fn remove(scene: &Scene, id: NodeId, mode: Removal) -> StagecraftResult<Self> {
        let node = scene
            .node(id)
            .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;
        Ok(Self::Remove {
            description: format!("Remove \"{}\"", node.name),
            id,
            mode,
            removed: None,
        })
    }

    /// Create an item at the top of the stack.
    pub fn create_item(source: SourceRef, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::CreateItem {
            description: format!("Add \"{name}\""),
            source,
            name,
            created: None,
        }
    }

    /// Create an empty folder at the top of the stack.
    pub fn create_folder(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::CreateFolder {
            description: format!("Add folder \"{name}\""),
            name,
            created: None,
        }
    }

    /// Show or hide an item (or every nested item of a folder). `None` when
    /// nothing would change.
    pub fn set_visible(scene: &Scene, id: NodeId, value: bool) -> StagecraftResult<Option<Self>> {
        let (name, changed) = changed_flags(scene, id, value, |item| item.visible)?;
        Ok(changed.map(|changed| Self::SetVisible {
            description: format!("Change visibility of \"{name}\""),
            value,
            changed,
        }))
    }

    /// Lock or unlock an item (or every nested item of a folder).
    pub fn set_locked(scene: &Scene, id: NodeId, value: bool) -> StagecraftResult<Option<Self>> {
        let (name, changed) = changed_flags(scene, id, value, |item| item.locked)?;
        Ok(changed.map(|changed| Self::SetLocked {
            description: format!("Change lock state of \"{name}\""),
            value,
            changed,
        }))
    }

    /// Rename a node.
    pub fn rename(scene: &Scene, id: NodeId, to: impl Into<String>) -> StagecraftResult<Self> {
        let node = scene
            .node(id)
            .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;
        let to = to.into();
        Ok(Self::Rename {
            description: format!("Rename \"{}\"", node.name),
            id,
            from: node.name.clone(),
            to,
        })
    }

    /// Id allocated by a create command's first `apply`, if any.
    pub fn created_id(&self) -> Option<NodeId> {
        match self {
            Self::CreateItem { created, .. } | Self::CreateFolder { created, .. } => {
                created.as_ref().map(|(node, _)| node.id)
            }
            _ => None,
        }
    }

    /// Nodes this command touches, for commit notifications.
    pub fn affected_ids(&self) -> Vec<NodeId> {
        match self {
            Self::ModifyTransform { deltas, .. } => deltas.iter().map(|d| d.id).collect(),
            Self::Reparent { id, .. } | Self::Reorder { id, .. } | Self::Rename { id, .. } => {
                vec![*id]
            }
            Self::Remove { id, removed, .. } => removed
                .as_ref()
                .map(RemovedSubtree::ids)
                .unwrap_or_else(|| vec![*id]),
            Self::CreateItem { created, .. } | Self::CreateFolder { created, .. } => {
                created.iter().map(|(node, _)| node.id).collect()
            }
            Self::SetVisible { changed, .. } | Self::SetLocked { changed, .. } => {
                changed.iter().map(|&(id, _)| id).collect()
            }
        }
    }

    /// Replay the edit forward.
    pub fn apply(&mut self, scene: &mut Scene) -> StagecraftResult<()> {
        match self {
            Self::ModifyTransform { deltas, .. } => {
                check_transform_targets(scene, deltas)?;
                for d in deltas.iter() {
                    scene.set_transform(d.id, d.after)?;
                }
                Ok(())
            }
            Self::Reparent { id, to, .. } => {
                scene.reparent(*id, to.parent, to.index).map_err(as_stale)
            }
            Self::Reorder { id, to, .. } => scene.reorder(*id, *to).map_err(as_stale),
            Self::Remove { id, mode, removed, .. } => {
                let subtree = scene.remove_node(*id, *mode).map_err(as_stale)?;
                *removed = Some(subtree);
                Ok(())
            }
            Self::CreateItem {
                source,
                name,
                created,
                ..
            } => match created {
                // Redo reinserts the identical node so the id stays stable.
                Some((node, placement)) => scene.restore(RemovedSubtree {
                    mode: Removal::Ungroup,
                    nodes: vec![(node.clone(), *placement)],
                }),
                None => {
                    let id = scene.add_item(*source, name.clone())?;
                    let node = scene.node(id).cloned().ok_or_else(|| {
                        StagecraftError::stale("created item vanished")
                    })?;
                    *created = Some((node, Placement {
                        parent: None,
                        index: 0,
                    }));
                    Ok(())
                }
            },
            Self::CreateFolder { name, created, .. } => match created {
                Some((node, placement)) => scene.restore(RemovedSubtree {
                    mode: Removal::Ungroup,
                    nodes: vec![(node.clone(), *placement)],
                }),
                None => {
                    let id = scene.add_folder(name.clone())?;
                    let node = scene.node(id).cloned().ok_or_else(|| {
                        StagecraftError::stale("created folder vanished")
                    })?;
                    *created = Some((node, Placement {
                        parent: None,
                        index: 0,
                    }));
                    Ok(())
                }
            },
            Self::SetVisible { value, changed, .. } => {
                apply_flags(scene, changed, |item, v| item.visible = v, *value)
            }
            Self::SetLocked { value, changed, .. } => {
                apply_flags(scene, changed, |item, v| item.locked = v, *value)
            }
            Self::Rename { id, to, .. } => {
                scene.rename(*id, to.clone()).map_err(as_stale)?;
                Ok(())
            }
        }
    }

    /// Undo the edit, restoring the captured pre-state.
    pub fn revert(&mut self, scene: &mut Scene) -> StagecraftResult<()> {
        match self {
            Self::ModifyTransform { deltas, .. } => {
                check_transform_targets(scene, deltas)?;
                for d in deltas.iter() {
                    scene.set_transform(d.id, d.before)?;
                }
                Ok(())
            }
            Self::Reparent { id, from, .. } => {
                scene.reparent(*id, from.parent, from.index).map_err(as_stale)
            }
            Self::Reorder { id, from, .. } => scene.reorder(*id, *from).map_err(as_stale),
            Self::Remove { removed, .. } => {
                let subtree = removed
                    .clone()
                    .ok_or_else(|| StagecraftError::stale("remove was never applied"))?;
                scene.restore(subtree)
            }
            Self::CreateItem { created, .. } | Self::CreateFolder { created, .. } => {
                let (node, _) = created
                    .as_ref()
                    .ok_or_else(|| StagecraftError::stale("create was never applied"))?;
                scene.remove_node(node.id, Removal::Cascade).map_err(as_stale)?;
                Ok(())
            }
            Self::SetVisible { changed, .. } => {
                restore_flags(scene, changed, |item, v| item.visible = v)
            }
            Self::SetLocked { changed, .. } => {
                restore_flags(scene, changed, |item, v| item.locked = v)
            }
            Self::Rename { id, from, .. } => {
                scene.rename(*id, from.clone()).map_err(as_stale)?;
                Ok(())
            }
        }
    }
}

/// Items under `id` whose flag differs from `value`, with prior values, or
/// `None` when the edit would change nothing.
fn changed_flags(
    scene: &Scene,
    id: NodeId,
    value: bool,
    read: impl Fn(&crate::graph::node::ItemState) -> bool,
) -> StagecraftResult<(String, Option<Vec<(NodeId, bool)>>)> {
    let node = scene
        .node(id)
        .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;
    let mut changed = Vec::new();
    for target in scene.nested_items(id) {
        if let Some(item) = scene.node(target).and_then(Node::as_item)
            && read(item) != value
        {
            changed.push((target, read(item)));
        }
    }
    let changed = if changed.is_empty() { None } else { Some(changed) };
    Ok((node.name.clone(), changed))
}

/// All transform targets must still be live, unlocked items before any write.
fn check_transform_targets(scene: &Scene, deltas: &[TransformDelta]) -> StagecraftResult<()> {
    for d in deltas {
        let node = scene
            .node(d.id)
            .ok_or_else(|| StagecraftError::stale(d.id.to_string()))?;
        let item = node
            .as_item()
            .ok_or_else(|| StagecraftError::stale(format!("{} is not an item", d.id)))?;
        if item.locked {
            return Err(StagecraftError::NodeLocked(d.id));
        }
    }
    Ok(())
}

fn apply_flags(
    scene: &mut Scene,
    changed: &[(NodeId, bool)],
    write: impl Fn(&mut crate::graph::node::ItemState, bool),
    value: bool,
) -> StagecraftResult<()> {
    check_flag_targets(scene, changed)?;
    for &(id, _) in changed {
        if let Some(item) = scene.node_mut(id).and_then(Node::as_item_mut) {
            write(item, value);
        }
    }
    Ok(())
}

fn restore_flags(
    scene: &mut Scene,
    changed: &[(NodeId, bool)],
    write: impl Fn(&mut crate::graph::node::ItemState, bool),
) -> StagecraftResult<()> {
    check_flag_targets(scene, changed)?;
    for &(id, before) in changed {
        if let Some(item) = scene.node_mut(id).and_then(Node::as_item_mut) {
            write(item, before);
        }
    }
    Ok(())
}

fn check_flag_targets(scene: &Scene, changed: &[(NodeId, bool)]) -> StagecraftResult<()> {
    for &(id, _) in changed {
        let node = scene
            .node(id)
            .ok_or_else(|| StagecraftError::stale(id.to_string()))?;
        if !node.is_item() {
            return Err(StagecraftError::stale(format!("{id} is not an item")));
        }
    }
    Ok(())
}
