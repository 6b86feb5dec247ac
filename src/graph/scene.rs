use std::collections::BTreeMap;

use crate::foundation::core::{NodeId, SceneId, SourceRef, Transform};
use crate::foundation::error::{StagecraftError, StagecraftResult};
use crate::graph::node::{FolderState, ItemState, Node, NodeKind};

/// Where a node sits in the tree: owning folder (`None` = top level) and
/// index among that parent's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub parent: Option<NodeId>,
    pub index: usize,
}

/// Folder removal policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Removal {
    /// Reparent the folder's children to the folder's former parent at the
    /// folder's former position (ungroup semantics). Default.
    Ungroup,
    /// Remove the whole subtree.
    Cascade,
}

/// Everything a removal detached, sufficient for [`Scene::restore`] to
/// reinsert it exactly where it was.
#[derive(Clone, Debug)]
pub struct RemovedSubtree {
    pub(crate) mode: Removal,
    /// Pre-order: parents before children, siblings in ascending index.
    ///
    /// For `Ungroup` this is the single removed node; a removed folder keeps
    /// its children list so restore can pull the children back in.
    pub(crate) nodes: Vec<(Node, Placement)>,
}

impl RemovedSubtree {
    /// Ids of the removed nodes, pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|(n, _)| n.id).collect()
    }
}

/// Plain-data view of the folder tree for read-only consumers.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub is_folder: bool,
    pub children: Vec<NodeSnapshot>,
}

/// Ordered collection of nodes for one scene.
///
/// The tree (top-level order, folder children lists, parent links) is the
/// single source of truth. `node_order` (the pre-order flattening used for
/// z-order) and the item-index table are caches rebuilt by every structural
/// mutation, so queries stay `&self` and O(1).
#[derive(Clone, Debug)]
pub struct Scene {
    id: SceneId,
    name: String,
    nodes: BTreeMap<NodeId, Node>,
    /// Top-level nodes, front = top of the stack.
    roots: Vec<NodeId>,
    node_order: Vec<NodeId>,
    item_indices: BTreeMap<NodeId, usize>,
    next_node: u64,
    unique_names: bool,
}

impl Scene {
    pub fn new(id: SceneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: BTreeMap::new(),
            roots: Vec::new(),
            node_order: Vec::new(),
            item_indices: BTreeMap::new(),
            next_node: 0,
            unique_names: false,
        }
    }

    /// Reject duplicate node names in `add_item`/`add_folder`/`rename`.
    pub fn with_unique_names(mut self, unique: bool) -> Self {
        self.unique_names = unique;
        self
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// O(1) lookup; absent ids yield `None`, never an error.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Pre-order flattening of the tree, front = top of the stack.
    pub fn node_order(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Nodes in paint order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn check_name(&self, name: &str) -> StagecraftResult<()> {
        if self.unique_names && self.nodes.values().any(|n| n.name == name) {
            return Err(StagecraftError::duplicate_name(name));
        }
        Ok(())
    }

    /// Create an item at the top of the stack.
    pub fn add_item(&mut self, source: SourceRef, name: impl Into<String>) -> StagecraftResult<NodeId> {
        let name = name.into();
        self.check_name(&name)?;
        let id = self.alloc_id();
        self.nodes.insert(
            id,
            Node {
                id,
                name,
                parent: None,
                kind: NodeKind::Item(ItemState::new(source)),
            },
        );
        self.roots.insert(0, id);
        self.refresh_caches();
        Ok(id)
    }

    /// Create an empty folder at the top of the stack.
    pub fn add_folder(&mut self, name: impl Into<String>) -> StagecraftResult<NodeId> {
        let name = name.into();
        self.check_name(&name)?;
        let id = self.alloc_id();
        self.nodes.insert(
            id,
            Node {
                id,
                name,
                parent: None,
                kind: NodeKind::Folder(FolderState::default()),
            },
        );
        self.roots.insert(0, id);
        self.refresh_caches();
        Ok(id)
    }

    /// Current placement of a node within its parent's sibling list.
    pub fn placement_of(&self, id: NodeId) -> Option<Placement> {
        let node = self.nodes.get(&id)?;
        let siblings = self.sibling_list(node.parent);
        let index = siblings.iter().position(|&s| s == id)?;
        Some(Placement {
            parent: node.parent,
            index,
        })
    }

    fn sibling_list(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.roots,
            Some(p) => self
                .nodes
                .get(&p)
                .and_then(|n| n.as_folder())
                .map(|f| f.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    fn sibling_list_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            None => &mut self.roots,
            Some(p) => {
                &mut self
                    .nodes
                    .get_mut(&p)
                    .and_then(|n| n.as_folder_mut())
                    .expect("parent link points at a live folder")
                    .children
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes[&id].parent;
        let list = self.sibling_list_mut(parent);
        list.retain(|&s| s != id);
    }

    fn attach(&mut self, id: NodeId, parent: Option<NodeId>, index: usize) {
        let list = self.sibling_list_mut(parent);
        let at = index.min(list.len());
        list.insert(at, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
        }
    }

    /// `true` when `id` is (transitively) inside `ancestor`.
    pub fn is_descendant(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.nodes.get(&p).and_then(|n| n.parent);
        }
        false
    }

    /// Move a node under `new_parent` (`None` = top level) at `index` among
    /// the new siblings. Fails with `CycleDetected` when the target is the
    /// node itself or one of its descendants; the graph is untouched on
    /// failure.
    pub fn reparent(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        index: usize,
    ) -> StagecraftResult<()> {
        if !self.contains(id) {
            return Err(StagecraftError::not_found(id.to_string()));
        }
        if let Some(p) = new_parent {
            let parent = self
                .nodes
                .get(&p)
                .ok_or_else(|| StagecraftError::not_found(p.to_string()))?;
            if !parent.is_folder() {
                return Err(StagecraftError::validation(format!(
                    "reparent target {p} is not a folder"
                )));
            }
            if p == id || self.is_descendant(id, p) {
                return Err(StagecraftError::CycleDetected { node: id, new_parent: p });
            }
        }
        self.detach(id);
        self.attach(id, new_parent, index);
        self.refresh_caches();
        Ok(())
    }

    /// Move a node within its current parent's sibling list.
    pub fn reorder(&mut self, id: NodeId, index: usize) -> StagecraftResult<()> {
        let placement = self
            .placement_of(id)
            .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;
        self.detach(id);
        self.attach(id, placement.parent, index);
        self.refresh_caches();
        Ok(())
    }

    /// Remove a node.
    ///
    /// `Removal::Ungroup` (the default for UI delete-folder) reparents a
    /// folder's children into the folder's former slot; `Removal::Cascade`
    /// removes the whole subtree. The returned [`RemovedSubtree`] feeds
    /// [`Scene::restore`].
    pub fn remove_node(&mut self, id: NodeId, mode: Removal) -> StagecraftResult<RemovedSubtree> {
        if !self.contains(id) {
            return Err(StagecraftError::not_found(id.to_string()));
        }
        let placement = self
            .placement_of(id)
            .ok_or_else(|| StagecraftError::not_found(id.to_string()))?;

        let removed = match mode {
            Removal::Ungroup => {
                let node = self.nodes[&id].clone();
                self.detach(id);
                if let Some(folder) = node.as_folder() {
                    // Splice children into the former parent at the folder's slot.
                    for (offset, &child) in folder.children.clone().iter().enumerate() {
                        if let Some(c) = self.nodes.get_mut(&child) {
                            c.parent = placement.parent;
                        }
                        let list = self.sibling_list_mut(placement.parent);
                        let at = (placement.index + offset).min(list.len());
                        list.insert(at, child);
                    }
                }
                self.nodes.remove(&id);
                RemovedSubtree {
                    mode,
                    nodes: vec![(node, placement)],
                }
            }
            Removal::Cascade => {
                let mut collected = Vec::new();
                self.collect_subtree(id, placement, &mut collected);
                self.detach(id);
                for (node, _) in &collected {
                    self.nodes.remove(&node.id);
                }
                RemovedSubtree {
                    mode,
                    nodes: collected,
                }
            }
        };
        self.refresh_caches();
        tracing::debug!(scene = %self.id, node = %id, ?mode, "removed node");
        Ok(removed)
    }

    fn collect_subtree(&self, id: NodeId, placement: Placement, out: &mut Vec<(Node, Placement)>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let mut clone = node.clone();
        // Folders are captured with empty children; restore re-attaches each
        // child at its own recorded placement.
        let children = match &mut clone.kind {
            NodeKind::Folder(f) => std::mem::take(&mut f.children),
            NodeKind::Item(_) => Vec::new(),
        };
        out.push((clone, placement));
        for (index, child) in children.into_iter().enumerate() {
            self.collect_subtree(
                child,
                Placement {
                    parent: Some(id),
                    index,
                },
                out,
            );
        }
    }

    /// Exact inverse of [`Scene::remove_node`]; also used by the persistence
    /// loader. Fails with `StaleReference`, leaving the graph untouched, when
    /// an id is already live again or a recorded parent no longer exists.
    pub fn restore(&mut self, removed: RemovedSubtree) -> StagecraftResult<()> {
        for (node, _) in &removed.nodes {
            if self.contains(node.id) {
                return Err(StagecraftError::stale(format!(
                    "cannot restore {}: id is live",
                    node.id
                )));
            }
        }
        // Recorded parents must resolve to a folder that is either live or
        // part of this same restore, checked before any insertion.
        let incoming: Vec<NodeId> = removed.nodes.iter().map(|(n, _)| n.id).collect();
        for (node, placement) in &removed.nodes {
            if let Some(parent) = placement.parent
                && !incoming.contains(&parent)
                && !self.nodes.get(&parent).is_some_and(Node::is_folder)
            {
                return Err(StagecraftError::stale(format!(
                    "cannot restore {}: parent {parent} is gone",
                    node.id
                )));
            }
        }
        match removed.mode {
            Removal::Ungroup => {
                let (node, placement) = removed
                    .nodes
                    .into_iter()
                    .next()
                    .ok_or_else(|| StagecraftError::stale("empty removal record"))?;
                let id = node.id;
                let children = node.as_folder().map(|f| f.children.clone());
                if let Some(children) = &children {
                    for &child in children {
                        if !self.contains(child) {
                            return Err(StagecraftError::stale(format!(
                                "cannot restore {id}: child {child} is gone"
                            )));
                        }
                    }
                }
                let mut inserted = node;
                if let Some(f) = inserted.as_folder_mut() {
                    f.children.clear();
                }
                inserted.parent = None;
                self.next_node = self.next_node.max(id.0 + 1);
                self.nodes.insert(id, inserted);
                // Children are pulled out of the former parent before the
                // folder takes its old slot back, so indices line up.
                if let Some(children) = children {
                    for (index, child) in children.into_iter().enumerate() {
                        self.detach(child);
                        self.attach(child, Some(id), index);
                    }
                }
                self.attach(id, placement.parent, placement.index);
            }
            Removal::Cascade => {
                for (node, placement) in removed.nodes {
                    let id = node.id;
                    let mut inserted = node;
                    inserted.parent = None;
                    self.next_node = self.next_node.max(id.0 + 1);
                    self.nodes.insert(id, inserted);
                    self.attach(id, placement.parent, placement.index);
                }
            }
        }
        self.refresh_caches();
        Ok(())
    }

    /// Insert an externally built node (persistence load path).
    pub(crate) fn insert_raw(&mut self, node: Node, placement: Placement) -> StagecraftResult<()> {
        if self.contains(node.id) {
            return Err(StagecraftError::validation(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        let id = node.id;
        let mut inserted = node;
        inserted.parent = None;
        if let Some(f) = inserted.as_folder_mut() {
            f.children.clear();
        }
        self.next_node = self.next_node.max(id.0 + 1);
        self.nodes.insert(id, inserted);
        self.attach(id, placement.parent, placement.index);
        self.refresh_caches();
        Ok(())
    }

    /// Rename a node, honoring the uniqueness policy.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> StagecraftResult<String> {
        let name = name.into();
        if !self.contains(id) {
            return Err(StagecraftError::not_found(id.to_string()));
        }
        if self.nodes[&id].name != name {
            self.check_name(&name)?;
        }
        let node = self.nodes.get_mut(&id).expect("checked above");
        Ok(std::mem::replace(&mut node.name, name))
    }

    /// Set visibility on an item, or on every nested item of a folder.
    /// Returns the affected ids with their prior values.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> StagecraftResult<Vec<(NodeId, bool)>> {
        self.set_item_flag(id, visible, |item| &mut item.visible)
    }

    /// Set the lock flag on an item, or on every nested item of a folder.
    /// Locked items reject transform-mutating commands.
    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> StagecraftResult<Vec<(NodeId, bool)>> {
        self.set_item_flag(id, locked, |item| &mut item.locked)
    }

    fn set_item_flag(
        &mut self,
        id: NodeId,
        value: bool,
        field: impl Fn(&mut ItemState) -> &mut bool,
    ) -> StagecraftResult<Vec<(NodeId, bool)>> {
        if !self.contains(id) {
            return Err(StagecraftError::not_found(id.to_string()));
        }
        let mut changed = Vec::new();
        for target in self.nested_items(id) {
            let item = self
                .nodes
                .get_mut(&target)
                .and_then(|n| n.as_item_mut())
                .expect("nested_items yields live items");
            let slot = field(item);
            if *slot != value {
                changed.push((target, *slot));
                *slot = value;
            }
        }
        Ok(changed)
    }

    pub(crate) fn set_transform(&mut self, id: NodeId, transform: Transform) -> StagecraftResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| StagecraftError::stale(id.to_string()))?;
        let item = node
            .as_item_mut()
            .ok_or_else(|| StagecraftError::stale(format!("{id} is not an item")))?;
        let mut t = transform;
        t.set_rotation(t.rotation_deg);
        item.transform = t;
        Ok(())
    }

    /// Items reachable from `id` in paint order: an item yields itself, a
    /// folder yields its nested items recursively.
    pub fn nested_items(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.push_nested_items(id, &mut out);
        out
    }

    fn push_nested_items(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Item(_)) => out.push(id),
            Some(NodeKind::Folder(f)) => {
                for &child in &f.children {
                    self.push_nested_items(child, out);
                }
            }
            None => {}
        }
    }

    /// Paint-order index among items. Folders take no slot of their own:
    /// a folder's index equals the index of the node just before it in the
    /// flat order (0 when first); an item's index is one past its
    /// predecessor's (0 when first).
    pub fn item_index(&self, id: NodeId) -> Option<usize> {
        self.item_indices.get(&id).copied()
    }

    /// Read-only tree of the whole scene.
    pub fn hierarchy(&self) -> Vec<NodeSnapshot> {
        self.roots
            .iter()
            .filter_map(|&id| self.snapshot_subtree(id))
            .collect()
    }

    fn snapshot_subtree(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(&id)?;
        let children = node
            .as_folder()
            .map(|f| {
                f.children
                    .iter()
                    .filter_map(|&c| self.snapshot_subtree(c))
                    .collect()
            })
            .unwrap_or_default();
        Some(NodeSnapshot {
            id,
            name: node.name.clone(),
            is_folder: node.is_folder(),
            children,
        })
    }

    fn refresh_caches(&mut self) {
        self.node_order.clear();
        let roots = self.roots.clone();
        for id in roots {
            self.flatten_into_order(id);
        }
        self.item_indices.clear();
        let mut items_seen = 0usize;
        for &id in &self.node_order {
            let is_item = self.nodes.get(&id).is_some_and(Node::is_item);
            let index = if is_item {
                let i = items_seen;
                items_seen += 1;
                i
            } else {
                items_seen.saturating_sub(1)
            };
            self.item_indices.insert(id, index);
        }
    }

    fn flatten_into_order(&mut self, id: NodeId) {
        self.node_order.push(id);
        if let Some(children) = self.nodes.get(&id).and_then(|n| n.as_folder()).map(|f| f.children.clone()) {
            for child in children {
                self.flatten_into_order(child);
            }
        }
    }

    /// Verify the order/parent invariants; test and debugging aid.
    pub fn check_consistency(&self) -> StagecraftResult<()> {
        if self.node_order.len() != self.nodes.len() {
            return Err(StagecraftError::validation(
                "node_order is not a permutation of the node set",
            ));
        }
        for id in &self.node_order {
            if !self.nodes.contains_key(id) {
                return Err(StagecraftError::validation(format!(
                    "node_order references dead node {id}"
                )));
            }
        }
        for node in self.nodes.values() {
            let siblings = self.sibling_list(node.parent);
            if !siblings.contains(&node.id) {
                return Err(StagecraftError::validation(format!(
                    "{} missing from its parent's child list",
                    node.id
                )));
            }
            if let Some(folder) = node.as_folder() {
                for child in &folder.children {
                    let child_parent = self.nodes.get(child).and_then(|c| c.parent);
                    if child_parent != Some(node.id) {
                        return Err(StagecraftError::validation(format!(
                            "child {child} does not point back at folder {}",
                            node.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn unique_names(&self) -> bool {
        self.unique_names
    }

    pub(crate) fn next_node(&self) -> u64 {
        self.next_node
    }

    pub(crate) fn set_next_node(&mut self, next: u64) {
        self.next_node = self.next_node.max(next);
    }
}
