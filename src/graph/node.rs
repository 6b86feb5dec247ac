use crate::foundation::core::{NodeId, SourceRef, Transform};

/// One element of a scene's hierarchy: an item or a folder.
///
/// Shared identity and tree position live here; kind-specific payload lives
/// in [`NodeKind`] and is reached by pattern matching, never by downcasting.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Owning folder, `None` for a top-level node.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Item(ItemState),
    Folder(FolderState),
}

/// Leaf node: references a renderable source and carries a 2D transform.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ItemState {
    pub source: SourceRef,
    pub transform: Transform,
    pub visible: bool,
    /// Locked items reject transform-mutating commands.
    pub locked: bool,
}

impl ItemState {
    pub fn new(source: SourceRef) -> Self {
        Self {
            source,
            transform: Transform::default(),
            visible: true,
            locked: false,
        }
    }
}

/// Grouping node: owns an ordered list of child node ids.
///
/// The order is meaningful: it is the paint/z order of the subtree and the
/// tree order shown by UI consumers.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct FolderState {
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_item(&self) -> bool {
        matches!(self.kind, NodeKind::Item(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn as_item(&self) -> Option<&ItemState> {
        match &self.kind {
            NodeKind::Item(item) => Some(item),
            NodeKind::Folder(_) => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut ItemState> {
        match &mut self.kind {
            NodeKind::Item(item) => Some(item),
            NodeKind::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderState> {
        match &self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::Item(_) => None,
        }
    }

    pub(crate) fn as_folder_mut(&mut self) -> Option<&mut FolderState> {
        match &mut self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::Item(_) => None,
        }
    }

    /// `true` when transform-mutating commands must skip or reject this node.
    pub fn is_locked(&self) -> bool {
        self.as_item().is_some_and(|item| item.locked)
    }
}
