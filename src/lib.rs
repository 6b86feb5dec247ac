//! Stagecraft is a scene graph and reversible command history engine for 2D
//! scene editors.
//!
//! A [`Scene`] owns an ordered tree of items and folders; a [`Selection`]
//! targets any mix of nodes and subtrees for bulk geometric operations; every
//! mutation is expressed as a [`Command`] carrying its own inverse and
//! sequenced by a [`CommandHistory`], so arbitrary structural edits stay
//! undoable. Rendering, persistence formats and presentation are external
//! collaborators fed through the read-only [`boundary`] types.
#![forbid(unsafe_code)]

pub mod boundary;
mod editor;
pub mod foundation;
pub mod graph;
pub mod history;
pub mod select;

pub use crate::foundation::core::{
    Crop, NodeId, Point, Rect, SceneId, SourceRef, Transform, Vec2, normalize_degrees,
};
pub use crate::foundation::error::{StagecraftError, StagecraftResult};

pub use crate::boundary::persist::{SceneData, from_data, to_data};
pub use crate::boundary::render::{ItemSnapshot, snapshots};
pub use crate::editor::{CommittedEdit, SceneEditor};
pub use crate::graph::node::{FolderState, ItemState, Node, NodeKind};
pub use crate::graph::scene::{NodeSnapshot, Placement, Removal, RemovedSubtree, Scene};
pub use crate::history::command::Command;
pub use crate::history::stack::{CommandHistory, DEFAULT_HISTORY_LIMIT};
pub use crate::select::selection::{Selection, TransformDelta, TransformOp};
