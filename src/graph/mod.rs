//! The scene graph: nodes, folders and the per-scene collection that keeps
//! order and parent links consistent under structural edits.

pub mod node;
pub mod scene;
