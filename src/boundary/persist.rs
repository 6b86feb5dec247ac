use crate::foundation::core::{NodeId, SceneId};
use crate::foundation::error::{StagecraftError, StagecraftResult};
use crate::graph::node::Node;
use crate::graph::scene::{Placement, Scene};

/// Full serialization of one scene for the persistence collaborator.
///
/// `nodes` is stored in `node_order` sequence (pre-order, parents before
/// children) so a loader can rebuild the graph in one forward pass. The
/// engine does not own any file format; hosts serialize this with whatever
/// they like (`serde_json` in tests).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneData {
    pub id: SceneId,
    pub name: String,
    #[serde(default)]
    pub unique_names: bool,
    /// Id allocator watermark; preserved so ids are not reused across a
    /// save/load within a session.
    pub next_node: u64,
    pub nodes: Vec<Node>,
    pub node_order: Vec<NodeId>,
}

/// Capture a scene as plain data.
pub fn to_data(scene: &Scene) -> SceneData {
    SceneData {
        id: scene.id(),
        name: scene.name().to_owned(),
        unique_names: scene.unique_names(),
        next_node: scene.next_node(),
        nodes: scene.iter().cloned().collect(),
        node_order: scene.node_order().to_vec(),
    }
}

/// Rebuild a scene from plain data, validating the order/parent invariants.
///
/// Corrupt data fails with `Validation`; nothing about the input is trusted.
pub fn from_data(data: SceneData) -> StagecraftResult<Scene> {
    if data.nodes.len() != data.node_order.len() {
        return Err(StagecraftError::validation(
            "node_order length differs from node count",
        ));
    }
    for (node, &expected) in data.nodes.iter().zip(&data.node_order) {
        if node.id != expected {
            return Err(StagecraftError::validation(format!(
                "nodes are not stored in node_order sequence at {expected}"
            )));
        }
    }

    let mut scene = Scene::new(data.id, data.name).with_unique_names(data.unique_names);
    let mut seen: Vec<NodeId> = Vec::with_capacity(data.nodes.len());
    for node in &data.nodes {
        if seen.contains(&node.id) {
            return Err(StagecraftError::validation(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        if let Some(parent) = node.parent {
            let parent_node = data
                .nodes
                .iter()
                .find(|n| n.id == parent)
                .ok_or_else(|| {
                    StagecraftError::validation(format!("{} has unknown parent {parent}", node.id))
                })?;
            if !parent_node.is_folder() {
                return Err(StagecraftError::validation(format!(
                    "{} has non-folder parent {parent}",
                    node.id
                )));
            }
            if !seen.contains(&parent) {
                return Err(StagecraftError::validation(format!(
                    "{} appears before its parent {parent}",
                    node.id
                )));
            }
        }
        seen.push(node.id);
        // Appending in pre-order reconstructs each sibling list in order.
        scene.insert_raw(
            node.clone(),
            Placement {
                parent: node.parent,
                index: usize::MAX,
            },
        )?;
    }

    if scene.node_order() != data.node_order.as_slice() {
        return Err(StagecraftError::validation(
            "node_order does not match the folder tree",
        ));
    }
    for stored in &data.nodes {
        if let Some(folder) = stored.as_folder() {
            let rebuilt = scene
                .node(stored.id)
                .and_then(Node::as_folder)
                .map(|f| f.children.clone())
                .unwrap_or_default();
            if rebuilt != folder.children {
                return Err(StagecraftError::validation(format!(
                    "children of {} disagree with node_order",
                    stored.id
                )));
            }
        }
    }
    scene.set_next_node(data.next_node);
    scene.check_consistency()?;
    Ok(scene)
}
