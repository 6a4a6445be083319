//! Seam between the viewer session and the rendering engine.
//!
//! The session never walks the scene graph itself: `attach_model` hands back
//! the flattened, traversal-order list of named nodes and the session only
//! applies its name predicate over it.

use crate::assets::{ModelGraph, ModelNode};
use crate::session::SpinAxis;
use glam::{Quat, Vec3};

/// Non-owning handle to a scene-graph node held by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone)]
pub struct NamedNode {
    pub id: NodeId,
    pub name: String,
}

/// Hand out handles for a batch of nodes appended after `base` existing
/// ones, so a repeat attach can never alias handles from an earlier model.
pub fn number_nodes(base: usize, nodes: &[ModelNode]) -> Vec<NamedNode> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| NamedNode {
            id: NodeId((base + index) as u32),
            name: node.name.clone().unwrap_or_default(),
        })
        .collect()
}

pub trait RenderEngine {
    /// Attach a loaded model subgraph to the scene. Returns every node of the
    /// subgraph, in traversal order, paired with its name. Called at most once
    /// per load; nodes attached by other means are never revisited.
    fn attach_model(&mut self, model: ModelGraph) -> Vec<NamedNode>;

    /// Move the engine camera to the given pose.
    fn set_camera(&mut self, position: Vec3, orientation: Quat);

    /// Rotate a node around one of its own local axes.
    fn rotate_local(&mut self, node: NodeId, axis: SpinAxis, radians: f32);

    /// Viewport changed; update aspect ratio and surface size.
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame from the current camera state.
    fn render(&mut self);
}
