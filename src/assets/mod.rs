//! Model loading, kept off the frame loop.
//!
//! `spawn_load` runs the glTF import on a background thread and reports back
//! over a channel: any number of `Progress` events (observability only),
//! then exactly one `Ready` or `Failed`. The frame loop polls the channel
//! and never blocks on it.

use crossbeam_channel::{Receiver, Sender};
use glam::{Mat4, Quat, Vec3};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to import glTF at {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("glTF document contains no scene")]
    EmptyScene,
}

/// Local TRS transform of a scene-graph node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: Option<String>,
    /// Index into `ModelGraph::nodes`. Parents always precede children.
    pub parent: Option<usize>,
    pub transform: Transform,
}

/// One triangle-list primitive, referencing the node it hangs off.
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    pub node: usize,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
}

/// Flattened model subgraph in traversal order, plus a root transform that
/// carries the viewer's fixed placement above all parentless nodes.
#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    pub root: Transform,
    pub nodes: Vec<ModelNode>,
    pub primitives: Vec<MeshPrimitive>,
}

impl ModelGraph {
    /// Fixed placement applied once when the load resolves.
    pub fn apply_placement(&mut self, scale: f32, offset: Vec3) {
        self.root.scale = Vec3::splat(scale);
        self.root.translation = offset;
    }
}

pub enum LoadEvent {
    /// Byte counts of the source file. No effect on control flow.
    Progress { loaded: u64, total: u64 },
    Ready(ModelGraph),
    Failed(LoadError),
}

/// Synchronous import of a glTF/GLB file into a flat node + primitive list.
pub fn load_model(path: &Path) -> Result<ModelGraph, LoadError> {
    let (document, buffers, _images) =
        gltf::import(path).map_err(|source| LoadError::Import {
            path: path.display().to_string(),
            source,
        })?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::EmptyScene)?;

    let mut graph = ModelGraph::default();
    for node in scene.nodes() {
        collect_node(&node, None, &buffers, &mut graph);
    }
    log::debug!(
        "Imported {}: {} nodes, {} primitives",
        path.display(),
        graph.nodes.len(),
        graph.primitives.len()
    );
    Ok(graph)
}

/// Load on a background thread, reporting over the returned channel.
pub fn spawn_load(path: PathBuf) -> Receiver<LoadEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let spawned = std::thread::Builder::new()
        .name("model-loader".to_string())
        .spawn(move || {
            report_read_progress(&path, &tx);
            let event = match load_model(&path) {
                Ok(graph) => LoadEvent::Ready(graph),
                Err(err) => LoadEvent::Failed(err),
            };
            let _ = tx.send(event);
        });
    if let Err(err) = spawned {
        // Dropping the sender disconnects the channel; the session treats
        // that as a finished load.
        log::warn!("Failed to spawn loader thread: {}", err);
    }
    rx
}

/// Stream the source file once purely for progress byte counts. The import
/// below rereads it; read errors here are left for the import to surface.
fn report_read_progress(path: &Path, tx: &Sender<LoadEvent>) {
    let total = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    let Ok(mut file) = std::fs::File::open(path) else {
        return;
    };
    let mut chunk = [0u8; 64 * 1024];
    let mut loaded = 0u64;
    loop {
        match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(count) => {
                loaded += count as u64;
                let _ = tx.send(LoadEvent::Progress { loaded, total });
            }
            Err(_) => break,
        }
    }
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Option<usize>,
    buffers: &[gltf::buffer::Data],
    graph: &mut ModelGraph,
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let index = graph.nodes.len();
    graph.nodes.push(ModelNode {
        name: node.name().map(String::from),
        parent,
        transform: Transform {
            translation: Vec3::from(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from(scale),
        },
    });

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            if positions.is_empty() {
                continue;
            }
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());
            let mut normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            if normals.len() != positions.len() {
                normals = averaged_normals(&positions, &indices);
            }
            let base_color = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();
            graph.primitives.push(MeshPrimitive {
                node: index,
                positions,
                normals,
                indices,
                base_color,
            });
        }
    }

    for child in node.children() {
        collect_node(&child, Some(index), buffers, graph);
    }
}

/// Area-weighted vertex normals for primitives that ship without any.
fn averaged_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let a = Vec3::from(positions[i0]);
        let b = Vec3::from(positions[i1]);
        let c = Vec3::from(positions[i2]);
        let face = (b - a).cross(c - a);
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }
    normals
        .into_iter()
        .map(|normal| {
            if normal.length_squared() > 1e-12 {
                normal.normalize().to_array()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}
