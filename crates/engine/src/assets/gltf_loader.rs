//! glTF/GLB model loading.
//!
//! Produces model-space triangle meshes (node transforms baked in) and the
//! list of animation clips with their durations. Materials, textures and
//! skins are ignored.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use gltf::mesh::Mode;
use thiserror::Error;
use tracing::{debug, info};

use super::MeshGeometry;
use crate::app::AnimationClip;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to import glTF model {path}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("mesh '{mesh}' in {path} has no POSITION attribute")]
    MissingPositions { path: PathBuf, mesh: String },
    #[error("model {path} contains no triangle geometry")]
    NoGeometry { path: PathBuf },
}

#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    pub meshes: Vec<MeshGeometry>,
    pub clips: Vec<AnimationClip>,
}

impl LoadedModel {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.positions.len()).sum()
    }
}

pub fn load_model(path: impl AsRef<Path>) -> Result<LoadedModel, AssetError> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Import {
        path: path.to_path_buf(),
        source,
    })?;

    let mut meshes = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            collect_node_meshes(path, &node, Mat4::IDENTITY, &buffers, &mut meshes)?;
        }
    }
    if meshes.is_empty() {
        return Err(AssetError::NoGeometry {
            path: path.to_path_buf(),
        });
    }

    let clips = document
        .animations()
        .map(|animation| read_clip(&animation, &buffers))
        .collect::<Vec<_>>();

    let model = LoadedModel { meshes, clips };
    info!(
        path = %path.display(),
        meshes = model.meshes.len(),
        vertices = model.vertex_count(),
        clips = model.clips.len(),
        "asset_loaded"
    );
    Ok(model)
}

fn collect_node_meshes(
    path: &Path,
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<MeshGeometry>,
) -> Result<(), AssetError> {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        let base_name = node
            .name()
            .or_else(|| mesh.name())
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        for (primitive_index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != Mode::Triangles {
                debug!(
                    mesh = base_name.as_str(),
                    mode = ?primitive.mode(),
                    "skipping non-triangle primitive"
                );
                continue;
            }
            let name = if primitive_index == 0 {
                base_name.clone()
            } else {
                format!("{base_name}.{primitive_index}")
            };

            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let positions = reader
                .read_positions()
                .ok_or_else(|| AssetError::MissingPositions {
                    path: path.to_path_buf(),
                    mesh: name.clone(),
                })?
                .map(|p| world.transform_point3(Vec3::from(p)))
                .collect::<Vec<_>>();
            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<_>>(),
                None => (0..positions.len() as u32).collect(),
            };

            out.push(MeshGeometry {
                name,
                positions,
                indices,
            });
        }
    }

    for child in node.children() {
        collect_node_meshes(path, &child, world, buffers, out)?;
    }
    Ok(())
}

fn read_clip(animation: &gltf::Animation<'_>, buffers: &[gltf::buffer::Data]) -> AnimationClip {
    let name = animation
        .name()
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("animation_{}", animation.index()));

    let mut duration_seconds = 0.0f32;
    for channel in animation.channels() {
        let reader =
            channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        if let Some(inputs) = reader.read_inputs() {
            duration_seconds = inputs.fold(duration_seconds, f32::max);
        }
    }

    AnimationClip {
        name,
        duration_seconds,
    }
}
