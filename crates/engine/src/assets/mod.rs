mod gltf_loader;
mod primitives;

use std::sync::Arc;

use glam::Vec3;

pub use gltf_loader::{load_model, AssetError, LoadedModel};
pub use primitives::{box_mesh, ground_plane};

/// Triangle mesh in model space. Indices are triangle lists.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = *self.positions.get(tri[0] as usize)?;
            let b = *self.positions.get(tri[1] as usize)?;
            let c = *self.positions.get(tri[2] as usize)?;
            Some([a, b, c])
        })
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }

    pub fn into_shared(self) -> Arc<MeshGeometry> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangles_skip_out_of_range_indices() {
        let mesh = MeshGeometry {
            name: "broken".to_string(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2, 0, 1, 9],
        };
        assert_eq!(mesh.triangles().count(), 1);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn bounds_cover_all_positions() {
        let mesh = MeshGeometry {
            name: "pts".to_string(),
            positions: vec![Vec3::new(-1.0, 2.0, 0.5), Vec3::new(3.0, -4.0, 0.0)],
            indices: Vec::new(),
        };
        let (min, max) = mesh.bounds().expect("bounds");
        assert_eq!(min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Vec3::new(3.0, 2.0, 0.5));
    }
}
