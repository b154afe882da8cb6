use glam::Vec3;

use super::MeshGeometry;

pub fn box_mesh(name: &str, half_extents: Vec3) -> MeshGeometry {
    let h = half_extents;
    let positions = vec![
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // -z
        4, 5, 6, 4, 6, 7, // +z
        0, 1, 5, 0, 5, 4, // -y
        3, 7, 6, 3, 6, 2, // +y
        0, 4, 7, 0, 7, 3, // -x
        1, 2, 6, 1, 6, 5, // +x
    ];
    MeshGeometry {
        name: name.to_string(),
        positions,
        indices,
    }
}

/// Flat square on the XZ plane at y = 0.
pub fn ground_plane(half_size: f32) -> MeshGeometry {
    let s = half_size;
    MeshGeometry {
        name: "ground".to_string(),
        positions: vec![
            Vec3::new(-s, 0.0, -s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(s, 0.0, s),
            Vec3::new(-s, 0.0, s),
        ],
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}
