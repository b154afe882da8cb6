//! Render mesh → convex collision shape.
//!
//! The hull is computed with parry's quickhull, flattened into a triangle
//! soup, then re-indexed: vertices that agree to two decimals collapse into
//! one point and faces that lose a corner in the process are dropped.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use rapier3d::na::Point3;
use rapier3d::parry::transformation::try_convex_hull;
use thiserror::Error;

/// Quantization applied before comparing vertices (1 cm for meter units).
const VERTEX_KEY_SCALE: f32 = 100.0;
const MIN_HULL_POINTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HullError {
    #[error("convex hull needs at least {MIN_HULL_POINTS} distinct points, got {count}")]
    TooFewPoints { count: usize },
    #[error("mesh contains a non-finite vertex at index {index}")]
    NonFiniteVertex { index: usize },
    #[error("convex hull computation failed: {0}")]
    Quickhull(String),
    #[error("no faces left after removing degenerate triangles")]
    NoFaces,
    #[error("physics backend rejected the convex shape")]
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvexShape {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
}

impl ConvexShape {
    pub fn scaled(&self, scale: Vec3) -> ConvexShape {
        ConvexShape {
            vertices: self.vertices.iter().map(|v| *v * scale).collect(),
            faces: self.faces.clone(),
        }
    }
}

pub fn shape_from_mesh(positions: &[Vec3]) -> Result<ConvexShape, HullError> {
    if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
        return Err(HullError::NonFiniteVertex { index });
    }

    let mut seen = HashSet::with_capacity(positions.len());
    let mut points = Vec::with_capacity(positions.len());
    for p in positions {
        if seen.insert(vertex_key(*p)) {
            points.push(Point3::new(p.x, p.y, p.z));
        }
    }
    if points.len() < MIN_HULL_POINTS {
        return Err(HullError::TooFewPoints {
            count: points.len(),
        });
    }

    let (hull_vertices, hull_faces) =
        try_convex_hull(&points).map_err(|err| HullError::Quickhull(format!("{err:?}")))?;

    let soup = hull_faces
        .iter()
        .flat_map(|face| face.iter().map(|&i| hull_vertices[i as usize]))
        .map(|p| Vec3::new(p.x, p.y, p.z))
        .collect::<Vec<_>>();

    polyhedron_from_triangle_soup(&soup)
}

/// Re-indexes a non-indexed triangle list (every three vertices form a face).
///
/// The first vertex seen for a quantized position becomes the point; later
/// duplicates map onto it. A face whose corners collapse is removed, the
/// rest keep their order. A trailing partial triangle is ignored.
pub fn polyhedron_from_triangle_soup(soup: &[Vec3]) -> Result<ConvexShape, HullError> {
    let mut first_index_by_key: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut remap = Vec::with_capacity(soup.len());

    for v in soup {
        let index = *first_index_by_key.entry(vertex_key(*v)).or_insert_with(|| {
            vertices.push(*v);
            (vertices.len() - 1) as u32
        });
        remap.push(index);
    }

    let faces = remap
        .chunks_exact(3)
        .map(|tri| [tri[0], tri[1], tri[2]])
        .filter(|face| !is_degenerate(face))
        .collect::<Vec<_>>();

    if faces.is_empty() {
        return Err(HullError::NoFaces);
    }

    Ok(ConvexShape { vertices, faces })
}

fn is_degenerate(face: &[u32; 3]) -> bool {
    (0..3).any(|n| face[n] == face[(n + 1) % 3])
}

fn vertex_key(v: Vec3) -> (i64, i64, i64) {
    (quantize(v.x), quantize(v.y), quantize(v.z))
}

// Half up, not half away from zero. Widened first so that a stored value just
// under a half-centimetre boundary is not pushed over it by f32 rounding.
fn quantize(value: f32) -> i64 {
    (f64::from(value) * f64::from(VERTEX_KEY_SCALE) + 0.5).floor() as i64
}
