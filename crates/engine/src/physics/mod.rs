mod hull;
mod world;

pub use hull::{polyhedron_from_triangle_soup, shape_from_mesh, ConvexShape, HullError};
pub use world::{BodyHandle, BodyKind, PhysicsSettings, PhysicsWorld};
