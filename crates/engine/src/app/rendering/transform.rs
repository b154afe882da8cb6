use glam::{Mat4, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Maps a world-space point to `(x_px, y_px, depth)`, with depth in `[0, 1]`
/// (0 on the near plane). Returns `None` for points in front of the near
/// plane or behind the camera.
pub fn project_to_screen(world: Vec3, view_projection: Mat4, viewport: Viewport) -> Option<Vec3> {
    let clip = view_projection * world.extend(1.0);
    if clip.w <= f32::EPSILON || clip.z < 0.0 {
        return None;
    }
    Some(clip_to_screen(clip, viewport))
}

/// Perspective divide plus viewport mapping. `y` grows downwards.
pub(crate) fn clip_to_screen(clip: Vec4, viewport: Viewport) -> Vec3 {
    let ndc = clip.truncate() / clip.w;
    Vec3::new(
        (ndc.x * 0.5 + 0.5) * viewport.width as f32,
        (0.5 - ndc.y * 0.5) * viewport.height as f32,
        ndc.z,
    )
}

/// Clips a triangle in clip space against the near plane (`z >= 0`).
/// The result is a convex polygon of 0, 3 or 4 vertices.
pub(crate) fn clip_triangle_near(triangle: [Vec4; 3]) -> Vec<Vec4> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let current = triangle[i];
        let next = triangle[(i + 1) % 3];
        let current_inside = current.z >= 0.0;
        let next_inside = next.z >= 0.0;

        if current_inside {
            out.push(current);
        }
        if current_inside != next_inside {
            let t = current.z / (current.z - next.z);
            out.push(current + (next - current) * t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PerspectiveCamera;

    fn viewport() -> Viewport {
        Viewport {
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn look_target_maps_to_viewport_center() {
        let camera = PerspectiveCamera {
            position: Vec3::new(0.0, 5.0, 65.0),
            look_target: Vec3::new(0.0, 1.0, 60.0),
            aspect: 800.0 / 600.0,
            ..PerspectiveCamera::default()
        };
        let p = project_to_screen(camera.look_target, camera.view_projection(), viewport())
            .expect("visible");
        assert!((p.x - 400.0).abs() < 0.01);
        assert!((p.y - 300.0).abs() < 0.01);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn points_behind_camera_are_not_projected() {
        let camera = PerspectiveCamera {
            position: Vec3::ZERO,
            look_target: Vec3::NEG_Z,
            ..PerspectiveCamera::default()
        };
        assert!(project_to_screen(Vec3::new(0.0, 0.0, 5.0), camera.view_projection(), viewport())
            .is_none());
    }

    #[test]
    fn higher_points_land_higher_on_screen() {
        let camera = PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, 10.0),
            look_target: Vec3::ZERO,
            ..PerspectiveCamera::default()
        };
        let vp = camera.view_projection();
        let low = project_to_screen(Vec3::ZERO, vp, viewport()).expect("low");
        let high = project_to_screen(Vec3::Y, vp, viewport()).expect("high");
        assert!(high.y < low.y);
    }

    #[test]
    fn near_clipping_keeps_inside_triangles_and_splits_crossing_ones() {
        let inside = [
            Vec4::new(0.0, 0.0, 0.5, 1.0),
            Vec4::new(1.0, 0.0, 0.5, 1.0),
            Vec4::new(0.0, 1.0, 0.5, 1.0),
        ];
        assert_eq!(clip_triangle_near(inside).len(), 3);

        let crossing = [
            Vec4::new(0.0, 0.0, -1.0, 1.0),
            Vec4::new(1.0, 0.0, 1.0, 1.0),
            Vec4::new(0.0, 1.0, 1.0, 1.0),
        ];
        let clipped = clip_triangle_near(crossing);
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|v| v.z >= -1.0e-6));

        let behind = [
            Vec4::new(0.0, 0.0, -1.0, 1.0),
            Vec4::new(1.0, 0.0, -1.0, 1.0),
            Vec4::new(0.0, 1.0, -2.0, 1.0),
        ];
        assert!(clip_triangle_near(behind).is_empty());
    }
}
