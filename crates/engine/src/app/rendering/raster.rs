//! CPU triangle rasterization into an RGBA8 frame with a float depth buffer.

use glam::{Vec3, Vec4};

use super::transform::{clip_to_screen, clip_triangle_near, Viewport};
use crate::app::{LightSettings, SceneWorld};

const MIN_TRIANGLE_AREA_PX: f32 = 1.0e-6;

pub(crate) struct FrameTarget<'a> {
    pub(crate) frame: &'a mut [u8],
    pub(crate) depth: &'a mut [f32],
    pub(crate) viewport: Viewport,
}

impl<'a> FrameTarget<'a> {
    pub(crate) fn new(frame: &'a mut [u8], depth: &'a mut [f32], viewport: Viewport) -> Self {
        Self {
            frame,
            depth,
            viewport,
        }
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
        self.depth.fill(f32::INFINITY);
    }

    /// Fills a screen-space triangle; vertices are `(x_px, y_px, depth)`.
    /// Either winding is accepted. A pixel is written when its center is
    /// covered and it is nearer than what the depth buffer holds.
    pub(crate) fn fill_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: [u8; 4]) {
        let area = edge(a, b, c);
        if area.abs() < MIN_TRIANGLE_AREA_PX {
            return;
        }
        let width = self.viewport.width as i32;
        let height = self.viewport.height as i32;

        let min_x = (a.x.min(b.x).min(c.x).floor() as i32).max(0);
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i32).min(width - 1);
        let min_y = (a.y.min(b.y).min(c.y).floor() as i32).max(0);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i32).min(height - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let inv_area = 1.0 / area;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(b, c, p) * inv_area;
                let w1 = edge(c, a, p) * inv_area;
                let w2 = edge(a, b, p) * inv_area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * a.z + w1 * b.z + w2 * c.z;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }
                let index = y as usize * self.viewport.width as usize + x as usize;
                let Some(stored) = self.depth.get_mut(index) else {
                    continue;
                };
                if depth >= *stored {
                    continue;
                }
                *stored = depth;
                write_pixel_rgba(self.frame, index, color);
            }
        }
    }

    pub(crate) fn fill_rect(
        &mut self,
        x: i32,
        y: i32,
        rect_width: i32,
        rect_height: i32,
        color: [u8; 4],
    ) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = (x + rect_width).min(self.viewport.width as i32);
        let end_y = (y + rect_height).min(self.viewport.height as i32);
        if end_x <= start_x || end_y <= start_y {
            return;
        }
        let width = self.viewport.width as usize;
        for py in start_y..end_y {
            for px in start_x..end_x {
                write_pixel_rgba(self.frame, py as usize * width + px as usize, color);
            }
        }
    }

    pub(crate) fn rect_outline(
        &mut self,
        x: i32,
        y: i32,
        rect_width: i32,
        rect_height: i32,
        color: [u8; 4],
    ) {
        if rect_width <= 1 || rect_height <= 1 {
            return;
        }
        self.fill_rect(x, y, rect_width, 1, color);
        self.fill_rect(x, y + rect_height - 1, rect_width, 1, color);
        self.fill_rect(x, y, 1, rect_height, color);
        self.fill_rect(x + rect_width - 1, y, 1, rect_height, color);
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.viewport.width as usize + x as usize) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&self.frame[offset..offset + 4]);
        out
    }
}

fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn write_pixel_rgba(frame: &mut [u8], pixel_index: usize, color: [u8; 4]) {
    let Some(byte_offset) = pixel_index.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

/// Flat shading: ambient plus a two-sided directional term, scaled so a face
/// lit head-on by both lights shows its base color.
pub(crate) fn shade(base: [u8; 4], normal: Vec3, lights: &LightSettings) -> [u8; 4] {
    let ambient = color_vec(lights.ambient_color) * lights.ambient_intensity;
    let directional = &lights.directional;
    let lambert = normal.dot(directional.direction_to_light()).abs();
    let diffuse = color_vec(directional.color) * directional.intensity * lambert;

    let total = (lights.ambient_intensity + directional.intensity).max(f32::EPSILON);
    let light = ((ambient + diffuse) / total).min(Vec3::ONE);
    [
        (base[0] as f32 * light.x).round() as u8,
        (base[1] as f32 * light.y).round() as u8,
        (base[2] as f32 * light.z).round() as u8,
        base[3],
    ]
}

fn color_vec(rgb: [u8; 3]) -> Vec3 {
    Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0
}

/// Draws every visible entity mesh. Returns the number of triangles written
/// to the rasterizer after near-plane clipping.
pub(crate) fn draw_world(target: &mut FrameTarget<'_>, world: &SceneWorld) -> usize {
    let view_projection = world.camera().view_projection();
    let lights = world.lights();
    let viewport = target.viewport;
    let mut drawn = 0;

    for entity in world.entities() {
        if !entity.visible {
            continue;
        }
        let Some(renderable) = entity.renderable.as_ref() else {
            continue;
        };
        let model = entity.transform.matrix();

        for [a, b, c] in renderable.mesh.triangles() {
            let world_tri = [
                model.transform_point3(a),
                model.transform_point3(b),
                model.transform_point3(c),
            ];
            let normal = (world_tri[1] - world_tri[0])
                .cross(world_tri[2] - world_tri[0])
                .normalize_or_zero();
            let color = shade(renderable.color, normal, lights);

            let clip: [Vec4; 3] = world_tri.map(|p| view_projection * p.extend(1.0));
            let polygon = clip_triangle_near(clip);
            if polygon.len() < 3 {
                continue;
            }
            let screen = polygon
                .iter()
                .map(|v| clip_to_screen(*v, viewport))
                .collect::<Vec<_>>();
            for i in 1..screen.len() - 1 {
                target.fill_triangle(screen[0], screen[i], screen[i + 1], color);
                drawn += 1;
            }
        }
    }
    drawn
}
