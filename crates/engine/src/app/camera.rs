//! Perspective camera plus the orbit rig that keeps it trained on the player.
//!
//! The orbit rig works in spherical coordinates around `target`: `phi` is the
//! polar angle measured from +Y, `theta` the azimuth measured from +Z towards
//! +X. User drags queue angular deltas which `update` applies (damped) and
//! clamps before writing the camera position back.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec3};
use serde::Deserialize;

const POLAR_EPSILON: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub look_target: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 0.0),
            look_target: Vec3::ZERO,
            fov_y_degrees: 45.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn set_aspect_from_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit vector the camera is looking along.
    pub fn world_direction(&self) -> Vec3 {
        let dir = (self.look_target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            Vec3::NEG_Z
        } else {
            dir
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrbitSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub rotate_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            min_distance: 5.0,
            max_distance: 15.0,
            min_polar_angle: 1.2,
            max_polar_angle: FRAC_PI_2 - 0.05,
            min_azimuth_angle: 0.0,
            max_azimuth_angle: 0.0,
            rotate_speed: 1.0,
        }
    }
}

impl OrbitSettings {
    /// Puts every min/max pair in order and replaces NaN bounds with the
    /// defaults, so clamping against them cannot panic.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let (min_distance, max_distance) = ordered(
            (self.min_distance, defaults.min_distance),
            (self.max_distance, defaults.max_distance),
        );
        let (min_polar_angle, max_polar_angle) = ordered(
            (self.min_polar_angle, defaults.min_polar_angle),
            (self.max_polar_angle, defaults.max_polar_angle),
        );
        Self {
            min_distance,
            max_distance,
            min_polar_angle,
            max_polar_angle,
            ..self
        }
    }
}

fn ordered((min, min_fallback): (f32, f32), (max, max_fallback): (f32, f32)) -> (f32, f32) {
    let min = if min.is_nan() { min_fallback } else { min };
    let max = if max.is_nan() { max_fallback } else { max };
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    settings: OrbitSettings,
    target: Vec3,
    pending_delta: Spherical,
}

impl OrbitControls {
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            target: Vec3::ZERO,
            pending_delta: Spherical::default(),
        }
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn rotate_by_drag(&mut self, dx_px: f32, dy_px: f32, viewport_height: u32) {
        if viewport_height == 0 {
            return;
        }
        let height = viewport_height as f32;
        let speed = self.settings.rotate_speed;
        self.pending_delta.theta -= TAU * dx_px / height * speed;
        self.pending_delta.phi -= TAU * dy_px / height * speed;
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let settings = self.settings;
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        let blend = if settings.enable_damping {
            settings.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.pending_delta.theta * blend;
        spherical.phi += self.pending_delta.phi * blend;

        spherical.theta = clamp_azimuth(
            spherical.theta,
            settings.min_azimuth_angle,
            settings.max_azimuth_angle,
        );
        spherical.phi = spherical
            .phi
            .clamp(settings.min_polar_angle, settings.max_polar_angle)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = spherical
            .radius
            .clamp(settings.min_distance, settings.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.look_target = self.target;

        if settings.enable_damping {
            let decay = 1.0 - settings.damping_factor;
            self.pending_delta.theta *= decay;
            self.pending_delta.phi *= decay;
        } else {
            self.pending_delta = Spherical::default();
        }
    }
}

fn clamp_azimuth(theta: f32, min: f32, max: f32) -> f32 {
    if !min.is_finite() || !max.is_finite() {
        return theta;
    }
    let min = wrap_into_pi(min);
    let max = wrap_into_pi(max);
    if min <= max {
        theta.clamp(min, max)
    } else if theta > (min + max) * 0.5 {
        theta.max(min)
    } else {
        theta.min(max)
    }
}

fn wrap_into_pi(angle: f32) -> f32 {
    if angle < -PI {
        angle + TAU
    } else if angle > PI {
        angle - TAU
    } else {
        angle
    }
}
