use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use tracing::{debug, info};

use super::camera::{OrbitControls, OrbitSettings, PerspectiveCamera};
use super::input::{ActionStates, InputAction, DIRECTION_ACTIONS};
use crate::assets::MeshGeometry;
use crate::physics::{BodyHandle, BodyKind, PhysicsWorld};

pub const DEFAULT_BACKGROUND_RGBA: [u8; 4] = [0xa8, 0xde, 0xf0, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    jump_pressed: bool,
    toggle_run_pressed: bool,
    orbit_drag_px: (f32, f32),
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        jump_pressed: bool,
        toggle_run_pressed: bool,
        orbit_drag_px: (f32, f32),
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            jump_pressed,
            toggle_run_pressed,
            orbit_drag_px,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn any_direction_down(&self) -> bool {
        self.actions.any_down(&DIRECTION_ACTIONS)
    }

    /// Space went down since the previous frame.
    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    /// Shift went down since the previous frame.
    pub fn toggle_run_pressed(&self) -> bool {
        self.toggle_run_pressed
    }

    pub fn orbit_drag_px(&self) -> (f32, f32) {
        self.orbit_drag_px
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_jump_pressed(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        self
    }

    pub fn with_toggle_run_pressed(mut self, toggle_run_pressed: bool) -> Self {
        self.toggle_run_pressed = toggle_run_pressed;
        self
    }

    pub fn with_orbit_drag_px(mut self, dx: f32, dy: f32) -> Self {
        self.orbit_drag_px = (dx, dy);
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3 {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3 {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform3 {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn with_yaw(mut self, yaw_radians: f32) -> Self {
        self.rotation = Quat::from_rotation_y(yaw_radians);
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub mesh: Arc<MeshGeometry>,
    pub color: [u8; 4],
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform3,
    pub renderable: Option<Renderable>,
    pub visible: bool,
    pub body: Option<BodyHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectionalLight {
    pub color: [u8; 3],
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: [0xff, 0xff, 0xff],
            intensity: 3.0,
            position: [-60.0, 100.0, -10.0],
        }
    }
}

impl DirectionalLight {
    /// Unit vector pointing from the scene towards the light.
    pub fn direction_to_light(&self) -> Vec3 {
        Vec3::from_array(self.position).normalize_or_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightSettings {
    pub ambient_color: [u8; 3],
    pub ambient_intensity: f32,
    pub directional: DirectionalLight,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            ambient_color: [0xff, 0xff, 0xff],
            ambient_intensity: 0.7,
            directional: DirectionalLight::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    camera: PerspectiveCamera,
    orbit: OrbitControls,
    physics: PhysicsWorld,
    background: [u8; 4],
    lights: LightSettings,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            entities: Vec::new(),
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
            camera: PerspectiveCamera::default(),
            orbit: OrbitControls::new(OrbitSettings::default()),
            physics: PhysicsWorld::default(),
            background: DEFAULT_BACKGROUND_RGBA,
            lights: LightSettings::default(),
        }
    }
}

impl SceneWorld {
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        transform: Transform3,
        renderable: Option<Renderable>,
    ) -> EntityId {
        self.spawn_internal(name.into(), transform, renderable, None)
    }

    /// Spawns an entity tied to a physics body. Kinematic bodies follow the
    /// entity, dynamic bodies drive it; static bodies are left alone.
    pub fn spawn_with_body(
        &mut self,
        name: impl Into<String>,
        transform: Transform3,
        renderable: Option<Renderable>,
        body: BodyHandle,
    ) -> EntityId {
        self.spawn_internal(name.into(), transform, renderable, Some(body))
    }

    fn spawn_internal(
        &mut self,
        name: String,
        transform: Transform3,
        renderable: Option<Renderable>,
        body: Option<BodyHandle>,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            name,
            transform,
            renderable,
            visible: true,
            body,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            self.entities.append(&mut self.pending_spawns);
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            let mut released = Vec::new();
            self.entities.retain(|entity| {
                let keep = pending.binary_search(&entity.id).is_err();
                if !keep {
                    released.extend(entity.body);
                }
                keep
            });
            self.pending_despawns.clear();

            // Several entities may share a body (one per mesh of a prop).
            for body in released {
                let still_used = self.entities.iter().any(|entity| entity.body == Some(body));
                if !still_used && self.physics.remove_body(body) {
                    debug!(?body, "body_removed");
                }
            }
        }
    }

    /// Drops all entities and resets camera, physics and lighting.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Looks up applied entities first, then ones still waiting to spawn.
    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .chain(self.pending_spawns.iter_mut())
            .find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn orbit(&self) -> &OrbitControls {
        &self.orbit
    }

    pub fn orbit_mut(&mut self) -> &mut OrbitControls {
        &mut self.orbit
    }

    pub fn set_orbit_settings(&mut self, settings: OrbitSettings) {
        let target = self.orbit.target();
        self.orbit = OrbitControls::new(settings);
        self.orbit.set_target(target);
    }

    /// Camera and orbit rig borrowed together, for code that moves both.
    pub fn camera_rig_mut(&mut self) -> (&mut PerspectiveCamera, &mut OrbitControls) {
        (&mut self.camera, &mut self.orbit)
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn replace_physics(&mut self, physics: PhysicsWorld) {
        self.physics = physics;
    }

    pub fn background(&self) -> [u8; 4] {
        self.background
    }

    pub fn set_background(&mut self, background: [u8; 4]) {
        self.background = background;
    }

    pub fn lights(&self) -> &LightSettings {
        &self.lights
    }

    pub fn set_lights(&mut self, lights: LightSettings) {
        self.lights = lights;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect_from_size(width, height);
    }

    pub fn apply_orbit_drag(&mut self, dx_px: f32, dy_px: f32, viewport_height: u32) {
        if dx_px == 0.0 && dy_px == 0.0 {
            return;
        }
        self.orbit.rotate_by_drag(dx_px, dy_px, viewport_height);
    }

    /// Pushes kinematic entity poses into the physics world, steps it once and
    /// copies dynamic body poses back. Returns the simulated seconds.
    pub fn step_physics(&mut self, dt_seconds: f32) -> f32 {
        for entity in &self.entities {
            let Some(body) = entity.body else {
                continue;
            };
            if self.physics.body_kind(body) == Some(BodyKind::Kinematic) {
                self.physics.set_kinematic_pose(
                    body,
                    entity.transform.translation,
                    entity.transform.rotation,
                );
            }
        }

        let stepped = self.physics.step(dt_seconds);
        if stepped <= 0.0 {
            return stepped;
        }

        for entity in &mut self.entities {
            let Some(body) = entity.body else {
                continue;
            };
            if self.physics.body_kind(body) != Some(BodyKind::Dynamic) {
                continue;
            }
            if let Some((translation, rotation)) = self.physics.body_pose(body) {
                entity.transform.translation = translation;
                entity.transform.rotation = rotation;
            }
        }
        stepped
    }

    pub fn update_camera(&mut self) {
        self.orbit.update(&mut self.camera);
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub command: SceneCommand,
    pub physics_seconds: f32,
}

/// Owns the running scene and its world, and fixes the per-frame order:
/// scene update, pending entity changes, physics step, orbit camera.
pub struct SceneHost {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneHost {
    pub fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.world.update_camera();
        self.is_loaded = true;
        info!(
            entities = self.world.entity_count(),
            bodies = self.world.physics().body_count(),
            colliders = self.world.physics().collider_count(),
            "scene_loaded"
        );
    }

    pub fn frame(&mut self, dt_seconds: f32, input: &InputSnapshot) -> FrameReport {
        if !self.is_loaded {
            self.load();
        }
        let command = self.scene.update(dt_seconds, input, &mut self.world);
        self.world.apply_pending();

        let physics_seconds = self.world.step_physics(dt_seconds);

        let (dx, dy) = input.orbit_drag_px();
        let (_, height) = input.window_size();
        self.world.apply_orbit_drag(dx, dy, height);
        self.world.update_camera();

        FrameReport {
            command,
            physics_seconds,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.world.resize(width, height);
    }

    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut SceneWorld {
        &mut self.world
    }

    pub fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.is_loaded = false;
    }
}
