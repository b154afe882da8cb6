use std::path::{Path, PathBuf};

use glam::{Quat, Vec3};
use motion_engine::{
    box_mesh, ground_plane, load_model, shape_from_mesh, AnimationClip, BodyHandle, BodyKind,
    EntityId, InputSnapshot, MeshGeometry, PhysicsWorld, Renderable, Scene, SceneCommand,
    SceneWorld, Transform3,
};
use tracing::{debug, info, warn};

use super::controller::{CharacterControls, CharacterRig, ControllerTuning, DirectionKeys};
use crate::app::config::{CharacterConfig, PropConfig, SceneConfig};

const PLACEHOLDER_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 0.9, 0.3);
const GROUND_THICKNESS: f32 = 0.1;

struct Character {
    entity: EntityId,
    controls: CharacterControls,
}

pub(crate) struct DemoScene {
    config: SceneConfig,
    assets_dir: PathBuf,
    character: Option<Character>,
}

impl DemoScene {
    pub(crate) fn new(config: SceneConfig, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            assets_dir: assets_dir.into(),
            character: None,
        }
    }

    fn apply_environment(&self, world: &mut SceneWorld) {
        let [r, g, b] = self.config.background;
        world.set_background([r, g, b, 0xff]);
        world.set_lights(self.config.lights);
        world.set_orbit_settings(self.config.orbit);
        world.replace_physics(PhysicsWorld::new(self.config.physics));

        let camera = world.camera_mut();
        camera.fov_y_degrees = self.config.camera.fov_y_degrees;
        camera.near = self.config.camera.near;
        camera.far = self.config.camera.far;
        camera.position = Vec3::from_array(self.config.camera.position);
    }

    /// Returns whether the prop's model was found.
    fn spawn_prop(&self, world: &mut SceneWorld, prop: &PropConfig) -> bool {
        let path = self.assets_dir.join(&prop.model);
        let model = match load_model(&path) {
            Ok(model) => model,
            Err(err) => {
                warn!(prop = prop.name.as_str(), error = %err, "prop_load_failed");
                return false;
            }
        };

        let transform = Transform3::from_translation(Vec3::from_array(prop.position))
            .with_yaw(prop.yaw_radians)
            .with_uniform_scale(prop.scale);
        let body = world
            .physics_mut()
            .add_body(prop.body, transform.translation, transform.rotation);
        if prop.collision_hulls {
            attach_hulls(world.physics_mut(), body, &prop.name, &model.meshes, prop.scale);
        }

        let [r, g, b] = prop.color;
        for mesh in model.meshes {
            let name = format!("{}/{}", prop.name, mesh.name);
            let renderable = Renderable {
                mesh: mesh.into_shared(),
                color: [r, g, b, 0xff],
            };
            world.spawn_with_body(name, transform, Some(renderable), body);
        }
        info!(
            prop = prop.name.as_str(),
            body = ?prop.body,
            hulls = prop.collision_hulls,
            "prop_spawned"
        );
        true
    }

    fn spawn_character(&mut self, world: &mut SceneWorld) {
        let config = &self.config.character;
        let (meshes, clips) = load_character_model(&self.assets_dir, config);

        let spawn = Vec3::from_array(config.position);
        let mut transform = Transform3::from_translation(spawn)
            .with_yaw(config.yaw_radians)
            .with_uniform_scale(config.scale);
        let tuning = controller_tuning(config);
        let controls = {
            let (camera, orbit) = world.camera_rig_mut();
            CharacterControls::new(
                clips,
                &config.excluded_clips,
                &config.initial_action,
                tuning,
                spawn,
                config.yaw_radians,
                CharacterRig {
                    model: &mut transform,
                    camera,
                    orbit,
                },
            )
        };

        let body = world.physics_mut().add_body(
            BodyKind::Kinematic,
            transform.translation,
            transform.rotation,
        );
        if config.collision_hulls {
            attach_hulls(world.physics_mut(), body, "character", &meshes, config.scale);
        }

        let [r, g, b] = config.color;
        let renderable = Renderable {
            mesh: merge_meshes("character", &meshes).into_shared(),
            color: [r, g, b, 0xff],
        };
        let entity = world.spawn_with_body("character", transform, Some(renderable), body);
        info!(
            entity = entity.0,
            meshes = meshes.len(),
            action = controls.current_action(),
            "character_spawned"
        );
        self.character = Some(Character { entity, controls });
    }

    fn spawn_fallback_ground(&self, world: &mut SceneWorld) {
        let ground = self.config.fallback_ground;
        let half_size = ground.half_size;
        let collider = box_mesh(
            "ground_collider",
            Vec3::new(half_size, GROUND_THICKNESS * 0.5, half_size),
        );
        let body = world.physics_mut().add_body(
            BodyKind::Static,
            Vec3::new(0.0, -GROUND_THICKNESS * 0.5, 0.0),
            Quat::IDENTITY,
        );
        attach_hulls(world.physics_mut(), body, "ground", &[collider], 1.0);

        let [r, g, b] = ground.color;
        let renderable = Renderable {
            mesh: ground_plane(half_size).into_shared(),
            color: [r, g, b, 0xff],
        };
        world.spawn("ground", Transform3::default(), Some(renderable));
        info!(half_size, "fallback_ground_spawned");
    }
}

impl Scene for DemoScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.apply_environment(world);

        let mut props_loaded = 0usize;
        for prop in &self.config.props {
            if self.spawn_prop(world, prop) {
                props_loaded += 1;
            }
        }

        self.spawn_character(world);

        if props_loaded == 0 && self.config.fallback_ground.enabled {
            self.spawn_fallback_ground(world);
        }

        world.physics().log_summary();
        info!(
            props = props_loaded,
            props_configured = self.config.props.len(),
            "demo_scene_ready"
        );
    }

    fn update(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        let Some(character) = self.character.as_mut() else {
            return SceneCommand::None;
        };

        if input.toggle_run_pressed() {
            character.controls.switch_run_toggle();
        }
        if input.jump_pressed() {
            character.controls.jump();
        }

        let Some(mut model) = world
            .find_entity(character.entity)
            .map(|entity| entity.transform)
        else {
            return SceneCommand::None;
        };
        {
            let (camera, orbit) = world.camera_rig_mut();
            character.controls.update(
                dt_seconds,
                DirectionKeys::from_input(input),
                CharacterRig {
                    model: &mut model,
                    camera,
                    orbit,
                },
            );
        }
        if let Some(entity) = world.find_entity_mut(character.entity) {
            entity.transform = model;
        }

        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        info!(entities = world.entity_count(), "demo_scene_unloaded");
        self.character = None;
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let character = self.character.as_ref()?;
        let mode = if character.controls.is_running() {
            "run"
        } else {
            "walk"
        };
        Some(format!(
            "{} | {} | action: {}",
            self.config.window.title,
            mode,
            character.controls.current_action()
        ))
    }
}

fn controller_tuning(config: &CharacterConfig) -> ControllerTuning {
    ControllerTuning {
        fade_duration: config.fade_duration,
        walk_velocity: config.walk_velocity,
        run_velocity: config.run_velocity,
        jump_velocity: config.jump_velocity,
        jump_duration: config.jump_duration,
        turn_step_radians: config.turn_step_radians,
        camera_target_height: config.camera_target_height,
        run_by_default: config.run_by_default,
    }
}

fn load_character_model(
    assets_dir: &Path,
    config: &CharacterConfig,
) -> (Vec<MeshGeometry>, Vec<AnimationClip>) {
    let path = assets_dir.join(&config.model);
    match load_model(&path) {
        Ok(model) => (model.meshes, model.clips),
        Err(err) => {
            warn!(error = %err, "character_model_missing");
            let mut placeholder = box_mesh("character_placeholder", PLACEHOLDER_HALF_EXTENTS);
            for position in &mut placeholder.positions {
                position.y += PLACEHOLDER_HALF_EXTENTS.y;
            }
            (vec![placeholder], Vec::new())
        }
    }
}

/// One convex hull per mesh, scaled into body space. Meshes whose hull
/// cannot be built are skipped.
fn attach_hulls(
    physics: &mut PhysicsWorld,
    body: BodyHandle,
    owner: &str,
    meshes: &[MeshGeometry],
    scale: f32,
) {
    for mesh in meshes {
        let shape = match shape_from_mesh(&mesh.positions) {
            Ok(shape) => shape.scaled(Vec3::splat(scale)),
            Err(err) => {
                warn!(owner, mesh = mesh.name.as_str(), error = %err, "hull_skipped");
                continue;
            }
        };
        match physics.add_convex_shape(body, &shape) {
            Ok(colliders) => debug!(
                owner,
                mesh = mesh.name.as_str(),
                vertices = shape.vertices.len(),
                faces = shape.faces.len(),
                colliders,
                "hull_built"
            ),
            Err(err) => {
                warn!(owner, mesh = mesh.name.as_str(), error = %err, "hull_rejected");
            }
        }
    }
}

fn merge_meshes(name: &str, meshes: &[MeshGeometry]) -> MeshGeometry {
    let mut merged = MeshGeometry {
        name: name.to_string(),
        positions: Vec::new(),
        indices: Vec::new(),
    };
    for mesh in meshes {
        let base = merged.positions.len() as u32;
        merged.positions.extend_from_slice(&mesh.positions);
        merged
            .indices
            .extend(mesh.indices.iter().map(|index| base + index));
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::fs;

    use motion_engine::{Entity, InputAction, SceneHost};

    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    const CUBE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "block", "mesh": 0 }],
  "meshes": [
    { "name": "block", "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }
  ],
  "buffers": [{ "uri": "crate.bin", "byteLength": 168 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 96 },
    { "buffer": 0, "byteOffset": 96, "byteLength": 72 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3",
      "min": [-0.5, -0.5, -0.5], "max": [0.5, 0.5, 0.5] },
    { "bufferView": 1, "componentType": 5123, "count": 36, "type": "SCALAR" }
  ]
}"#;

    fn write_crate_model(assets_dir: &Path) {
        let cube = box_mesh("block", Vec3::splat(0.5));
        let mut bytes = Vec::with_capacity(168);
        for position in &cube.positions {
            for value in position.to_array() {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        for index in &cube.indices {
            bytes.extend_from_slice(&(*index as u16).to_le_bytes());
        }

        let models = assets_dir.join("models");
        fs::create_dir_all(&models).expect("models dir");
        fs::write(models.join("crate.gltf"), CUBE_GLTF).expect("write gltf");
        fs::write(models.join("crate.bin"), bytes).expect("write bin");
    }

    fn crate_prop(body: BodyKind, position: [f32; 3]) -> PropConfig {
        PropConfig {
            name: "crate".to_string(),
            model: "models/crate.gltf".to_string(),
            position,
            body,
            ..PropConfig::default()
        }
    }

    fn loaded_host(config: SceneConfig, assets_dir: &Path) -> SceneHost {
        let mut host = SceneHost::new(Box::new(DemoScene::new(config, assets_dir)));
        host.load();
        host
    }

    fn character_entity(host: &SceneHost) -> &Entity {
        host.world()
            .entities()
            .iter()
            .find(|entity| entity.name == "character")
            .expect("character entity")
    }

    #[test]
    fn missing_assets_fall_back_to_placeholders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = loaded_host(SceneConfig::default(), dir.path());
        let world = host.world();

        let names = world
            .entities()
            .iter()
            .map(|entity| entity.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["character", "ground"]);
        assert_eq!(world.physics().body_count(), 2);
        assert_eq!(world.physics().collider_count(), 2);
        assert_eq!(world.background(), [0xa8, 0xde, 0xf0, 0xff]);

        let character = character_entity(&host);
        assert_eq!(character.transform.translation, Vec3::new(0.0, 0.1, 60.0));
        assert!((world.orbit().target() - Vec3::new(0.0, 1.1, 60.0)).length() < 1.0e-4);
        assert_eq!(
            host.debug_title().as_deref(),
            Some("Motion Demo | run | action: idle")
        );
    }

    #[test]
    fn holding_forward_moves_character_body_and_camera() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut host = loaded_host(SceneConfig::default(), dir.path());
        let camera_before = host.world().camera().position;

        let input = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);
        for _ in 0..30 {
            host.frame(FRAME, &input);
        }

        let character = character_entity(&host);
        let translation = character.transform.translation;
        assert!(translation.z < 60.0, "character did not move: {translation}");
        assert!((translation.y - 0.1).abs() < 1.0e-4);

        let body = character.body.expect("character body");
        let (body_translation, _) = host.world().physics().body_pose(body).expect("pose");
        assert!((body_translation - translation).length() < 1.0e-3);

        assert!(host.world().camera().position.z < camera_before.z);
        assert_eq!(
            host.debug_title().as_deref(),
            Some("Motion Demo | run | action: run")
        );
    }

    #[test]
    fn run_toggle_and_jump_edges_reach_the_controller() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut host = loaded_host(SceneConfig::default(), dir.path());

        let toggle = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_toggle_run_pressed(true);
        host.frame(FRAME, &toggle);
        assert_eq!(
            host.debug_title().as_deref(),
            Some("Motion Demo | walk | action: walk")
        );

        host.frame(FRAME, &InputSnapshot::empty().with_jump_pressed(true));
        assert_eq!(
            host.debug_title().as_deref(),
            Some("Motion Demo | walk | action: jump")
        );
    }

    #[test]
    fn quit_request_returns_quit_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut host = loaded_host(SceneConfig::default(), dir.path());

        let report = host.frame(FRAME, &InputSnapshot::empty().with_quit_requested(true));
        assert_eq!(report.command, SceneCommand::Quit);
    }

    #[test]
    fn loaded_prop_gets_hull_and_suppresses_fallback_ground() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_crate_model(dir.path());
        let config = SceneConfig {
            props: vec![crate_prop(BodyKind::Static, [7.0, 0.0, 0.0])],
            ..SceneConfig::default()
        };
        let host = loaded_host(config, dir.path());
        let world = host.world();

        assert!(world.entities().iter().all(|entity| entity.name != "ground"));
        let prop = world
            .entities()
            .iter()
            .find(|entity| entity.name == "crate/block")
            .expect("prop entity");
        assert_eq!(prop.transform.translation, Vec3::new(7.0, 0.0, 0.0));

        let body = prop.body.expect("prop body");
        assert_eq!(world.physics().body_kind(body), Some(BodyKind::Static));
        assert_eq!(world.physics().body_count(), 2);
        assert_eq!(world.physics().collider_count(), 2);
    }

    #[test]
    fn prop_without_hulls_has_an_inert_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_crate_model(dir.path());
        let config = SceneConfig {
            props: vec![PropConfig {
                collision_hulls: false,
                ..crate_prop(BodyKind::Static, [0.0, 0.0, -16.0])
            }],
            ..SceneConfig::default()
        };
        let host = loaded_host(config, dir.path());

        assert_eq!(host.world().physics().body_count(), 2);
        assert_eq!(host.world().physics().collider_count(), 1);
    }

    #[test]
    fn dynamic_prop_follows_its_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_crate_model(dir.path());
        let config = SceneConfig {
            props: vec![crate_prop(BodyKind::Dynamic, [-20.0, 5.0, 0.0])],
            ..SceneConfig::default()
        };
        let mut host = loaded_host(config, dir.path());

        for _ in 0..20 {
            host.frame(FRAME, &InputSnapshot::empty());
        }

        let prop = host
            .world()
            .entities()
            .iter()
            .find(|entity| entity.name == "crate/block")
            .expect("prop entity");
        assert!(prop.transform.translation.y < 5.0);
    }

    #[test]
    fn merged_meshes_offset_indices() {
        let a = box_mesh("a", Vec3::ONE);
        let b = box_mesh("b", Vec3::ONE);
        let merged = merge_meshes("both", &[a.clone(), b]);
        assert_eq!(merged.positions.len(), 16);
        assert_eq!(merged.indices.len(), 72);
        assert_eq!(merged.indices[36], a.indices[0] + 8);
    }

    #[test]
    fn unload_clears_the_world() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut host = loaded_host(SceneConfig::default(), dir.path());
        host.shutdown();
        assert_eq!(host.world().entity_count(), 0);
        assert_eq!(host.debug_title(), None);
    }
}
