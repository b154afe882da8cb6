//! Scene description loaded from `assets/scene.json`.
//!
//! Every field has a default matching the stock scene, so a missing file or
//! a partial file is valid. Unknown fields are rejected.

use std::env;
use std::f32::consts::PI;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use motion_engine::{BodyKind, LightSettings, LoopConfig, OrbitSettings, PhysicsSettings};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub(crate) const SCENE_FILE_ENV_VAR: &str = "MOTION_SCENE_FILE";
pub(crate) const DEFAULT_SCENE_FILE: &str = "scene.json";

#[derive(Debug, Error)]
pub(crate) enum SceneConfigError {
    #[error("failed to read scene config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse scene config {path}{location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid scene config at {field}: {message}")]
    Invalid { field: String, message: String },
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WindowConfig {
    pub(crate) title: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) max_render_fps: Option<u32>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Motion Demo".to_string(),
            width: 1280,
            height: 720,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CameraConfig {
    pub(crate) fov_y_degrees: f32,
    pub(crate) near: f32,
    pub(crate) far: f32,
    pub(crate) position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 5.0, 60.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CharacterConfig {
    pub(crate) model: String,
    pub(crate) position: [f32; 3],
    pub(crate) yaw_radians: f32,
    pub(crate) scale: f32,
    pub(crate) color: [u8; 3],
    pub(crate) collision_hulls: bool,
    pub(crate) excluded_clips: Vec<String>,
    pub(crate) initial_action: String,
    pub(crate) run_by_default: bool,
    pub(crate) fade_duration: f32,
    pub(crate) walk_velocity: f32,
    pub(crate) run_velocity: f32,
    pub(crate) jump_velocity: f32,
    pub(crate) jump_duration: f32,
    pub(crate) turn_step_radians: f32,
    pub(crate) camera_target_height: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            model: "models/homeless2.glb".to_string(),
            position: [0.0, 0.1, 60.0],
            yaw_radians: PI,
            scale: 1.0,
            color: [196, 164, 132],
            collision_hulls: true,
            excluded_clips: vec!["Armature|mixamo.com|Layer0".to_string()],
            initial_action: "idle".to_string(),
            run_by_default: true,
            fade_duration: 0.2,
            walk_velocity: 2.0,
            run_velocity: 5.0,
            jump_velocity: 10.0,
            jump_duration: 0.6,
            turn_step_radians: 0.2,
            camera_target_height: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PropConfig {
    pub(crate) name: String,
    pub(crate) model: String,
    pub(crate) position: [f32; 3],
    pub(crate) yaw_radians: f32,
    pub(crate) scale: f32,
    pub(crate) color: [u8; 3],
    pub(crate) body: BodyKind,
    /// One convex hull per mesh; without it the body has no shapes.
    pub(crate) collision_hulls: bool,
}

impl Default for PropConfig {
    fn default() -> Self {
        Self {
            name: "prop".to_string(),
            model: String::new(),
            position: [0.0; 3],
            yaw_radians: 0.0,
            scale: 1.0,
            color: [160, 160, 160],
            body: BodyKind::Static,
            collision_hulls: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GroundConfig {
    pub(crate) enabled: bool,
    pub(crate) half_size: f32,
    pub(crate) color: [u8; 3],
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            half_size: 80.0,
            color: [194, 178, 128],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SceneConfig {
    pub(crate) window: WindowConfig,
    pub(crate) background: [u8; 3],
    pub(crate) camera: CameraConfig,
    pub(crate) orbit: OrbitSettings,
    pub(crate) lights: LightSettings,
    pub(crate) physics: PhysicsSettings,
    pub(crate) character: CharacterConfig,
    pub(crate) props: Vec<PropConfig>,
    /// Used only when no prop could be loaded.
    pub(crate) fallback_ground: GroundConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            background: [0xa8, 0xde, 0xf0],
            camera: CameraConfig::default(),
            orbit: OrbitSettings::default(),
            lights: LightSettings::default(),
            physics: PhysicsSettings::default(),
            character: CharacterConfig::default(),
            props: vec![
                PropConfig {
                    name: "tunnel".to_string(),
                    model: "models/test_tunnel (1).glb".to_string(),
                    position: [7.0, 0.0, 0.0],
                    color: [150, 150, 140],
                    ..PropConfig::default()
                },
                PropConfig {
                    name: "shelter".to_string(),
                    model: "models/bunkerwithoutdoors_untitled.glb".to_string(),
                    position: [0.0, 0.0, -16.0],
                    yaw_radians: PI,
                    scale: 0.7,
                    color: [120, 130, 110],
                    collision_hulls: false,
                    ..PropConfig::default()
                },
            ],
            fallback_ground: GroundConfig::default(),
        }
    }
}

impl SceneConfig {
    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            window_title: self.window.title.clone(),
            window_width: self.window.width,
            window_height: self.window.height,
            max_render_fps: self.window.max_render_fps,
            ..LoopConfig::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SceneConfigError> {
        ensure(self.window.width > 0, "window.width", "must be positive")?;
        ensure(self.window.height > 0, "window.height", "must be positive")?;

        let camera = &self.camera;
        ensure(
            camera.fov_y_degrees > 0.0 && camera.fov_y_degrees < 180.0,
            "camera.fov_y_degrees",
            "must be between 0 and 180",
        )?;
        ensure(camera.near > 0.0, "camera.near", "must be positive")?;
        ensure(camera.far > camera.near, "camera.far", "must exceed camera.near")?;
        ensure_finite(&camera.position, "camera.position")?;

        let orbit = &self.orbit;
        ensure(
            orbit.damping_factor > 0.0 && orbit.damping_factor <= 1.0,
            "orbit.damping_factor",
            "must be in (0, 1]",
        )?;
        ensure(
            orbit.min_distance > 0.0 && orbit.min_distance <= orbit.max_distance,
            "orbit.min_distance",
            "must be positive and not exceed orbit.max_distance",
        )?;
        ensure(
            orbit.min_polar_angle <= orbit.max_polar_angle,
            "orbit.min_polar_angle",
            "must not exceed orbit.max_polar_angle",
        )?;

        let physics = &self.physics;
        ensure_finite(&physics.gravity, "physics.gravity")?;
        ensure(physics.friction >= 0.0, "physics.friction", "must not be negative")?;
        ensure(
            physics.restitution >= 0.0,
            "physics.restitution",
            "must not be negative",
        )?;
        ensure(
            physics.max_step_seconds > 0.0,
            "physics.max_step_seconds",
            "must be positive",
        )?;

        let character = &self.character;
        ensure(!character.model.is_empty(), "character.model", "must not be empty")?;
        ensure_finite(&character.position, "character.position")?;
        ensure(character.scale > 0.0, "character.scale", "must be positive")?;
        ensure(
            !character.initial_action.is_empty(),
            "character.initial_action",
            "must not be empty",
        )?;
        for (field, value) in [
            ("character.fade_duration", character.fade_duration),
            ("character.walk_velocity", character.walk_velocity),
            ("character.run_velocity", character.run_velocity),
            ("character.jump_velocity", character.jump_velocity),
            ("character.jump_duration", character.jump_duration),
            ("character.camera_target_height", character.camera_target_height),
        ] {
            ensure(
                value.is_finite() && value >= 0.0,
                field,
                "must be a finite, non-negative number",
            )?;
        }
        ensure(
            character.turn_step_radians > 0.0,
            "character.turn_step_radians",
            "must be positive",
        )?;

        for (index, prop) in self.props.iter().enumerate() {
            let field = |name: &str| format!("props[{index}].{name}");
            ensure(!prop.name.is_empty(), &field("name"), "must not be empty")?;
            ensure(!prop.model.is_empty(), &field("model"), "must not be empty")?;
            ensure(prop.scale > 0.0, &field("scale"), "must be positive")?;
            ensure_finite(&prop.position, &field("position"))?;
            ensure(
                prop.body != BodyKind::Kinematic,
                &field("body"),
                "props are either static or dynamic",
            )?;
        }

        ensure(
            self.fallback_ground.half_size > 0.0,
            "fallback_ground.half_size",
            "must be positive",
        )?;
        Ok(())
    }
}

fn ensure(condition: bool, field: &str, message: &str) -> Result<(), SceneConfigError> {
    if condition {
        Ok(())
    } else {
        Err(SceneConfigError::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        })
    }
}

fn ensure_finite(values: &[f32], field: &str) -> Result<(), SceneConfigError> {
    ensure(
        values.iter().all(|value| value.is_finite()),
        field,
        "must contain finite numbers",
    )
}

pub(crate) fn parse_scene_config(raw: &str, path: &Path) -> Result<SceneConfig, SceneConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = match serde_path_to_error::deserialize::<_, SceneConfig>(&mut deserializer) {
        Ok(config) => config,
        Err(error) => {
            let json_path = error.path().to_string();
            let location = if json_path.is_empty() || json_path == "." {
                String::new()
            } else {
                format!(" at {json_path}")
            };
            return Err(SceneConfigError::Parse {
                path: path.to_path_buf(),
                location,
                source: error.into_inner(),
            });
        }
    };
    config.validate()?;
    Ok(config)
}

/// Picks the scene file: the env override when set, otherwise
/// `<assets>/scene.json`. The flag is true for an explicit override.
pub(crate) fn resolve_scene_path(
    assets_dir: &Path,
    env_override: Option<String>,
) -> (PathBuf, bool) {
    match env_override.filter(|value| !value.trim().is_empty()) {
        Some(value) => (PathBuf::from(value.trim()), true),
        None => (assets_dir.join(DEFAULT_SCENE_FILE), false),
    }
}

/// Reads and validates a scene file. A missing default file yields the
/// built-in scene; a missing explicit file is an error.
pub(crate) fn load_scene_config_from(
    path: &Path,
    explicit: bool,
) -> Result<SceneConfig, SceneConfigError> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let config = parse_scene_config(&raw, path)?;
            info!(
                path = %path.display(),
                props = config.props.len(),
                "scene_config_loaded"
            );
            Ok(config)
        }
        Err(source) if source.kind() == io::ErrorKind::NotFound && !explicit => {
            info!(path = %path.display(), "scene_config_defaults");
            Ok(SceneConfig::default())
        }
        Err(source) => Err(SceneConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn load_scene_config(assets_dir: &Path) -> Result<SceneConfig, SceneConfigError> {
    let env_override = match env::var(SCENE_FILE_ENV_VAR) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(source) => {
            return Err(SceneConfigError::EnvVar {
                var: SCENE_FILE_ENV_VAR,
                source,
            })
        }
    };
    let (path, explicit) = resolve_scene_path(assets_dir, env_override);
    load_scene_config_from(&path, explicit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<SceneConfig, SceneConfigError> {
        parse_scene_config(raw, Path::new("scene.json"))
    }

    #[test]
    fn empty_object_yields_stock_scene() {
        let config = parse("{}").expect("config");
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.character.model, "models/homeless2.glb");
        assert_eq!(config.character.position, [0.0, 0.1, 60.0]);
        assert_eq!(config.props.len(), 2);
        assert_eq!(config.props[1].scale, 0.7);
        assert!(!config.props[1].collision_hulls);
        assert_eq!(config.physics.gravity, [0.0, -9.82, 0.0]);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse(
            r#"{
                "character": { "walk_velocity": 3.5 },
                "physics": { "gravity": [0.0, -1.62, 0.0] },
                "props": [{ "name": "crate", "model": "models/crate.glb", "body": "dynamic" }]
            }"#,
        )
        .expect("config");

        assert_eq!(config.character.walk_velocity, 3.5);
        assert_eq!(config.character.run_velocity, 5.0);
        assert_eq!(config.physics.gravity, [0.0, -1.62, 0.0]);
        assert_eq!(config.physics.friction, 0.25);
        assert_eq!(config.props.len(), 1);
        assert_eq!(config.props[0].body, BodyKind::Dynamic);
        assert_eq!(config.orbit, OrbitSettings::default());
    }

    #[test]
    fn parse_errors_name_the_json_path() {
        let err = parse(r#"{ "character": { "walk_velocity": "fast" } }"#).expect_err("error");
        let message = err.to_string();
        assert!(message.contains("character.walk_velocity"), "{message}");

        let err = parse(r#"{ "camera": { "zoom": 2.0 } }"#).expect_err("error");
        assert!(err.to_string().contains("camera"), "{err}");
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let err = parse(r#"{ "character": { "walk_velocity": -1.0 } }"#).expect_err("error");
        match err {
            SceneConfigError::Invalid { field, .. } => assert_eq!(field, "character.walk_velocity"),
            other => panic!("unexpected error: {other}"),
        }

        let err = parse(r#"{ "props": [{ "model": "x.glb", "scale": 0.0 }] }"#).expect_err("error");
        match err {
            SceneConfigError::Invalid { field, .. } => assert_eq!(field, "props[0].scale"),
            other => panic!("unexpected error: {other}"),
        }

        let err = parse(r#"{ "props": [{ "model": "x.glb", "body": "kinematic" }] }"#)
            .expect_err("error");
        assert!(matches!(err, SceneConfigError::Invalid { .. }));

        let err = parse(r#"{ "camera": { "near": 10.0, "far": 5.0 } }"#).expect_err("error");
        assert!(err.to_string().contains("camera.far"));
    }

    #[test]
    fn missing_default_file_uses_stock_scene() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (path, explicit) = resolve_scene_path(dir.path(), None);
        assert_eq!(path, dir.path().join("scene.json"));
        assert!(!explicit);

        let config = load_scene_config_from(&path, explicit).expect("defaults");
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let override_path = dir.path().join("custom.json");
        let (path, explicit) =
            resolve_scene_path(dir.path(), Some(override_path.display().to_string()));
        assert_eq!(path, override_path);
        assert!(explicit);

        let err = load_scene_config_from(&path, explicit).expect_err("error");
        assert!(matches!(err, SceneConfigError::Read { .. }));
    }

    #[test]
    fn blank_override_falls_back_to_default_path() {
        let (path, explicit) = resolve_scene_path(Path::new("/assets"), Some("  ".to_string()));
        assert_eq!(path, PathBuf::from("/assets/scene.json"));
        assert!(!explicit);
    }

    #[test]
    fn file_on_disk_is_parsed_and_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scene.json");
        fs::write(&path, r#"{ "window": { "title": "Custom", "max_render_fps": 30 } }"#)
            .expect("write");

        let config = load_scene_config_from(&path, false).expect("config");
        let loop_config = config.loop_config();
        assert_eq!(loop_config.window_title, "Custom");
        assert_eq!(loop_config.max_render_fps, Some(30));
        assert_eq!(loop_config.window_width, 1280);
    }

    #[test]
    fn repository_scene_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/scene.json");
        let raw = fs::read_to_string(&path).expect("scene.json present");
        let config = parse_scene_config(&raw, &path).expect("valid scene");
        let defaults = SceneConfig::default();
        assert_eq!(config.window, defaults.window);
        assert_eq!(config.camera, defaults.camera);
        assert_eq!(config.lights, defaults.lights);
        assert_eq!(config.physics, defaults.physics);
        assert_eq!(config.character.model, defaults.character.model);
        assert_eq!(config.character.excluded_clips, defaults.character.excluded_clips);
        assert!((config.character.yaw_radians - PI).abs() < 1.0e-6);
        assert_eq!(config.props.len(), defaults.props.len());
        for (loaded, expected) in config.props.iter().zip(&defaults.props) {
            assert_eq!(loaded.name, expected.name);
            assert_eq!(loaded.model, expected.model);
            assert_eq!(loaded.collision_hulls, expected.collision_hulls);
        }
        assert!((config.orbit.max_polar_angle - defaults.orbit.max_polar_angle).abs() < 1.0e-5);
    }
}
