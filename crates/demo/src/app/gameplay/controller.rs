//! Third-person character controller: picks the animation for the current
//! input, turns the model towards the camera-relative heading and moves
//! model and camera together across the ground plane.

use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};
use motion_engine::{
    ActionHandle, AnimationClip, AnimationMixer, InputAction, InputSnapshot, OrbitControls,
    PerspectiveCamera, Transform3,
};
use tracing::{debug, warn};

pub(crate) const ACTION_IDLE: &str = "idle";
pub(crate) const ACTION_WALK: &str = "walk";
pub(crate) const ACTION_RUN: &str = "run";
pub(crate) const ACTION_JUMP: &str = "jump";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DirectionKeys {
    pub(crate) forward: bool,
    pub(crate) backward: bool,
    pub(crate) left: bool,
    pub(crate) right: bool,
}

impl DirectionKeys {
    pub(crate) fn from_input(input: &InputSnapshot) -> Self {
        Self {
            forward: input.is_down(InputAction::MoveForward),
            backward: input.is_down(InputAction::MoveBackward),
            left: input.is_down(InputAction::MoveLeft),
            right: input.is_down(InputAction::MoveRight),
        }
    }

    pub(crate) fn any(self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// Heading offset in radians relative to the camera's yaw around the model.
/// Forward wins over backward and left over right.
pub(crate) fn direction_offset(keys: DirectionKeys) -> f32 {
    if keys.forward {
        if keys.left {
            5.0 * PI / 4.0
        } else if keys.right {
            3.0 * PI / 4.0
        } else {
            PI
        }
    } else if keys.backward {
        if keys.left {
            7.0 * PI / 4.0
        } else if keys.right {
            9.0 * PI / 4.0
        } else {
            2.0 * PI
        }
    } else if keys.left {
        -FRAC_PI_2
    } else if keys.right {
        FRAC_PI_2
    } else {
        PI
    }
}

pub(crate) fn select_action(
    jumping: bool,
    direction_pressed: bool,
    toggle_run: bool,
) -> &'static str {
    if jumping {
        ACTION_JUMP
    } else if direction_pressed && toggle_run {
        ACTION_RUN
    } else if direction_pressed {
        ACTION_WALK
    } else {
        ACTION_IDLE
    }
}

/// Rotates `current` towards `target` by at most `max_angle` radians.
pub(crate) fn rotate_towards(current: Quat, target: Quat, max_angle: f32) -> Quat {
    let angle = current.angle_between(target);
    if angle <= f32::EPSILON || max_angle >= angle {
        return target;
    }
    current.slerp(target, max_angle / angle)
}

fn is_moving_action(action: &str) -> bool {
    matches!(action, ACTION_RUN | ACTION_WALK | ACTION_JUMP)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ControllerTuning {
    pub(crate) fade_duration: f32,
    pub(crate) walk_velocity: f32,
    pub(crate) run_velocity: f32,
    pub(crate) jump_velocity: f32,
    pub(crate) jump_duration: f32,
    pub(crate) turn_step_radians: f32,
    pub(crate) camera_target_height: f32,
    pub(crate) run_by_default: bool,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            fade_duration: 0.2,
            walk_velocity: 2.0,
            run_velocity: 5.0,
            jump_velocity: 10.0,
            jump_duration: 0.6,
            turn_step_radians: 0.2,
            camera_target_height: 1.0,
            run_by_default: true,
        }
    }
}

/// Everything the controller moves in one update.
pub(crate) struct CharacterRig<'a> {
    pub(crate) model: &'a mut Transform3,
    pub(crate) camera: &'a mut PerspectiveCamera,
    pub(crate) orbit: &'a mut OrbitControls,
}

#[derive(Debug)]
pub(crate) struct CharacterControls {
    mixer: AnimationMixer,
    tuning: ControllerTuning,
    toggle_run: bool,
    current_action: String,
    jump_remaining: f32,
    missing_actions: HashSet<String>,
}

impl CharacterControls {
    /// Builds the mixer from `clips` minus `excluded_clips`, places the model
    /// at `spawn` facing `yaw_radians`, lines the camera up behind it and
    /// starts `initial_action`.
    pub(crate) fn new(
        clips: impl IntoIterator<Item = AnimationClip>,
        excluded_clips: &[String],
        initial_action: &str,
        tuning: ControllerTuning,
        spawn: Vec3,
        yaw_radians: f32,
        rig: CharacterRig<'_>,
    ) -> Self {
        let mixer = AnimationMixer::new(
            clips
                .into_iter()
                .filter(|clip| !excluded_clips.iter().any(|name| *name == clip.name)),
        );
        let mut controls = Self {
            mixer,
            tuning,
            toggle_run: tuning.run_by_default,
            current_action: initial_action.to_string(),
            jump_remaining: 0.0,
            missing_actions: HashSet::new(),
        };
        if let Some(handle) = controls.action_handle(initial_action) {
            controls.mixer.play(handle);
        }

        rig.model.translation = spawn;
        rig.model.rotation = Quat::from_rotation_y(yaw_radians);
        rig.camera.position.z = spawn.z;
        controls.update_camera_target(Vec3::ZERO, rig);
        controls
    }

    pub(crate) fn switch_run_toggle(&mut self) {
        self.toggle_run = !self.toggle_run;
        debug!(run = self.toggle_run, "run_toggled");
    }

    /// Starts a jump unless one is already in progress.
    pub(crate) fn jump(&mut self) {
        if self.is_jumping() {
            return;
        }
        self.jump_remaining = self.tuning.jump_duration;
    }

    pub(crate) fn is_jumping(&self) -> bool {
        self.jump_remaining > 0.0
    }

    pub(crate) fn is_running(&self) -> bool {
        self.toggle_run
    }

    pub(crate) fn current_action(&self) -> &str {
        &self.current_action
    }

    #[cfg(test)]
    pub(crate) fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, keys: DirectionKeys, rig: CharacterRig<'_>) {
        let play = select_action(self.is_jumping(), keys.any(), self.toggle_run);
        if self.current_action != play {
            self.crossfade_to(play);
        }

        self.mixer.update(dt_seconds);

        if is_moving_action(&self.current_action) {
            let model_position = rig.model.translation;
            let camera_position = rig.camera.position;
            let camera_yaw = (camera_position.x - model_position.x)
                .atan2(camera_position.z - model_position.z);
            let offset = direction_offset(keys);

            let heading = Quat::from_rotation_y(camera_yaw + offset);
            rig.model.rotation =
                rotate_towards(rig.model.rotation, heading, self.tuning.turn_step_radians);

            let mut walk_direction = rig.camera.world_direction();
            walk_direction.y = 0.0;
            let walk_direction =
                Quat::from_rotation_y(offset) * walk_direction.normalize_or_zero();

            let velocity = match self.current_action.as_str() {
                ACTION_RUN => self.tuning.run_velocity,
                ACTION_JUMP => self.tuning.jump_velocity,
                _ => self.tuning.walk_velocity,
            };
            let step = Vec3::new(
                walk_direction.x * velocity * dt_seconds,
                0.0,
                walk_direction.z * velocity * dt_seconds,
            );
            rig.model.translation -= step;
            self.update_camera_target(step, rig);
        }

        if self.jump_remaining > 0.0 {
            self.jump_remaining = (self.jump_remaining - dt_seconds).max(0.0);
        }
    }

    fn crossfade_to(&mut self, play: &'static str) {
        let fade = self.tuning.fade_duration;
        let current = self.current_action.clone();
        if let Some(handle) = self.action_handle(&current) {
            self.mixer.fade_out(handle, fade);
        }
        if let Some(next) = self.action_handle(play) {
            self.mixer.reset(next);
            self.mixer.fade_in(next, fade);
            self.mixer.play(next);
        }
        debug!(from = self.current_action.as_str(), to = play, "action_changed");
        self.current_action = play.to_string();
    }

    fn update_camera_target(&self, step: Vec3, rig: CharacterRig<'_>) {
        rig.camera.position.x -= step.x;
        rig.camera.position.z -= step.z;
        let target = rig.model.translation + Vec3::Y * self.tuning.camera_target_height;
        rig.orbit.set_target(target);
    }

    fn action_handle(&mut self, name: &str) -> Option<ActionHandle> {
        let handle = self.mixer.clip_action(name);
        if handle.is_none() && self.missing_actions.insert(name.to_string()) {
            warn!(action = name, "animation_clip_missing");
        }
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_engine::OrbitSettings;

    const EPS: f32 = 1.0e-4;

    fn clips() -> Vec<AnimationClip> {
        ["idle", "walk", "run", "jump", "Armature|mixamo.com|Layer0"]
            .into_iter()
            .map(|name| AnimationClip {
                name: name.to_string(),
                duration_seconds: 1.0,
            })
            .collect()
    }

    struct Fixture {
        model: Transform3,
        camera: PerspectiveCamera,
        orbit: OrbitControls,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                model: Transform3::default(),
                camera: PerspectiveCamera {
                    position: Vec3::new(0.0, 5.0, 0.0),
                    ..PerspectiveCamera::default()
                },
                orbit: OrbitControls::new(OrbitSettings::default()),
            }
        }

        fn rig(&mut self) -> CharacterRig<'_> {
            CharacterRig {
                model: &mut self.model,
                camera: &mut self.camera,
                orbit: &mut self.orbit,
            }
        }

        fn controls(&mut self) -> CharacterControls {
            let excluded = vec!["Armature|mixamo.com|Layer0".to_string()];
            CharacterControls::new(
                clips(),
                &excluded,
                ACTION_IDLE,
                ControllerTuning::default(),
                Vec3::new(0.0, 0.1, 60.0),
                PI,
                self.rig(),
            )
        }
    }

    fn forward() -> DirectionKeys {
        DirectionKeys {
            forward: true,
            ..DirectionKeys::default()
        }
    }

    #[test]
    fn direction_offsets_cover_all_eight_headings() {
        let keys = |forward, backward, left, right| DirectionKeys {
            forward,
            backward,
            left,
            right,
        };
        assert_eq!(direction_offset(keys(false, false, false, false)), PI);
        assert_eq!(direction_offset(keys(true, false, false, false)), PI);
        assert_eq!(direction_offset(keys(true, false, true, false)), 5.0 * PI / 4.0);
        assert_eq!(direction_offset(keys(true, false, false, true)), 3.0 * PI / 4.0);
        assert_eq!(direction_offset(keys(false, true, false, false)), 2.0 * PI);
        assert_eq!(direction_offset(keys(false, true, true, false)), 7.0 * PI / 4.0);
        assert_eq!(direction_offset(keys(false, true, false, true)), 9.0 * PI / 4.0);
        assert_eq!(direction_offset(keys(false, false, true, false)), -FRAC_PI_2);
        assert_eq!(direction_offset(keys(false, false, false, true)), FRAC_PI_2);
    }

    #[test]
    fn forward_beats_backward_and_left_beats_right() {
        let all = DirectionKeys {
            forward: true,
            backward: true,
            left: true,
            right: true,
        };
        assert_eq!(direction_offset(all), 5.0 * PI / 4.0);

        let sideways = DirectionKeys {
            left: true,
            right: true,
            ..DirectionKeys::default()
        };
        assert_eq!(direction_offset(sideways), -FRAC_PI_2);
    }

    #[test]
    fn action_selection_prefers_jump_then_run_then_walk() {
        assert_eq!(select_action(true, false, false), ACTION_JUMP);
        assert_eq!(select_action(true, true, true), ACTION_JUMP);
        assert_eq!(select_action(false, true, true), ACTION_RUN);
        assert_eq!(select_action(false, true, false), ACTION_WALK);
        assert_eq!(select_action(false, false, true), ACTION_IDLE);
    }

    #[test]
    fn rotate_towards_limits_the_turn() {
        let current = Quat::IDENTITY;
        let target = Quat::from_rotation_y(1.0);

        let turned = rotate_towards(current, target, 0.2);
        assert!((turned.angle_between(current) - 0.2).abs() < EPS);
        assert!((turned.angle_between(target) - 0.8).abs() < EPS);

        assert_eq!(rotate_towards(current, target, 2.0), target);
    }

    #[test]
    fn construction_places_model_and_camera() {
        let mut fixture = Fixture::new();
        let controls = fixture.controls();

        assert_eq!(controls.current_action(), ACTION_IDLE);
        assert!(controls.is_running());
        let idle = controls.mixer().clip_action(ACTION_IDLE).expect("idle clip");
        assert!(controls.mixer().is_running(idle));
        assert!(controls
            .mixer()
            .clip_action("Armature|mixamo.com|Layer0")
            .is_none());

        assert_eq!(fixture.model.translation, Vec3::new(0.0, 0.1, 60.0));
        assert!(fixture.model.rotation.angle_between(Quat::from_rotation_y(PI)) < EPS);
        assert_eq!(fixture.camera.position.z, 60.0);
        assert!((fixture.orbit.target() - Vec3::new(0.0, 1.1, 60.0)).length() < EPS);
    }

    #[test]
    fn jump_is_ignored_while_jumping_and_expires() {
        let mut fixture = Fixture::new();
        let mut controls = fixture.controls();

        controls.jump();
        assert!(controls.is_jumping());
        controls.update(0.5, DirectionKeys::default(), fixture.rig());
        assert_eq!(controls.current_action(), ACTION_JUMP);

        controls.jump();
        controls.update(0.2, DirectionKeys::default(), fixture.rig());
        assert!(!controls.is_jumping());

        controls.update(0.016, DirectionKeys::default(), fixture.rig());
        assert_eq!(controls.current_action(), ACTION_IDLE);
    }

    #[test]
    fn action_change_crossfades() {
        let mut fixture = Fixture::new();
        let mut controls = fixture.controls();

        controls.update(0.1, forward(), fixture.rig());
        assert_eq!(controls.current_action(), ACTION_RUN);

        let mixer = controls.mixer();
        let run = mixer.clip_action(ACTION_RUN).expect("run clip");
        let idle = mixer.clip_action(ACTION_IDLE).expect("idle clip");
        assert!(mixer.is_running(run));
        assert!(mixer.weight(run) < 1.0);
        assert!(mixer.weight(idle) < 1.0);

        controls.switch_run_toggle();
        controls.update(0.1, forward(), fixture.rig());
        assert_eq!(controls.current_action(), ACTION_WALK);
    }

    #[test]
    fn forward_moves_away_from_camera_at_run_speed() {
        let mut fixture = Fixture::new();
        let mut controls = fixture.controls();
        fixture.camera.position = Vec3::new(0.0, 5.0, 70.0);
        fixture.camera.look_target = Vec3::new(0.0, 1.1, 60.0);

        controls.update(0.1, forward(), fixture.rig());

        // Camera looks down -Z, so forward is -Z at 5 units/s.
        assert!((fixture.model.translation.z - 59.5).abs() < EPS);
        assert!(fixture.model.translation.x.abs() < EPS);
        assert!((fixture.camera.position.z - 69.5).abs() < EPS);
        assert!((fixture.orbit.target() - Vec3::new(0.0, 1.1, 59.5)).length() < EPS);
    }

    #[test]
    fn strafing_moves_sideways_at_walk_speed() {
        let mut fixture = Fixture::new();
        let mut controls = fixture.controls();
        controls.switch_run_toggle();
        fixture.camera.position = Vec3::new(0.0, 5.0, 70.0);
        fixture.camera.look_target = Vec3::new(0.0, 1.1, 60.0);

        let right = DirectionKeys {
            right: true,
            ..DirectionKeys::default()
        };
        controls.update(0.5, right, fixture.rig());

        assert_eq!(controls.current_action(), ACTION_WALK);
        assert!((fixture.model.translation.x - 1.0).abs() < EPS);
        assert!((fixture.model.translation.z - 60.0).abs() < EPS);
    }

    #[test]
    fn idle_leaves_pose_untouched() {
        let mut fixture = Fixture::new();
        let mut controls = fixture.controls();
        let before = fixture.model;

        controls.update(0.1, DirectionKeys::default(), fixture.rig());
        assert_eq!(fixture.model, before);
    }

    #[test]
    fn missing_clips_do_not_stop_the_controller() {
        let mut fixture = Fixture::new();
        let mut controls = CharacterControls::new(
            Vec::new(),
            &[],
            ACTION_IDLE,
            ControllerTuning::default(),
            Vec3::ZERO,
            0.0,
            fixture.rig(),
        );
        fixture.camera.position = Vec3::new(0.0, 5.0, 10.0);
        fixture.camera.look_target = Vec3::ZERO;

        controls.update(0.1, forward(), fixture.rig());
        assert_eq!(controls.current_action(), ACTION_RUN);
        assert!(fixture.model.translation.z < 0.0);
    }
}
