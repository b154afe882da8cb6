//! Clip playback bookkeeping: which clips run, their weights and local time.
//!
//! Pose evaluation and skinning are out of scope; the mixer only tracks the
//! state a skinning backend would sample.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration_seconds: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightFade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug, Clone)]
struct ActionState {
    clip: AnimationClip,
    time: f32,
    weight: f32,
    running: bool,
    fade: Option<WeightFade>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    actions: Vec<ActionState>,
    by_name: HashMap<String, ActionHandle>,
}

impl AnimationMixer {
    pub fn new(clips: impl IntoIterator<Item = AnimationClip>) -> Self {
        let mut mixer = Self::default();
        for clip in clips {
            mixer.add_clip(clip);
        }
        mixer
    }

    /// Registers a clip; a clip with an already-known name replaces nothing
    /// and returns the existing handle.
    pub fn add_clip(&mut self, clip: AnimationClip) -> ActionHandle {
        if let Some(handle) = self.by_name.get(&clip.name) {
            return *handle;
        }
        let handle = ActionHandle(self.actions.len());
        self.by_name.insert(clip.name.clone(), handle);
        self.actions.push(ActionState {
            clip,
            time: 0.0,
            weight: 1.0,
            running: false,
            fade: None,
        });
        handle
    }

    pub fn clip_action(&self, name: &str) -> Option<ActionHandle> {
        self.by_name.get(name).copied()
    }

    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|action| action.clip.name.as_str())
    }

    pub fn play(&mut self, handle: ActionHandle) {
        if let Some(action) = self.action_mut(handle) {
            action.running = true;
        }
    }

    pub fn stop(&mut self, handle: ActionHandle) {
        if let Some(action) = self.action_mut(handle) {
            action.running = false;
            action.time = 0.0;
            action.fade = None;
        }
    }

    pub fn reset(&mut self, handle: ActionHandle) {
        if let Some(action) = self.action_mut(handle) {
            action.time = 0.0;
            action.weight = 1.0;
            action.fade = None;
        }
    }

    pub fn fade_in(&mut self, handle: ActionHandle, duration: f32) {
        self.start_fade(handle, 0.0, 1.0, duration);
    }

    pub fn fade_out(&mut self, handle: ActionHandle, duration: f32) {
        let from = self.weight(handle);
        self.start_fade(handle, from, 0.0, duration);
    }

    pub fn weight(&self, handle: ActionHandle) -> f32 {
        self.action(handle).map_or(0.0, |action| action.weight)
    }

    pub fn time(&self, handle: ActionHandle) -> f32 {
        self.action(handle).map_or(0.0, |action| action.time)
    }

    pub fn is_running(&self, handle: ActionHandle) -> bool {
        self.action(handle).is_some_and(|action| action.running)
    }

    pub fn update(&mut self, dt_seconds: f32) {
        if dt_seconds <= 0.0 {
            return;
        }
        for action in &mut self.actions {
            if !action.running {
                continue;
            }

            if action.clip.duration_seconds > 0.0 {
                action.time = (action.time + dt_seconds) % action.clip.duration_seconds;
            }

            if let Some(mut fade) = action.fade {
                fade.elapsed += dt_seconds;
                let t = if fade.duration <= 0.0 {
                    1.0
                } else {
                    (fade.elapsed / fade.duration).min(1.0)
                };
                action.weight = fade.from + (fade.to - fade.from) * t;
                if t >= 1.0 {
                    action.fade = None;
                    if fade.to <= 0.0 {
                        action.running = false;
                    }
                } else {
                    action.fade = Some(fade);
                }
            }
        }
    }

    fn start_fade(&mut self, handle: ActionHandle, from: f32, to: f32, duration: f32) {
        if let Some(action) = self.action_mut(handle) {
            action.weight = from;
            action.fade = Some(WeightFade {
                from,
                to,
                elapsed: 0.0,
                duration: duration.max(0.0),
            });
        }
    }

    fn action(&self, handle: ActionHandle) -> Option<&ActionState> {
        self.actions.get(handle.0)
    }

    fn action_mut(&mut self, handle: ActionHandle) -> Option<&mut ActionState> {
        self.actions.get_mut(handle.0)
    }
}
