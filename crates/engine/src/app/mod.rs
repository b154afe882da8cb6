mod animation;
mod camera;
mod input;
mod key_display;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use animation::{ActionHandle, AnimationClip, AnimationMixer};
pub use camera::{OrbitControls, OrbitSettings, PerspectiveCamera};
pub use input::{InputAction, DIRECTION_ACTIONS};
pub use key_display::{DisplayKey, KeyDisplay, KeyDisplayEntry, KEY_DOWN_COLOR, KEY_UP_COLOR};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{project_to_screen, Renderer, Viewport};
pub use scene::{
    DirectionalLight, Entity, EntityId, EntityIdAllocator, FrameReport, InputSnapshot,
    LightSettings, Renderable, Scene, SceneCommand, SceneHost, SceneWorld, Transform3,
    DEFAULT_BACKGROUND_RGBA,
};
