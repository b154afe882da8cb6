mod controller;
mod scene_impl;

use std::path::Path;

use motion_engine::Scene;

use crate::app::config::SceneConfig;

pub(crate) fn build_scene(config: SceneConfig, assets_dir: &Path) -> Box<dyn Scene> {
    Box::new(scene_impl::DemoScene::new(config, assets_dir))
}
