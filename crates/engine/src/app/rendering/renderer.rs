use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::raster::{draw_world, FrameTarget};
use super::text::draw_key_display;
use super::Viewport;
use crate::app::{KeyDisplay, SceneWorld};

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    depth: Vec<f32>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        let viewport = Viewport {
            width: size.width,
            height: size.height,
        };
        Ok(Self {
            window,
            pixels,
            depth: vec![f32::INFINITY; viewport.pixel_count()],
            viewport,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        self.depth = vec![f32::INFINITY; self.viewport.pixel_count()];
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    /// Returns the number of rasterized triangles.
    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        key_display: &KeyDisplay,
    ) -> Result<usize, Error> {
        if self.viewport.is_empty() {
            return Ok(0);
        }

        let mut target = FrameTarget::new(self.pixels.frame_mut(), &mut self.depth, self.viewport);
        target.clear(world.background());
        let triangles = draw_world(&mut target, world);
        draw_key_display(&mut target, key_display);

        self.pixels.render()?;
        Ok(triangles)
    }
}
