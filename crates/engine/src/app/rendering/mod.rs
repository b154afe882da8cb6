mod raster;
mod renderer;
mod text;
mod transform;

pub use renderer::Renderer;
pub use transform::{project_to_screen, Viewport};
