mod component;
mod engine;
mod render;
mod state;

pub use component::ForceGraphCanvas;
pub use engine::CanvasEngine;
