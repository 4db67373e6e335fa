//! Rendering Adapter: camera, viewport and a renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read the scene graph and camera; they never mutate either.
//! - Projection goes through `Camera::project`, which applies the
//!   perspective divide and yields normalized device coordinates.

mod camera;
mod renderer;
mod viewport;

pub use camera::{Camera, Projection, View};
pub use renderer::{DebugTextRenderer, Renderer};
pub use viewport::Viewport;

pub fn crate_info() -> &'static str {
    "anchorspace-render v0.1.0"
}
