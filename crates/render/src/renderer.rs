use anchorspace_scene::SceneGraph;
use std::fmt::Write as _;

use crate::Camera;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads the scene graph and a camera, then produces a frame.
/// It never mutates the scene.
pub trait Renderer {
    /// Render one frame of `scene` as seen through `camera`.
    fn render(&mut self, scene: &SceneGraph, camera: &Camera);

    /// Number of frames rendered so far.
    fn frames(&self) -> u64;
}

/// Debug text renderer.
///
/// Produces a human-readable dump of the scene per frame. Useful for CLI
/// output, logging, and testing the render interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    frames: u64,
    last_frame: String,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the most recent frame; empty before the first render.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }
}

impl Renderer for DebugTextRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: &Camera) {
        self.frames += 1;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame {} ({} nodes) ===",
            self.frames,
            scene.node_count()
        );
        let _ = writeln!(out, "Camera: {:?}", camera.view);

        for (id, node) in scene.iter() {
            if !node.visible {
                continue;
            }
            let p = scene.world_position(id).unwrap_or_default();
            let ndc = camera.project(p);
            let _ = writeln!(
                out,
                "  [{}] {} world=({:.2}, {:.2}, {:.2}) ndc=({:.3}, {:.3})",
                id.short(),
                node.name.as_deref().unwrap_or("-"),
                p.x,
                p.y,
                p.z,
                ndc.x,
                ndc.y
            );
        }

        tracing::trace!(frame = self.frames, "debug frame rendered");
        self.last_frame = out;
    }

    fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorspace_scene::SceneNode;
    use glam::Vec3;

    #[test]
    fn debug_renderer_empty_scene() {
        let scene = SceneGraph::new();
        let mut renderer = DebugTextRenderer::new();
        assert_eq!(renderer.frames(), 0);
        renderer.render(&scene, &Camera::identity());

        assert_eq!(renderer.frames(), 1);
        assert!(renderer.last_frame().contains("Frame 1 (1 nodes)"));
        assert!(renderer.last_frame().contains("root"));
    }

    #[test]
    fn debug_renderer_with_nodes() {
        let mut scene = SceneGraph::new();
        scene
            .add(scene.root(), SceneNode::group(Vec3::new(0.5, 0.0, 0.0)).named("pin"))
            .unwrap();
        scene
            .add(
                scene.root(),
                SceneNode {
                    visible: false,
                    ..SceneNode::default().named("hidden")
                },
            )
            .unwrap();
        scene.update_world_matrices();

        let mut renderer = DebugTextRenderer::new();
        renderer.render(&scene, &Camera::identity());
        renderer.render(&scene, &Camera::identity());

        assert_eq!(renderer.frames(), 2);
        let frame = renderer.last_frame();
        assert!(frame.contains("pin world=(0.50, 0.00, 0.00) ndc=(0.500, 0.000)"));
        assert!(!frame.contains("hidden"));
    }
}
