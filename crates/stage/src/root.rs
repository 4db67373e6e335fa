use anchorspace_dom::{Document, ElementId};
use anchorspace_render::{Camera, DebugTextRenderer, Renderer, Viewport};
use anchorspace_scene::SceneGraph;

use crate::{FrameLoop, FrameStats};

/// Host state shared by everything mounted on a stage: the scene, the
/// active camera, the surface size, the document hosting the surface, and
/// the renderer drawing into it.
pub struct RootState {
    pub scene: SceneGraph,
    pub camera: Camera,
    pub viewport: Viewport,
    pub document: Document,
    /// The `<canvas>` the renderer draws into.
    pub surface: ElementId,
    pub renderer: Box<dyn Renderer>,
}

impl std::fmt::Debug for RootState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootState")
            .field("nodes", &self.scene.node_count())
            .field("camera", &self.camera)
            .field("viewport", &self.viewport)
            .field("surface", &self.surface)
            .field("frames", &self.renderer.frames())
            .finish()
    }
}

impl RootState {
    /// Build a document of the form `<body><div><canvas/></div></body>` and
    /// a default camera matching the viewport's aspect ratio.
    pub fn new(viewport: Viewport, renderer: Box<dyn Renderer>) -> Self {
        let mut document = Document::new();
        let container = document.create_element("div");
        let surface = document.create_element("canvas");
        let body = document.body();
        // Freshly created elements cannot fail to insert.
        let _ = document.append_child(body, container);
        let _ = document.append_child(container, surface);
        let _ = document.set_css_text(container, "position:relative;overflow:hidden;");
        let _ = document.set_attribute(surface, "width", &viewport.width.to_string());
        let _ = document.set_attribute(surface, "height", &viewport.height.to_string());

        let mut camera = Camera::default();
        camera.set_aspect(viewport.aspect());

        Self {
            scene: SceneGraph::new(),
            camera,
            viewport,
            document,
            surface,
            renderer,
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Element holding the surface; overlays are inserted here.
    pub fn surface_parent(&self) -> Option<ElementId> {
        self.document.parent(self.surface)
    }

    /// Render the scene through the active camera.
    pub fn render(&mut self) {
        self.renderer.render(&self.scene, &self.camera);
    }

    /// Change the surface size and keep the camera aspect in sync.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        let _ = self
            .document
            .set_attribute(self.surface, "width", &viewport.width.to_string());
        let _ = self
            .document
            .set_attribute(self.surface, "height", &viewport.height.to_string());
        tracing::debug!(width = viewport.width, height = viewport.height, "stage resized");
    }
}

/// A root state together with its frame loop.
#[derive(Debug)]
pub struct Stage {
    pub root: RootState,
    pub frames: FrameLoop,
}

impl Stage {
    pub fn new(root: RootState) -> Self {
        Self {
            root,
            frames: FrameLoop::new(),
        }
    }

    /// Stage with a debug text renderer and the default camera.
    pub fn headless(viewport: Viewport) -> Self {
        Self::new(RootState::new(viewport, Box::new(DebugTextRenderer::new())))
    }

    /// Advance one frame.
    pub fn frame(&mut self, delta: f32) -> &FrameStats {
        self.frames.advance(&mut self.root, delta)
    }
}
