use anchorspace_common::NodeId;
use anchorspace_dom::{Document, ElementId, Markup, Style};
use anchorspace_stage::{RootState, Stage, SubscriptionId};
use glam::Vec2;
use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use crate::projection::{CENTER_TRANSFORM, anchor_css, calculate_position, moved_beyond, translate3d};
use crate::OverlayProps;

/// Priority of the overlay's frame callback. Positive, so the overlay
/// renders the scene itself after repositioning.
const FRAME_PRIORITY: i32 = 1;

/// State shared between the overlay handle and its frame callback.
#[derive(Debug)]
struct Tracker {
    element: ElementId,
    anchor: NodeId,
    eps: f32,
    /// Last position written to the element.
    last: Vec2,
}

impl Tracker {
    fn on_frame(&mut self, root: &mut RootState) {
        if let Some(world) = root.scene.world_matrix(self.anchor) {
            let pos = calculate_position(world, &root.camera, &root.viewport);
            if moved_beyond(self.last, pos, self.eps) {
                match root
                    .document
                    .set_style_property(self.element, "transform", &translate3d(pos))
                {
                    Ok(()) => {
                        tracing::trace!(element = %self.element, x = pos.x, y = pos.y, "overlay moved");
                        self.last = pos;
                    }
                    Err(e) => tracing::warn!("overlay element unavailable: {e}"),
                }
            }
        }
        root.render();
    }
}

/// An HTML overlay pinned to the screen projection of a scene node.
///
/// Mounting creates the anchor node and the overlay element; `unmount`
/// consumes the handle, so teardown happens at most once. The frame callback
/// only holds a weak reference to the tracking state: if the handle is
/// dropped without `unmount`, the next frame releases the element and the
/// anchor and retires the callback.
#[derive(Debug)]
#[must_use = "an overlay stays on screen until passed to `unmount`"]
pub struct DomOverlay {
    tracker: Rc<RefCell<Tracker>>,
    subscription: SubscriptionId,
    element: ElementId,
    anchor: NodeId,
    wrapper: Option<ElementId>,
    props: OverlayProps,
}

impl DomOverlay {
    /// Mount with the anchor directly under the scene root.
    pub fn mount(stage: &mut Stage, props: OverlayProps) -> Self {
        let parent = stage.root.scene.root();
        Self::mount_under(stage, parent, props)
    }

    /// Mount with the anchor under `parent`. An unknown parent falls back to
    /// the scene root.
    pub fn mount_under(stage: &mut Stage, parent: NodeId, props: OverlayProps) -> Self {
        let root = &mut stage.root;
        let element = root.document.create_element("div");

        let anchor = match root.scene.add(parent, props.node.clone()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("anchor parent unavailable, using scene root: {e}");
                let scene_root = root.scene.root();
                // The scene root always exists.
                root.scene
                    .add(scene_root, props.node.clone())
                    .unwrap_or(scene_root)
            }
        };

        root.scene.update_world_matrices();
        let pos = root
            .scene
            .world_matrix(anchor)
            .map(|world| calculate_position(world, &root.camera, &root.viewport))
            .unwrap_or_default();
        if let Err(e) = root.document.set_css_text(element, &anchor_css(pos)) {
            tracing::warn!("overlay position not set: {e}");
        }

        match root.surface_parent() {
            Some(container) => {
                let inserted = if props.config.prepend {
                    root.document.prepend(container, element)
                } else {
                    root.document.append_child(container, element)
                };
                match inserted {
                    Ok(()) => tracing::debug!(
                        %element,
                        %container,
                        prepend = props.config.prepend,
                        "overlay inserted"
                    ),
                    Err(e) => tracing::warn!("overlay insert failed: {e}"),
                }
            }
            None => tracing::warn!("render surface has no parent, overlay stays detached"),
        }

        let wrapper = render_content(&mut root.document, element, &props);

        let tracker = Rc::new(RefCell::new(Tracker {
            element,
            anchor,
            eps: props.config.effective_eps(),
            last: pos,
        }));
        let weak: Weak<RefCell<Tracker>> = Rc::downgrade(&tracker);
        let subscription = stage.frames.subscribe(
            FRAME_PRIORITY,
            Box::new(move |root, _delta| match weak.upgrade() {
                Some(tracker) => {
                    tracker.borrow_mut().on_frame(root);
                    ControlFlow::Continue(())
                }
                None => {
                    tracing::warn!(%element, "overlay dropped without unmount, releasing");
                    release(root, element, anchor);
                    ControlFlow::Break(())
                }
            }),
        );

        tracing::debug!(%element, anchor = %anchor.short(), x = pos.x, y = pos.y, "overlay mounted");
        Self {
            tracker,
            subscription,
            element,
            anchor,
            wrapper,
            props,
        }
    }

    /// Apply new props: forward node properties to the anchor, pick up the
    /// new threshold, and re-render the content. The content is re-rendered
    /// on every call, changed or not. `prepend` only applies at mount.
    pub fn update(&mut self, stage: &mut Stage, props: OverlayProps) {
        let root = &mut stage.root;
        if let Some(node) = root.scene.get_mut(self.anchor) {
            *node = props.node.clone();
        }
        self.tracker.borrow_mut().eps = props.config.effective_eps();
        self.props = props;
        self.wrapper = render_content(&mut root.document, self.element, &self.props);
    }

    /// Tear down: stop tracking, detach the overlay element, free its
    /// content, and remove the anchor node.
    pub fn unmount(self, stage: &mut Stage) {
        stage.frames.unsubscribe(self.subscription);
        release(&mut stage.root, self.element, self.anchor);
        tracing::debug!(element = %self.element, "overlay unmounted");
    }

    /// The overlay element inserted next to the render surface.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The content wrapper inside the overlay element. This is the element
    /// callers style and measure.
    pub fn wrapper(&self) -> Option<ElementId> {
        self.wrapper
    }

    /// The scene node whose origin the overlay follows.
    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// Last screen position written to the overlay element.
    pub fn position(&self) -> Vec2 {
        self.tracker.borrow().last
    }

    pub fn props(&self) -> &OverlayProps {
        &self.props
    }
}

/// Detach and free the overlay element with its content, then remove the anchor.
fn release(root: &mut RootState, element: ElementId, anchor: NodeId) {
    if let Some(parent) = root.document.parent(element) {
        if let Err(e) = root.document.remove_child(parent, element) {
            tracing::warn!("overlay detach failed: {e}");
        }
    }
    root.document.unmount_at(element);
    root.document.destroy(element);

    if let Err(e) = root.scene.remove(anchor) {
        tracing::warn!("anchor already gone: {e}");
    }
}

/// Wrapper markup: centering transform (or none), then user style, then
/// user content.
fn wrapper_markup(props: &OverlayProps) -> Markup {
    let transform = if props.config.center {
        CENTER_TRANSFORM
    } else {
        "none"
    };
    let mut style = Style::new().with("transform", transform);
    style.merge(&props.config.style);
    Markup::element("div")
        .style(style)
        .class(props.config.class_name.as_deref())
        .child(props.children.clone())
}

fn render_content(document: &mut Document, element: ElementId, props: &OverlayProps) -> Option<ElementId> {
    match document.render_into(element, &wrapper_markup(props)) {
        Ok(wrapper) => Some(wrapper),
        Err(e) => {
            tracing::warn!("overlay content render failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OverlayConfig;
    use anchorspace_common::Transform;
    use anchorspace_render::{Camera, Viewport};
    use anchorspace_scene::SceneNode;
    use glam::Vec3;

    fn stage_800x600() -> Stage {
        let mut stage = Stage::headless(Viewport::new(800.0, 600.0));
        stage.root.camera = Camera::identity();
        stage
    }

    fn label() -> OverlayProps {
        OverlayProps::new(Markup::element("span").child(Markup::text("Hello")))
    }

    fn with_config(config: OverlayConfig) -> OverlayProps {
        label().with_config(config)
    }

    fn container(stage: &Stage) -> ElementId {
        stage.root.surface_parent().unwrap()
    }

    #[test]
    fn mount_positions_at_projected_center() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        let style = stage.root.document.style(overlay.element()).unwrap();
        assert_eq!(style.get("transform"), Some("translate3d(400px,300px,0)"));
        assert_eq!(style.get("position"), Some("absolute"));
        assert_eq!(style.get("top"), Some("0"));
        assert_eq!(style.get("left"), Some("0"));
        assert_eq!(overlay.position(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn mount_appends_after_surface_by_default() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        let parent = container(&stage);
        assert_eq!(
            stage.root.document.children(parent),
            &[stage.root.surface, overlay.element()]
        );
        assert!(stage.root.document.is_attached(overlay.element()));
    }

    #[test]
    fn mount_prepends_when_asked() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(
            &mut stage,
            with_config(OverlayConfig {
                prepend: true,
                ..OverlayConfig::default()
            }),
        );
        let parent = container(&stage);
        assert_eq!(
            stage.root.document.children(parent),
            &[overlay.element(), stage.root.surface]
        );
    }

    #[test]
    fn element_is_inserted_exactly_once() {
        let mut stage = stage_800x600();
        let mut overlay = DomOverlay::mount(&mut stage, label());
        for _ in 0..3 {
            stage.frame(0.016);
        }
        overlay.update(&mut stage, label());
        let parent = container(&stage);
        let count = stage
            .root
            .document
            .children(parent)
            .iter()
            .filter(|c| **c == overlay.element())
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn content_is_wrapped() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(
            &mut stage,
            with_config(OverlayConfig {
                class_name: Some("tag".into()),
                style: Style::parse("color: red"),
                ..OverlayConfig::default()
            }),
        );
        let doc = &stage.root.document;
        let wrapper = overlay.wrapper().unwrap();
        assert_eq!(doc.parent(wrapper), Some(overlay.element()));
        assert_eq!(doc.class_name(wrapper), Some("tag"));
        assert_eq!(doc.style(wrapper).unwrap().css_text(), "transform:none;color:red;");
        assert_eq!(doc.text_content(wrapper), "Hello");
    }

    #[test]
    fn center_adds_centering_transform() {
        let mut stage = stage_800x600();
        let centered = DomOverlay::mount(
            &mut stage,
            with_config(OverlayConfig {
                center: true,
                ..OverlayConfig::default()
            }),
        );
        let plain = DomOverlay::mount(&mut stage, label());
        let doc = &stage.root.document;
        assert_eq!(
            doc.style(centered.wrapper().unwrap()).unwrap().get("transform"),
            Some("translate3d(-50%,-50%,0)")
        );
        assert_eq!(
            doc.style(plain.wrapper().unwrap()).unwrap().get("transform"),
            Some("none")
        );
    }

    #[test]
    fn user_style_overrides_wrapper_transform() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(
            &mut stage,
            with_config(OverlayConfig {
                center: true,
                style: Style::parse("transform: scale(2)"),
                ..OverlayConfig::default()
            }),
        );
        let doc = &stage.root.document;
        assert_eq!(
            doc.style(overlay.wrapper().unwrap()).unwrap().get("transform"),
            Some("scale(2)")
        );
    }

    #[test]
    fn stationary_camera_makes_no_writes() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        let writes = stage.root.document.style_writes(overlay.element());
        for _ in 0..10 {
            stage.frame(0.016);
        }
        assert_eq!(stage.root.document.style_writes(overlay.element()), writes);
    }

    #[test]
    fn sub_threshold_motion_makes_no_writes() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        let writes = stage.root.document.style_writes(overlay.element());

        // One NDC unit is 400px horizontally; 1e-6 NDC is 0.0004px.
        stage.root.scene.set_transform(
            overlay.anchor(),
            Transform::from_position(Vec3::new(1e-6, 0.0, 0.0)),
        );
        stage.frame(0.016);
        assert_eq!(stage.root.document.style_writes(overlay.element()), writes);
        assert_eq!(overlay.position(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn motion_beyond_eps_writes_once_per_move() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        let writes = stage.root.document.style_writes(overlay.element());

        stage.root.scene.set_transform(
            overlay.anchor(),
            Transform::from_position(Vec3::new(0.5, -0.5, 0.0)),
        );
        stage.frame(0.016);
        stage.frame(0.016);

        let doc = &stage.root.document;
        assert_eq!(doc.style_writes(overlay.element()), writes + 1);
        assert_eq!(
            doc.style(overlay.element()).unwrap().get("transform"),
            Some("translate3d(600px,450px,0)")
        );
        assert_eq!(overlay.position(), Vec2::new(600.0, 450.0));
    }

    #[test]
    fn larger_eps_suppresses_small_moves() {
        let mut stage = stage_800x600();
        let mut overlay = DomOverlay::mount(&mut stage, label());
        overlay.update(
            &mut stage,
            with_config(OverlayConfig {
                eps: 10.0,
                ..OverlayConfig::default()
            }),
        );
        let writes = stage.root.document.style_writes(overlay.element());

        // 0.02 NDC is 8px horizontally.
        stage.root.scene.set_transform(
            overlay.anchor(),
            Transform::from_position(Vec3::new(0.02, 0.0, 0.0)),
        );
        stage.frame(0.016);
        assert_eq!(stage.root.document.style_writes(overlay.element()), writes);
    }

    #[test]
    fn overlay_renders_each_frame() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        stage.frame(0.016);
        stage.frame(0.016);
        assert_eq!(stage.root.renderer.frames(), 2);
        assert!(!stage.frames.stats().auto_rendered);
        overlay.unmount(&mut stage);
    }

    #[test]
    fn dropped_handle_releases_on_next_frame() {
        let mut stage = stage_800x600();
        let nodes_before = stage.root.scene.node_count();
        let docs_before = stage.root.document.node_count();
        let element = {
            let overlay = DomOverlay::mount(&mut stage, label());
            overlay.element()
        };
        assert!(stage.root.document.is_attached(element));

        stage.frame(0.016);

        assert!(!stage.root.document.contains(element));
        assert_eq!(stage.root.document.node_count(), docs_before);
        assert_eq!(stage.root.scene.node_count(), nodes_before);
        assert!(stage.frames.is_empty());
        assert!(stage.frames.stats().auto_rendered);
        assert_eq!(stage.root.renderer.frames(), 1);
    }

    #[test]
    fn invalid_eps_falls_back_to_default() {
        let mut stage = stage_800x600();
        let mut overlay = DomOverlay::mount(
            &mut stage,
            with_config(OverlayConfig {
                eps: f32::NAN,
                ..OverlayConfig::default()
            }),
        );
        let writes = stage.root.document.style_writes(overlay.element());
        stage.root.scene.set_transform(
            overlay.anchor(),
            Transform::from_position(Vec3::new(0.5, 0.0, 0.0)),
        );
        stage.frame(0.016);
        assert_eq!(stage.root.document.style_writes(overlay.element()), writes + 1);
        assert_eq!(overlay.position(), Vec2::new(600.0, 300.0));

        // Negative eps must not turn every frame into a write.
        overlay.update(
            &mut stage,
            with_config(OverlayConfig {
                eps: -1.0,
                ..OverlayConfig::default()
            }),
        );
        let writes = stage.root.document.style_writes(overlay.element());
        stage.frame(0.016);
        stage.frame(0.016);
        assert_eq!(stage.root.document.style_writes(overlay.element()), writes);
        overlay.unmount(&mut stage);
    }

    #[test]
    fn orbiting_camera_moves_offset_anchor() {
        let mut stage = Stage::headless(Viewport::new(800.0, 600.0));
        let overlay = DomOverlay::mount(
            &mut stage,
            label().with_node(SceneNode::group(Vec3::new(1.0, 0.0, 0.0))),
        );
        let start = overlay.position();
        stage.root.camera.orbit(Vec3::ZERO, 5.0, 0.0, 0.8);
        stage.frame(0.016);
        assert!(moved_beyond(start, overlay.position(), 1.0));
    }

    #[test]
    fn anchor_follows_parent_node() {
        let mut stage = stage_800x600();
        let parent = stage
            .root
            .scene
            .add(stage.root.scene.root(), SceneNode::group(Vec3::new(-0.5, 0.0, 0.0)))
            .unwrap();
        let overlay = DomOverlay::mount_under(
            &mut stage,
            parent,
            label().with_node(SceneNode::group(Vec3::new(0.0, 0.5, 0.0))),
        );
        assert_eq!(stage.root.scene.parent(overlay.anchor()), Some(parent));
        assert_eq!(overlay.position(), Vec2::new(200.0, 150.0));
    }

    #[test]
    fn unknown_parent_falls_back_to_root() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount_under(&mut stage, NodeId::new(), label());
        assert_eq!(
            stage.root.scene.parent(overlay.anchor()),
            Some(stage.root.scene.root())
        );
    }

    #[test]
    fn update_forwards_node_props_and_rerenders() {
        let mut stage = stage_800x600();
        let mut overlay = DomOverlay::mount(&mut stage, label());
        let wrapper = overlay.wrapper();

        let next = OverlayProps::new(Markup::text("Bye"))
            .with_node(SceneNode::group(Vec3::new(0.0, 1.0, 0.0)).named("pin"));
        overlay.update(&mut stage, next);

        assert_eq!(overlay.wrapper(), wrapper);
        let node = stage.root.scene.get(overlay.anchor()).unwrap();
        assert_eq!(node.name.as_deref(), Some("pin"));
        assert_eq!(stage.root.document.text_content(overlay.element()), "Bye");

        stage.frame(0.016);
        assert_eq!(overlay.position(), Vec2::new(400.0, 0.0));
    }

    #[test]
    fn unmount_removes_element_and_content() {
        let mut stage = stage_800x600();
        let nodes_before = stage.root.scene.node_count();
        let docs_before = stage.root.document.node_count();
        let overlay = DomOverlay::mount(&mut stage, label());
        let element = overlay.element();
        let wrapper = overlay.wrapper().unwrap();
        assert_eq!(stage.frames.len(), 1);

        overlay.unmount(&mut stage);

        let doc = &stage.root.document;
        assert!(!doc.contains(element));
        assert!(!doc.contains(wrapper));
        assert!(!doc.children(container(&stage)).contains(&element));
        assert_eq!(doc.node_count(), docs_before);
        assert_eq!(stage.root.scene.node_count(), nodes_before);
        assert!(stage.frames.is_empty());

        // Back to automatic rendering.
        stage.frame(0.016);
        assert!(stage.frames.stats().auto_rendered);
    }

    #[test]
    fn remount_creates_fresh_element() {
        let mut stage = stage_800x600();
        let first = DomOverlay::mount(&mut stage, label());
        let first_element = first.element();
        first.unmount(&mut stage);

        let second = DomOverlay::mount(&mut stage, label());
        assert_ne!(second.element(), first_element);
        assert!(stage.root.document.is_attached(second.element()));
        assert_eq!(stage.root.document.children(container(&stage)).len(), 2);
    }

    #[test]
    fn detached_surface_is_a_noop() {
        let mut stage = stage_800x600();
        let parent = container(&stage);
        let surface = stage.root.surface;
        stage.root.document.remove_child(parent, surface).unwrap();

        let overlay = DomOverlay::mount(&mut stage, label());
        assert!(!stage.root.document.is_attached(overlay.element()));
        assert!(overlay.wrapper().is_some());
        stage.frame(0.016);
        overlay.unmount(&mut stage);
    }

    #[test]
    fn removed_anchor_stops_tracking_but_keeps_rendering() {
        let mut stage = stage_800x600();
        let overlay = DomOverlay::mount(&mut stage, label());
        let writes = stage.root.document.style_writes(overlay.element());
        stage.root.scene.remove(overlay.anchor()).unwrap();
        stage.frame(0.016);
        assert_eq!(stage.root.document.style_writes(overlay.element()), writes);
        assert_eq!(stage.root.renderer.frames(), 1);
        overlay.unmount(&mut stage);
    }
}
