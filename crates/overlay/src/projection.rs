use anchorspace_render::{Camera, Viewport};
use glam::{Mat4, Vec2};

/// Wrapper transform that centers content on the anchor point.
pub const CENTER_TRANSFORM: &str = "translate3d(-50%,-50%,0)";

/// Screen position, in surface pixels, of the origin of a world matrix.
///
/// NDC x maps left to right onto `[0, width]`; NDC y is flipped since screen
/// y grows downward.
pub fn calculate_position(world: Mat4, camera: &Camera, viewport: &Viewport) -> Vec2 {
    let ndc = camera.project(world.w_axis.truncate());
    Vec2::new(
        (ndc.x + 1.0) * viewport.width / 2.0,
        (-ndc.y + 1.0) * viewport.height / 2.0,
    )
}

/// True when either axis moved strictly more than `eps`.
pub fn moved_beyond(old: Vec2, new: Vec2, eps: f32) -> bool {
    (old.x - new.x).abs() > eps || (old.y - new.y).abs() > eps
}

pub fn translate3d(pos: Vec2) -> String {
    format!("translate3d({}px,{}px,0)", pos.x, pos.y)
}

/// Full inline style of a freshly mounted overlay element.
pub fn anchor_css(pos: Vec2) -> String {
    format!(
        "position:absolute;top:0;left:0;transform:{};",
        translate3d(pos)
    )
}
