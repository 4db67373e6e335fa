//! DOM overlays anchored to scene nodes.
//!
//! A `DomOverlay` owns a scene node (the anchor) and a detached `<div>`
//! (the overlay element). On mount the element is inserted next to the
//! render surface and positioned at the anchor's projected screen position;
//! every frame after that the position is recomputed and written back only
//! when it moved by more than `eps` on either axis.
//!
//! # Invariants
//! - The overlay element is in the document exactly while the overlay is
//!   mounted; unmounting removes it and frees its content together.
//! - The cached screen position changes only alongside a style write.
//! - The overlay's frame callback runs at priority 1, so the stage does not
//!   render on its own while an overlay is mounted; the overlay renders.

mod config;
mod overlay;
mod projection;

pub use config::{ConfigError, DEFAULT_EPS, OverlayConfig, OverlayProps};
pub use overlay::DomOverlay;
pub use projection::{CENTER_TRANSFORM, anchor_css, calculate_position, moved_beyond, translate3d};

pub fn crate_info() -> &'static str {
    "anchorspace-overlay v0.1.0"
}
