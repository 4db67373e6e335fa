//! Stage: the host state components read each frame, and the loop that
//! drives them.
//!
//! # Invariants
//! - Frame callbacks run in ascending priority; ties run in registration order.
//! - World matrices are refreshed before any callback of a frame runs.
//! - The loop renders on its own only while no callback has priority > 0;
//!   a positive-priority subscriber takes over rendering.
//! - A callback that returns `ControlFlow::Break` is removed before the
//!   render decision of that frame.

mod frame;
mod root;

pub use frame::{FrameCallback, FrameLoop, FrameStats, SubscriptionId};
pub use root::{RootState, Stage};

pub fn crate_info() -> &'static str {
    "anchorspace-stage v0.1.0"
}
