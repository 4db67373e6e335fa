//! Shared types for the anchorspace workspace.

mod types;

pub use types::{NodeId, Transform};
