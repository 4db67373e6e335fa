//! Scene graph: retained node hierarchy, local transforms, world matrices.
//!
//! # Invariants
//! - The root node always exists and cannot be removed or reparented.
//! - World matrices are only recomputed by `update_world_matrices`.
//! - All structural mutations flow through explicit operations and are logged.

pub mod graph;

pub use graph::{SceneError, SceneEvent, SceneGraph, SceneNode};
