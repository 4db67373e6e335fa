//! Retained document model: an arena of element and text nodes with inline
//! styles, plus primitives to mount and unmount markup into any element.
//!
//! # Invariants
//! - A node has at most one parent; inserting an attached node moves it.
//! - Inserts that would make a node its own ancestor are rejected.
//! - Every effective inline-style write is counted per element.
//! - A container holds at most one mounted markup root at a time.

mod document;
mod markup;
mod mount;
mod style;

pub use document::{Document, DomError, ElementId, NodeData};
pub use markup::{Markup, MarkupElement};
pub use style::Style;

pub fn crate_info() -> &'static str {
    "anchorspace-dom v0.1.0"
}
