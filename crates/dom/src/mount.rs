//! Mounting markup into containers.
//!
//! Re-rendering into a container that already holds mounted markup patches
//! the existing nodes where tag and position match, so element handles stay
//! stable across renders. Mismatched nodes are replaced wholesale.

use crate::document::{Document, DomError, ElementId, NodeData};
use crate::Markup;

impl Document {
    /// Render `markup` into `container`, replacing or patching whatever was
    /// mounted there before. Returns the top-level node of the mounted tree.
    pub fn render_into(&mut self, container: ElementId, markup: &Markup) -> Result<ElementId, DomError> {
        match self.node(container) {
            None => return Err(DomError::UnknownNode(container)),
            Some(NodeData::Text(_)) => return Err(DomError::NotAnElement(container)),
            Some(NodeData::Element { .. }) => {}
        }

        let root = match self.mounts.get(&container).copied() {
            Some(existing) if self.parent(existing) == Some(container) => self.patch(existing, markup)?,
            _ => {
                let fresh = self.build(markup)?;
                self.append_child(container, fresh)?;
                fresh
            }
        };
        self.mounts.insert(container, root);
        tracing::trace!(%container, %root, "markup rendered");
        Ok(root)
    }

    /// Unmount whatever was rendered into `container`, freeing its nodes.
    /// Returns false when nothing was mounted.
    pub fn unmount_at(&mut self, container: ElementId) -> bool {
        let Some(root) = self.mounts.remove(&container) else {
            return false;
        };
        let freed = self.destroy(root);
        tracing::trace!(%container, freed, "markup unmounted");
        true
    }

    /// Top-level node currently mounted into `container`.
    pub fn mounted_root(&self, container: ElementId) -> Option<ElementId> {
        self.mounts.get(&container).copied()
    }

    fn build(&mut self, markup: &Markup) -> Result<ElementId, DomError> {
        match markup {
            Markup::Text(text) => Ok(self.create_text(text)),
            Markup::Element(el) => {
                let id = self.create_element(&el.tag);
                {
                    let (attributes, class_name, _, _) = self.element_parts(id)?;
                    *attributes = el.attributes.clone();
                    *class_name = el.class_name.clone();
                }
                if !el.style.is_empty() {
                    self.set_style(id, &el.style)?;
                }
                for child in &el.children {
                    let child_id = self.build(child)?;
                    self.append_child(id, child_id)?;
                }
                Ok(id)
            }
        }
    }

    fn patch(&mut self, existing: ElementId, markup: &Markup) -> Result<ElementId, DomError> {
        let same_kind = match (self.node(existing), markup) {
            (Some(NodeData::Text(_)), Markup::Text(_)) => true,
            (Some(NodeData::Element { tag, .. }), Markup::Element(el)) => *tag == el.tag,
            _ => false,
        };
        if !same_kind {
            let fresh = self.build(markup)?;
            self.replace(existing, fresh);
            return Ok(fresh);
        }

        match markup {
            Markup::Text(text) => {
                if self.node(existing) != Some(&NodeData::Text(text.clone())) {
                    self.set_text(existing, text)?;
                }
            }
            Markup::Element(el) => {
                {
                    let (attributes, class_name, _, _) = self.element_parts(existing)?;
                    if *attributes != el.attributes {
                        *attributes = el.attributes.clone();
                    }
                    if *class_name != el.class_name {
                        *class_name = el.class_name.clone();
                    }
                }
                self.set_style(existing, &el.style)?;

                let old_children = self.children(existing).to_vec();
                for (i, child) in el.children.iter().enumerate() {
                    match old_children.get(i) {
                        Some(old) => {
                            self.patch(*old, child)?;
                        }
                        None => {
                            let fresh = self.build(child)?;
                            self.append_child(existing, fresh)?;
                        }
                    }
                }
                for stale in old_children.iter().skip(el.children.len()) {
                    self.destroy(*stale);
                }
            }
        }
        Ok(existing)
    }

    /// Put `fresh` where `old` sits in its parent, then free `old`.
    fn replace(&mut self, old: ElementId, fresh: ElementId) {
        if let Some(parent) = self.parent(old) {
            if let Some(entry) = self.nodes.get_mut(&parent) {
                if let Some(slot) = entry.children.iter_mut().find(|c| **c == old) {
                    *slot = fresh;
                }
            }
            if let Some(entry) = self.nodes.get_mut(&fresh) {
                entry.parent = Some(parent);
            }
            if let Some(entry) = self.nodes.get_mut(&old) {
                entry.parent = None;
            }
        }
        self.destroy(old);
    }
}
