use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::Style;

/// Handle to a node in a `Document`. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from document operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("no such node: {0}")]
    UnknownNode(ElementId),
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },
    #[error("inserting {child} into {parent} would make it its own ancestor")]
    HierarchyRequest { parent: ElementId, child: ElementId },
    #[error("{0} is a text node")]
    NotAnElement(ElementId),
}

/// Payload of a document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        class_name: Option<String>,
        style: Style,
    },
    Text(String),
}

impl NodeData {
    pub(crate) fn element(tag: &str) -> Self {
        NodeData::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            class_name: None,
            style: Style::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    style_writes: u64,
}

/// A retained document: an arena of nodes rooted at `<body>`.
///
/// Nodes are created detached and only become part of the rendered tree once
/// inserted under something attached to the body.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: BTreeMap<ElementId, NodeEntry>,
    next_id: u64,
    body: ElementId,
    /// Container -> root of the markup currently mounted into it.
    pub(crate) mounts: BTreeMap<ElementId, ElementId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            body: ElementId(0),
            mounts: BTreeMap::new(),
        };
        doc.body = doc.insert_node(NodeData::element("body"));
        doc
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn insert_node(&mut self, data: NodeData) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeEntry {
                data,
                parent: None,
                children: Vec::new(),
                style_writes: 0,
            },
        );
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.insert_node(NodeData::element(tag))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> ElementId {
        self.insert_node(NodeData::Text(text.to_string()))
    }

    pub fn node(&self, id: ElementId) -> Option<&NodeData> {
        self.nodes.get(&id).map(|e| &e.data)
    }

    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.node(id).and_then(NodeData::tag)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(&id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: ElementId) -> Option<ElementId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: ElementId) -> Option<ElementId> {
        self.children(id).last().copied()
    }

    /// Whether the node is reachable from the body.
    pub fn is_attached(&self, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            if c == self.body {
                return true;
            }
            cursor = self.parent(c);
        }
        false
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, of: ElementId) -> bool {
        let mut cursor = Some(of);
        while let Some(c) = cursor {
            if c == ancestor {
                return true;
            }
            cursor = self.parent(c);
        }
        false
    }

    fn check_insert(&self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        match self.node(parent) {
            None => return Err(DomError::UnknownNode(parent)),
            Some(NodeData::Text(_)) => return Err(DomError::NotAnElement(parent)),
            Some(NodeData::Element { .. }) => {}
        }
        if !self.contains(child) {
            return Err(DomError::UnknownNode(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn detach(&mut self, child: ElementId) {
        let Some(old) = self.parent(child) else {
            return;
        };
        if let Some(entry) = self.nodes.get_mut(&old) {
            entry.children.retain(|c| *c != child);
        }
        if let Some(entry) = self.nodes.get_mut(&child) {
            entry.parent = None;
        }
    }

    fn insert_at(&mut self, parent: ElementId, child: ElementId, first: bool) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        if let Some(entry) = self.nodes.get_mut(&parent) {
            if first {
                entry.children.insert(0, child);
            } else {
                entry.children.push(child);
            }
        }
        if let Some(entry) = self.nodes.get_mut(&child) {
            entry.parent = Some(parent);
        }
        Ok(())
    }

    /// Insert `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        self.insert_at(parent, child, false)
    }

    /// Insert `child` as the first child of `parent`, moving it if attached.
    pub fn prepend(&mut self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        self.insert_at(parent, child, true)
    }

    /// Detach `child` from `parent`. The node stays alive and can be reinserted.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        if !self.contains(parent) {
            return Err(DomError::UnknownNode(parent));
        }
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach a node and free it together with its whole subtree.
    /// Returns the number of nodes freed.
    pub fn destroy(&mut self, id: ElementId) -> usize {
        self.detach(id);
        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&next) {
                stack.extend(entry.children);
                self.mounts.remove(&next);
                freed += 1;
            }
        }
        freed
    }

    pub(crate) fn element_parts(
        &mut self,
        id: ElementId,
    ) -> Result<(&mut BTreeMap<String, String>, &mut Option<String>, &mut Style, &mut u64), DomError> {
        let entry = self.nodes.get_mut(&id).ok_or(DomError::UnknownNode(id))?;
        match &mut entry.data {
            NodeData::Element {
                attributes,
                class_name,
                style,
                ..
            } => Ok((attributes, class_name, style, &mut entry.style_writes)),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn style(&self, id: ElementId) -> Option<&Style> {
        match self.node(id)? {
            NodeData::Element { style, .. } => Some(style),
            NodeData::Text(_) => None,
        }
    }

    /// Replace the whole inline style. Counts as one write.
    pub fn set_css_text(&mut self, id: ElementId, css: &str) -> Result<(), DomError> {
        let (_, _, style, writes) = self.element_parts(id)?;
        *style = Style::parse(css);
        *writes += 1;
        Ok(())
    }

    /// Replace the inline style unless it is already equal. Returns whether
    /// a write happened.
    pub fn set_style(&mut self, id: ElementId, new: &Style) -> Result<bool, DomError> {
        let (_, _, style, writes) = self.element_parts(id)?;
        if style == new {
            return Ok(false);
        }
        *style = new.clone();
        *writes += 1;
        Ok(true)
    }

    /// Set a single inline style property. Counts as one write.
    pub fn set_style_property(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        let (_, _, style, writes) = self.element_parts(id)?;
        style.set(name, value);
        *writes += 1;
        Ok(())
    }

    /// Number of inline-style writes made to an element since creation.
    pub fn style_writes(&self, id: ElementId) -> u64 {
        self.nodes.get(&id).map(|e| e.style_writes).unwrap_or(0)
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        let (attributes, _, _, _) = self.element_parts(id)?;
        attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        match self.node(id)? {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_class_name(&mut self, id: ElementId, class: Option<&str>) -> Result<(), DomError> {
        let (_, class_name, _, _) = self.element_parts(id)?;
        *class_name = class.map(str::to_string);
        Ok(())
    }

    pub fn class_name(&self, id: ElementId) -> Option<&str> {
        match self.node(id)? {
            NodeData::Element { class_name, .. } => class_name.as_deref(),
            NodeData::Text(_) => None,
        }
    }

    /// Replace the content of a text node.
    pub fn set_text(&mut self, id: ElementId, text: &str) -> Result<(), DomError> {
        let entry = self.nodes.get_mut(&id).ok_or(DomError::UnknownNode(id))?;
        match &mut entry.data {
            NodeData::Text(t) => {
                *t = text.to_string();
                Ok(())
            }
            NodeData::Element { .. } => Err(DomError::NotAnElement(id)),
        }
    }

    /// Concatenated text content of a subtree.
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        match self.node(id) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element { .. }) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    /// Serialize a subtree as HTML. Attributes come out in name order.
    pub fn to_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: ElementId, out: &mut String) {
        match self.node(id) {
            Some(NodeData::Text(t)) => out.push_str(&escape(t)),
            Some(NodeData::Element {
                tag,
                attributes,
                class_name,
                style,
            }) => {
                out.push('<');
                out.push_str(tag);
                if let Some(class) = class_name {
                    out.push_str(&format!(" class=\"{}\"", escape(class)));
                }
                if !style.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", escape(&style.css_text())));
                }
                for (name, value) in attributes {
                    out.push_str(&format!(" {name}=\"{}\"", escape(value)));
                }
                out.push('>');
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
            None => {}
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
