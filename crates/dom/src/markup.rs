use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Style;

/// A markup tree to be mounted into a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Markup {
    Text(String),
    Element(MarkupElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub children: Vec<Markup>,
}

impl Markup {
    pub fn element(tag: &str) -> Self {
        Markup::Element(MarkupElement {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            class_name: None,
            style: Style::new(),
            children: Vec::new(),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    /// Set an attribute. No effect on text.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let Markup::Element(el) = &mut self {
            el.attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn class(mut self, class: Option<&str>) -> Self {
        if let Markup::Element(el) = &mut self {
            el.class_name = class.map(str::to_string);
        }
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        if let Markup::Element(el) = &mut self {
            el.style = style;
        }
        self
    }

    pub fn child(mut self, child: Markup) -> Self {
        if let Markup::Element(el) = &mut self {
            el.children.push(child);
        }
        self
    }
}

impl Default for Markup {
    fn default() -> Self {
        Markup::Text(String::new())
    }
}
