use serde::{Deserialize, Serialize};
use std::fmt;

/// Inline CSS declarations in insertion order.
///
/// Serializes as css text (`"color:red;top:0;"`) so styles can be written
/// in config files the same way they are written in markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Style {
    declarations: Vec<(String, String)>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name: value; name: value` declarations. Malformed entries
    /// (no colon, empty name) are skipped. A `;` inside parentheses or
    /// quotes belongs to the value.
    pub fn parse(css: &str) -> Self {
        let mut style = Self::new();
        for decl in split_declarations(css) {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            style.set(name, value.trim());
        }
        style
    }

    /// Builder form of `set`.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    /// Set a property, replacing an existing value in place.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.declarations.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .declarations
                .push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.declarations.iter().position(|(n, _)| n == name)?;
        Some(self.declarations.remove(idx).1)
    }

    /// Apply every declaration of `other` on top of this style.
    pub fn merge(&mut self, other: &Style) {
        for (name, value) in &other.declarations {
            self.set(name, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialize as `name:value;` pairs.
    pub fn css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(n, v)| format!("{n}:{v};"))
            .collect()
    }
}

/// Split on `;` at parenthesis depth 0 and outside quotes.
fn split_declarations(css: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in css.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&css[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&css[start..]);
    parts
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css_text())
    }
}

impl From<String> for Style {
    fn from(css: String) -> Self {
        Self::parse(&css)
    }
}

impl From<&str> for Style {
    fn from(css: &str) -> Self {
        Self::parse(css)
    }
}

impl From<Style> for String {
    fn from(style: Style) -> Self {
        style.css_text()
    }
}
