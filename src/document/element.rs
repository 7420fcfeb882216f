use std::collections::HashMap;

/// A single XML element with its attributes, direct text and source line.
///
/// Elements are immutable once the loader has built them; every accessor
/// borrows.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    pub line: usize,
}

impl Element {
    pub fn new(tag: impl Into<String>, line: usize) -> Self {
        Self {
            tag: tag.into(),
            attributes: HashMap::new(),
            children: Vec::new(),
            text: None,
            line,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Text with surrounding whitespace removed; empty when there is none.
    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn has_text(&self) -> bool {
        !self.trimmed_text().is_empty()
    }

    /// True when the element has neither child elements nor text.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && !self.has_text()
    }

    pub fn child(&self, index: usize) -> Option<&Element> {
        self.children.get(index)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }
}
