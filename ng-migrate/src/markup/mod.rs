//! Angular template markup: a span-preserving element tree.
//!
//! Every span is a byte range into the template text handed to [`parse`].
//! Inline templates are parsed from the literal body, so callers add the
//! literal's offset to land in the component file.

mod parser;

pub use parser::parse;

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrValue {
    pub text: String,
    /// Range of the value without its quotes.
    pub span: Range<usize>,
    pub quote: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub name_span: Range<usize>,
    /// Name through the closing quote of the value, if any.
    pub span: Range<usize>,
    pub value: Option<AttrValue>,
}

impl Attribute {
    /// The attribute name without binding brackets: `[x]`, `(x)`, `[(x)]` -> `x`.
    pub fn bare_name(&self) -> &str {
        strip_binding(&self.name)
    }

    pub fn value_text(&self) -> Option<&str> {
        self.value.as_ref().map(|v| v.text.as_str())
    }
}

/// `[x]`, `(x)` and `[(x)]` to `x`; anything else unchanged.
pub fn strip_binding(name: &str) -> &str {
    for (open, close) in [("[(", ")]"), ("[", "]"), ("(", ")")] {
        if let Some(inner) = name.strip_prefix(open).and_then(|n| n.strip_suffix(close)) {
            return inner;
        }
    }
    name
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub name_span: Range<usize>,
    /// `<` through `>` of the start tag.
    pub start_span: Range<usize>,
    /// Name inside the end tag, when there is one.
    pub end_name_span: Option<Range<usize>>,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub self_closing: bool,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// `@if (...) { ... }` and friends.
    Block { name: String, children: Vec<Node> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    /// Elements satisfying `predicate`, in document order (parents before
    /// their children).
    pub fn find_elements<F>(&self, predicate: F) -> Vec<&Element>
    where
        F: Fn(&Element) -> bool,
    {
        let mut found = Vec::new();
        collect(&self.nodes, &predicate, &mut found);
        found
    }
}

fn collect<'a, F>(nodes: &'a [Node], predicate: &F, found: &mut Vec<&'a Element>)
where
    F: Fn(&Element) -> bool,
{
    for node in nodes {
        match node {
            Node::Element(element) => {
                if predicate(element) {
                    found.push(element);
                }
                collect(&element.children, predicate, found);
            }
            Node::Block { children, .. } => collect(children, predicate, found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_binding() {
        assert_eq!(strip_binding("[value]"), "value");
        assert_eq!(strip_binding("(toggle)"), "toggle");
        assert_eq!(strip_binding("[(ngModel)]"), "ngModel");
        assert_eq!(strip_binding("readonly"), "readonly");
        assert_eq!(strip_binding("[attr.x"), "[attr.x");
    }

    #[test]
    fn test_find_elements_in_document_order() {
        let template = parse("<a><b></b>@if (x) { <b id=\"2\"></b> }</a><b id=\"3\"/>").unwrap();
        let found = template.find_elements(|e| e.name == "b");
        assert_eq!(found.len(), 3);
        assert_eq!(found[1].attr("id").and_then(|a| a.value_text()), Some("2"));
        assert_eq!(found[2].attr("id").and_then(|a| a.value_text()), Some("3"));
    }
}
