//! Serializer writing a converted tree back to template text.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use crate::tree::{AttrValue, Attribute, Element, ElementForm, Node};

/// Write a tree back to text without escaping.
///
/// Text and attribute values are raw in the tree, so they are written as-is.
pub(crate) struct MarkupSerializer;

impl MarkupSerializer {
    pub(crate) fn new() -> Self {
        Self
    }

    /// Serialize the children of the synthetic root.
    pub(crate) fn serialize(&self, root: &Element) -> String {
        let mut out = String::with_capacity(4096);
        for child in &root.children {
            serialize_node(child, &mut out);
        }
        out
    }
}

impl Default for MarkupSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) | Node::Raw(text) => out.push_str(text),
        Node::Element(element) => serialize_element(element, out),
    }
}

fn serialize_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attrs {
        serialize_attr(attr, out);
    }

    match element.form {
        ElementForm::SelfClosing => out.push_str("/>"),
        ElementForm::Void => out.push('>'),
        ElementForm::Normal | ElementForm::Unclosed => {
            out.push('>');
            for child in &element.children {
                serialize_node(child, out);
            }
            if element.form == ElementForm::Normal {
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

fn serialize_attr(attr: &Attribute, out: &mut String) {
    out.push(' ');
    out.push_str(&attr.name);
    match &attr.value {
        AttrValue::Bare => {}
        AttrValue::Quoted { value, quote } => {
            out.push('=');
            out.push(*quote);
            out.push_str(value);
            out.push(*quote);
        }
        AttrValue::Unquoted(value) => {
            out.push('=');
            out.push_str(value);
        }
    }
}
