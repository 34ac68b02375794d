//! Parse tree for placeholder-substituted template markup.
//!
//! Text and attribute values are kept raw (entities are not decoded) so that
//! markup surrounding the directives is written back unchanged.

/// Node in the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element with attributes and children.
    Element(Element),
    /// Raw text payload.
    Text(String),
    /// Markup carried through verbatim (comments, doctype, CDATA).
    Raw(String),
}

impl Node {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// How an element was written in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementForm {
    /// `<p>...</p>`
    #[default]
    Normal,
    /// `<p/>`
    SelfClosing,
    /// HTML void element without a closing tag: `<br>`
    Void,
    /// Start tag whose end tag was implied by an ancestor's: `<li>a</ul>`
    Unclosed,
}

/// Element node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
    /// Child nodes.
    pub children: Vec<Node>,
    /// Source form.
    pub form: ElementForm,
}

impl Element {
    /// Create an element with the given tag name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Vec<Attribute>) -> Self {
        self.attrs = attrs;
        self
    }

    /// Set children.
    #[cfg(test)]
    #[must_use]
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Set source form.
    #[must_use]
    pub fn with_form(mut self, form: ElementForm) -> Self {
        self.form = form;
        self
    }

    /// Depth-first search for the first descendant element with the given
    /// name, ignoring ASCII case.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        for child in &mut self.children {
            if let Node::Element(element) = child {
                if element.name.eq_ignore_ascii_case(name) {
                    return Some(element);
                }
                if let Some(found) = element.find_mut(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// First child that is an element.
    pub fn first_element_mut(&mut self) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }
}

/// Element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: AttrValue,
}

impl Attribute {
    /// Attribute written as `name="value"`.
    #[cfg(test)]
    #[must_use]
    pub fn quoted(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Quoted {
                value: value.into(),
                quote: '"',
            },
        }
    }

    /// Attribute written as a bare name.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Bare,
        }
    }
}

/// Attribute value as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// No value: `checked`
    Bare,
    /// Quoted value, with the quote character used.
    Quoted {
        /// Raw value between the quotes.
        value: String,
        /// `"` or `'`.
        quote: char,
    },
    /// Unquoted value emitted verbatim: `class={{ x }}`
    Unquoted(String),
}

impl AttrValue {
    /// Raw value text, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bare => None,
            Self::Quoted { value, .. } | Self::Unquoted(value) => Some(value),
        }
    }
}
