//! Markup parser producing a [`Element`] tree from pre-processed source.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ConvertError;
use crate::placeholder::restore_literals;
use crate::scanner::attributes;
use crate::tree::{Element, ElementForm, Node};

/// Synthetic root wrapping the whole document.
pub(crate) const ROOT_TAG: &str = "twig-root";

/// HTML elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Lenient HTML parser keeping text and attributes raw.
pub(crate) struct MarkupParser;

impl MarkupParser {
    pub(crate) fn new() -> Self {
        Self
    }

    /// Parse a document into a tree under a synthetic root element.
    ///
    /// An end tag closing an ancestor implicitly ends the elements opened
    /// inside it (`<li>a<li>b</ul>`); those keep [`ElementForm::Unclosed`] so
    /// no end tag is invented on output. End tags matching no open element
    /// are skipped.
    pub(crate) fn parse(&self, markup: &str) -> Result<Element, ConvertError> {
        let wrapped = format!("<{ROOT_TAG}>{markup}</{ROOT_TAG}>");

        let mut reader = Reader::from_str(&wrapped);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let mut root = self.start_element(&reader, &e, ElementForm::Normal);
                    let mut open = vec![root.name.clone()];
                    root.children = self.parse_children(&mut reader, &mut open)?.0;
                    return Ok(root);
                }
                Event::Eof => return Ok(Element::new(ROOT_TAG)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Parse children of the element on top of `open` (the stack of open
    /// tag names, outermost first) until its end tag.
    fn parse_children<R: BufRead>(
        &self,
        reader: &mut Reader<R>,
        open: &mut Vec<String>,
    ) -> Result<(Vec<Node>, Closing), ConvertError> {
        let mut buf = Vec::new();
        let mut children = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = self.decode_name(reader, e.name().as_ref());
                    if is_void(&name) {
                        let element = self.start_element(reader, &e, ElementForm::Void);
                        children.push(Node::Element(element));
                    } else {
                        let mut element = self.start_element(reader, &e, ElementForm::Normal);
                        open.push(name);
                        let (grandchildren, closing) = self.parse_children(reader, open)?;
                        open.pop();
                        element.children = grandchildren;
                        if closing != Closing::Matched {
                            element.form = ElementForm::Unclosed;
                        }
                        children.push(Node::Element(element));

                        match closing {
                            Closing::Matched => {}
                            Closing::Ancestor(end_tag) => {
                                if is_current(open, &end_tag) {
                                    return Ok((children, Closing::Matched));
                                }
                                return Ok((children, Closing::Ancestor(end_tag)));
                            }
                            Closing::Eof => return Ok((children, Closing::Eof)),
                        }
                    }
                }
                Event::Empty(e) => {
                    let element = self.start_element(reader, &e, ElementForm::SelfClosing);
                    children.push(Node::Element(element));
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?;
                    append_text(&mut children, &restore_literals(&text));
                }
                Event::GeneralRef(e) => {
                    // Entities stay encoded in the output.
                    let entity = reader.decoder().decode(&e)?;
                    append_text(&mut children, &format!("&{entity};"));
                }
                Event::CData(e) => {
                    let text = reader.decoder().decode(&e)?;
                    children.push(Node::Raw(format!("<![CDATA[{text}]]>")));
                }
                Event::Comment(e) => {
                    let text = reader.decoder().decode(&e)?;
                    children.push(Node::Raw(format!("<!--{text}-->")));
                }
                Event::DocType(e) => {
                    let text = reader.decoder().decode(&e)?;
                    children.push(Node::Raw(format!("<!DOCTYPE {}>", text.trim_start())));
                }
                Event::PI(e) => {
                    let text = reader.decoder().decode(&e)?;
                    children.push(Node::Raw(format!("<?{text}?>")));
                }
                Event::Decl(e) => {
                    let text = reader.decoder().decode(&e)?;
                    children.push(Node::Raw(format!("<?{text}?>")));
                }
                Event::End(e) => {
                    let end_tag = self.decode_name(reader, e.name().as_ref());
                    if is_current(open, &end_tag) {
                        return Ok((children, Closing::Matched));
                    }
                    if open.iter().any(|name| name.eq_ignore_ascii_case(&end_tag)) {
                        return Ok((children, Closing::Ancestor(end_tag)));
                    }
                    tracing::debug!(%end_tag, "Skipping end tag matching no open element");
                }
                Event::Eof => return Ok((children, Closing::Eof)),
            }
            buf.clear();
        }
    }

    fn start_element<R: BufRead>(
        &self,
        reader: &Reader<R>,
        e: &BytesStart,
        form: ElementForm,
    ) -> Element {
        let name = self.decode_name(reader, e.name().as_ref());
        let raw = self.decode_name(reader, e.attributes_raw());
        Element::new(name)
            .with_attrs(attributes(&restore_literals(&raw)))
            .with_form(form)
    }

    fn decode_name<R: BufRead>(&self, reader: &Reader<R>, bytes: &[u8]) -> String {
        reader
            .decoder()
            .decode(bytes)
            .map_or_else(|_| String::from_utf8_lossy(bytes).into_owned(), Cow::into_owned)
    }
}

impl Default for MarkupParser {
    fn default() -> Self {
        Self::new()
    }
}

/// How the children of an element ended.
#[derive(Debug, PartialEq, Eq)]
enum Closing {
    /// The element's own end tag.
    Matched,
    /// End tag of an ancestor, still to be consumed by it.
    Ancestor(String),
    /// End of input.
    Eof,
}

/// Whether `end_tag` closes the innermost open element.
fn is_current(open: &[String], end_tag: &str) -> bool {
    open.last().is_some_and(|name| name.eq_ignore_ascii_case(end_tag))
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
}

/// Append text, merging with a preceding text node.
fn append_text(children: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = children.last_mut() {
        last.push_str(text);
    } else {
        children.push(Node::text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Attribute;
    use pretty_assertions::assert_eq;

    fn parse(markup: &str) -> Element {
        MarkupParser::new().parse(markup).unwrap()
    }

    #[test]
    fn test_parse_simple_element() {
        let root = parse("<p>Hello</p>");

        assert_eq!(root.name, ROOT_TAG);
        assert_eq!(
            root.children,
            vec![Node::Element(
                Element::new("p").with_children(vec![Node::text("Hello")])
            )]
        );
    }

    #[test]
    fn test_parse_void_and_self_closing() {
        let root = parse(r#"<p>a<br>b<img src="x.png"/></p>"#);
        let Node::Element(p) = &root.children[0] else {
            panic!("expected element");
        };

        assert_eq!(p.children.len(), 4);
        assert_eq!(
            p.children[1],
            Node::Element(Element::new("br").with_form(ElementForm::Void))
        );
        assert_eq!(p.children[2], Node::text("b"));
        assert_eq!(
            p.children[3],
            Node::Element(
                Element::new("img")
                    .with_attrs(vec![Attribute::quoted("src", "x.png")])
                    .with_form(ElementForm::SelfClosing)
            )
        );
    }

    #[test]
    fn test_entities_stay_encoded() {
        let root = parse("<p>a&nbsp;b &amp; c</p>");
        let Node::Element(p) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.children, vec![Node::text("a&nbsp;b &amp; c")]);
    }

    #[test]
    fn test_comments_and_doctype_preserved() {
        let root = parse("<!DOCTYPE html><!-- note --><html></html>");
        assert_eq!(root.children[0], Node::Raw("<!DOCTYPE html>".to_owned()));
        assert_eq!(root.children[1], Node::Raw("<!-- note -->".to_owned()));
    }

    #[test]
    fn test_literals_restored() {
        let root = parse("<p>a \u{E001} b \u{E000} c</p>");
        let Node::Element(p) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.children, vec![Node::text("a < b & c")]);
    }

    #[test]
    fn test_mismatched_end_is_skipped() {
        let root = parse("<div><p>x</span></p></div>");
        let Node::Element(div) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(div.children.len(), 1);
    }

    #[test]
    fn test_unclosed_elements_end_at_ancestor() {
        let root = parse("<ul><li>a<li>b</ul><p>x</p>");

        assert_eq!(
            root.children,
            vec![
                Node::Element(Element::new("ul").with_children(vec![
                    Node::Element(
                        Element::new("li")
                            .with_children(vec![
                                Node::text("a"),
                                Node::Element(
                                    Element::new("li")
                                        .with_children(vec![Node::text("b")])
                                        .with_form(ElementForm::Unclosed)
                                ),
                            ])
                            .with_form(ElementForm::Unclosed)
                    ),
                ])),
                Node::Element(Element::new("p").with_children(vec![Node::text("x")])),
            ]
        );
    }

    #[test]
    fn test_unclosed_paragraph_keeps_siblings_outside() {
        let root = parse("<div><p>a</div><span>z</span>");

        assert_eq!(root.children.len(), 2);
        let Node::Element(div) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(
            div.children,
            vec![Node::Element(
                Element::new("p")
                    .with_children(vec![Node::text("a")])
                    .with_form(ElementForm::Unclosed)
            )]
        );
    }

    #[test]
    fn test_unclosed_at_end_of_document() {
        let root = parse("<p>a");
        let Node::Element(p) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.form, ElementForm::Unclosed);
        assert_eq!(p.children, vec![Node::text("a")]);
    }

    #[test]
    fn test_end_tag_case_insensitive() {
        let root = parse("<DIV>x</div>");
        let Node::Element(div) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(div.form, ElementForm::Normal);
    }

    #[test]
    fn test_unquoted_attributes_kept() {
        let root = parse("<input type=text checked>");
        let Node::Element(input) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(input.form, ElementForm::Void);
        assert_eq!(input.attrs.len(), 2);
        assert_eq!(input.attrs[1], Attribute::bare("checked"));
    }
}
