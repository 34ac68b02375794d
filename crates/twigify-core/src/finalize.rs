//! Final document assembly: structural checks, macro import, inheritance
//! wrapping and serialization.

use crate::context::{ConversionContext, MACRO_TOKEN};
use crate::error::ConvertError;
use crate::macros::insert_import;
use crate::placeholder::{Family, USE_ELEMENT};
use crate::scanner::{Segment, directive_spans};
use crate::serializer::MarkupSerializer;
use crate::tree::{Attribute, Element, Node};

/// Turn a converted tree into output text.
pub(crate) fn finalize(
    mut root: Element,
    ctx: &ConversionContext<'_>,
) -> Result<String, ConvertError> {
    ctx.blocks.ensure_closed()?;
    insert_import(&mut root, ctx);
    if let Some(parent) = &ctx.inheritance {
        complete_inheritance(&mut root, parent);
    }

    check_placeholders(&root)?;
    let output = MarkupSerializer::new().serialize(&root);

    let leftover = directive_spans(&output)
        .iter()
        .filter(|segment| matches!(segment, Segment::Directive(_)))
        .count();
    if leftover > 0 {
        tracing::warn!(leftover, "Directive spans left unconverted");
    }
    Ok(output)
}

/// Replace the `twig-use` element with an `extends` header, its content and
/// the closing `endblock`.
fn complete_inheritance(root: &mut Element, parent: &str) {
    let header = format!("{{% extends {parent} %}}\n{{% block content %}}");
    if !splice_use(&mut root.children, &header) {
        tracing::warn!("Inheritance wrapper not found, wrapping whole document");
        root.children.insert(0, Node::text(header));
        root.children.push(Node::text("{% endblock %}"));
    }
}

fn splice_use(children: &mut Vec<Node>, header: &str) -> bool {
    for i in 0..children.len() {
        let Node::Element(element) = &mut children[i] else {
            continue;
        };
        if element.name == USE_ELEMENT {
            let content = std::mem::take(&mut element.children);
            let mut replacement = Vec::with_capacity(content.len() + 2);
            replacement.push(Node::text(header));
            replacement.extend(content);
            replacement.push(Node::text("{% endblock %}"));
            children.splice(i..=i, replacement);
            return true;
        }
        if splice_use(&mut element.children, header) {
            return true;
        }
    }
    false
}

/// Fail if a holder attribute or inline macro token emitted by
/// pre-processing survived conversion.
///
/// Only those positions are checked, so document text that merely looks like
/// a token is left alone.
fn check_placeholders(element: &Element) -> Result<(), ConvertError> {
    if let Some((family, index)) = element.attrs.iter().find_map(holder_token) {
        return Err(ConvertError::UnresolvedPlaceholder { family, index });
    }
    for child in &element.children {
        match child {
            Node::Element(child) => check_placeholders(child)?,
            Node::Text(text) => {
                if let Some(caps) = MACRO_TOKEN.captures(text) {
                    return Err(ConvertError::UnresolvedPlaceholder {
                        family: Family::Macro,
                        index: caps[1].parse().unwrap_or(usize::MAX),
                    });
                }
            }
            Node::Raw(_) => {}
        }
    }
    Ok(())
}

fn holder_token(attr: &Attribute) -> Option<(Family, usize)> {
    let value = attr.value.as_str()?;
    Family::ALL
        .into_iter()
        .filter(|family| attr.name == family.holder())
        .find_map(|family| family.parse_token(value).map(|index| (family, index)))
}
