//! Tree converter.
//!
//! Walks the parsed document in order. Attributes of an element are handled
//! before its children because a `cond` attribute wraps the element itself.

use std::mem;

use crate::context::ConversionContext;
use crate::error::ConvertError;
use crate::grammar::{convert_print_spans, rewrite_logical};
use crate::placeholder::Family;
use crate::tree::{AttrValue, Attribute, Element, Node};

/// Families whose holder attribute receives the converted value expression.
const VALUE_FAMILIES: [Family; 3] = [Family::Class, Family::Checked, Family::Selected];

/// Convert every node below `root` in place.
pub(crate) fn convert_tree(
    root: &mut Element,
    ctx: &mut ConversionContext<'_>,
) -> Result<(), ConvertError> {
    let children = mem::take(&mut root.children);
    root.children = convert_children(children, ctx)?;
    Ok(())
}

fn convert_children(
    children: Vec<Node>,
    ctx: &mut ConversionContext<'_>,
) -> Result<Vec<Node>, ConvertError> {
    let mut converted = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Text(text) => converted.push(Node::Text(ctx.convert_text(&text)?)),
            Node::Raw(raw) => converted.push(Node::Raw(raw)),
            Node::Element(mut element) => {
                let cond = convert_attributes(&mut element, ctx)?;
                let grandchildren = mem::take(&mut element.children);
                element.children = convert_children(grandchildren, ctx)?;

                if let Some(cond) = cond {
                    converted.push(Node::text(format!("{{% if {cond} %}}\n")));
                    converted.push(Node::Element(element));
                    converted.push(Node::text("\n{% endif %}"));
                } else {
                    converted.push(Node::Element(element));
                }
            }
        }
    }
    Ok(converted)
}

/// Resolve placeholder attributes and print-convert the rest.
///
/// Returns the condition of `cond` attributes, which are removed.
fn convert_attributes(
    element: &mut Element,
    ctx: &mut ConversionContext<'_>,
) -> Result<Option<String>, ConvertError> {
    let mut conds = Vec::new();
    let mut attrs = Vec::with_capacity(element.attrs.len());

    for mut attr in mem::take(&mut element.attrs) {
        if let Some(index) = placeholder_index(&attr, Family::Cond) {
            conds.push(rewrite_logical(ctx.resolve(Family::Cond, index)?));
            continue;
        }
        if let Some(index) = placeholder_index(&attr, Family::Macro) {
            let call = ctx.resolve(Family::Macro, index)?.to_owned();
            ctx.macros.mark_used();
            attrs.push(Attribute::bare(call));
            continue;
        }
        if let Some((family, index)) = VALUE_FAMILIES
            .into_iter()
            .find_map(|family| placeholder_index(&attr, family).map(|index| (family, index)))
        {
            attr.value = AttrValue::Unquoted(ctx.resolve(family, index)?.to_owned());
            attrs.push(attr);
            continue;
        }

        match &mut attr.value {
            AttrValue::Quoted { value, .. } | AttrValue::Unquoted(value) if value.contains("::") => {
                *value = convert_print_spans(value);
            }
            _ => {}
        }
        attrs.push(attr);
    }

    element.attrs = attrs;
    Ok((!conds.is_empty()).then(|| conds.join(" and ")))
}

/// Placeholder index carried by `attr`, if it is a holder of `family`.
fn placeholder_index(attr: &Attribute, family: Family) -> Option<usize> {
    if attr.name != family.holder() {
        return None;
    }
    family.parse_token(attr.value.as_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvertOptions;
    use crate::tree::ElementForm;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cond_wraps_element() {
        let options = ConvertOptions::default();
        let mut ctx = ConversionContext::new(&options);
        let index = ctx.placeholders.cond.record("!user.active".to_owned());

        let mut root = Element::new("root").with_children(vec![Node::Element(
            Element::new("p")
                .with_attrs(vec![
                    Attribute::quoted("id", "x"),
                    Attribute::quoted("data-twig-cond", Family::Cond.token(index)),
                ])
                .with_children(vec![Node::text("hi")]),
        )]);
        convert_tree(&mut root, &mut ctx).unwrap();

        assert_eq!(
            root.children,
            vec![
                Node::text("{% if not user.active %}\n"),
                Node::Element(
                    Element::new("p")
                        .with_attrs(vec![Attribute::quoted("id", "x")])
                        .with_children(vec![Node::text("hi")])
                ),
                Node::text("\n{% endif %}"),
            ]
        );
    }

    #[test]
    fn test_value_attributes_resolved() {
        let options = ConvertOptions::default();
        let mut ctx = ConversionContext::new(&options);
        ctx.placeholders.checked.record("{{ on }}".to_owned());

        let mut root = Element::new("root").with_children(vec![Node::Element(
            Element::new("input")
                .with_attrs(vec![
                    Attribute::quoted("checked", "TWIG_CHECKED_0"),
                    Attribute::quoted("value", "::v::"),
                ])
                .with_form(ElementForm::Void),
        )]);
        convert_tree(&mut root, &mut ctx).unwrap();

        let Node::Element(input) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(
            input.attrs,
            vec![
                Attribute {
                    name: "checked".to_owned(),
                    value: AttrValue::Unquoted("{{ on }}".to_owned()),
                },
                Attribute::quoted("value", "{{v}}"),
            ]
        );
    }

    #[test]
    fn test_macro_attribute_marks_import() {
        let options = ConvertOptions::default();
        let mut ctx = ConversionContext::new(&options);
        ctx.macros.calls.record("{{ macros.attrs(x) }}".to_owned());

        let mut root = Element::new("root").with_children(vec![Node::Element(
            Element::new("a").with_attrs(vec![Attribute::quoted("data-twig-macro", "TWIG_MACRO_0")]),
        )]);
        convert_tree(&mut root, &mut ctx).unwrap();

        let Node::Element(a) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(a.attrs, vec![Attribute::bare("{{ macros.attrs(x) }}")]);
        assert!(ctx.macros.is_used());
    }

    #[test]
    fn test_ordinary_class_untouched() {
        let options = ConvertOptions::default();
        let mut ctx = ConversionContext::new(&options);
        let mut root = Element::new("root").with_children(vec![Node::Element(
            Element::new("p").with_attrs(vec![Attribute::quoted("class", "TWIG_CLASSIC")]),
        )]);
        convert_tree(&mut root, &mut ctx).unwrap();

        let Node::Element(p) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.attrs, vec![Attribute::quoted("class", "TWIG_CLASSIC")]);
    }

    #[test]
    fn test_unresolved_cond() {
        let options = ConvertOptions::default();
        let mut ctx = ConversionContext::new(&options);
        let mut root = Element::new("root").with_children(vec![Node::Element(
            Element::new("p").with_attrs(vec![Attribute::quoted("data-twig-cond", "TWIG_COND_7")]),
        )]);

        assert!(matches!(
            convert_tree(&mut root, &mut ctx),
            Err(ConvertError::UnresolvedPlaceholder {
                family: Family::Cond,
                index: 7,
            })
        ));
    }
}
